use crate::core::models::molecule::Molecule;
use crate::core::models::space::{Space, SpaceError};
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed XYZ at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Frame does not match template '{template}': {message}")]
    TemplateMismatch { template: String, message: String },
    #[error(transparent)]
    Space(#[from] SpaceError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XyzFrame {
    pub comment: String,
    pub sites: Vec<(String, Point3<f64>)>,
}

/// Writes every site of `space` as one frame. Molecules are written whole, so
/// sites may lie outside the cell.
pub fn write_frame(space: &Space, comment: &str, writer: &mut impl Write) -> Result<(), XyzError> {
    writeln!(writer, "{}", space.num_sites())?;
    writeln!(writer, "{}", comment)?;
    for molecule in space.molecules() {
        let template = space.template(molecule.template)?;
        for (site, position) in template.sites.iter().zip(molecule.site_positions()) {
            writeln!(
                writer,
                "{} {:.8} {:.8} {:.8}",
                site.name, position.x, position.y, position.z
            )?;
        }
    }
    Ok(())
}

/// Reads the next frame, or `None` at end of input.
pub fn read_frame(reader: &mut impl BufRead, line_no: &mut usize) -> Result<Option<XyzFrame>, XyzError> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        *line_no += 1;
        if !line.trim().is_empty() {
            break;
        }
    }
    let count: usize = line.trim().parse().map_err(|_| XyzError::Parse {
        line: *line_no,
        message: format!("expected a site count, found '{}'", line.trim()),
    })?;

    let mut comment = String::new();
    reader.read_line(&mut comment)?;
    *line_no += 1;

    let mut sites = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(XyzError::Parse {
                line: *line_no,
                message: format!("frame ended after {} of {} sites", sites.len(), count),
            });
        }
        *line_no += 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(XyzError::Parse {
                line: *line_no,
                message: "expected 'name x y z'".to_string(),
            });
        }
        let mut coords = [0.0; 3];
        for (c, field) in coords.iter_mut().zip(&fields[1..4]) {
            *c = field.parse().map_err(|_| XyzError::Parse {
                line: *line_no,
                message: format!("invalid coordinate '{}'", field),
            })?;
        }
        sites.push((fields[0].to_string(), Point3::from(coords)));
    }
    Ok(Some(XyzFrame {
        comment: comment.trim_end().to_string(),
        sites,
    }))
}

pub fn read_frames(reader: &mut impl BufRead) -> Result<Vec<XyzFrame>, XyzError> {
    let mut line_no = 0;
    let mut frames = Vec::new();
    while let Some(frame) = read_frame(reader, &mut line_no)? {
        frames.push(frame);
    }
    Ok(frames)
}

/// Adds the molecules of `frame` to `space`, reading consecutive sites as
/// molecules of `template`. The first site of each molecule is its reference.
pub fn populate_space(frame: &XyzFrame, space: &mut Space, template: usize) -> Result<(), XyzError> {
    let definition = space.template(template)?.clone();
    let n = definition.num_sites();
    let mismatch = |message: String| XyzError::TemplateMismatch {
        template: definition.name.clone(),
        message,
    };
    if n == 0 || frame.sites.len() % n != 0 {
        return Err(mismatch(format!(
            "{} sites is not a multiple of {}",
            frame.sites.len(),
            n
        )));
    }
    for chunk in frame.sites.chunks(n) {
        for ((name, _), site) in chunk.iter().zip(&definition.sites) {
            if name != &site.name {
                return Err(mismatch(format!(
                    "expected site '{}', found '{}'",
                    site.name, name
                )));
            }
        }
        let reference = chunk[0].1;
        let offsets = chunk.iter().map(|(_, p)| p - reference).collect();
        space.add_molecule(Molecule::new(template, reference, offsets))?;
    }
    Ok(())
}
