use super::molecule::{Molecule, MoleculeTemplate};
use super::simulation_box::SimulationBox;
use crate::core::utils::geometry::random_orientation;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpaceError {
    #[error("Only three-dimensional cells are supported, got dimension {0}")]
    UnsupportedDimension(usize),
    #[error("Cell edge lengths must be positive and finite, got {0}")]
    InvalidLength(f64),
    #[error("Unknown molecule template index {0}")]
    UnknownTemplate(usize),
    #[error("Molecule index {index} out of range ({count} molecules)")]
    MoleculeOutOfRange { index: usize, count: usize },
    #[error("Template '{template}' has {expected} sites but {actual} offsets were given")]
    SiteCountMismatch {
        template: String,
        expected: usize,
        actual: usize,
    },
}

/// The simulated configuration: a periodic cell, the rigid templates that may
/// appear in it and the molecules currently placed.
///
/// Every accepted change bumps a configuration id, which output files use to
/// tell configurations apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    simulation_box: SimulationBox,
    templates: Vec<MoleculeTemplate>,
    molecules: Vec<Molecule>,
    config_id: u64,
}

impl Space {
    /// Creates an empty configuration in the given cell.
    pub fn new(simulation_box: SimulationBox) -> Self {
        Self {
            simulation_box,
            templates: Vec::new(),
            molecules: Vec::new(),
            config_id: 0,
        }
    }

    /// Registers a molecule template.
    ///
    /// # Return
    ///
    /// The template index used by [`Molecule::template`] and the insertion APIs.
    pub fn add_template(&mut self, template: MoleculeTemplate) -> usize {
        self.templates.push(template);
        self.templates.len() - 1
    }

    #[inline]
    pub fn simulation_box(&self) -> &SimulationBox {
        &self.simulation_box
    }

    #[inline]
    pub fn templates(&self) -> &[MoleculeTemplate] {
        &self.templates
    }

    pub fn template(&self, index: usize) -> Result<&MoleculeTemplate, SpaceError> {
        self.templates
            .get(index)
            .ok_or(SpaceError::UnknownTemplate(index))
    }

    #[inline]
    pub fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    pub fn molecule(&self, index: usize) -> Result<&Molecule, SpaceError> {
        self.molecules
            .get(index)
            .ok_or(SpaceError::MoleculeOutOfRange {
                index,
                count: self.molecules.len(),
            })
    }

    #[inline]
    pub fn num_molecules(&self) -> usize {
        self.molecules.len()
    }

    /// Number of molecules built from the given template.
    pub fn num_molecules_of(&self, template: usize) -> usize {
        self.molecules
            .iter()
            .filter(|m| m.template == template)
            .count()
    }

    /// Molecule counts indexed by template.
    pub fn molecule_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.templates.len()];
        for m in &self.molecules {
            if let Some(c) = counts.get_mut(m.template) {
                *c += 1;
            }
        }
        counts
    }

    pub fn num_sites(&self) -> usize {
        self.molecules.iter().map(|m| m.offsets.len()).sum()
    }

    #[inline]
    pub fn config_id(&self) -> u64 {
        self.config_id
    }

    /// Builds a molecule of `template` with its reference site at `position`
    /// (wrapped into the cell) and the given orientation, without adding it.
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError::UnknownTemplate`] if the template was never registered.
    pub fn build_molecule(
        &self,
        template: usize,
        position: Point3<f64>,
        orientation: &UnitQuaternion<f64>,
    ) -> Result<Molecule, SpaceError> {
        let offsets = self.template(template)?.oriented_offsets(orientation);
        Ok(Molecule::new(
            template,
            self.simulation_box.wrap(&position),
            offsets,
        ))
    }

    /// Appends a molecule to the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is unknown or the number of offsets does not
    /// match the template's site count.
    pub fn add_molecule(&mut self, mut molecule: Molecule) -> Result<usize, SpaceError> {
        let template = self.template(molecule.template)?;
        if template.num_sites() != molecule.offsets.len() {
            return Err(SpaceError::SiteCountMismatch {
                template: template.name.clone(),
                expected: template.num_sites(),
                actual: molecule.offsets.len(),
            });
        }
        molecule.position = self.simulation_box.wrap(&molecule.position);
        self.molecules.push(molecule);
        self.config_id += 1;
        Ok(self.molecules.len() - 1)
    }

    /// Convenience wrapper around [`Space::build_molecule`] and [`Space::add_molecule`].
    pub fn insert_molecule(
        &mut self,
        template: usize,
        position: Point3<f64>,
        orientation: UnitQuaternion<f64>,
    ) -> Result<usize, SpaceError> {
        let molecule = self.build_molecule(template, position, &orientation)?;
        self.add_molecule(molecule)
    }

    /// Removes a molecule; the last molecule takes its index.
    pub fn remove_molecule(&mut self, index: usize) -> Result<Molecule, SpaceError> {
        if index >= self.molecules.len() {
            return Err(SpaceError::MoleculeOutOfRange {
                index,
                count: self.molecules.len(),
            });
        }
        self.config_id += 1;
        Ok(self.molecules.swap_remove(index))
    }

    /// Moves a molecule to a new pose. The reference position is wrapped into the cell.
    pub fn set_pose(
        &mut self,
        index: usize,
        position: Point3<f64>,
        offsets: Vec<Vector3<f64>>,
    ) -> Result<(), SpaceError> {
        let count = self.molecules.len();
        let wrapped = self.simulation_box.wrap(&position);
        let molecule = self
            .molecules
            .get_mut(index)
            .ok_or(SpaceError::MoleculeOutOfRange { index, count })?;
        if molecule.offsets.len() != offsets.len() {
            return Err(SpaceError::SiteCountMismatch {
                template: self.templates[molecule.template].name.clone(),
                expected: molecule.offsets.len(),
                actual: offsets.len(),
            });
        }
        molecule.position = wrapped;
        molecule.offsets = offsets;
        self.config_id += 1;
        Ok(())
    }

    /// Places `count` molecules of `template` on the points of the smallest simple
    /// cubic lattice that holds them, each with a random orientation.
    pub fn fill_cubic_lattice<R: Rng + ?Sized>(
        &mut self,
        template: usize,
        count: usize,
        rng: &mut R,
    ) -> Result<(), SpaceError> {
        self.template(template)?;
        if count == 0 {
            return Ok(());
        }
        let mut per_side = 1usize;
        while per_side.pow(3) < count {
            per_side += 1;
        }
        let spacing = self.simulation_box.lengths() / per_side as f64;
        for n in 0..count {
            let (i, j, k) = (n % per_side, (n / per_side) % per_side, n / per_side.pow(2));
            let position = Point3::new(
                (i as f64 + 0.5) * spacing.x,
                (j as f64 + 0.5) * spacing.y,
                (k as f64 + 0.5) * spacing.z,
            );
            let orientation = random_orientation(rng);
            self.insert_molecule(template, position, orientation)?;
        }
        Ok(())
    }
}
