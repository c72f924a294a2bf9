use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

const SPCE_OH_BOND: f64 = 1.0; // Å
const SPCE_HOH_ANGLE_DEGREES: f64 = 109.47;
const SPCE_CHARGE_H: f64 = 0.4238;
const SPCE_EPSILON_O: f64 = 0.650169581; // kJ/mol
const SPCE_SIGMA_O: f64 = 3.16555789; // Å

/// A single interaction site of a rigid molecule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    /// Lennard-Jones type label; sites sharing a label must share `epsilon` and `sigma`.
    #[serde(rename = "type")]
    pub site_type: String,
    pub epsilon: f64,
    pub sigma: f64,
    pub charge: f64,
    /// Body-frame position relative to the reference site.
    pub position: Vector3<f64>,
}

impl Site {
    pub fn new(
        name: &str,
        site_type: &str,
        epsilon: f64,
        sigma: f64,
        charge: f64,
        position: Vector3<f64>,
    ) -> Self {
        Self {
            name: name.to_string(),
            site_type: site_type.to_string(),
            epsilon,
            sigma,
            charge,
            position,
        }
    }
}

/// Rigid molecule definition. Site 0 is the reference site used for
/// cutoffs, wrapping and rotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoleculeTemplate {
    pub name: String,
    pub sites: Vec<Site>,
}

impl MoleculeTemplate {
    pub fn new(name: &str, sites: Vec<Site>) -> Self {
        Self {
            name: name.to_string(),
            sites,
        }
    }

    /// Extended simple point charge water (Berendsen et al., 1987).
    pub fn spce() -> Self {
        let half_angle = SPCE_HOH_ANGLE_DEGREES.to_radians() / 2.0;
        let (sin, cos) = half_angle.sin_cos();
        Self::new(
            "spce",
            vec![
                Site::new(
                    "O",
                    "O",
                    SPCE_EPSILON_O,
                    SPCE_SIGMA_O,
                    -2.0 * SPCE_CHARGE_H,
                    Vector3::zeros(),
                ),
                Site::new(
                    "H1",
                    "H",
                    0.0,
                    0.0,
                    SPCE_CHARGE_H,
                    Vector3::new(SPCE_OH_BOND * sin, SPCE_OH_BOND * cos, 0.0),
                ),
                Site::new(
                    "H2",
                    "H",
                    0.0,
                    0.0,
                    SPCE_CHARGE_H,
                    Vector3::new(-SPCE_OH_BOND * sin, SPCE_OH_BOND * cos, 0.0),
                ),
            ],
        )
    }

    #[inline]
    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    pub fn net_charge(&self) -> f64 {
        self.sites.iter().map(|s| s.charge).sum()
    }

    /// Site offsets from the reference site after applying `orientation`.
    pub fn oriented_offsets(&self, orientation: &UnitQuaternion<f64>) -> Vec<Vector3<f64>> {
        let origin = self.sites.first().map(|s| s.position).unwrap_or_else(Vector3::zeros);
        self.sites
            .iter()
            .map(|s| orientation * (s.position - origin))
            .collect()
    }
}

/// A molecule placed in the cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    pub template: usize,
    /// Reference-site position, kept inside the cell.
    pub position: Point3<f64>,
    /// Site offsets from the reference site in the current orientation.
    pub offsets: Vec<Vector3<f64>>,
}

impl Molecule {
    pub fn new(template: usize, position: Point3<f64>, offsets: Vec<Vector3<f64>>) -> Self {
        Self {
            template,
            position,
            offsets,
        }
    }

    /// Absolute site positions; sites may lie outside the cell.
    pub fn site_positions(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        self.offsets.iter().map(move |o| self.position + o)
    }
}
