//! Physical constants and unit conversions.
//!
//! Energies are in kJ/mol, lengths in Å and charges in units of the elementary
//! charge. Charges used by the pair potentials are pre-multiplied by
//! [`charge_scale`], so that `q_i q_j / r` is directly an energy in kJ/mol.

use std::f64::consts::PI;

pub const AVOGADRO_CONSTANT: f64 = 6.022140857e23; // 1/mol
pub const ELEMENTARY_CHARGE: f64 = 1.6021766208e-19; // C
pub const VACUUM_PERMITTIVITY: f64 = 8.854187817e-12; // F/m
pub const IDEAL_GAS_CONSTANT: f64 = 8.3144598; // J/(mol K)

/// Vacuum permittivity in e²·mol/(kJ·Å).
pub fn reduced_vacuum_permittivity() -> f64 {
    VACUUM_PERMITTIVITY / ELEMENTARY_CHARGE.powi(2) * 1e3 / 1e10 / AVOGADRO_CONSTANT
}

/// Coulomb constant `1/(4π ε0)` in kJ·Å/(mol·e²).
pub fn coulomb_constant() -> f64 {
    1.0 / (4.0 * PI * reduced_vacuum_permittivity())
}

/// Factor applied to a charge in units of e before it enters an energy sum.
pub fn charge_scale() -> f64 {
    coulomb_constant().sqrt()
}

/// Inverse thermal energy in mol/kJ.
pub fn beta_from_kelvin(temperature: f64) -> f64 {
    1.0 / (temperature * IDEAL_GAS_CONSTANT / 1e3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coulomb_constant_matches_known_value_in_kj_per_mol() {
        assert!((coulomb_constant() - 1389.3545).abs() < 1e-2);
    }

    #[test]
    fn charge_scale_squared_is_coulomb_constant() {
        assert!((charge_scale().powi(2) - coulomb_constant()).abs() < 1e-9);
    }

    #[test]
    fn beta_at_room_temperature() {
        let beta = beta_from_kelvin(298.0);
        assert!((beta - 0.403597).abs() < 1e-5);
    }
}
