use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

/// Potential energy split into its components, in kJ/mol.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyTerm {
    pub lj: f64,
    pub lrc: f64,
    pub real: f64,
    pub fourier: f64,
    /// Ewald self and intramolecular correction, subtracted from the total.
    pub self_energy: f64,
}

impl EnergyTerm {
    pub fn new(lj: f64, lrc: f64, real: f64, fourier: f64, self_energy: f64) -> Self {
        Self {
            lj,
            lrc,
            real,
            fourier,
            self_energy,
        }
    }

    #[inline]
    pub fn total(&self) -> f64 {
        self.lj + self.lrc + self.real + self.fourier - self.self_energy
    }
}

impl Add for EnergyTerm {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            lj: self.lj + rhs.lj,
            lrc: self.lrc + rhs.lrc,
            real: self.real + rhs.real,
            fourier: self.fourier + rhs.fourier,
            self_energy: self.self_energy + rhs.self_energy,
        }
    }
}

impl AddAssign for EnergyTerm {
    fn add_assign(&mut self, rhs: Self) {
        self.lj += rhs.lj;
        self.lrc += rhs.lrc;
        self.real += rhs.real;
        self.fourier += rhs.fourier;
        self.self_energy += rhs.self_energy;
    }
}

impl Neg for EnergyTerm {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            lj: -self.lj,
            lrc: -self.lrc,
            real: -self.real,
            fourier: -self.fourier,
            self_energy: -self.self_energy,
        }
    }
}

impl Sub for EnergyTerm {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self + (-rhs)
    }
}

impl Sum for EnergyTerm {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, term| acc + term)
    }
}
