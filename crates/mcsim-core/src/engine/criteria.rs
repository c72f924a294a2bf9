use crate::core::utils::constants::beta_from_kelvin;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CriteriaError {
    #[error("Inverse temperature must be positive and finite, got {0}")]
    InvalidBeta(f64),
    #[error("Temperature must be positive and finite, got {0} K")]
    InvalidTemperature(f64),
    #[error("Activity must be positive and finite, got {0}")]
    InvalidActivity(f64),
}

/// Decides whether a trial with log acceptance probability `ln_probability` is accepted.
pub trait Criteria {
    fn beta(&self) -> f64;

    /// Fugacity factor `exp(beta mu) / Lambda^3` used by insertions and deletions.
    fn activity(&self) -> f64;

    fn accept(&self, ln_probability: f64, rng: &mut dyn RngCore) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metropolis {
    beta: f64,
    activity: f64,
}

impl Metropolis {
    pub fn new(beta: f64, activity: f64) -> Result<Self, CriteriaError> {
        if !(beta.is_finite() && beta > 0.0) {
            return Err(CriteriaError::InvalidBeta(beta));
        }
        if !(activity.is_finite() && activity > 0.0) {
            return Err(CriteriaError::InvalidActivity(activity));
        }
        Ok(Self { beta, activity })
    }

    pub fn from_temperature(kelvin: f64, activity: f64) -> Result<Self, CriteriaError> {
        if !(kelvin.is_finite() && kelvin > 0.0) {
            return Err(CriteriaError::InvalidTemperature(kelvin));
        }
        Self::new(beta_from_kelvin(kelvin), activity)
    }
}

impl Criteria for Metropolis {
    fn beta(&self) -> f64 {
        self.beta
    }

    fn activity(&self) -> f64 {
        self.activity
    }

    fn accept(&self, ln_probability: f64, rng: &mut dyn RngCore) -> bool {
        if !ln_probability.is_finite() {
            return false;
        }
        ln_probability >= 0.0 || rng.r#gen::<f64>() < ln_probability.exp()
    }
}

/// Serializable set of the available acceptance criteria.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcceptanceCriteria {
    Metropolis(Metropolis),
}

impl AcceptanceCriteria {
    /// Same criteria at `factor` times the inverse temperature.
    pub fn with_scaled_beta(&self, factor: f64) -> Result<Self, CriteriaError> {
        match self {
            Self::Metropolis(m) => Ok(Self::Metropolis(Metropolis::new(
                m.beta * factor,
                m.activity,
            )?)),
        }
    }
}

impl From<Metropolis> for AcceptanceCriteria {
    fn from(value: Metropolis) -> Self {
        Self::Metropolis(value)
    }
}

impl Criteria for AcceptanceCriteria {
    fn beta(&self) -> f64 {
        match self {
            Self::Metropolis(m) => m.beta(),
        }
    }

    fn activity(&self) -> f64 {
        match self {
            Self::Metropolis(m) => m.activity(),
        }
    }

    fn accept(&self, ln_probability: f64, rng: &mut dyn RngCore) -> bool {
        match self {
            Self::Metropolis(m) => m.accept(ln_probability, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn new_validates_beta_and_activity() {
        assert_eq!(
            Metropolis::new(0.0, 1.0),
            Err(CriteriaError::InvalidBeta(0.0))
        );
        assert_eq!(
            Metropolis::new(1.0, -1.0),
            Err(CriteriaError::InvalidActivity(-1.0))
        );
        assert!(matches!(
            Metropolis::from_temperature(f64::NAN, 1.0),
            Err(CriteriaError::InvalidTemperature(_))
        ));
    }

    #[test]
    fn downhill_moves_are_always_accepted() {
        let criteria = Metropolis::from_temperature(298.0, 1.0).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert!(criteria.accept(0.0, &mut rng));
            assert!(criteria.accept(12.5, &mut rng));
        }
    }

    #[test]
    fn non_finite_probabilities_are_rejected() {
        let criteria = Metropolis::new(1.0, 1.0).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert!(!criteria.accept(f64::NAN, &mut rng));
        assert!(!criteria.accept(f64::NEG_INFINITY, &mut rng));
        assert!(!criteria.accept(f64::INFINITY, &mut rng));
    }

    #[test]
    fn uphill_acceptance_rate_follows_boltzmann_factor() {
        let criteria = Metropolis::new(1.0, 1.0).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let n = 50_000;
        let accepted = (0..n)
            .filter(|_| criteria.accept(-1.0, &mut rng))
            .count();
        let rate = accepted as f64 / n as f64;
        assert!((rate - (-1.0f64).exp()).abs() < 0.01);
    }

    #[test]
    fn scaled_beta_keeps_activity() {
        let criteria = AcceptanceCriteria::from(Metropolis::new(2.0, 0.5).unwrap());
        let scaled = criteria.with_scaled_beta(0.25).unwrap();
        assert_eq!(scaled.beta(), 0.5);
        assert_eq!(scaled.activity(), 0.5);
    }
}
