//! # Workflows Module
//!
//! End-to-end simulation procedures built from the [`crate::engine`] pieces.
//!
//! - **Canonical Ensemble** ([`nvt`]) - Fill the cell to a molecule count, equilibrate
//!   with step-size tuning, sample in production and report the mean potential energy
//!   per molecule with its block error, optionally checked against a reference value.

pub mod nvt;
