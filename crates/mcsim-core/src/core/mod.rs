//! # Core Module
//!
//! The stateless foundation of the library: how a periodic configuration of rigid
//! molecules is represented, how its potential energy is evaluated, and how it is
//! written to and read from disk.
//!
//! ## Architecture
//!
//! - **Configuration** ([`models`]) - Cell, molecule templates, molecules and the `Space` holding them
//! - **Energy Calculations** ([`forcefield`]) - Lennard-Jones and Ewald electrostatics with incremental updates
//! - **File I/O** ([`io`]) - XYZ trajectories
//! - **Utilities** ([`utils`]) - Physical constants, the error function and random geometry
//!
//! ## Units
//!
//! Energies are in kJ/mol, lengths in Å, charges in units of the elementary charge and
//! temperatures in K.

pub mod forcefield;
pub mod io;
pub mod models;
pub mod utils;
