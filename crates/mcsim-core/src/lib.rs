//! # mcsim Core Library
//!
//! Metropolis Monte Carlo simulation of rigid point-charge molecules, such as
//! SPC/E water, in a periodic cell with Lennard-Jones dispersion and Ewald-summed
//! electrostatics.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** The configuration (`Space`), molecule templates,
//!   the pair potential with its Ewald reciprocal sum, XYZ I/O and numerical utilities.
//!
//! - **[`engine`]: The Logic Core.** Acceptance criteria, trial moves, accumulators and
//!   the `MonteCarlo` driver with its periodic logs, trajectories, restarts, energy
//!   checks and step-size tuning.
//!
//! - **[`workflows`]: The Public API.** Complete staged procedures, such as an NVT run
//!   that fills the cell, equilibrates, samples and compares the result with a reference.

pub mod core;
pub mod engine;
pub mod workflows;
