//! # Engine Module
//!
//! The stateful Monte Carlo machinery built on top of [`crate::core`]: acceptance
//! criteria, trial moves, running averages, the [`mc::MonteCarlo`] driver and the
//! files it writes.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Run settings and their builder
//! - **Acceptance** ([`criteria`]) - The `Criteria` trait and the Metropolis rule
//! - **Moves** ([`trial`]) - Translation, rotation, insertion and deletion with step-size tuning
//! - **Statistics** ([`accumulator`]) - Averages with block error estimates
//! - **Driver** ([`mc`]) - Trial selection, after-attempt hooks, production switching
//! - **Molecule counts** ([`seek`]) - Reaching a target number of molecules
//! - **Files** ([`output`], [`checkpoint`]) - CSV log, XYZ movie and JSON restarts
//! - **Progress Monitoring** ([`progress`]) - Callbacks for user interfaces
//! - **Error Handling** ([`error`]) - Engine-wide error type
//!
//! ## Key Capabilities
//!
//! - **Incremental energies** checked periodically against full recomputation
//! - **Reproducible runs** from a seeded ChaCha20 generator stored in every checkpoint
//! - **Resumable simulations** through JSON checkpoints with automatic backups

pub mod accumulator;
pub mod checkpoint;
pub mod config;
pub mod criteria;
pub mod error;
pub mod mc;
pub mod output;
pub mod progress;
pub mod seek;
pub mod trial;
