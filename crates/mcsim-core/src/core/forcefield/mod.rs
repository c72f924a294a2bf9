//! # Force Field Module
//!
//! Interaction model for rigid point-charge molecules: 12-6 Lennard-Jones between
//! sites with Lorentz-Berthelot mixing, and Coulomb electrostatics evaluated with
//! the Ewald summation in a periodic cell.
//!
//! ## Key Components
//!
//! - [`params`] - Molecule definitions loaded from TOML (`[[site]]` tables) or built in
//! - [`potentials`] - Pairwise functional forms and the Lennard-Jones tail correction
//! - [`ewald`] - Wave vectors, structure factors and self terms of the reciprocal sum
//! - [`pair`] - [`pair::PairLjCoulEwald`], which owns the running energy of a configuration
//!   and evaluates trial moves incrementally
//! - [`term`] - Energy components and their arithmetic
//!
//! ## Usage
//!
//! The potential is built once per configuration and then kept in sync with it:
//! every move is first proposed, which returns an [`pair::EnergyChange`], and
//! committed only if the move is accepted.
//!
//! ```ignore
//! let mut pair = PairLjCoulEwald::new(config, &space)?;
//! let change = pair.propose_displacement(&space, index, &new_position, &new_offsets)?;
//! if accepted {
//!     space.set_pose(index, new_position, new_offsets)?;
//!     pair.commit(change);
//! }
//! ```

pub mod ewald;
pub mod pair;
pub mod params;
pub(crate) mod potentials;
pub mod term;
