//! # Core Models Module
//!
//! Data structures describing the simulated system: the periodic cell, the rigid
//! molecule templates, the molecules placed in the cell, and the [`space::Space`]
//! that owns all of them.
//!
//! ## Key Components
//!
//! - [`simulation_box`] - Periodic orthorhombic cell with minimum-image and wrapping rules
//! - [`molecule`] - Interaction sites, rigid molecule templates and placed molecules
//! - [`space`] - The configuration: cell, templates and molecules, plus a configuration id
//!
//! ## Usage
//!
//! ```ignore
//! use mcsim::core::models::{molecule::MoleculeTemplate, simulation_box::SimulationBox, space::Space};
//!
//! let mut space = Space::new(SimulationBox::cubic(24.8586887)?);
//! let water = space.add_template(MoleculeTemplate::spce());
//! space.insert_molecule(water, Point3::new(1.0, 2.0, 3.0), UnitQuaternion::identity())?;
//! ```

pub mod molecule;
pub mod simulation_box;
pub mod space;
