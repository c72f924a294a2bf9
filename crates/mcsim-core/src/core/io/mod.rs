//! Trajectory file formats.

pub mod xyz;
