pub mod energy;
pub mod resume;
pub mod run;
