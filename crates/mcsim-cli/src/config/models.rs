use mcsim::engine::config as core_config;

/// Reference value a finished run is compared against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceConfig {
    pub pe_per_molecule: f64,
    pub stdev: f64,
    pub z: f64,
}

pub struct AppConfig {
    pub core_config: core_config::NvtConfig,
    pub reference: Option<ReferenceConfig>,
}
