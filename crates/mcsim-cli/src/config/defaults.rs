pub struct DefaultsConfig {
    pub template: String,
    pub placement: String,
    pub temperature: f64,
    pub activity: f64,
    pub long_range_correction: bool,
    pub linear_shift: bool,
    pub log_frequency: u64,
    pub movie_frequency: u64,
    pub restart_frequency: u64,
    pub check_energy_tolerance: f64,
    pub reference_z: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            template: "spce".to_string(),
            placement: "seek".to_string(),
            temperature: 298.0,
            activity: 1.0,
            long_range_correction: true,
            linear_shift: false,
            log_frequency: 10_000,
            movie_frequency: 100_000,
            restart_frequency: 100_000,
            check_energy_tolerance: 1e-6,
            reference_z: 2.576,
        }
    }
}
