// src/config/config.rs
use crate::miner::pool::{DEFAULT_CPU_DIVISOR, DEFAULT_LOAD_FACTOR, PoolConfig};
use crate::types::RandomXMode;
use crate::utils::error::MinerError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for the mining application
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// RandomX memory mode ("light" or "fast")
    #[serde(default)]
    pub randomx_mode: RandomXMode,

    /// Fraction of total CPU the miner may use, clamped to [0, 1/cpu_divisor]
    #[serde(default = "default_load_factor")]
    pub load_factor: f64,

    /// Divisor applied to logical cores to get the worker count; also
    /// bounds the load factor
    #[serde(default = "default_cpu_divisor")]
    pub cpu_divisor: u32,

    /// Fixed number of workers (0 or absent = cores / cpu_divisor)
    #[serde(default)]
    pub worker_threads: Option<usize>,

    /// Seconds between statistics log lines
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,

    /// Default log level when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_load_factor() -> f64 {
    DEFAULT_LOAD_FACTOR
}

fn default_cpu_divisor() -> u32 {
    DEFAULT_CPU_DIVISOR
}

fn default_report_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            randomx_mode: RandomXMode::default(),
            load_factor: default_load_factor(),
            cpu_divisor: default_cpu_divisor(),
            worker_threads: None,
            report_interval_secs: default_report_interval(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Loads configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded and validated configuration
    /// * `Err(MinerError)` - If file couldn't be read, parsed or validated
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MinerError> {
        let path = path.into();
        let config_str = std::fs::read_to_string(&path).map_err(|e| {
            MinerError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse(&config_str)
    }

    /// Parses and validates a TOML document
    pub fn parse(s: &str) -> Result<Self, MinerError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), MinerError> {
        if self.cpu_divisor == 0 {
            return Err(MinerError::ConfigError("cpu_divisor must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.load_factor) {
            return Err(MinerError::ConfigError(format!(
                "load_factor must be within [0, 1], got {}",
                self.load_factor
            )));
        }
        if self.report_interval_secs == 0 {
            return Err(MinerError::ConfigError(
                "report_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Pool settings derived from this configuration
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            cpu_divisor: self.cpu_divisor,
            load_factor: self.load_factor,
            worker_threads: self.worker_threads,
        }
    }

    /// Generates a configuration template string
    ///
    /// # Returns
    /// String containing a commented TOML configuration template
    pub fn generate_template() -> String {
        let mut template = String::new();
        template.push_str("# XMR Idle Miner Configuration\n\n");
        template.push_str("# RandomX mode: light (~256MB shared cache) or fast (~2GB shared dataset)\n");
        template.push_str("randomx_mode = \"light\"\n");
        template.push_str("# Share of total CPU to use, capped at 1 / cpu_divisor\n");
        template.push_str(&format!("load_factor = {}\n", DEFAULT_LOAD_FACTOR));
        template.push_str("# Workers = logical cores / cpu_divisor\n");
        template.push_str(&format!("cpu_divisor = {}\n", DEFAULT_CPU_DIVISOR));
        template.push_str("# Uncomment to pin the number of workers\n");
        template.push_str("# worker_threads = 2\n");
        template.push_str("# Seconds between statistics reports\n");
        template.push_str("report_interval_secs = 60\n");
        template.push_str("# error, warn, info, debug or trace (RUST_LOG overrides)\n");
        template.push_str("log_level = \"info\"\n");
        template
    }
}
