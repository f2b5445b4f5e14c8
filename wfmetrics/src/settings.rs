use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use wfmetrics_core::settings::MetricsConfig;

#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
#[readonly::make]
pub struct Settings {
    pub bind_address: String,
    pub metrics: MetricsConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bind_address: "0.0.0.0:8080".to_string(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Settings {
    pub fn get_environment() -> Environment {
        Environment::default()
            .prefix("WFMETRICS")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    pub fn new() -> Result<Self, ConfigError> {
        Self::from_dir("config")
    }

    /// Layers `default`, `<run mode>` and `local` from `dir`, then the
    /// environment. All files are optional.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_sources(dir.as_ref(), Self::get_environment())
    }

    fn from_sources(dir: &Path, environment: Environment) -> Result<Self, ConfigError> {
        let run_mode = env::var("WFMETRICS_RUN_MODE").unwrap_or_else(|_| "development".into());

        // `metrics.server` defaults through serde, a builder default would
        // shadow the `endpoint` alias.
        let s = Config::builder()
            .set_default("bind_address", "0.0.0.0:8080")?
            .add_source(config_file(dir, "default"))
            .add_source(config_file(dir, &run_mode))
            .add_source(config_file(dir, "local"))
            .add_source(environment)
            .build()?;

        s.try_deserialize()
    }
}

fn config_file(
    dir: &Path,
    name: &str,
) -> File<config::FileSourceFile, config::FileFormat> {
    File::with_name(&dir.join(name).to_string_lossy()).required(false)
}
