//! Configuration Loader
//!
//! Layered loading: built-in defaults, then an optional base file, then an
//! optional environment-specific file, then `RESUBMIT__SECTION__KEY`
//! environment variables. File format follows the extension (YAML, TOML, JSON).

use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use super::ResubmitConfig;
use crate::error::ResubmitResult;

/// Prefix for environment overrides, e.g. `RESUBMIT__RETRY__BASE_DELAY_MS`
pub const ENV_PREFIX: &str = "RESUBMIT";

/// Name of the variable selecting the deployment environment
pub const ENVIRONMENT_VAR: &str = "RESUBMIT_ENV";

/// Current environment, defaulting to development
pub fn detect_environment() -> String {
    std::env::var(ENVIRONMENT_VAR)
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

impl ResubmitConfig {
    /// Load defaults, an optional file, and process environment overrides
    pub fn load(path: Option<&str>) -> ResubmitResult<Self> {
        Self::load_from_sources(path, None)
    }

    /// Load `resubmit.yaml` then `resubmit.{environment}.yaml` from `dir`
    pub fn load_for_environment(dir: &Path, environment: &str) -> ResubmitResult<Self> {
        let base = dir.join("resubmit.yaml");
        let overlay = dir.join(format!("resubmit.{environment}.yaml"));

        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&ResubmitConfig::default())?)
            .add_source(config::File::from(base).required(false))
            .add_source(config::File::from(overlay).required(false));
        builder = builder.add_source(environment_source(None));

        let config: ResubmitConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            environment = %environment,
            directory = %dir.display(),
            "Configuration loaded for environment"
        );
        Ok(config)
    }

    /// Load with an explicit environment map instead of the process environment
    pub fn load_from_sources(
        path: Option<&str>,
        environment: Option<HashMap<String, String>>,
    ) -> ResubmitResult<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&ResubmitConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(environment_source(environment));

        let config: ResubmitConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            file = path.unwrap_or("<none>"),
            base_url = %config.api.base_url,
            batch_width = config.batch.concurrent_batch_width,
            "Configuration loaded"
        );
        Ok(config)
    }
}

fn environment_source(overrides: Option<HashMap<String, String>>) -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .source(overrides)
}
