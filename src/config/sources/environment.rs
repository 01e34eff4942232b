//! Environment sources: `GIST_*` variables, then the legacy `MODEL_NAME`.
//!
//! `GIST_WORKERS=4` sets `workers`; nested keys use `__`, as in
//! `GIST_PROVIDER__MODEL` or `GIST_RETRY__MAX_ATTEMPTS`.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

pub const ENV_PREFIX: &str = "GIST";
pub const LEGACY_MODEL_VAR: &str = "MODEL_NAME";

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option(
            "provider.model",
            std::env::var(LEGACY_MODEL_VAR)
                .ok()
                .filter(|v| !v.trim().is_empty()),
        )
}
