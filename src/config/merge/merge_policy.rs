//! Merge rules: defaults, override order.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("language", crate::config::DEFAULT_LANGUAGE)?
        .set_default("workers", 1)?
        .set_default("provider.kind", "openai")?
        .set_default("provider.model", crate::config::DEFAULT_MODEL)
}
