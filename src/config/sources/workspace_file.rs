//! Run-local config file source: an explicit `--config` file, else ./gist.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::{File, FileFormat};
use std::path::Path;

pub const LOCAL_CONFIG_FILE: &str = "gist.toml";

/// Add the run-local config file to builder.
/// An explicit path must exist; the implicit ./gist.toml is optional.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    explicit: Option<&Path>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = match explicit {
        Some(path) => builder.add_source(File::from(path).format(FileFormat::Toml).required(true)),
        None => {
            let local = Path::new(LOCAL_CONFIG_FILE);
            if local.exists() {
                builder.add_source(File::from(local).format(FileFormat::Toml).required(false))
            } else {
                builder
            }
        }
    };
    Ok(builder)
}
