use std::fs;
use std::path::Path;

use anyhow::Context;
use trackable_compiler_frontend::Configuration;

pub const CONFIG_FILE_NAME: &str = ".trackable.toml";

/// Loads the plugin options from `dir`. A missing file yields the defaults.
pub fn load_configuration(dir: impl AsRef<Path>) -> anyhow::Result<Configuration> {
    let path = dir.as_ref().join(CONFIG_FILE_NAME);
    match fs::read_to_string(&path) {
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("{} not found, using the default options", path.display());
            Ok(Configuration::default())
        }
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
        Ok(content) => parse_configuration(&content)
            .with_context(|| format!("invalid configuration in {}", path.display())),
    }
}

pub fn parse_configuration(content: &str) -> anyhow::Result<Configuration> {
    Ok(toml::from_str(content)?)
}
