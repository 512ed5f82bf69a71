//! Infrastructure implementation of the `ConfigStore` port.

use anyhow::{Context, Result};
use rigger_common::ProviderConfig;
use std::path::PathBuf;

use crate::application::ports::ConfigStore;
use crate::domain::config::{CONFIG_FILE_NAME, DEFAULT_CONFIG_DIR};

/// Production implementation of `ConfigStore` that uses a YAML file on disk.
///
/// The path is, in order: the explicit path, `RIGGER_CONFIG`, then
/// `~/.rigger/config.yaml`.
#[derive(Debug, Default)]
pub struct YamlConfigStore {
    explicit: Option<PathBuf>,
}

impl YamlConfigStore {
    #[must_use]
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { explicit }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<ProviderConfig> {
        let path = self.path()?;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using flags only");
            return Ok(ProviderConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.explicit {
            return Ok(path.clone());
        }
        if let Ok(val) = std::env::var("RIGGER_CONFIG") {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(DEFAULT_CONFIG_DIR).join(CONFIG_FILE_NAME))
    }
}
