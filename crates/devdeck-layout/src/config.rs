//! Engine configuration.
//!
//! ```toml
//! # devdeck-layout.toml
//! default_template = "sidebar"
//! persist = true
//! storage_key_prefix = "panel-layout:"
//! storage_path = "/home/me/.config/devdeck/layouts.json"
//! ```
//!
//! ```rust,ignore
//! let config = LayoutConfig::from_toml_file("devdeck-layout.toml")?;
//! let problems = config.validate(&TemplateCatalog::builtin());
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::persistence::DEFAULT_KEY_PREFIX;
use crate::template::{DEFAULT_TEMPLATE_ID, TemplateCatalog};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Template applied to new scopes and by `reset_layout`.
    pub default_template: String,
    /// Write every successful mutation through to storage.
    pub persist: bool,
    pub storage_key_prefix: String,
    /// JSON file for [`FileStorage`](crate::storage::FileStorage). `None`
    /// keeps layouts in memory only.
    pub storage_path: Option<PathBuf>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_template: DEFAULT_TEMPLATE_ID.to_owned(),
            persist: true,
            storage_key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
            storage_path: None,
        }
    }
}

impl LayoutConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path.as_ref())?)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&read(path.as_ref())?)
    }

    /// Problems with this config against `catalog`. Empty means valid.
    #[must_use]
    pub fn validate(&self, catalog: &TemplateCatalog) -> Vec<String> {
        let mut errors = Vec::new();

        if !catalog.contains(&self.default_template) {
            errors.push(format!(
                "default_template `{}` is not a known template (known: {})",
                self.default_template,
                catalog.ids().collect::<Vec<_>>().join(", ")
            ));
        }

        if self.storage_key_prefix.is_empty() {
            errors.push("storage_key_prefix must not be empty".into());
        }

        if self
            .storage_path
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            errors.push("storage_path must not be empty when set".into());
        }

        if self.storage_path.is_some() && !self.persist {
            errors.push("storage_path is set but persist is disabled".into());
        }

        errors
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
