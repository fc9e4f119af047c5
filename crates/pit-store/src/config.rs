use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Names of the on-disk pieces of a repository.
///
/// ```text
/// <root>/<marker>/<objects_dir>/<key[..2]>/<key[2..]>
/// <root>/<marker>/<index_file>
/// <root>/<lock_file>
/// ```
///
/// The lock file sits next to the marker rather than inside it so that
/// `reinit()` never deletes a lock that is currently held.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory name that marks a repository root.
    pub marker: String,
    /// Object pool directory inside the marker.
    pub objects_dir: String,
    /// Staging index head file inside the marker.
    pub index_file: String,
    /// Advisory lock file, a sibling of the marker.
    pub lock_file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            marker: ".pit".into(),
            objects_dir: "obj".into(),
            index_file: "INDEX".into(),
            lock_file: ".pit.lock".into(),
        }
    }
}

impl StoreConfig {
    /// Parse a config from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Every name must be a single, non-empty path component.
    pub fn validate(&self) -> StoreResult<()> {
        for (field, value) in [
            ("marker", &self.marker),
            ("objects_dir", &self.objects_dir),
            ("index_file", &self.index_file),
            ("lock_file", &self.lock_file),
        ] {
            if value.is_empty()
                || value == "."
                || value == ".."
                || value.contains('/')
                || value.contains('\\')
            {
                return Err(StoreError::InvalidConfig(format!(
                    "{field} must be a single path component, got {value:?}"
                )));
            }
        }
        if self.lock_file == self.marker {
            return Err(StoreError::InvalidConfig(
                "lock_file must differ from marker".into(),
            ));
        }
        Ok(())
    }
}
