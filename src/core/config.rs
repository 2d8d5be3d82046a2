//! Store configuration loaded from `profiles.toml`.
//!
//! ```toml
//! reload = "replace"
//! indent = 2
//!
//! [[types]]
//! name = "global"
//! dir = "~/.editor"
//!
//! [[types]]
//! name = "local"
//! dir = "~/.editor/local"
//! parent = "global"
//!
//! [[schemas]]
//! locator = "profile://global/settings.json"
//! example = { theme = "dark", font-size = 14 }
//! ```

use crate::core::error::ProfileError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "profiles.toml";

/// How `reload` folds the on-disk document into memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Memory becomes exactly what is on disk, mirroring `save`.
    #[default]
    Replace,
    /// Top-level keys from disk overwrite memory; keys only in memory stay.
    Merge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub dir: PathBuf,
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    pub locator: String,
    pub example: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub reload: ReloadPolicy,
    #[serde(default = "default_indent")]
    pub indent: usize,
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub schemas: Vec<SchemaDef>,
}

fn default_indent() -> usize {
    2
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            reload: ReloadPolicy::default(),
            indent: default_indent(),
            types: Vec::new(),
            schemas: Vec::new(),
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ProfileError> {
        let mut config: StoreConfig = toml::from_str(content)?;
        for ty in &mut config.types {
            ty.dir = expand_home(&ty.dir);
        }
        Ok(config)
    }

    /// Parse the file at `path`. A missing file is the default config.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        if !path.exists() {
            return Ok(StoreConfig::default());
        }
        let content = fs::read_to_string(path).map_err(ProfileError::IoError)?;
        Self::from_toml_str(&content).map_err(|e| {
            ProfileError::ConfigError(format!("{}: {}", path.display(), e))
        })
    }
}

/// Expand a leading `~` against `$HOME`.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}
