use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::schema::Validation;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Invalid locator `{locator}`: {reason}")]
    InvalidLocator { locator: String, reason: String },
    #[error("Invalid profile type name `{name}`: {reason}")]
    InvalidTypeName { name: String, reason: String },
    #[error("Unknown profile type: {0}")]
    UnknownType(String),
    #[error("Illegal key path: `{0}`")]
    IllegalPath(String),
    #[error("Schema rejected `{key}`: {verdict}")]
    SchemaRejection { key: String, verdict: Validation },
    #[error("Schemas belong on root types; `{type_name}` inherits from another type")]
    NonRootSchema { type_name: String },
    #[error("Inheriting `{parent}` from `{name}` would form a cycle")]
    InheritanceCycle { name: String, parent: String },
    #[error("Failed to persist {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Channel error: {0}")]
    Channel(String),
    #[error("Coordinator refused request: {0}")]
    Remote(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl ProfileError {
    pub(crate) fn invalid_locator(locator: &str, reason: impl Into<String>) -> Self {
        ProfileError::InvalidLocator {
            locator: locator.to_string(),
            reason: reason.into(),
        }
    }
}
