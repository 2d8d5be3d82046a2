//! `profile://<type>/<relative-file>` locators.
//!
//! A locator names one JSON document of one profile type. The pair
//! (type, file) is the identity key used by the profile cache, so the
//! canonical string produced by [`Locator`]'s `Display` impl is what the
//! store keys on.

use crate::core::error::ProfileError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const SCHEME: &str = "profile";
const PREFIX: &str = "profile://";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locator {
    type_name: String,
    file: String,
}

impl Locator {
    /// Build a locator from its parts, applying the same checks as parsing.
    pub fn new(type_name: &str, file: &str) -> Result<Self, ProfileError> {
        format!("{}{}/{}", PREFIX, type_name, file).parse()
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Relative file path under the type's storage directory.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// The profile id: the file path without its `.json` suffix.
    pub fn id(&self) -> &str {
        self.file.strip_suffix(".json").unwrap_or(&self.file)
    }

    /// Same file under another type; used to walk the inheritance chain.
    pub fn with_type(&self, type_name: &str) -> Locator {
        Locator {
            type_name: type_name.to_string(),
            file: self.file.clone(),
        }
    }

    /// Join the relative file onto a storage directory.
    pub fn resolve(&self, storage_dir: &Path) -> PathBuf {
        self.file
            .split('/')
            .fold(storage_dir.to_path_buf(), |acc, segment| acc.join(segment))
    }
}

/// Check that `name` can appear as the type part of a locator.
///
/// Returns the reason it cannot.
pub fn check_type_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("empty profile type");
    }
    if name.contains(['/', '\\', ':', '?', '#']) {
        return Err("illegal character in type");
    }
    Ok(())
}

impl FromStr for Locator {
    type Err = ProfileError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let rest = raw
            .strip_prefix(PREFIX)
            .ok_or_else(|| ProfileError::invalid_locator(raw, "expected `profile://` scheme"))?;

        let (type_name, file) = rest
            .split_once('/')
            .ok_or_else(|| ProfileError::invalid_locator(raw, "missing file path"))?;

        check_type_name(type_name).map_err(|reason| ProfileError::invalid_locator(raw, reason))?;
        if file.is_empty() {
            return Err(ProfileError::invalid_locator(raw, "empty file path"));
        }
        if file.contains('\\') {
            return Err(ProfileError::invalid_locator(raw, "backslash in file path"));
        }
        for segment in file.split('/') {
            match segment {
                "" => return Err(ProfileError::invalid_locator(raw, "empty path segment")),
                "." | ".." => {
                    return Err(ProfileError::invalid_locator(
                        raw,
                        "relative segments are not allowed",
                    ));
                }
                _ => {}
            }
        }

        Ok(Locator {
            type_name: type_name.to_string(),
            file: file.to_string(),
        })
    }
}

impl TryFrom<String> for Locator {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Locator> for String {
    fn from(value: Locator) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", PREFIX, self.type_name, self.file)
    }
}
