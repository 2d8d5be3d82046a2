//! Registry of profile types.
//!
//! Each type maps a name to a storage directory and, optionally, a parent
//! type it inherits values from. Parents may be registered after their
//! children; a dangling parent simply ends the chain early until it shows up.

use crate::core::error::ProfileError;
use crate::core::locator::check_type_name;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// A registered profile type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileType {
    pub name: String,
    pub dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    types: BTreeMap<String, ProfileType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `name`.
    ///
    /// Unknown parents are accepted with a warning. A parent link that would
    /// close a loop is refused and leaves the registry untouched.
    pub fn register(
        &mut self,
        name: &str,
        dir: impl Into<PathBuf>,
        parent: Option<&str>,
    ) -> Result<&ProfileType, ProfileError> {
        for candidate in std::iter::once(name).chain(parent) {
            check_type_name(candidate).map_err(|reason| ProfileError::InvalidTypeName {
                name: candidate.to_string(),
                reason: reason.to_string(),
            })?;
        }
        if let Some(parent) = parent {
            self.check_cycle(name, parent)?;
            if !self.types.contains_key(parent) {
                warn!(
                    "Profile type `{}` inherits `{}`, which is not registered yet",
                    name, parent
                );
            }
        }

        let entry = ProfileType {
            name: name.to_string(),
            dir: dir.into(),
            parent: parent.map(str::to_string),
        };
        info!(
            "Registered profile type `{}` at {}",
            entry.name,
            entry.dir.display()
        );
        self.types.insert(name.to_string(), entry);
        Ok(&self.types[name])
    }

    /// Point an existing type at a new parent.
    pub fn inherit(&mut self, name: &str, parent: &str) -> Result<&ProfileType, ProfileError> {
        let dir = self
            .types
            .get(name)
            .map(|t| t.dir.clone())
            .ok_or_else(|| ProfileError::UnknownType(name.to_string()))?;
        self.register(name, dir, Some(parent))
    }

    /// Insert an entry taken from another endpoint's registry as-is.
    pub(crate) fn insert(&mut self, entry: ProfileType) {
        self.types.insert(entry.name.clone(), entry);
    }

    pub fn resolve(&self, name: &str) -> Option<&ProfileType> {
        self.types.get(name)
    }

    pub fn storage_dir(&self, name: &str) -> Option<&Path> {
        self.types.get(name).map(|t| t.dir.as_path())
    }

    /// `name` followed by its ancestors, root last.
    ///
    /// Empty when `name` itself is unknown; stops at the first parent that is
    /// not registered.
    pub fn chain(&self, name: &str) -> Vec<&ProfileType> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = self.types.get(name);
        while let Some(ty) = cursor {
            if !seen.insert(ty.name.as_str()) {
                break;
            }
            chain.push(ty);
            cursor = ty.parent.as_deref().and_then(|p| self.types.get(p));
        }
        chain
    }

    /// Last resolvable type of `name`'s chain.
    pub fn root_of(&self, name: &str) -> Option<&ProfileType> {
        self.chain(name).last().copied()
    }

    /// True when `ancestor` appears anywhere in `name`'s chain, `name` included.
    pub fn descends_from(&self, name: &str, ancestor: &str) -> bool {
        self.chain(name).iter().any(|t| t.name == ancestor)
    }

    pub fn types(&self) -> impl Iterator<Item = &ProfileType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Drop every type. Profiles resolved against the old table are stale.
    pub fn clear(&mut self) {
        self.types.clear();
    }

    fn check_cycle(&self, name: &str, parent: &str) -> Result<(), ProfileError> {
        let mut cursor = Some(parent);
        let mut seen = HashSet::new();
        while let Some(current) = cursor {
            if current == name {
                return Err(ProfileError::InheritanceCycle {
                    name: name.to_string(),
                    parent: parent.to_string(),
                });
            }
            if !seen.insert(current) {
                break;
            }
            cursor = self
                .types
                .get(current)
                .and_then(|t| t.parent.as_deref());
        }
        Ok(())
    }
}
