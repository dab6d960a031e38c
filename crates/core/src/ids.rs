//! Repository and File Identifiers
//!
//! `RepoRef` names a remote repository as `owner/name`. `FileKey` names a file
//! inside a repository as `owner/name::path`, the stable key used for bulk
//! edit jobs and open editor buffers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Separator between the repository and the path in a [`FileKey`].
pub const FILE_KEY_SEPARATOR: &str = "::";

/// A remote repository, identified by owner login and repository name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse an `owner/name` full name.
    pub fn parse(full_name: &str) -> CoreResult<Self> {
        match full_name.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(owner, name))
            }
            _ => Err(CoreError::InvalidRepoRef(full_name.to_string())),
        }
    }

    /// The `owner/name` form.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A file within a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileKey {
    pub repo: RepoRef,
    pub path: String,
}

impl FileKey {
    pub fn new(repo: RepoRef, path: impl Into<String>) -> Self {
        Self {
            repo,
            path: path.into(),
        }
    }

    /// Parse an `owner/name::path` key.
    ///
    /// Only the first separator splits; any later `::` stays part of the path.
    pub fn parse(key: &str) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidFileKey(key.to_string());
        let (repo, path) = key.split_once(FILE_KEY_SEPARATOR).ok_or_else(invalid)?;
        if path.is_empty() {
            return Err(invalid());
        }
        let repo = RepoRef::parse(repo).map_err(|_| invalid())?;
        Ok(Self::new(repo, path))
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.repo, FILE_KEY_SEPARATOR, self.path)
    }
}

impl FromStr for FileKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
