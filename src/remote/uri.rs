//! Storage URIs (`agave://{system}/{absolute path}`) and remote path helpers
//!
//! Remote paths are always POSIX paths, independent of the host platform.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SCHEME: &str = "agave://";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UriError {
    #[error("not a storage URI (expected agave://system/path): {0}")]
    InvalidScheme(String),

    #[error("storage URI has no system id: {0}")]
    MissingSystem(String),
}

/// Join a remote path and a segment. An absolute segment replaces the base.
pub fn join_path(base: &str, segment: &str) -> String {
    if segment.starts_with('/') || base.is_empty() {
        return segment.to_string();
    }
    if segment.is_empty() {
        return base.to_string();
    }
    if base.ends_with('/') {
        format!("{}{}", base, segment)
    } else {
        format!("{}/{}", base, segment)
    }
}

/// Directory part of a remote path (`/a/b/c.json` → `/a/b`, `/a` → `/`).
pub fn parent_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(i) => path[..i].to_string(),
        None => String::new(),
    }
}

/// Final component of a remote path.
pub fn path_file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Final component of a remote path without its extension.
pub fn path_file_stem(path: &str) -> &str {
    let name = path_file_name(path);
    match name.rfind('.') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    }
}

/// A file or directory on a storage system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageUri {
    system: String,
    path: String,
}

impl StorageUri {
    /// Build a URI from a system id and a path; the path is made absolute.
    pub fn new(system: impl Into<String>, path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        Self {
            system: system.into(),
            path,
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    /// Absolute path on the storage system
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        path_file_name(&self.path)
    }

    pub fn parent_dir(&self) -> String {
        parent_dir(&self.path)
    }

    /// A URI for `segment` below this one on the same system
    pub fn join(&self, segment: &str) -> Self {
        Self::new(self.system.clone(), join_path(&self.path, segment))
    }
}

impl FromStr for StorageUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(SCHEME)
            .ok_or_else(|| UriError::InvalidScheme(s.to_string()))?;
        let (system, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        if system.is_empty() {
            return Err(UriError::MissingSystem(s.to_string()));
        }
        Ok(Self::new(system, path))
    }
}

impl fmt::Display for StorageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", SCHEME, self.system, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let uri: StorageUri = "agave://data-sd2e-community/uploads/run_1/manifest.json".parse().unwrap();
        assert_eq!(uri.system(), "data-sd2e-community");
        assert_eq!(uri.path(), "/uploads/run_1/manifest.json");
        assert_eq!(uri.file_name(), "manifest.json");
        assert_eq!(uri.parent_dir(), "/uploads/run_1");
        assert_eq!(uri.to_string(), "agave://data-sd2e-community/uploads/run_1/manifest.json");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!("https://x/y".parse::<StorageUri>(), Err(UriError::InvalidScheme(_))));
        assert!(matches!("agave:///y".parse::<StorageUri>(), Err(UriError::MissingSystem(_))));
    }

    #[test]
    fn test_system_only() {
        let uri: StorageUri = "agave://sys".parse().unwrap();
        assert_eq!(uri.path(), "/");
    }

    #[test]
    fn test_new_makes_path_absolute() {
        assert_eq!(StorageUri::new("sys", "a/b").to_string(), "agave://sys/a/b");
        assert_eq!(StorageUri::new("sys", "/a").join("b.json").path(), "/a/b.json");
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(join_path("/a/b", "c"), "/a/b/c");
        assert_eq!(join_path("/a/b/", "c"), "/a/b/c");
        assert_eq!(join_path("/a/b", "/c"), "/c");
        assert_eq!(join_path("/a/b", ""), "/a/b");
        assert_eq!(parent_dir("/a/b/c.json"), "/a/b");
        assert_eq!(parent_dir("/a"), "/");
        assert_eq!(parent_dir(&parent_dir("/a/b/c.json")), "/a");
        assert_eq!(path_file_stem("/plans/plan_42.json"), "plan_42");
        assert_eq!(path_file_stem("/plans/.hidden"), ".hidden");
        assert_eq!(path_file_stem("rule_30"), "rule_30");
    }
}
