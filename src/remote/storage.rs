//! Object storage access

use super::uri::{join_path, parent_dir, path_file_name, StorageUri};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unknown storage system: {0}")]
    UnknownSystem(String),

    #[error("path escapes the storage root: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("remote error: {0}")]
    Remote(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for object storage backends, addressed by system id and
/// absolute path.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a remote file into `local`, returning the local path
    async fn download(&self, uri: &StorageUri, local: &Path) -> StorageResult<PathBuf>;

    /// Store `local` under `dest_dir`, keeping its file name
    async fn upload(&self, system: &str, dest_dir: &str, local: &Path) -> StorageResult<StorageUri>;

    /// Create a directory (and any missing parents)
    async fn mkdir(&self, system: &str, path: &str) -> StorageResult<()>;

    /// Rename a file in place; `new_name` is a bare file name
    async fn rename(&self, system: &str, path: &str, new_name: &str) -> StorageResult<()>;
}

fn local_file_name(local: &Path) -> StorageResult<String> {
    local
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| StorageError::InvalidPath(local.display().to_string()))
}

fn map_not_found(e: std::io::Error, what: &str) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(what.to_string())
    } else {
        StorageError::Io(e)
    }
}

// ---------------------------------------------------------------------------
// FsObjectStore
// ---------------------------------------------------------------------------

/// Storage systems mounted on the local filesystem, one root directory per
/// system id.
#[derive(Debug, Clone, Default)]
pub struct FsObjectStore {
    roots: HashMap<String, PathBuf>,
}

impl FsObjectStore {
    pub fn new(roots: HashMap<String, PathBuf>) -> Self {
        Self { roots }
    }

    pub fn with_root(mut self, system: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.roots.insert(system.into(), root.into());
        self
    }

    /// Map a system path onto the local filesystem.
    fn resolve(&self, system: &str, path: &str) -> StorageResult<PathBuf> {
        let root = self
            .roots
            .get(system)
            .ok_or_else(|| StorageError::UnknownSystem(system.to_string()))?;

        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn download(&self, uri: &StorageUri, local: &Path) -> StorageResult<PathBuf> {
        let source = self.resolve(uri.system(), uri.path())?;
        tokio::fs::copy(&source, local)
            .await
            .map_err(|e| map_not_found(e, &uri.to_string()))?;
        Ok(local.to_path_buf())
    }

    async fn upload(&self, system: &str, dest_dir: &str, local: &Path) -> StorageResult<StorageUri> {
        let name = local_file_name(local)?;
        let remote_path = join_path(dest_dir, &name);
        let dest_dir_local = self.resolve(system, dest_dir)?;
        if !tokio::fs::try_exists(&dest_dir_local).await? {
            return Err(StorageError::NotFound(StorageUri::new(system, dest_dir).to_string()));
        }
        let target = self.resolve(system, &remote_path)?;
        tokio::fs::copy(local, &target)
            .await
            .map_err(|e| map_not_found(e, &local.display().to_string()))?;
        Ok(StorageUri::new(system, remote_path))
    }

    async fn mkdir(&self, system: &str, path: &str) -> StorageResult<()> {
        let dir = self.resolve(system, path)?;
        tokio::fs::create_dir_all(&dir).await?;
        Ok(())
    }

    async fn rename(&self, system: &str, path: &str, new_name: &str) -> StorageResult<()> {
        let from = self.resolve(system, path)?;
        let to = self.resolve(system, &join_path(&parent_dir(path), new_name))?;
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| map_not_found(e, &StorageUri::new(system, path).to_string()))
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory storage keyed by storage URI, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: DashMap<String, Vec<u8>>,
    dirs: DashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file
    pub fn put(&self, uri: &StorageUri, contents: impl Into<Vec<u8>>) {
        self.files.insert(uri.to_string(), contents.into());
    }

    pub fn get(&self, uri: &StorageUri) -> Option<Vec<u8>> {
        self.files.get(&uri.to_string()).map(|r| r.clone())
    }

    pub fn contains(&self, uri: &StorageUri) -> bool {
        self.files.contains_key(&uri.to_string())
    }

    pub fn has_dir(&self, uri: &StorageUri) -> bool {
        self.dirs.contains(&uri.to_string())
    }

    /// All stored file URIs, sorted
    pub fn uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.files.iter().map(|r| r.key().clone()).collect();
        uris.sort();
        uris
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn download(&self, uri: &StorageUri, local: &Path) -> StorageResult<PathBuf> {
        let contents = self
            .get(uri)
            .ok_or_else(|| StorageError::NotFound(uri.to_string()))?;
        tokio::fs::write(local, contents).await?;
        Ok(local.to_path_buf())
    }

    async fn upload(&self, system: &str, dest_dir: &str, local: &Path) -> StorageResult<StorageUri> {
        let name = local_file_name(local)?;
        let contents = tokio::fs::read(local)
            .await
            .map_err(|e| map_not_found(e, &local.display().to_string()))?;
        let uri = StorageUri::new(system, join_path(dest_dir, &name));
        self.put(&uri, contents);
        Ok(uri)
    }

    async fn mkdir(&self, system: &str, path: &str) -> StorageResult<()> {
        self.dirs.insert(StorageUri::new(system, path).to_string());
        Ok(())
    }

    async fn rename(&self, system: &str, path: &str, new_name: &str) -> StorageResult<()> {
        let from = StorageUri::new(system, path);
        let (_, contents) = self
            .files
            .remove(&from.to_string())
            .ok_or_else(|| StorageError::NotFound(from.to_string()))?;
        let to = StorageUri::new(system, join_path(&parent_dir(path), path_file_name(new_name)));
        self.put(&to, contents);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        let work = TempDir::new().unwrap();
        let uri = StorageUri::new("sys", "/in/manifest.json");
        store.put(&uri, b"{}".to_vec());

        let local = store.download(&uri, &work.path().join("manifest.json")).await.unwrap();
        assert_eq!(std::fs::read(&local).unwrap(), b"{}");

        store.mkdir("sys", "/out").await.unwrap();
        assert!(store.has_dir(&StorageUri::new("sys", "/out")));

        let uploaded = store.upload("sys", "/out", &local).await.unwrap();
        assert_eq!(uploaded.to_string(), "agave://sys/out/manifest.json");
        assert!(store.contains(&uploaded));
    }

    #[tokio::test]
    async fn memory_store_rename() {
        let store = MemoryStore::new();
        store.put(&StorageUri::new("sys", "/out/a.json"), b"1".to_vec());

        store.rename("sys", "/out/a.json", "a.json.1000").await.unwrap();
        assert_eq!(store.uris(), vec!["agave://sys/out/a.json.1000".to_string()]);

        let err = store.rename("sys", "/out/a.json", "x").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn memory_store_download_missing() {
        let store = MemoryStore::new();
        let work = TempDir::new().unwrap();
        let err = store
            .download(&StorageUri::new("sys", "/nope.json"), &work.path().join("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn fs_store_operations() {
        let root = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = FsObjectStore::default().with_root("sys", root.path());

        std::fs::create_dir_all(root.path().join("in")).unwrap();
        std::fs::write(root.path().join("in/plan.json"), b"plan").unwrap();

        let local = store
            .download(&"agave://sys/in/plan.json".parse().unwrap(), &work.path().join("plan.json"))
            .await
            .unwrap();
        assert_eq!(std::fs::read(&local).unwrap(), b"plan");

        // Upload into a missing directory fails until it is created
        assert!(matches!(
            store.upload("sys", "/out/p1", &local).await,
            Err(StorageError::NotFound(_))
        ));
        store.mkdir("sys", "/out/p1").await.unwrap();
        let uri = store.upload("sys", "/out/p1", &local).await.unwrap();
        assert_eq!(uri.path(), "/out/p1/plan.json");
        assert!(root.path().join("out/p1/plan.json").exists());

        store.rename("sys", "/out/p1/plan.json", "plan.json.5000").await.unwrap();
        assert!(root.path().join("out/p1/plan.json.5000").exists());

        let err = store.rename("sys", "/out/p1/plan.json", "again").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn fs_store_rejects_escape_and_unknown_system() {
        let root = TempDir::new().unwrap();
        let store = FsObjectStore::default().with_root("sys", root.path());

        assert!(matches!(
            store.mkdir("sys", "/../outside").await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            store.mkdir("other", "/x").await,
            Err(StorageError::UnknownSystem(_))
        ));
    }
}
