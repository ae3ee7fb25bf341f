// src/core/fs_ops.rs
//! Upload storage on the local file system.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::app_log;
use crate::upload_validator::{
    IncomingFile, UploadError, UploadErrorKind, UploadKind, UploadValidator,
};

const HTACCESS: &str = "Options -Indexes\ndeny from all\n";

/// Ensure directory exists
pub async fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .await
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        app_log!(info, "Created directory: {}", path.display());
    }
    Ok(())
}

/// A file accepted and written by a [`FileStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Path relative to the store root, e.g. `cv/1700000000_mon-cv.pdf`.
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub mime_type: &'static str,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Validate then persist under a collision-free name. Nothing is written
    /// when validation fails.
    async fn save(&self, kind: UploadKind, file: &IncomingFile) -> Result<StoredFile, UploadError>;

    /// Absolute path for a stored relative path, refusing anything that
    /// would escape the store root.
    fn resolve(&self, relative_path: &str) -> Option<PathBuf>;
}

pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root with listing disabled and an empty index.
    pub async fn secure_root(&self) -> Result<()> {
        ensure_dir_exists(&self.root).await?;

        let htaccess = self.root.join(".htaccess");
        if !htaccess.exists() {
            fs::write(&htaccess, HTACCESS)
                .await
                .with_context(|| format!("Failed to write {}", htaccess.display()))?;
        }

        let index = self.root.join("index.html");
        if !index.exists() {
            fs::write(&index, "")
                .await
                .with_context(|| format!("Failed to write {}", index.display()))?;
        }

        Ok(())
    }

    /// Create `name`, or `stem-1.ext`, `stem-2.ext`... when taken. The name is
    /// claimed by the exclusive create itself, so concurrent saves of the same
    /// upload never share a file.
    async fn create_unique(dir: &Path, file_name: &str) -> Result<(fs::File, PathBuf)> {
        let (stem, ext) = match file_name.rsplit_once('.') {
            Some((stem, ext)) => (stem, format!(".{}", ext)),
            None => (file_name, String::new()),
        };

        let mut counter = 0u32;
        loop {
            let candidate = if counter == 0 {
                dir.join(file_name)
            } else {
                dir.join(format!("{}-{}{}", stem, counter, ext))
            };

            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(file) => return Ok((file, candidate)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to create upload: {}", candidate.display()))
                }
            }
        }
    }

    async fn write(&self, kind: UploadKind, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        self.secure_root().await?;

        let dir = self.root.join(kind.subdir());
        ensure_dir_exists(&dir).await?;

        let (mut file, target) = Self::create_unique(&dir, file_name).await?;
        file.write_all(bytes)
            .await
            .with_context(|| format!("Failed to write upload: {}", target.display()))?;
        file.flush()
            .await
            .with_context(|| format!("Failed to write upload: {}", target.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, std::fs::Permissions::from_mode(0o644))
                .await
                .with_context(|| format!("Failed to set permissions: {}", target.display()))?;
        }

        Ok(target)
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(&self, kind: UploadKind, file: &IncomingFile) -> Result<StoredFile, UploadError> {
        let validated = UploadValidator::validate(kind, file)?;
        let file_name = validated.file_name(chrono::Utc::now().timestamp());

        let absolute_path = self
            .write(kind, &file_name, &file.bytes)
            .await
            .map_err(|e| {
                app_log!(error, "Failed to store {:?} upload: {:#}", kind, e);
                UploadError::new(UploadErrorKind::Storage, "Impossible de sauvegarder le fichier")
            })?;

        let stored_name = absolute_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&file_name)
            .to_string();

        app_log!(info, "Stored upload: {}", absolute_path.display());

        Ok(StoredFile {
            relative_path: format!("{}/{}", kind.subdir(), stored_name),
            absolute_path,
            mime_type: validated.mime_type,
        })
    }

    fn resolve(&self, relative_path: &str) -> Option<PathBuf> {
        let relative = Path::new(relative_path);
        let safe = !relative_path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        safe.then(|| self.root.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload_validator::fixtures;

    #[tokio::test]
    async fn test_save_writes_under_kind_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path().join("trainer-files"));

        let stored = store
            .save(UploadKind::Cv, &IncomingFile::new("Mon CV.pdf", fixtures::pdf()))
            .await
            .unwrap();

        assert!(stored.relative_path.starts_with("cv/"));
        assert!(stored.relative_path.ends_with("_mon-cv.pdf"));
        assert!(stored.absolute_path.exists());
        assert!(store.root().join(".htaccess").exists());
        assert!(store.root().join("index.html").exists());
    }

    #[tokio::test]
    async fn test_same_name_does_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let photo = IncomingFile::new("portrait.png", fixtures::png());

        let first = store.save(UploadKind::Photo, &photo).await.unwrap();
        let second = store.save(UploadKind::Photo, &photo).await.unwrap();

        assert_ne!(first.absolute_path, second.absolute_path);
        assert!(first.absolute_path.exists());
        assert!(second.absolute_path.exists());
    }

    #[tokio::test]
    async fn test_taken_name_gets_counter_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("portrait.png"), b"taken").unwrap();
        std::fs::write(dir.path().join("portrait-1.png"), b"taken").unwrap();

        let (_, path) = LocalFileStore::create_unique(dir.path(), "portrait.png")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("portrait-2.png"));
        assert_eq!(std::fs::read(dir.path().join("portrait.png")).unwrap(), b"taken");

        let (_, bare) = LocalFileStore::create_unique(dir.path(), "README").await.unwrap();
        assert_eq!(bare, dir.path().join("README"));
        let (_, bare) = LocalFileStore::create_unique(dir.path(), "README").await.unwrap();
        assert_eq!(bare, dir.path().join("README-1"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(LocalFileStore::new(dir.path()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .save(UploadKind::Photo, &IncomingFile::new("portrait.png", fixtures::png()))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut paths = std::collections::HashSet::new();
        for task in tasks {
            let stored = task.await.unwrap();
            assert_eq!(std::fs::read(&stored.absolute_path).unwrap(), fixtures::png());
            paths.insert(stored.absolute_path);
        }
        assert_eq!(paths.len(), 8);
    }

    #[tokio::test]
    async fn test_rejected_upload_never_reaches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("trainer-files");
        let store = LocalFileStore::new(&root);

        let err = store
            .save(UploadKind::Cv, &IncomingFile::new("cv.pdf", fixtures::exe()))
            .await
            .unwrap_err();

        assert_eq!(err.kind, UploadErrorKind::DisallowedType);
        assert!(!root.join("cv").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stored_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let stored = store
            .save(UploadKind::Cv, &IncomingFile::new("cv.pdf", fixtures::pdf()))
            .await
            .unwrap();

        let mode = std::fs::metadata(&stored.absolute_path)
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_resolve_refuses_traversal() {
        let store = LocalFileStore::new("/srv/files");

        assert_eq!(
            store.resolve("photos/a.png"),
            Some(PathBuf::from("/srv/files/photos/a.png"))
        );
        assert_eq!(store.resolve("../etc/passwd"), None);
        assert_eq!(store.resolve("/etc/passwd"), None);
        assert_eq!(store.resolve(""), None);
    }
}
