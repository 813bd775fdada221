use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::ImageStore;
use crate::error::{AppError, AppResult};

/// Filesystem-backed image store rooted at a single upload directory.
#[derive(Clone, Debug)]
pub struct LocalImageStore {
    root: PathBuf,
    url_prefix: String,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }

    fn path_for(&self, name: &str) -> AppResult<PathBuf> {
        if !Self::is_valid_name(name) {
            return Err(AppError::Storage(format!("invalid storage name: {}", name)));
        }
        Ok(self.root.join(name))
    }

    pub async fn ensure_root(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|err| {
            AppError::Storage(format!(
                "failed to create upload dir {:?}: {}",
                self.root, err
            ))
        })
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    /// Writes to a temp file first so a reader never sees a partial image.
    async fn write(&self, name: &str, bytes: &[u8]) -> AppResult<String> {
        let path = self.path_for(name)?;
        self.ensure_root().await?;

        let tmp = self
            .root
            .join(format!(".{}.tmp-{}", name, Uuid::new_v4().simple()));

        let mut file = tokio::fs::File::create(&tmp).await.map_err(|err| {
            AppError::Storage(format!("failed to create {:?}: {}", tmp, err))
        })?;
        file.write_all(bytes).await.map_err(|err| {
            AppError::Storage(format!("failed to write {:?}: {}", tmp, err))
        })?;
        file.flush().await.map_err(|err| {
            AppError::Storage(format!("failed to flush {:?}: {}", tmp, err))
        })?;
        drop(file);

        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AppError::Storage(format!(
                "failed to move {:?} -> {:?}: {}",
                tmp, path, err
            )));
        }

        tracing::debug!(storage_name = %name, size = bytes.len(), "Stored image bytes");
        Ok(format!("{}/{}", self.url_prefix, name))
    }

    async fn delete(&self, name: &str) -> AppResult<bool> {
        let path = self.path_for(name)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(AppError::Storage(format!(
                "failed to delete {:?}: {}",
                path, err
            ))),
        }
    }
}
