use std::path::Path;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;

mod local;
#[cfg(test)]
pub(crate) mod memory;

pub use local::LocalImageStore;

/// Durable byte storage for uploaded images.
///
/// Names are opaque and write-once; the store never sees image metadata.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store `bytes` under `name` and return the public URL for it.
    async fn write(&self, name: &str, bytes: &[u8]) -> AppResult<String>;

    /// Remove the bytes stored under `name`.
    /// Returns `false` when nothing was stored under that name.
    async fn delete(&self, name: &str) -> AppResult<bool>;

    /// Recover the storage name from a URL returned by [`ImageStore::write`].
    fn name_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.rsplit('/').next().filter(|name| !name.is_empty())
    }
}

/// Generate a unique storage name that keeps the original file extension.
pub fn storage_name_for(original_file_name: &str) -> String {
    let extension = Path::new(original_file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("{}{}", Uuid::new_v4(), extension)
}
