use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::ImageStore;
use crate::error::{AppError, AppResult};

/// In-memory image store with switchable failures.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.lock().unwrap().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn write(&self, name: &str, bytes: &[u8]) -> AppResult<String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Storage("disk unavailable".to_string()));
        }
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
        Ok(format!("/uploads/booking-images/{}", name))
    }

    async fn delete(&self, name: &str) -> AppResult<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::Storage("disk unavailable".to_string()));
        }
        Ok(self.files.lock().unwrap().remove(name).is_some())
    }
}
