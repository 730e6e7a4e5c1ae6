use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{AppError, AppResult};

use super::StorageBackend;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

/// Object store kept in process memory.
pub struct MemoryStorage {
    bucket: String,
    objects: Mutex<HashMap<String, StoredObject>>,
    /// Uploads still allowed before `upload` reports a full bucket.
    quota: Mutex<Option<usize>>,
}

impl MemoryStorage {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(HashMap::new()),
            quota: Mutex::new(None),
        }
    }

    /// Lets `count` more uploads through, then fails the rest with
    /// "quota exceeded". `None` lifts the limit.
    pub fn limit_uploads(&self, count: Option<usize>) {
        *self.quota.lock().unwrap_or_else(PoisonError::into_inner) = count;
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<String> {
        if let Some(remaining) = self
            .quota
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            if *remaining == 0 {
                return Err(AppError::Storage("quota exceeded".into()));
            }
            *remaining -= 1;
        }
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key.to_string(),
                StoredObject {
                    data: Bytes::copy_from_slice(data),
                    content_type: content_type.to_string(),
                },
            );
        Ok(format!("mem://{}/{}", self.bucket, key))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| AppError::Storage(format!("no object at {}", key)))
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_and_delete() {
        let storage = MemoryStorage::new("items");
        let path = storage
            .upload("items/a/cover.png", b"png", "image/png")
            .await
            .unwrap();
        assert_eq!(path, "mem://items/items/a/cover.png");
        assert_eq!(storage.object("items/a/cover.png").unwrap().content_type, "image/png");

        storage.delete("items/a/cover.png").await.unwrap();
        assert!(storage.is_empty());
        assert!(storage.delete("items/a/cover.png").await.is_err());
    }

    #[tokio::test]
    async fn test_upload_quota() {
        let storage = MemoryStorage::new("items");
        storage.limit_uploads(Some(1));
        storage.upload("items/a/1.png", b"1", "image/png").await.unwrap();
        let err = storage
            .upload("items/a/2.png", b"2", "image/png")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Storage error: quota exceeded");
        assert_eq!(storage.len(), 1);

        storage.limit_uploads(None);
        storage.upload("items/a/2.png", b"2", "image/png").await.unwrap();
        assert_eq!(storage.len(), 2);
    }
}
