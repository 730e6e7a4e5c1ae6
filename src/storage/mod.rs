// Durable object storage for item images (GCS, R2, or in-process)

pub mod gcs;
pub mod memory;
pub mod r2;

pub use gcs::GcsBackend;
pub use memory::MemoryStorage;
pub use r2::R2Backend;

use async_trait::async_trait;

use crate::error::AppResult;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Stores the object and returns its storage path (`<scheme>://<bucket>/<key>`).
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<String>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    fn bucket(&self) -> &str;
}
