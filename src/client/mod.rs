//! Typed access to the `items` and `enquiries` tables.

pub mod memory;
pub mod postgres;
pub mod rest;

pub use memory::MemoryEntityClient;
pub use postgres::PgEntityClient;
pub use rest::RestEntityClient;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{EnquiryModel, ItemModel, ItemPatch, NewEnquiry, NewItem};

/// Boundary to the hosted backend. One call per method, no retries.
#[async_trait]
pub trait EntityClient: Send + Sync {
    /// Inserts one item and returns the stored row.
    async fn insert_item(&self, item: &NewItem) -> AppResult<ItemModel>;

    /// All items, newest `created_at` first.
    async fn list_items(&self) -> AppResult<Vec<ItemModel>>;

    /// Applies a partial edit and stamps `updated_at`.
    /// Fails with `NotFound` when no row has this id.
    async fn update_item(&self, id: Uuid, patch: &ItemPatch) -> AppResult<ItemModel>;

    /// Fails with `NotFound` when no row was removed.
    async fn delete_item(&self, id: Uuid) -> AppResult<()>;

    async fn insert_enquiry(&self, enquiry: &NewEnquiry) -> AppResult<EnquiryModel>;

    /// All enquiries, newest first. Enquiries have no update or delete path.
    async fn list_enquiries(&self) -> AppResult<Vec<EnquiryModel>>;
}
