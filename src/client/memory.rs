use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{EnquiryModel, ItemModel, ItemPatch, NewEnquiry, NewItem};

use super::EntityClient;

#[derive(Default)]
struct Tables {
    items: Vec<ItemModel>,
    enquiries: Vec<EnquiryModel>,
}

/// In-process backend. Used for local runs and tests.
#[derive(Default)]
pub struct MemoryEntityClient {
    tables: Mutex<Tables>,
    failure: Mutex<Option<String>>,
    latency: Option<Duration>,
    requests: AtomicUsize,
}

impl MemoryEntityClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long before touching the tables.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// While set, every call fails with this backend message.
    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = message.map(str::to_string);
    }

    /// Number of calls that reached the backend, failed ones included.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    async fn begin(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(message) = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(AppError::Backend(message));
        }
        Ok(self.tables.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    let mut rows: Vec<T> = rows.iter().rev().cloned().collect();
    rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    rows
}

#[async_trait]
impl EntityClient for MemoryEntityClient {
    async fn insert_item(&self, item: &NewItem) -> AppResult<ItemModel> {
        let mut tables = self.begin().await?;
        let now = Utc::now();
        let model = ItemModel {
            id: Uuid::new_v4(),
            name: item.name.clone(),
            item_type: item.item_type.clone(),
            description: item.description.clone(),
            cover_image: item.cover_image.clone(),
            additional_images: item.additional_images.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.items.push(model.clone());
        Ok(model)
    }

    async fn list_items(&self) -> AppResult<Vec<ItemModel>> {
        let tables = self.begin().await?;
        Ok(newest_first(&tables.items, |item| item.created_at))
    }

    async fn update_item(&self, id: Uuid, patch: &ItemPatch) -> AppResult<ItemModel> {
        let mut tables = self.begin().await?;
        let item = tables
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| AppError::NotFound(format!("item {}", id)))?;

        patch.apply(item);
        // Keep updated_at strictly after created_at even within one clock tick.
        let now = Utc::now();
        item.updated_at = if now > item.created_at {
            now
        } else {
            item.created_at + chrono::Duration::microseconds(1)
        };
        Ok(item.clone())
    }

    async fn delete_item(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.begin().await?;
        let before = tables.items.len();
        tables.items.retain(|item| item.id != id);
        if tables.items.len() == before {
            return Err(AppError::NotFound(format!("item {}", id)));
        }
        Ok(())
    }

    async fn insert_enquiry(&self, enquiry: &NewEnquiry) -> AppResult<EnquiryModel> {
        let mut tables = self.begin().await?;
        let model = EnquiryModel {
            id: Uuid::new_v4(),
            item_id: enquiry.item_id,
            user_name: enquiry.user_name.clone(),
            user_email: enquiry.user_email.clone(),
            message: enquiry.message.clone(),
            created_at: Utc::now(),
        };
        tables.enquiries.push(model.clone());
        Ok(model)
    }

    async fn list_enquiries(&self) -> AppResult<Vec<EnquiryModel>> {
        let tables = self.begin().await?;
        Ok(newest_first(&tables.enquiries, |enquiry| enquiry.created_at))
    }
}
