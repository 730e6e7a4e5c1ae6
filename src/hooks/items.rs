use std::sync::Arc;

use uuid::Uuid;

use crate::client::EntityClient;
use crate::error::AppResult;
use crate::models::{ItemModel, ItemPatch, NewItem};
use crate::query::{Fetcher, QueryCache, QueryHandle, QueryKey};

use super::{run_detached, MutationStatus, MutationTracker};

pub type ItemsCache = QueryCache<Vec<ItemModel>>;

pub fn items_query_key() -> QueryKey {
    QueryKey::new("items")
}

/// Mounts the item list query. Fetches on mount; refetches only when a
/// mutation invalidates the key.
pub fn use_items(client: Arc<dyn EntityClient>, cache: &ItemsCache) -> QueryHandle<Vec<ItemModel>> {
    let fetcher: Fetcher<Vec<ItemModel>> = Arc::new(move || {
        let client = client.clone();
        Box::pin(async move {
            tracing::debug!("Fetching items");
            match client.list_items().await {
                Ok(items) => {
                    tracing::info!(count = items.len(), "Items fetched");
                    Ok(items)
                }
                Err(e) => {
                    tracing::error!("Error fetching items: {}", e);
                    Err(e)
                }
            }
        })
    });
    cache.mount(items_query_key(), fetcher)
}

#[derive(Clone)]
pub struct CreateItem {
    client: Arc<dyn EntityClient>,
    cache: ItemsCache,
    tracker: MutationTracker,
}

impl CreateItem {
    pub fn new(client: Arc<dyn EntityClient>, cache: ItemsCache) -> Self {
        Self {
            client,
            cache,
            tracker: MutationTracker::new(),
        }
    }

    pub fn status(&self) -> MutationStatus {
        self.tracker.status()
    }

    pub fn is_pending(&self) -> bool {
        self.tracker.is_pending()
    }

    pub async fn mutate(&self, item: NewItem) -> AppResult<ItemModel> {
        let client = self.client.clone();
        let cache = self.cache.clone();
        run_detached(&self.tracker, async move {
            tracing::info!(name = %item.name, item_type = %item.item_type, "Adding item");
            match client.insert_item(&item).await {
                Ok(created) => {
                    tracing::info!(id = %created.id, "Item added");
                    cache.invalidate(&items_query_key());
                    Ok(created)
                }
                Err(e) => {
                    tracing::error!("Error adding item: {}", e);
                    Err(e)
                }
            }
        })
        .await
    }
}

#[derive(Clone)]
pub struct UpdateItem {
    client: Arc<dyn EntityClient>,
    cache: ItemsCache,
    tracker: MutationTracker,
}

impl UpdateItem {
    pub fn new(client: Arc<dyn EntityClient>, cache: ItemsCache) -> Self {
        Self {
            client,
            cache,
            tracker: MutationTracker::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.tracker.is_pending()
    }

    pub async fn mutate(&self, id: Uuid, patch: ItemPatch) -> AppResult<ItemModel> {
        let client = self.client.clone();
        let cache = self.cache.clone();
        run_detached(&self.tracker, async move {
            match client.update_item(id, &patch).await {
                Ok(updated) => {
                    tracing::info!(id = %id, "Item updated");
                    cache.invalidate(&items_query_key());
                    Ok(updated)
                }
                Err(e) => {
                    tracing::error!(id = %id, "Error updating item: {}", e);
                    Err(e)
                }
            }
        })
        .await
    }
}

#[derive(Clone)]
pub struct DeleteItem {
    client: Arc<dyn EntityClient>,
    cache: ItemsCache,
    tracker: MutationTracker,
}

impl DeleteItem {
    pub fn new(client: Arc<dyn EntityClient>, cache: ItemsCache) -> Self {
        Self {
            client,
            cache,
            tracker: MutationTracker::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.tracker.is_pending()
    }

    /// A row that is already gone still refreshes the list so it cannot
    /// linger in the cache.
    pub async fn mutate(&self, id: Uuid) -> AppResult<()> {
        let client = self.client.clone();
        let cache = self.cache.clone();
        run_detached(&self.tracker, async move {
            let result = client.delete_item(id).await;
            match &result {
                Ok(()) => tracing::info!(id = %id, "Item deleted"),
                Err(e) if e.is_not_found() => tracing::warn!(id = %id, "Item already deleted"),
                Err(e) => tracing::error!(id = %id, "Error deleting item: {}", e),
            }
            if result.is_ok() || result.as_ref().is_err_and(|e| e.is_not_found()) {
                cache.invalidate(&items_query_key());
            }
            result
        })
        .await
    }
}
