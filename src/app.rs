use std::sync::Arc;

use crate::client::{EntityClient, MemoryEntityClient, PgEntityClient, RestEntityClient};
use crate::config::{BackendConfig, Config, StorageConfig};
use crate::db::{create_pool, run_migrations};
use crate::error::AppResult;
use crate::hooks::ItemsCache;
use crate::router::Route;
use crate::storage::{GcsBackend, R2Backend, StorageBackend};
use crate::upload::{BlobStore, ImageUploader};
use crate::views::{CreateItemForm, ListView, Toaster};

/// Shared handles every view is built from. Cloning shares the cache,
/// toaster and blob session.
#[derive(Clone)]
pub struct AppContext {
    pub client: Arc<dyn EntityClient>,
    pub items: ItemsCache,
    pub toaster: Toaster,
    pub blobs: BlobStore,
    pub uploader: Option<ImageUploader>,
}

impl AppContext {
    pub fn new(client: Arc<dyn EntityClient>) -> Self {
        Self {
            client,
            items: ItemsCache::new(),
            toaster: Toaster::new(),
            blobs: BlobStore::new(),
            uploader: None,
        }
    }

    pub fn with_uploader(mut self, uploader: ImageUploader) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub async fn from_config(config: &Config) -> AppResult<Self> {
        let client: Arc<dyn EntityClient> = match &config.backend {
            BackendConfig::Postgres {
                database_url,
                run_migrations: migrate,
            } => {
                tracing::info!("Connecting to database...");
                let pool = create_pool(database_url).await?;
                tracing::info!("Database connection established");
                if *migrate {
                    run_migrations(&pool).await?;
                }
                Arc::new(PgEntityClient::new(pool))
            }
            BackendConfig::Rest { url, api_key } => {
                tracing::info!("Using REST backend at {}", url);
                Arc::new(RestEntityClient::new(url.as_str(), api_key.as_str())?)
            }
            BackendConfig::Memory => {
                tracing::warn!("Using in-memory backend; nothing is persisted");
                Arc::new(MemoryEntityClient::new())
            }
        };

        let storage: Option<Arc<dyn StorageBackend>> = match &config.storage {
            StorageConfig::R2 {
                bucket,
                account_id,
                access_key,
                secret_key,
            } => {
                tracing::info!("R2 image storage enabled: bucket={}", bucket);
                Some(Arc::new(R2Backend::new(
                    bucket.clone(),
                    account_id.clone(),
                    access_key.clone(),
                    secret_key.clone(),
                )?))
            }
            StorageConfig::Gcs { bucket } => {
                tracing::info!("GCS image storage enabled: bucket={}", bucket);
                Some(Arc::new(GcsBackend::new(bucket.clone()).await?))
            }
            StorageConfig::None => {
                tracing::info!("Image storage disabled, images stay session-local");
                None
            }
        };

        let ctx = Self::new(client);
        Ok(match storage {
            Some(storage) => ctx.with_uploader(ImageUploader::new(
                storage,
                config.public_image_base_url.clone(),
            )),
            None => ctx,
        })
    }
}

pub enum Page {
    Home,
    ViewItems(ListView),
    AddItems(CreateItemForm),
    About,
    NotFound(String),
}

/// Shell: navigation plus the page currently mounted.
pub struct App {
    ctx: AppContext,
    route: Route,
    page: Page,
}

impl App {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            route: Route::Home,
            page: Page::Home,
        }
    }

    /// Mounts the page for `path`. Re-entering the item list reuses cached
    /// data while it refreshes; re-entering the form starts it blank.
    pub fn navigate(&mut self, path: &str) -> Route {
        let route = Route::from_path(path);
        tracing::debug!(path, ?route, "Navigate");
        self.page = match route {
            Route::Home => Page::Home,
            Route::ViewItems => Page::ViewItems(ListView::mount(&self.ctx)),
            Route::AddItems => Page::AddItems(CreateItemForm::new(&self.ctx)),
            Route::About => Page::About,
            Route::NotFound => Page::NotFound(path.to_string()),
        };
        self.route = route;
        route
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Highlight state of a navigation entry.
    pub fn is_active(&self, route: Route) -> bool {
        self.route == route
    }
}
