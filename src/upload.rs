//! Image selection for item forms.
//!
//! Selected files first become session-local `blob:` references, usable as an
//! image source only while the [`BlobStore`] that issued them is alive. An
//! [`ImageUploader`] exchanges them for durable remote URLs. Items saved
//! with `blob:` references lose their images once the session ends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::storage::StorageBackend;

const BLOB_SCHEME: &str = "blob:";

/// A file handed over by the file picker or a drop target.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl SelectedFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageRef {
    /// Pending: only resolvable inside the session that created it.
    LocalBlob(String),
    /// Durable URL.
    Remote(String),
}

impl ImageRef {
    /// Classifies a stored reference string. Empty strings are no image.
    pub fn parse(reference: &str) -> Option<Self> {
        if reference.is_empty() {
            None
        } else if reference.starts_with(BLOB_SCHEME) {
            Some(ImageRef::LocalBlob(reference.to_string()))
        } else {
            Some(ImageRef::Remote(reference.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ImageRef::LocalBlob(s) | ImageRef::Remote(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            ImageRef::LocalBlob(s) | ImageRef::Remote(s) => s,
        }
    }

    pub fn is_durable(&self) -> bool {
        matches!(self, ImageRef::Remote(_))
    }
}

/// Blob references issued during one session.
#[derive(Clone)]
pub struct BlobStore {
    session: Uuid,
    blobs: Arc<Mutex<HashMap<String, SelectedFile>>>,
}

impl Default for BlobStore {
    fn default() -> Self {
        Self {
            session: Uuid::new_v4(),
            blobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Uuid {
        self.session
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SelectedFile>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, file: SelectedFile) -> ImageRef {
        let reference = format!("{}{}/{}", BLOB_SCHEME, self.session, Uuid::new_v4());
        self.lock().insert(reference.clone(), file);
        ImageRef::LocalBlob(reference)
    }

    pub fn get(&self, image: &ImageRef) -> Option<SelectedFile> {
        match image {
            ImageRef::LocalBlob(reference) => self.lock().get(reference).cloned(),
            ImageRef::Remote(_) => None,
        }
    }

    pub fn revoke(&self, image: &ImageRef) {
        if let ImageRef::LocalBlob(reference) = image {
            self.lock().remove(reference);
        }
    }

    /// Whether `reference` can still be rendered. Remote URLs always can;
    /// blobs only while this session holds them.
    pub fn is_live(&self, reference: &str) -> bool {
        match ImageRef::parse(reference) {
            Some(ImageRef::LocalBlob(reference)) => self.lock().contains_key(&reference),
            Some(ImageRef::Remote(_)) => true,
            None => false,
        }
    }
}

/// Value of an image input: one image, or an ordered list of them.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadField {
    Single(Option<ImageRef>),
    Multi(Vec<ImageRef>),
}

impl UploadField {
    pub fn single() -> Self {
        UploadField::Single(None)
    }

    pub fn multiple() -> Self {
        UploadField::Multi(Vec::new())
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, UploadField::Multi(_))
    }

    /// Single mode replaces the value with the first file; multi mode
    /// appends every file in order. An empty selection changes nothing.
    pub fn add<I>(&mut self, blobs: &BlobStore, files: I)
    where
        I: IntoIterator<Item = SelectedFile>,
    {
        match self {
            UploadField::Single(value) => {
                if let Some(file) = files.into_iter().next() {
                    *value = Some(blobs.register(file));
                }
            }
            UploadField::Multi(values) => {
                values.extend(files.into_iter().map(|file| blobs.register(file)));
            }
        }
    }

    /// Multi mode drops the entry at `index` (out of range is a no-op);
    /// single mode clears the value.
    pub fn remove(&mut self, index: usize) {
        match self {
            UploadField::Single(value) => *value = None,
            UploadField::Multi(values) => {
                if index < values.len() {
                    values.remove(index);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        match self {
            UploadField::Single(value) => *value = None,
            UploadField::Multi(values) => values.clear(),
        }
    }

    pub fn values(&self) -> Vec<&ImageRef> {
        match self {
            UploadField::Single(value) => value.iter().collect(),
            UploadField::Multi(values) => values.iter().collect(),
        }
    }

    pub fn has_pending(&self) -> bool {
        self.values().iter().any(|image| !image.is_durable())
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.values()
            .into_iter()
            .map(|image| image.as_str().to_string())
            .collect()
    }
}

/// Exchanges pending blob references for durable URLs.
#[derive(Clone)]
pub struct ImageUploader {
    storage: Arc<dyn StorageBackend>,
    public_base_url: Option<String>,
}

impl ImageUploader {
    pub fn new(storage: Arc<dyn StorageBackend>, public_base_url: Option<String>) -> Self {
        Self {
            storage,
            public_base_url,
        }
    }

    pub async fn persist(&self, blobs: &BlobStore, image: &ImageRef) -> AppResult<ImageRef> {
        if image.is_durable() {
            return Ok(image.clone());
        }
        let file = blobs.get(image).ok_or_else(|| {
            AppError::NotFound(format!("image {} is no longer available", image.as_str()))
        })?;

        let key = object_key(&file.name);
        let path = self
            .storage
            .upload(&key, &file.data, &file.content_type)
            .await?;
        let url = match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => path,
        };
        tracing::info!(key = %key, size = file.data.len(), "Image persisted");
        Ok(ImageRef::Remote(url))
    }

    /// Deletes an object this uploader stored. References it did not issue
    /// are left alone.
    pub async fn discard(&self, image: &ImageRef) -> AppResult<()> {
        match self.key_of(image) {
            Some(key) => {
                self.storage.delete(&key).await?;
                tracing::info!(key = %key, "Image discarded");
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn key_of(&self, image: &ImageRef) -> Option<String> {
        let ImageRef::Remote(url) = image else {
            return None;
        };
        let key = match &self.public_base_url {
            Some(base) => url.strip_prefix(base.trim_end_matches('/'))?,
            None => url
                .split_once("://")?
                .1
                .strip_prefix(self.storage.bucket())?,
        };
        let key = key.strip_prefix('/')?;
        key.starts_with("items/").then(|| key.to_string())
    }

    /// Removes every image in `uploaded`. Failures are logged, not returned,
    /// so one stuck object does not keep the rest alive.
    pub async fn discard_all(&self, uploaded: &[ImageRef]) {
        for image in uploaded {
            if let Err(e) = self.discard(image).await {
                tracing::warn!("Failed to discard uploaded image {}: {}", image.as_str(), e);
            }
        }
    }

    /// Persists every pending image of `field`, keeping order. Each object
    /// stored here is pushed onto `uploaded` as soon as it lands, so a caller
    /// can undo a partially persisted field.
    pub async fn persist_field(
        &self,
        blobs: &BlobStore,
        field: &UploadField,
        uploaded: &mut Vec<ImageRef>,
    ) -> AppResult<UploadField> {
        Ok(match field {
            UploadField::Single(None) => UploadField::Single(None),
            UploadField::Single(Some(image)) => {
                UploadField::Single(Some(self.persist_tracked(blobs, image, uploaded).await?))
            }
            UploadField::Multi(images) => {
                let mut persisted = Vec::with_capacity(images.len());
                for image in images {
                    persisted.push(self.persist_tracked(blobs, image, uploaded).await?);
                }
                UploadField::Multi(persisted)
            }
        })
    }

    async fn persist_tracked(
        &self,
        blobs: &BlobStore,
        image: &ImageRef,
        uploaded: &mut Vec<ImageRef>,
    ) -> AppResult<ImageRef> {
        let persisted = self.persist(blobs, image).await?;
        if !image.is_durable() {
            uploaded.push(persisted.clone());
        }
        Ok(persisted)
    }
}

fn object_key(file_name: &str) -> String {
    let mut name: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.trim_matches(|c| c == '.' || c == '_').is_empty() {
        name = "image".to_string();
    }
    format!("items/{}/{}", Uuid::new_v4(), name)
}
