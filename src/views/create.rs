use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::app::AppContext;
use crate::error::{AppError, AppResult};
use crate::hooks::CreateItem;
use crate::models::{ItemModel, NewItem};
use crate::upload::{BlobStore, ImageRef, ImageUploader, SelectedFile, UploadField};

use super::toast::{Toast, Toaster};
use super::{is_blank, SubmitGuard};

/// Suggested categories. The stored type is free text.
pub const ITEM_TYPES: [&str; 11] = [
    "Shirt",
    "Pant",
    "Shoes",
    "Sports Gear",
    "Electronics",
    "Furniture",
    "Books",
    "Tools",
    "Home & Garden",
    "Automotive",
    "Other",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

pub struct CreateItemForm {
    pub name: String,
    pub item_type: String,
    pub description: String,
    cover_image: UploadField,
    additional_images: UploadField,
    outcome: SubmitState,
    submitting: Arc<AtomicBool>,
    create: CreateItem,
    toaster: Toaster,
    blobs: BlobStore,
    uploader: Option<ImageUploader>,
}

impl CreateItemForm {
    pub fn new(ctx: &AppContext) -> Self {
        Self {
            name: String::new(),
            item_type: String::new(),
            description: String::new(),
            cover_image: UploadField::single(),
            additional_images: UploadField::multiple(),
            outcome: SubmitState::Idle,
            submitting: Arc::new(AtomicBool::new(false)),
            create: CreateItem::new(ctx.client.clone(), ctx.items.clone()),
            toaster: ctx.toaster.clone(),
            blobs: ctx.blobs.clone(),
            uploader: ctx.uploader.clone(),
        }
    }

    pub fn type_suggestions(&self) -> &'static [&'static str] {
        &ITEM_TYPES
    }

    pub fn cover_image(&self) -> &UploadField {
        &self.cover_image
    }

    pub fn additional_images(&self) -> &UploadField {
        &self.additional_images
    }

    pub fn add_cover_image(&mut self, files: Vec<SelectedFile>) {
        self.cover_image.add(&self.blobs, files);
    }

    pub fn remove_cover_image(&mut self) {
        self.cover_image.remove(0);
    }

    pub fn add_additional_images(&mut self, files: Vec<SelectedFile>) {
        self.additional_images.add(&self.blobs, files);
    }

    pub fn remove_additional_image(&mut self, index: usize) {
        self.additional_images.remove(index);
    }

    /// A submit dropped mid-flight keeps its backend call running, so the
    /// form stays busy until that call settles.
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst) || self.create.is_pending()
    }

    pub fn state(&self) -> SubmitState {
        if self.is_submitting() {
            SubmitState::Submitting
        } else {
            self.outcome
        }
    }

    fn validate(&self) -> AppResult<()> {
        if is_blank(&self.name) || is_blank(&self.item_type) || is_blank(&self.description) {
            return Err(AppError::InvalidInput(
                "name, type and description are required".into(),
            ));
        }
        Ok(())
    }

    pub async fn submit(&mut self) -> AppResult<ItemModel> {
        if self.is_submitting() {
            return Err(AppError::InProgress);
        }
        if let Err(e) = self.validate() {
            self.toaster
                .push(Toast::error("Please fill in all required fields"));
            return Err(e);
        }

        let _guard = SubmitGuard::engage(&self.submitting);
        match self.persist_and_create().await {
            Ok(created) => {
                self.outcome = SubmitState::Succeeded;
                self.toaster.push(Toast::success(
                    "Success!",
                    "Item successfully added to your inventory",
                ));
                self.reset();
                Ok(created)
            }
            Err(e) => {
                self.outcome = SubmitState::Failed;
                self.toaster.push(Toast::error(format!(
                    "Failed to add item: {}. Please try again.",
                    e
                )));
                Err(e)
            }
        }
    }

    /// Uploads pending images, then inserts the item. Any failure deletes
    /// the objects this call stored; local blobs stay registered so a retry
    /// uploads them again.
    async fn persist_and_create(&self) -> AppResult<ItemModel> {
        let mut uploaded = Vec::new();
        let result = self.upload_and_insert(&mut uploaded).await;
        if result.is_err() && !uploaded.is_empty() {
            if let Some(uploader) = &self.uploader {
                tracing::warn!(count = uploaded.len(), "Discarding images of failed submit");
                uploader.discard_all(&uploaded).await;
            }
        }
        if result.is_ok() && self.uploader.is_some() {
            self.revoke_local_images();
        }
        result
    }

    async fn upload_and_insert(&self, uploaded: &mut Vec<ImageRef>) -> AppResult<ItemModel> {
        let (cover, additional) = match &self.uploader {
            Some(uploader) => (
                uploader
                    .persist_field(&self.blobs, &self.cover_image, uploaded)
                    .await?,
                uploader
                    .persist_field(&self.blobs, &self.additional_images, uploaded)
                    .await?,
            ),
            None => {
                if self.cover_image.has_pending() || self.additional_images.has_pending() {
                    tracing::warn!(
                        "No image storage configured; saving session-local image references that will not survive a reload"
                    );
                }
                (self.cover_image.clone(), self.additional_images.clone())
            }
        };

        let item = NewItem {
            name: self.name.clone(),
            item_type: self.item_type.clone(),
            description: self.description.clone(),
            cover_image: cover.to_strings().into_iter().next(),
            additional_images: additional.to_strings(),
        };
        self.create.mutate(item).await
    }

    fn revoke_local_images(&self) {
        let pending = self
            .cover_image
            .values()
            .into_iter()
            .chain(self.additional_images.values())
            .filter(|image| matches!(image, ImageRef::LocalBlob(_)));
        for image in pending {
            self.blobs.revoke(image);
        }
    }

    fn reset(&mut self) {
        self.name.clear();
        self.item_type.clear();
        self.description.clear();
        self.cover_image.clear();
        self.additional_images.clear();
    }
}
