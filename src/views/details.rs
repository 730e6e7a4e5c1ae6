use crate::app::AppContext;
use crate::error::{AppError, AppResult};
use crate::hooks::{DeleteItem, UpdateItem};
use crate::models::{ItemModel, ItemPatch};
use crate::upload::BlobStore;

use super::image::image_src;
use super::toast::{Toast, ToastVariant, Toaster};
use super::is_blank;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode {
    Viewing,
    Editing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditFields {
    pub name: String,
    pub item_type: String,
    pub description: String,
}

impl EditFields {
    fn from_item(item: &ItemModel) -> Self {
        Self {
            name: item.name.clone(),
            item_type: item.item_type.clone(),
            description: item.description.clone(),
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

    /// Only the fields that differ from `item`.
    fn diff(&self, item: &ItemModel) -> ItemPatch {
        let changed = |edited: &String, current: &String| {
            (edited != current).then(|| edited.clone())
        };
        ItemPatch {
            name: changed(&self.name, &item.name),
            item_type: changed(&self.item_type, &item.item_type),
            description: changed(&self.description, &item.description),
        }
    }
}

/// Detail view of one item with in-place edit and delete.
///
/// The dialog works on the snapshot it was opened with; edits stay local
/// until `save` succeeds, and closing discards them.
pub struct DetailsDialog {
    item: ItemModel,
    fields: EditFields,
    mode: DialogMode,
    open: bool,
    update: UpdateItem,
    delete: DeleteItem,
    toaster: Toaster,
    blobs: BlobStore,
}

impl DetailsDialog {
    pub fn open(ctx: &AppContext, item: ItemModel) -> Self {
        Self {
            fields: EditFields::from_item(&item),
            item,
            mode: DialogMode::Viewing,
            open: true,
            update: UpdateItem::new(ctx.client.clone(), ctx.items.clone()),
            delete: DeleteItem::new(ctx.client.clone(), ctx.items.clone()),
            toaster: ctx.toaster.clone(),
            blobs: ctx.blobs.clone(),
        }
    }

    /// Shows another item, dropping any unsaved edits.
    pub fn reopen(&mut self, item: ItemModel) {
        self.fields = EditFields::from_item(&item);
        self.item = item;
        self.mode = DialogMode::Viewing;
        self.open = true;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn mode(&self) -> DialogMode {
        self.mode
    }

    pub fn item(&self) -> &ItemModel {
        &self.item
    }

    pub fn fields(&self) -> &EditFields {
        &self.fields
    }

    pub fn begin_edit(&mut self) {
        self.mode = DialogMode::Editing;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.fields.name = name.into();
    }

    pub fn set_item_type(&mut self, item_type: impl Into<String>) {
        self.fields.item_type = item_type.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.fields.description = description.into();
    }

    pub fn cancel(&mut self) {
        self.mode = DialogMode::Viewing;
        self.fields = EditFields::from_item(&self.item);
    }

    pub fn close(&mut self) {
        self.cancel();
        self.open = false;
    }

    pub async fn save(&mut self) -> AppResult<()> {
        if self.mode != DialogMode::Editing {
            return Ok(());
        }
        if let Err(e) = self.fields.validate() {
            self.toaster
                .push(Toast::error("Please fill in all required fields"));
            return Err(e);
        }

        let patch = self.fields.diff(&self.item);
        if patch.is_empty() {
            self.mode = DialogMode::Viewing;
            return Ok(());
        }

        match self.update.mutate(self.item.id, patch).await {
            Ok(updated) => {
                self.fields = EditFields::from_item(&updated);
                self.item = updated;
                self.mode = DialogMode::Viewing;
                self.toaster
                    .push(Toast::success("Success", "Item updated successfully"));
                Ok(())
            }
            Err(e) => {
                self.toaster.push(Toast::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Deletes right away. A row that is already gone counts as deleted.
    pub async fn delete(&mut self) -> AppResult<()> {
        match self.delete.mutate(self.item.id).await {
            Ok(()) => {
                self.toaster
                    .push(Toast::success("Success", "Item deleted successfully"));
                self.close();
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                self.toaster.push(Toast::new(
                    "Already deleted",
                    "This item no longer exists",
                    ToastVariant::Default,
                ));
                self.close();
                Ok(())
            }
            Err(e) => {
                self.toaster.push(Toast::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// The "Updated" line is shown only once the item was edited.
    pub fn shows_updated_at(&self) -> bool {
        self.item.was_updated()
    }

    pub fn cover_src(&self) -> Option<String> {
        self.item
            .cover_image
            .as_deref()
            .filter(|cover| !cover.is_empty())
            .map(|cover| image_src(Some(cover), &self.blobs))
    }

    pub fn additional_srcs(&self) -> Vec<String> {
        self.item
            .additional_images
            .iter()
            .map(|image| image_src(Some(image), &self.blobs))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{EntityClient, MemoryEntityClient};
    use crate::models::NewItem;
    use crate::views::list::{ListState, ListView};
    use std::sync::Arc;

    async fn setup() -> (Arc<MemoryEntityClient>, AppContext, ItemModel) {
        let client = Arc::new(MemoryEntityClient::new());
        let item = client
            .insert_item(&NewItem::new("Drill", "Tools", "Cordless drill"))
            .await
            .unwrap();
        let ctx = AppContext::new(client.clone());
        (client, ctx, item)
    }

    #[tokio::test]
    async fn test_edit_name_only() {
        let (_client, ctx, item) = setup().await;
        let mut dialog = DetailsDialog::open(&ctx, item);

        dialog.begin_edit();
        dialog.set_name("Hammer drill");
        dialog.save().await.unwrap();

        assert_eq!(dialog.mode(), DialogMode::Viewing);
        let saved = dialog.item();
        assert_eq!(saved.name, "Hammer drill");
        assert_eq!(saved.item_type, "Tools");
        assert_eq!(saved.description, "Cordless drill");
        assert!(saved.updated_at > saved.created_at);
        assert!(dialog.shows_updated_at());
        assert_eq!(ctx.toaster.last().unwrap().variant, ToastVariant::Success);
    }

    #[tokio::test]
    async fn test_save_rejects_blank_fields_without_backend_call() {
        let (client, ctx, item) = setup().await;
        let calls = client.request_count();
        let mut dialog = DetailsDialog::open(&ctx, item);

        dialog.begin_edit();
        dialog.set_description("   ");
        let err = dialog.save().await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(client.request_count(), calls);
        assert_eq!(dialog.mode(), DialogMode::Editing);
    }

    #[tokio::test]
    async fn test_close_discards_unsaved_edits() {
        let (_client, ctx, item) = setup().await;
        let mut dialog = DetailsDialog::open(&ctx, item.clone());

        dialog.begin_edit();
        dialog.set_item_type("Electronics");
        dialog.close();

        assert!(!dialog.is_open());
        assert_eq!(dialog.mode(), DialogMode::Viewing);
        assert_eq!(dialog.fields().item_type, "Tools");
        assert_eq!(dialog.item(), &item);
    }

    #[tokio::test]
    async fn test_reopen_reinitializes_from_snapshot() {
        let (client, ctx, drill) = setup().await;
        let desk = client
            .insert_item(&NewItem::new("Desk", "Furniture", "Oak"))
            .await
            .unwrap();
        let mut dialog = DetailsDialog::open(&ctx, drill);
        dialog.begin_edit();
        dialog.set_name("edited");

        dialog.reopen(desk.clone());
        assert_eq!(dialog.mode(), DialogMode::Viewing);
        assert_eq!(dialog.fields().name, "Desk");
        assert_eq!(dialog.item(), &desk);
    }

    #[tokio::test]
    async fn test_delete_removes_item_from_list() {
        let (_client, ctx, item) = setup().await;
        let mut view = ListView::mount(&ctx);
        view.settled().await;

        let mut dialog = view.open_details(&item);
        dialog.delete().await.unwrap();
        assert!(!dialog.is_open());
        assert_eq!(view.settled().await, ListState::Empty { searching: false });
    }

    #[tokio::test]
    async fn test_delete_of_missing_item_closes_dialog() {
        let (client, ctx, item) = setup().await;
        let mut view = ListView::mount(&ctx);
        view.settled().await;

        client.delete_item(item.id).await.unwrap();
        let mut dialog = view.open_details(&item);
        dialog.delete().await.unwrap();

        assert!(!dialog.is_open());
        assert_eq!(view.settled().await, ListState::Empty { searching: false });
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_dialog_open() {
        let (client, ctx, item) = setup().await;
        let mut dialog = DetailsDialog::open(&ctx, item);
        client.fail_with(Some("permission denied for table items"));

        assert!(dialog.delete().await.is_err());
        assert!(dialog.is_open());
        let toast = ctx.toaster.last().unwrap();
        assert_eq!(toast.variant, ToastVariant::Destructive);
        assert_eq!(toast.description, "permission denied for table items");
    }
}
