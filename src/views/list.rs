use crate::app::AppContext;
use crate::hooks::use_items;
use crate::models::ItemModel;
use crate::query::{QueryHandle, QueryState, QueryStatus};

use super::details::DetailsDialog;
use super::enquiry::EnquiryForm;
use super::image::image_src;

#[derive(Debug, Clone, PartialEq)]
pub enum ListState {
    Loading,
    Error(String),
    Empty { searching: bool },
    Populated(Vec<ItemModel>),
}

impl ListState {
    pub fn empty_message(&self) -> Option<&'static str> {
        match self {
            ListState::Empty { searching: true } => Some("No items found matching your search."),
            ListState::Empty { searching: false } => Some("No items found."),
            _ => None,
        }
    }
}

/// Case-insensitive substring match against name, type and description.
/// An empty term keeps every item, in the order given.
pub fn filter_items(items: &[ItemModel], term: &str) -> Vec<ItemModel> {
    if term.is_empty() {
        return items.to_vec();
    }
    let needle = term.to_lowercase();
    items
        .iter()
        .filter(|item| {
            [&item.name, &item.item_type, &item.description]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

pub struct ListView {
    ctx: AppContext,
    query: QueryHandle<Vec<ItemModel>>,
    search: String,
}

impl ListView {
    pub fn mount(ctx: &AppContext) -> Self {
        Self {
            ctx: ctx.clone(),
            query: use_items(ctx.client.clone(), &ctx.items),
            search: String::new(),
        }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Applied on every keystroke; the filtered view is recomputed on read.
    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    pub fn state(&self) -> ListState {
        derive_state(&self.query.snapshot(), &self.search)
    }

    pub async fn settled(&mut self) -> ListState {
        let state = self.query.settled().await;
        derive_state(&state, &self.search)
    }

    /// "Try again" after a failed load.
    pub fn retry(&self) {
        self.query.refetch();
    }

    /// Cover to render on the card; `None` when the item has no cover.
    pub fn cover_src(&self, item: &ItemModel) -> Option<String> {
        item.cover_image
            .as_deref()
            .filter(|cover| !cover.is_empty())
            .map(|cover| image_src(Some(cover), &self.ctx.blobs))
    }

    pub fn open_details(&self, item: &ItemModel) -> DetailsDialog {
        DetailsDialog::open(&self.ctx, item.clone())
    }

    pub fn open_enquiry(&self, item: &ItemModel) -> EnquiryForm {
        EnquiryForm::open(&self.ctx, item.id, &item.name)
    }
}

fn derive_state(state: &QueryState<Vec<ItemModel>>, search: &str) -> ListState {
    match state.status {
        QueryStatus::Pending => ListState::Loading,
        QueryStatus::Error => ListState::Error(state.error.clone().unwrap_or_default()),
        QueryStatus::Success => {
            let items = state
                .data
                .as_deref()
                .map(|items| filter_items(items, search))
                .unwrap_or_default();
            if items.is_empty() {
                ListState::Empty {
                    searching: !search.is_empty(),
                }
            } else {
                ListState::Populated(items)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{EntityClient, MemoryEntityClient};
    use crate::models::NewItem;
    use crate::views::image::PLACEHOLDER_IMAGE;
    use chrono::Utc;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    fn item(name: &str, item_type: &str, description: &str) -> ItemModel {
        let now = Utc::now();
        ItemModel {
            id: Uuid::new_v4(),
            name: name.into(),
            item_type: item_type.into(),
            description: description.into(),
            cover_image: None,
            additional_images: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog() -> Vec<ItemModel> {
        vec![
            item("Cordless Drill", "Tools", "18V with two batteries"),
            item("Oak Desk", "Furniture", "Solid wood, light scratches"),
            item("Running Shoes", "Shoes", "Barely used, size 42"),
            item("Toolbox", "Other", "Steel box"),
        ]
    }

    fn names(items: &[ItemModel]) -> Vec<&str> {
        items.iter().map(|item| item.name.as_str()).collect()
    }

    #[test]
    fn test_empty_search_returns_everything_in_order() {
        let items = catalog();
        assert_eq!(filter_items(&items, ""), items);
    }

    #[test]
    fn test_search_matches_any_field_case_insensitively() {
        let items = catalog();
        assert_eq!(names(&filter_items(&items, "TOOL")), vec!["Cordless Drill", "Toolbox"]);
        assert_eq!(names(&filter_items(&items, "wood")), vec!["Oak Desk"]);
        assert_eq!(names(&filter_items(&items, "shoes")), vec!["Running Shoes"]);
        assert!(filter_items(&items, "bicycle").is_empty());
    }

    #[test]
    fn test_filtered_list_is_an_ordered_subset() {
        let items = catalog();
        for term in ["o", "S", "e", "42", " "] {
            let filtered = filter_items(&items, term);
            let needle = term.to_lowercase();
            let expected: Vec<&ItemModel> = items
                .iter()
                .filter(|i| {
                    i.name.to_lowercase().contains(&needle)
                        || i.item_type.to_lowercase().contains(&needle)
                        || i.description.to_lowercase().contains(&needle)
                })
                .collect();
            assert_eq!(filtered.iter().collect::<Vec<_>>(), expected, "term {:?}", term);
        }
    }

    #[tokio::test]
    async fn test_loading_then_populated_then_filtered_empty() {
        let client = Arc::new(MemoryEntityClient::with_latency(Duration::from_millis(10)));
        client
            .insert_item(&NewItem::new("Drill", "Tools", "Cordless drill"))
            .await
            .unwrap();
        let ctx = AppContext::new(client);

        let mut view = ListView::mount(&ctx);
        assert_eq!(view.state(), ListState::Loading);

        let state = view.settled().await;
        assert!(matches!(state, ListState::Populated(ref items) if items.len() == 1));

        view.set_search("sofa");
        let state = view.state();
        assert_eq!(state, ListState::Empty { searching: true });
        assert_eq!(state.empty_message(), Some("No items found matching your search."));
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let ctx = AppContext::new(Arc::new(MemoryEntityClient::new()));
        let mut view = ListView::mount(&ctx);
        let state = view.settled().await;
        assert_eq!(state, ListState::Empty { searching: false });
        assert_eq!(state.empty_message(), Some("No items found."));
    }

    #[tokio::test]
    async fn test_error_then_retry() {
        let client = Arc::new(MemoryEntityClient::new());
        client.fail_with(Some("JWT expired"));
        let ctx = AppContext::new(client.clone());

        let mut view = ListView::mount(&ctx);
        assert_eq!(view.settled().await, ListState::Error("JWT expired".into()));

        client.fail_with(None);
        view.retry();
        assert_eq!(view.settled().await, ListState::Empty { searching: false });
    }

    #[tokio::test]
    async fn test_cover_from_previous_session_renders_placeholder() {
        let ctx = AppContext::new(Arc::new(MemoryEntityClient::new()));
        let view = ListView::mount(&ctx);

        let mut with_cover = item("Lamp", "Home & Garden", "Desk lamp");
        with_cover.cover_image = Some("blob:0000/1111".into());
        assert_eq!(view.cover_src(&with_cover).as_deref(), Some(PLACEHOLDER_IMAGE));
        assert_eq!(view.cover_src(&item("Lamp", "Other", "x")), None);
    }
}
