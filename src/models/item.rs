use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ItemModel {
    pub id: Uuid,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub item_type: String,
    pub description: String,
    pub cover_image: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub additional_images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ItemModel {
    /// True once the row has been edited after insert.
    pub fn was_updated(&self) -> bool {
        self.updated_at != self.created_at
    }
}

/// Candidate item; id and timestamps come from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub additional_images: Vec<String>,
}

impl NewItem {
    pub fn new(
        name: impl Into<String>,
        item_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            item_type: item_type.into(),
            description: description.into(),
            cover_image: None,
            additional_images: Vec::new(),
        }
    }
}

/// Editable subset of an item. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.item_type.is_none() && self.description.is_none()
    }

    pub fn apply(&self, item: &mut ItemModel) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(item_type) = &self.item_type {
            item.item_type = item_type.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
    }
}

// The backend column is loosely typed; a null list reads as empty.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
