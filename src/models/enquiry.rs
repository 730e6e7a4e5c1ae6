use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct EnquiryModel {
    pub id: Uuid,
    pub item_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEnquiry {
    pub item_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub message: Option<String>,
}

/// Message stored when the user leaves the field blank.
pub fn default_enquiry_message(item_name: &str) -> String {
    format!("I'm interested in learning more about {}.", item_name)
}
