use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{EnquiryModel, ItemModel, ItemPatch, NewEnquiry, NewItem};

use super::EntityClient;

const ITEMS_TABLE: &str = "items";
const ENQUIRIES_TABLE: &str = "enquiries";

/// Talks to the PostgREST endpoint of a hosted backend (e.g. Supabase).
#[derive(Clone)]
pub struct RestEntityClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct PatchBody<'a> {
    #[serde(flatten)]
    patch: &'a ItemPatch,
    updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct PostgrestError {
    message: Option<String>,
}

impl RestEntityClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> AppResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table)
    }

    fn list_url(&self, table: &str) -> String {
        format!("{}?select=*&order=created_at.desc", self.table_url(table))
    }

    fn row_url(&self, table: &str, id: Uuid) -> String {
        format!("{}?{}", self.table_url(table), id_filter(id))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn returning(&self, method: Method, url: &str) -> RequestBuilder {
        self.request(method, url)
            .header("Prefer", "return=representation")
    }

    async fn read_rows<T: DeserializeOwned + Send>(response: Response) -> AppResult<Vec<T>> {
        let status = response.status();
        let body = response.text().await?;
        parse_rows(status, &body)
    }

    async fn insert_one<B, T>(&self, table: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let response = self
            .returning(Method::POST, &self.table_url(table))
            .json(&[body])
            .send()
            .await?;
        Self::read_rows::<T>(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Backend(format!("insert into {} returned no row", table)))
    }
}

/// PostgREST equality filter on the primary key.
fn id_filter(id: Uuid) -> String {
    format!("id=eq.{}", urlencoding::encode(&id.to_string()))
}

/// Rows of a PostgREST response. Any non-2xx status is a backend failure
/// carrying the server's message.
fn parse_rows<T: DeserializeOwned>(status: StatusCode, body: &str) -> AppResult<Vec<T>> {
    if !status.is_success() {
        return Err(AppError::Backend(backend_message(status, body)));
    }
    serde_json::from_str(body)
        .map_err(|e| AppError::Backend(format!("unexpected response body: {}", e)))
}

/// PATCH and DELETE with `return=representation` answer `[]` when the filter
/// matched nothing.
fn first_row<T>(rows: Vec<T>, id: Uuid) -> AppResult<T> {
    rows.into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(format!("item {}", id)))
}

fn backend_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<PostgrestError>(body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| format!("backend responded with {}", status))
}

#[async_trait]
impl EntityClient for RestEntityClient {
    async fn insert_item(&self, item: &NewItem) -> AppResult<ItemModel> {
        self.insert_one(ITEMS_TABLE, item).await
    }

    async fn list_items(&self) -> AppResult<Vec<ItemModel>> {
        let response = self
            .request(Method::GET, &self.list_url(ITEMS_TABLE))
            .send()
            .await?;
        Self::read_rows(response).await
    }

    async fn update_item(&self, id: Uuid, patch: &ItemPatch) -> AppResult<ItemModel> {
        let body = PatchBody {
            patch,
            updated_at: Utc::now(),
        };
        let response = self
            .returning(Method::PATCH, &self.row_url(ITEMS_TABLE, id))
            .json(&body)
            .send()
            .await?;
        first_row(Self::read_rows::<ItemModel>(response).await?, id)
    }

    async fn delete_item(&self, id: Uuid) -> AppResult<()> {
        let response = self
            .returning(Method::DELETE, &self.row_url(ITEMS_TABLE, id))
            .send()
            .await?;
        first_row(Self::read_rows::<serde_json::Value>(response).await?, id).map(|_| ())
    }

    async fn insert_enquiry(&self, enquiry: &NewEnquiry) -> AppResult<EnquiryModel> {
        self.insert_one(ENQUIRIES_TABLE, enquiry).await
    }

    async fn list_enquiries(&self) -> AppResult<Vec<EnquiryModel>> {
        let response = self
            .request(Method::GET, &self.list_url(ENQUIRIES_TABLE))
            .send()
            .await?;
        Self::read_rows(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RestEntityClient {
        RestEntityClient::new("https://abc.supabase.co/", "anon-key").unwrap()
    }

    #[test]
    fn test_list_url_orders_newest_first() {
        assert_eq!(
            client().list_url(ITEMS_TABLE),
            "https://abc.supabase.co/rest/v1/items?select=*&order=created_at.desc"
        );
    }

    #[test]
    fn test_row_url_filters_by_id() {
        let id = Uuid::parse_str("6f1c2a9e-3b7d-4c1e-9a51-2d0f1e7b8c44").unwrap();
        assert_eq!(
            client().row_url(ITEMS_TABLE, id),
            "https://abc.supabase.co/rest/v1/items?id=eq.6f1c2a9e-3b7d-4c1e-9a51-2d0f1e7b8c44"
        );
    }

    #[test]
    fn test_backend_message_prefers_postgrest_message() {
        let body = r#"{"code":"23502","message":"null value in column \"name\""}"#;
        assert_eq!(
            backend_message(StatusCode::BAD_REQUEST, body),
            "null value in column \"name\""
        );
        assert_eq!(
            backend_message(StatusCode::BAD_GATEWAY, "<html>"),
            "backend responded with 502 Bad Gateway"
        );
    }

    #[test]
    fn test_error_status_becomes_backend_error() {
        let body = r#"{"code":"42501","message":"permission denied for table items"}"#;
        let err = parse_rows::<ItemModel>(StatusCode::UNAUTHORIZED, body).unwrap_err();
        assert!(matches!(err, AppError::Backend(_)));
        assert_eq!(err.to_string(), "permission denied for table items");

        let err = parse_rows::<ItemModel>(StatusCode::SERVICE_UNAVAILABLE, "").unwrap_err();
        assert_eq!(err.to_string(), "backend responded with 503 Service Unavailable");
    }

    #[test]
    fn test_representation_rows_are_parsed() {
        let body = r#"[{
            "id": "6f1c2a9e-3b7d-4c1e-9a51-2d0f1e7b8c44",
            "name": "Drill",
            "type": "Tools",
            "description": "Cordless drill",
            "cover_image": null,
            "additional_images": null,
            "created_at": "2025-06-01T10:00:00+00:00",
            "updated_at": "2025-06-02T08:30:00+00:00"
        }]"#;
        let rows = parse_rows::<ItemModel>(StatusCode::OK, body).unwrap();
        let id = rows[0].id;
        let item = first_row(rows, id).unwrap();
        assert_eq!(item.item_type, "Tools");
        assert!(item.additional_images.is_empty());
        assert!(item.was_updated());
    }

    #[test]
    fn test_empty_representation_is_not_found() {
        let id = Uuid::new_v4();
        let rows = parse_rows::<serde_json::Value>(StatusCode::OK, "[]").unwrap();
        let err = first_row(rows, id).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), format!("Not found: item {}", id));

        let err = parse_rows::<ItemModel>(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, AppError::Backend(_)));
    }

    #[test]
    fn test_patch_body_carries_updated_at() {
        let patch = ItemPatch {
            description: Some("Brushless".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(PatchBody {
            patch: &patch,
            updated_at: Utc::now(),
        })
        .unwrap();
        assert_eq!(value["description"], "Brushless");
        assert!(value.get("name").is_none());
        assert!(value.get("updated_at").is_some());
    }
}
