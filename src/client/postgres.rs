use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{EnquiryModel, ItemModel, ItemPatch, NewEnquiry, NewItem};

use super::EntityClient;

const ITEM_COLUMNS: &str =
    "id, name, type, description, cover_image, additional_images, created_at, updated_at";
const ENQUIRY_COLUMNS: &str = "id, item_id, user_name, user_email, message, created_at";

pub struct PgEntityClient {
    pool: PgPool,
}

impl PgEntityClient {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityClient for PgEntityClient {
    async fn insert_item(&self, item: &NewItem) -> AppResult<ItemModel> {
        let sql = format!(
            "INSERT INTO items (name, type, description, cover_image, additional_images) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            ITEM_COLUMNS
        );
        let model: ItemModel = sqlx::query_as(&sql)
            .bind(&item.name)
            .bind(&item.item_type)
            .bind(&item.description)
            .bind(item.cover_image.as_deref())
            .bind(&item.additional_images)
            .fetch_one(&self.pool)
            .await?;
        Ok(model)
    }

    async fn list_items(&self) -> AppResult<Vec<ItemModel>> {
        let sql = format!("SELECT {} FROM items ORDER BY created_at DESC", ITEM_COLUMNS);
        let models: Vec<ItemModel> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(models)
    }

    async fn update_item(&self, id: Uuid, patch: &ItemPatch) -> AppResult<ItemModel> {
        let sql = format!(
            "UPDATE items SET name = COALESCE($1, name), type = COALESCE($2, type), \
             description = COALESCE($3, description), updated_at = NOW() \
             WHERE id = $4 RETURNING {}",
            ITEM_COLUMNS
        );
        let model: Option<ItemModel> = sqlx::query_as(&sql)
            .bind(patch.name.as_deref())
            .bind(patch.item_type.as_deref())
            .bind(patch.description.as_deref())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        model.ok_or_else(|| AppError::NotFound(format!("item {}", id)))
    }

    async fn delete_item(&self, id: Uuid) -> AppResult<()> {
        let rows_affected = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("item {}", id)));
        }
        Ok(())
    }

    async fn insert_enquiry(&self, enquiry: &NewEnquiry) -> AppResult<EnquiryModel> {
        let sql = format!(
            "INSERT INTO enquiries (item_id, user_name, user_email, message) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            ENQUIRY_COLUMNS
        );
        let model: EnquiryModel = sqlx::query_as(&sql)
            .bind(enquiry.item_id)
            .bind(&enquiry.user_name)
            .bind(&enquiry.user_email)
            .bind(enquiry.message.as_deref())
            .fetch_one(&self.pool)
            .await?;
        Ok(model)
    }

    async fn list_enquiries(&self) -> AppResult<Vec<EnquiryModel>> {
        let sql = format!(
            "SELECT {} FROM enquiries ORDER BY created_at DESC",
            ENQUIRY_COLUMNS
        );
        let models: Vec<EnquiryModel> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(models)
    }
}
