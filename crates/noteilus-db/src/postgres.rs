//! PostgreSQL-backed document store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use noteilus_core::models::{
    DocumentAsset, DocumentAssetUpdate, DocumentStatus, PageAsset, TextSpan,
};
use noteilus_core::AppError;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::DocumentStore;

const SELECT_COLUMNS: &str = "id, owner_id, display_name, storage_key, storage_url, size_bytes, \
     uploaded_at, status, content_hash, thumbnail_url, thumbnail_kind, page_count, page_assets, \
     ocr_text, text_spans";

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    owner_id: String,
    display_name: String,
    storage_key: String,
    storage_url: String,
    size_bytes: i64,
    uploaded_at: DateTime<Utc>,
    status: String,
    content_hash: Option<String>,
    thumbnail_url: Option<String>,
    thumbnail_kind: Option<String>,
    page_count: Option<i32>,
    page_assets: Option<Json<Vec<PageAsset>>>,
    ocr_text: Option<String>,
    text_spans: Option<Json<Vec<TextSpan>>>,
}

impl DocumentRow {
    fn into_document(self) -> Result<DocumentAsset, AppError> {
        let status = DocumentStatus::parse(&self.status).ok_or_else(|| {
            AppError::Internal(format!("Unknown document status in store: {}", self.status))
        })?;

        Ok(DocumentAsset {
            id: self.id,
            owner_id: self.owner_id,
            display_name: self.display_name,
            storage_key: self.storage_key,
            storage_url: self.storage_url,
            size_bytes: self.size_bytes,
            uploaded_at: self.uploaded_at,
            status,
            content_hash: self.content_hash,
            thumbnail_url: self.thumbnail_url,
            thumbnail_kind: self.thumbnail_kind,
            page_count: self.page_count,
            page_assets: self.page_assets.map(|p| p.0),
            ocr_text: self.ocr_text,
            text_spans: self.text_spans.map(|s| s.0),
        })
    }
}

/// Document store backed by PostgreSQL.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded migrations for this store.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;
        tracing::debug!("Document store migrations applied");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, doc: &DocumentAsset) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO documents (id, owner_id, display_name, storage_key, storage_url, \
             size_bytes, uploaded_at, status, content_hash, thumbnail_url, thumbnail_kind, \
             page_count, page_assets, ocr_text, text_spans) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(doc.id)
        .bind(&doc.owner_id)
        .bind(&doc.display_name)
        .bind(&doc.storage_key)
        .bind(&doc.storage_url)
        .bind(doc.size_bytes)
        .bind(doc.uploaded_at)
        .bind(doc.status.as_str())
        .bind(&doc.content_hash)
        .bind(&doc.thumbnail_url)
        .bind(&doc.thumbnail_kind)
        .bind(doc.page_count)
        .bind(doc.page_assets.clone().map(Json))
        .bind(&doc.ocr_text)
        .bind(doc.text_spans.clone().map(Json))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_by_id(&self, id: Uuid, update: &DocumentAssetUpdate) -> Result<(), AppError> {
        // COALESCE keeps absent fields untouched; the pipeline never clears a
        // derived field once set.
        sqlx::query(
            "UPDATE documents SET \
             status = COALESCE($2, status), \
             storage_url = COALESCE($3, storage_url), \
             content_hash = COALESCE($4, content_hash), \
             thumbnail_url = COALESCE($5, thumbnail_url), \
             thumbnail_kind = COALESCE($6, thumbnail_kind), \
             page_count = COALESCE($7, page_count), \
             page_assets = COALESCE($8, page_assets), \
             ocr_text = COALESCE($9, ocr_text), \
             text_spans = COALESCE($10, text_spans) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(update.status.map(|s| s.as_str().to_string()))
        .bind(&update.storage_url)
        .bind(&update.content_hash)
        .bind(&update.thumbnail_url)
        .bind(&update.thumbnail_kind)
        .bind(update.page_count)
        .bind(update.page_assets.clone().map(Json))
        .bind(&update.ocr_text)
        .bind(update.text_spans.clone().map(Json))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DocumentAsset>, AppError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentRow::into_document).transpose()
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<DocumentAsset>, AppError> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE owner_id = $1 ORDER BY uploaded_at DESC",
            SELECT_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    async fn find_by_owner_and_hash(
        &self,
        owner_id: &str,
        content_hash: &str,
    ) -> Result<Option<DocumentAsset>, AppError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents \
             WHERE owner_id = $1 AND content_hash = $2 AND status = 'completed' \
             AND page_assets IS NOT NULL AND jsonb_array_length(page_assets) > 0 \
             ORDER BY uploaded_at DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(owner_id)
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentRow::into_document).transpose()
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
