//! Document metadata store abstraction.

use async_trait::async_trait;
use noteilus_core::models::{DocumentAsset, DocumentAssetUpdate};
use noteilus_core::AppError;
use uuid::Uuid;

/// Record store for document metadata, keyed by document id.
///
/// The ingestion pipeline is the only writer for a given record: one insert
/// at creation, one partial update at completion, and a delete on rollback.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document record.
    async fn insert(&self, doc: &DocumentAsset) -> Result<(), AppError>;

    /// Apply a partial update to an existing record. Absent fields are left
    /// untouched.
    async fn update_by_id(&self, id: Uuid, update: &DocumentAssetUpdate) -> Result<(), AppError>;

    /// Fetch a record by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<DocumentAsset>, AppError>;

    /// Fetch all records belonging to an owner, newest first.
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<DocumentAsset>, AppError>;

    /// Cache lookup: the most recent `completed` record of this owner with a
    /// matching content hash and at least one rendered page. Records still
    /// mid-upload are never cache-eligible.
    async fn find_by_owner_and_hash(
        &self,
        owner_id: &str,
        content_hash: &str,
    ) -> Result<Option<DocumentAsset>, AppError>;

    /// Delete a record by id. Deleting a missing record is not an error.
    async fn delete_by_id(&self, id: Uuid) -> Result<(), AppError>;
}
