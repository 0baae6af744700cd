//! In-memory document store.
//!
//! Test double for [`DocumentStore`]; shares merge semantics with the
//! Postgres implementation via [`DocumentAssetUpdate::apply_to`].

use crate::DocumentStore;
use async_trait::async_trait;
use noteilus_core::models::{DocumentAsset, DocumentAssetUpdate, DocumentStatus};
use noteilus_core::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<Mutex<HashMap<Uuid, DocumentAsset>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records (test helper).
    pub fn record_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, doc: &DocumentAsset) -> Result<(), AppError> {
        self.documents.lock().unwrap().insert(doc.id, doc.clone());
        Ok(())
    }

    async fn update_by_id(&self, id: Uuid, update: &DocumentAssetUpdate) -> Result<(), AppError> {
        let mut documents = self.documents.lock().unwrap();
        if let Some(doc) = documents.get_mut(&id) {
            update.apply_to(doc);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DocumentAsset>, AppError> {
        Ok(self.documents.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<DocumentAsset>, AppError> {
        let mut docs: Vec<DocumentAsset> = self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(docs)
    }

    async fn find_by_owner_and_hash(
        &self,
        owner_id: &str,
        content_hash: &str,
    ) -> Result<Option<DocumentAsset>, AppError> {
        let documents = self.documents.lock().unwrap();
        let mut candidates: Vec<&DocumentAsset> = documents
            .values()
            .filter(|d| {
                d.owner_id == owner_id
                    && d.status == DocumentStatus::Completed
                    && d.content_hash.as_deref() == Some(content_hash)
                    && d.has_rendered_pages()
            })
            .collect();
        candidates.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(candidates.first().map(|d| (*d).clone()))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), AppError> {
        self.documents.lock().unwrap().remove(&id);
        Ok(())
    }
}
