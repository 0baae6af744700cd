//! Ingestion pipeline controller.
//!
//! Sequences the upload workflow: validate → create record → store raw bytes
//! (the only fatal stage) → run the best-effort derivation stages
//! concurrently (OCR transcript, cache lookup or batch rendering plus
//! thumbnail, layout spans) → merge the successful outcomes into one batch
//! metadata update.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use noteilus_core::models::{
    DocumentAsset, DocumentAssetUpdate, DocumentStatus, PageAsset, TextSpan,
};
use noteilus_core::AppError;
use noteilus_db::DocumentStore;
use noteilus_storage::{keys, Storage};

use crate::hash::content_hash;
use crate::layout::SpanExtractor;
use crate::ocr::OcrEngine;
use crate::pdf::PageRenderer;
use crate::render::BatchRenderOrchestrator;
use crate::validator::{DocumentValidator, ValidationError};

fn sanitize_filename(filename: &str) -> String {
    const MAX: usize = 255;
    let path = std::path::Path::new(filename);
    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    if base.contains("..") {
        return "invalid_filename".to_string();
    }
    let s: String = base
        .chars()
        .take(MAX)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim().is_empty() || s.len() < 3 {
        "file".to_string()
    } else {
        s
    }
}

fn map_validation_error(err: ValidationError) -> AppError {
    match err {
        ValidationError::FileTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
        _ => AppError::InvalidInput(err.to_string()),
    }
}

/// Outcome of the visual derivation stage (cache reuse or fresh rendering).
struct VisualAssets {
    thumbnail_url: Option<String>,
    thumbnail_kind: Option<String>,
    page_count: Option<i32>,
    page_assets: Option<Vec<PageAsset>>,
}

/// Ties the adapters, object store, and document store into the upload
/// workflow.
pub struct IngestService {
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn Storage>,
    orchestrator: BatchRenderOrchestrator,
    ocr: Option<Arc<dyn OcrEngine>>,
    layout: Option<Arc<dyn SpanExtractor>>,
    validator: DocumentValidator,
}

impl IngestService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn Storage>,
        renderer: Arc<dyn PageRenderer>,
        ocr: Option<Arc<dyn OcrEngine>>,
        layout: Option<Arc<dyn SpanExtractor>>,
        validator: DocumentValidator,
    ) -> Self {
        let orchestrator = BatchRenderOrchestrator::new(renderer, Arc::clone(&storage));
        Self {
            store,
            storage,
            orchestrator,
            ocr,
            layout,
            validator,
        }
    }

    /// Ingest a document: store the raw bytes and derive its reusable assets.
    ///
    /// Only raw-bytes storage is fatal; every derivation stage degrades to
    /// absence of its output. The returned record carries whatever succeeded.
    pub async fn ingest(
        &self,
        owner_id: &str,
        data: Vec<u8>,
        original_filename: &str,
        content_type: &str,
    ) -> Result<DocumentAsset, AppError> {
        self.validator
            .validate_all(original_filename, content_type, data.len())
            .map_err(map_validation_error)?;

        let document_id = Uuid::new_v4();
        let digest = content_hash(&data);
        let extension = original_filename
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_lowercase();
        let storage_key =
            keys::document_key(owner_id, &format!("{}.{}", document_id, extension));

        let mut document = DocumentAsset {
            id: document_id,
            owner_id: owner_id.to_string(),
            display_name: sanitize_filename(original_filename),
            storage_key: storage_key.clone(),
            storage_url: String::new(),
            size_bytes: data.len() as i64,
            uploaded_at: Utc::now(),
            status: DocumentStatus::Uploading,
            content_hash: None,
            thumbnail_url: None,
            thumbnail_kind: None,
            page_count: None,
            page_assets: None,
            ocr_text: None,
            text_spans: None,
        };

        // Mandatory stage: record first, then durable raw bytes. An upload
        // failure retracts the record instead of leaving a failed one behind.
        self.store.insert(&document).await?;

        let storage_url = match self
            .storage
            .upload_with_key(&storage_key, data.clone(), content_type)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(
                    document_id = %document_id,
                    error = %e,
                    "Raw document upload failed, retracting record"
                );
                if let Err(cleanup) = self.store.delete_by_id(document_id).await {
                    tracing::error!(
                        document_id = %document_id,
                        error = %cleanup,
                        "Failed to retract record after upload failure"
                    );
                }
                return Err(AppError::Storage(e.to_string()));
            }
        };

        // Best-effort stages. Each adapter carries its own timeout boundary;
        // none of these can fail the upload or block the others.
        let (ocr_text, visual, text_spans) = tokio::join!(
            self.ocr_stage(&data),
            self.visual_stage(owner_id, document_id, &digest, &data),
            self.layout_stage(&data),
        );

        let update = DocumentAssetUpdate {
            status: Some(DocumentStatus::Completed),
            storage_url: Some(storage_url),
            content_hash: Some(digest),
            thumbnail_url: visual.thumbnail_url,
            thumbnail_kind: visual.thumbnail_kind,
            page_count: visual.page_count,
            page_assets: visual.page_assets,
            ocr_text: Some(ocr_text),
            text_spans,
        };

        self.store.update_by_id(document_id, &update).await?;
        update.apply_to(&mut document);

        tracing::info!(
            document_id = %document_id,
            owner_id = %owner_id,
            page_count = ?document.page_count,
            "Document ingestion completed"
        );

        Ok(document)
    }

    async fn ocr_stage(&self, data: &[u8]) -> String {
        let Some(engine) = &self.ocr else {
            tracing::debug!("No OCR engine configured, skipping transcript");
            return String::new();
        };

        match engine.extract_text(data).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    error = %format!("{:#}", e),
                    "OCR extraction failed, continuing without transcript"
                );
                String::new()
            }
        }
    }

    async fn visual_stage(
        &self,
        owner_id: &str,
        document_id: Uuid,
        digest: &str,
        data: &[u8],
    ) -> VisualAssets {
        // An identical earlier upload by the same owner lets us skip the
        // renderer entirely. Lookup failures fall through to rendering.
        match self.store.find_by_owner_and_hash(owner_id, digest).await {
            Ok(Some(cached)) => {
                tracing::info!(
                    document_id = %document_id,
                    cached_id = %cached.id,
                    "Reusing rendered pages from identical earlier upload"
                );
                let page_count = cached
                    .page_count
                    .or_else(|| cached.page_assets.as_ref().map(|p| p.len() as i32));
                return VisualAssets {
                    thumbnail_url: cached.thumbnail_url,
                    thumbnail_kind: cached.thumbnail_kind,
                    page_count,
                    page_assets: cached.page_assets,
                };
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Cache lookup failed, rendering from scratch");
            }
        }

        // Thumbnail and full per-page rendering are independent; neither
        // blocks the other.
        let (pages, thumbnail) = tokio::join!(
            self.orchestrator.render_document(owner_id, document_id, data),
            self.orchestrator.render_thumbnail(owner_id, document_id, data),
        );

        let (thumbnail_url, thumbnail_kind) = match thumbnail {
            Some((url, kind)) => (Some(url), Some(kind)),
            None => (None, None),
        };

        if pages.is_empty() {
            VisualAssets {
                thumbnail_url,
                thumbnail_kind,
                page_count: None,
                page_assets: None,
            }
        } else {
            VisualAssets {
                thumbnail_url,
                thumbnail_kind,
                page_count: Some(pages.len() as i32),
                page_assets: Some(pages),
            }
        }
    }

    async fn layout_stage(&self, data: &[u8]) -> Option<Vec<TextSpan>> {
        let Some(extractor) = &self.layout else {
            tracing::debug!("No layout extractor configured, skipping spans");
            return None;
        };

        match extractor.extract_spans(data).await {
            Ok(spans) => Some(spans),
            Err(e) => {
                tracing::warn!(
                    error = %format!("{:#}", e),
                    "Layout extraction failed, continuing without spans"
                );
                None
            }
        }
    }

    /// Ownership-checked fetch. Another owner's document is reported as
    /// absent, not as a permission error.
    pub async fn get(&self, owner_id: &str, id: Uuid) -> Result<DocumentAsset, AppError> {
        let doc = self
            .store
            .find_by_id(id)
            .await?
            .filter(|d| d.owner_id == owner_id)
            .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;
        Ok(doc)
    }

    /// All documents of an owner, newest first.
    pub async fn list(&self, owner_id: &str) -> Result<Vec<DocumentAsset>, AppError> {
        self.store.find_by_owner(owner_id).await
    }

    /// Raw document bytes from the object store.
    pub async fn download(&self, owner_id: &str, id: Uuid) -> Result<Vec<u8>, AppError> {
        let doc = self.get(owner_id, id).await?;
        self.storage
            .download(&doc.storage_key)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }

    /// Delete a document: derived assets and raw bytes from the object store
    /// (best effort), then the metadata record.
    ///
    /// Page assets reused from an identical earlier upload live under the
    /// source document's keys; the keys derived from this document id are
    /// simply absent there, and deleting a missing key is a no-op.
    pub async fn delete(&self, owner_id: &str, id: Uuid) -> Result<(), AppError> {
        let doc = self.get(owner_id, id).await?;

        let mut asset_keys = vec![doc.storage_key.clone(), keys::thumbnail_key(owner_id, id)];
        if let Some(pages) = &doc.page_assets {
            for page in pages {
                asset_keys.push(keys::page_asset_key(owner_id, id, page.page_number as u32));
            }
        }

        for key in asset_keys {
            if let Err(e) = self.storage.delete(&key).await {
                tracing::warn!(document_id = %id, key = %key, error = %e, "Failed to delete stored asset");
            }
        }

        self.store.delete_by_id(id).await?;

        tracing::info!(document_id = %id, owner_id = %owner_id, "Document deleted");
        Ok(())
    }
}
