//! End-to-end ingestion pipeline tests against in-memory storage and store,
//! with scripted adapters for rendering, OCR, and layout extraction.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use noteilus_core::models::{DocumentStatus, TextSpan};
use noteilus_core::AppError;
use noteilus_db::{DocumentStore, InMemoryDocumentStore};
use noteilus_processing::{
    DocumentValidator, IngestService, OcrEngine, PageRenderer, SpanExtractor,
};
use noteilus_storage::{MemoryStorage, Storage, StorageBackend, StorageError, StorageResult};

const PDF_BYTES: &[u8] = b"%PDF-1.4 three page fixture";

struct ScriptedRenderer {
    page_count: Option<u32>,
    failing_pages: HashSet<u32>,
    count_calls: AtomicUsize,
    render_calls: AtomicUsize,
}

impl ScriptedRenderer {
    fn with_pages(page_count: u32) -> Self {
        Self {
            page_count: Some(page_count),
            failing_pages: HashSet::new(),
            count_calls: AtomicUsize::new(0),
            render_calls: AtomicUsize::new(0),
        }
    }

    fn broken_inspector() -> Self {
        Self {
            page_count: None,
            failing_pages: HashSet::new(),
            count_calls: AtomicUsize::new(0),
            render_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PageRenderer for ScriptedRenderer {
    async fn page_count(&self, _data: &[u8]) -> Result<u32> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        match self.page_count {
            Some(count) => Ok(count),
            None => bail!("inspector crashed"),
        }
    }

    async fn render_page(&self, _data: &[u8], page_number: u32) -> Result<Vec<u8>> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_pages.contains(&page_number) {
            bail!("scripted failure for page {}", page_number);
        }
        Ok(format!("<svg><!-- page {} --></svg>", page_number).into_bytes())
    }
}

struct ScriptedOcr {
    text: Option<String>,
}

#[async_trait]
impl OcrEngine for ScriptedOcr {
    async fn extract_text(&self, _data: &[u8]) -> Result<String> {
        match &self.text {
            Some(text) => Ok(text.clone()),
            None => bail!("OCR service unreachable"),
        }
    }
}

struct ScriptedLayout {
    fail: bool,
}

#[async_trait]
impl SpanExtractor for ScriptedLayout {
    async fn extract_spans(&self, _data: &[u8]) -> Result<Vec<TextSpan>> {
        if self.fail {
            bail!("extractor produced unparsable output");
        }
        Ok(vec![TextSpan {
            id: "1-s0".to_string(),
            text: "Hello".to_string(),
            page_number: 1,
            x0: 72.0,
            y0: 90.0,
            x1: 120.0,
            y1: 104.0,
            font_size: 12.0,
            font_name: "Helvetica".to_string(),
            page_width: 612.0,
            page_height: 792.0,
        }])
    }
}

/// Object store whose writes always fail (upload rollback scenarios).
struct FailingStorage;

#[async_trait]
impl Storage for FailingStorage {
    async fn upload_with_key(
        &self,
        _storage_key: &str,
        _data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<String> {
        Err(StorageError::UploadFailed("disk full".to_string()))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        Err(StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, _storage_key: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn exists(&self, _storage_key: &str) -> StorageResult<bool> {
        Ok(false)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

fn pdf_validator() -> DocumentValidator {
    DocumentValidator::new(
        10 * 1024 * 1024,
        vec!["pdf".to_string()],
        vec!["application/pdf".to_string()],
    )
}

struct Fixture {
    store: Arc<InMemoryDocumentStore>,
    storage: Arc<MemoryStorage>,
    renderer: Arc<ScriptedRenderer>,
    service: IngestService,
}

fn fixture_with(renderer: ScriptedRenderer, ocr: ScriptedOcr, layout: ScriptedLayout) -> Fixture {
    let store = Arc::new(InMemoryDocumentStore::new());
    let storage = Arc::new(MemoryStorage::new());
    let renderer = Arc::new(renderer);

    let service = IngestService::new(
        Arc::clone(&store) as Arc<dyn DocumentStore>,
        Arc::clone(&storage) as Arc<dyn Storage>,
        Arc::clone(&renderer) as Arc<dyn PageRenderer>,
        Some(Arc::new(ocr)),
        Some(Arc::new(layout)),
        pdf_validator(),
    );

    Fixture {
        store,
        storage,
        renderer,
        service,
    }
}

fn fixture() -> Fixture {
    fixture_with(
        ScriptedRenderer::with_pages(3),
        ScriptedOcr {
            text: Some("# Page one\n\n# Page two\n\n# Page three".to_string()),
        },
        ScriptedLayout { fail: false },
    )
}

#[tokio::test]
async fn test_successful_ingestion_populates_all_assets() {
    let f = fixture();

    let doc = f
        .service
        .ingest("user-1", PDF_BYTES.to_vec(), "lecture.pdf", "application/pdf")
        .await
        .unwrap();

    assert_eq!(doc.status, DocumentStatus::Completed);
    assert_eq!(doc.display_name, "lecture.pdf");
    assert_eq!(doc.size_bytes, PDF_BYTES.len() as i64);
    assert!(doc.content_hash.is_some());
    assert!(doc.storage_url.starts_with("memory://documents/user-1/"));

    let pages = doc.page_assets.as_ref().unwrap();
    let numbers: Vec<i32> = pages.iter().map(|p| p.page_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(doc.page_count, Some(3));

    assert!(doc.thumbnail_url.is_some());
    assert_eq!(doc.thumbnail_kind.as_deref(), Some("svg"));
    assert!(doc.ocr_text.as_ref().unwrap().contains("Page one"));
    assert_eq!(doc.text_spans.as_ref().unwrap().len(), 1);

    // The persisted record matches what the caller received.
    let stored = f.store.find_by_id(doc.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DocumentStatus::Completed);
    assert_eq!(stored.page_assets, doc.page_assets);
    assert_eq!(stored.ocr_text, doc.ocr_text);

    // Raw bytes are durably stored under the record's key.
    assert_eq!(f.storage.download(&doc.storage_key).await.unwrap(), PDF_BYTES);
}

#[tokio::test]
async fn test_single_page_failure_leaves_gap() {
    let mut renderer = ScriptedRenderer::with_pages(3);
    renderer.failing_pages.insert(2);
    let f = fixture_with(
        renderer,
        ScriptedOcr {
            text: Some("text".to_string()),
        },
        ScriptedLayout { fail: false },
    );

    let doc = f
        .service
        .ingest("user-1", PDF_BYTES.to_vec(), "lecture.pdf", "application/pdf")
        .await
        .unwrap();

    assert_eq!(doc.status, DocumentStatus::Completed);
    let numbers: Vec<i32> = doc
        .page_assets
        .as_ref()
        .unwrap()
        .iter()
        .map(|p| p.page_number)
        .collect();
    assert_eq!(numbers, vec![1, 3]);
    assert_eq!(doc.page_count, Some(2));
    // Thumbnail only depends on page 1 and still succeeds.
    assert!(doc.thumbnail_url.is_some());
}

#[tokio::test]
async fn test_broken_inspector_still_completes() {
    let f = fixture_with(
        ScriptedRenderer::broken_inspector(),
        ScriptedOcr {
            text: Some("text".to_string()),
        },
        ScriptedLayout { fail: false },
    );

    let doc = f
        .service
        .ingest("user-1", PDF_BYTES.to_vec(), "lecture.pdf", "application/pdf")
        .await
        .unwrap();

    assert_eq!(doc.status, DocumentStatus::Completed);
    assert!(doc.page_assets.is_none());
    assert!(doc.page_count.is_none());
    // OCR and layout are unaffected by the rendering failure.
    assert_eq!(doc.ocr_text.as_deref(), Some("text"));
    assert!(doc.text_spans.is_some());
}

#[tokio::test]
async fn test_raw_upload_failure_rolls_back_record() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let service = IngestService::new(
        Arc::clone(&store) as Arc<dyn DocumentStore>,
        Arc::new(FailingStorage),
        Arc::new(ScriptedRenderer::with_pages(3)),
        None,
        None,
        pdf_validator(),
    );

    let result = service
        .ingest("user-1", PDF_BYTES.to_vec(), "lecture.pdf", "application/pdf")
        .await;

    assert!(matches!(result, Err(AppError::Storage(_))));
    // Rollback is complete: no record remains queryable.
    assert_eq!(store.record_count(), 0);
    assert!(store.find_by_owner("user-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reingest_identical_content_skips_renderer() {
    let f = fixture();

    let first = f
        .service
        .ingest("user-1", PDF_BYTES.to_vec(), "lecture.pdf", "application/pdf")
        .await
        .unwrap();

    // 3 pages + 1 thumbnail.
    assert_eq!(f.renderer.render_calls.load(Ordering::SeqCst), 4);

    let second = f
        .service
        .ingest("user-1", PDF_BYTES.to_vec(), "lecture-copy.pdf", "application/pdf")
        .await
        .unwrap();

    // The renderer was not invoked again, and the derived assets are
    // identical to the first ingestion's.
    assert_eq!(f.renderer.render_calls.load(Ordering::SeqCst), 4);
    assert_eq!(f.renderer.count_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.page_assets, first.page_assets);
    assert_eq!(second.thumbnail_url, first.thumbnail_url);
    assert_ne!(second.id, first.id);
    assert_eq!(second.content_hash, first.content_hash);
}

#[tokio::test]
async fn test_different_owner_does_not_hit_cache() {
    let f = fixture();

    f.service
        .ingest("user-1", PDF_BYTES.to_vec(), "lecture.pdf", "application/pdf")
        .await
        .unwrap();
    f.service
        .ingest("user-2", PDF_BYTES.to_vec(), "lecture.pdf", "application/pdf")
        .await
        .unwrap();

    // Both uploads rendered: 2 * (3 pages + 1 thumbnail).
    assert_eq!(f.renderer.render_calls.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn test_ocr_failure_yields_empty_transcript() {
    let f = fixture_with(
        ScriptedRenderer::with_pages(2),
        ScriptedOcr { text: None },
        ScriptedLayout { fail: false },
    );

    let doc = f
        .service
        .ingest("user-1", PDF_BYTES.to_vec(), "lecture.pdf", "application/pdf")
        .await
        .unwrap();

    assert_eq!(doc.status, DocumentStatus::Completed);
    assert_eq!(doc.ocr_text.as_deref(), Some(""));
    // All other fields unaffected.
    assert_eq!(doc.page_count, Some(2));
    assert!(doc.thumbnail_url.is_some());
    assert!(doc.text_spans.is_some());
}

#[tokio::test]
async fn test_layout_failure_yields_absent_spans() {
    let f = fixture_with(
        ScriptedRenderer::with_pages(2),
        ScriptedOcr {
            text: Some("text".to_string()),
        },
        ScriptedLayout { fail: true },
    );

    let doc = f
        .service
        .ingest("user-1", PDF_BYTES.to_vec(), "lecture.pdf", "application/pdf")
        .await
        .unwrap();

    assert_eq!(doc.status, DocumentStatus::Completed);
    assert!(doc.text_spans.is_none());
    assert_eq!(doc.ocr_text.as_deref(), Some("text"));
}

#[tokio::test]
async fn test_unconfigured_adapters_are_skipped() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let service = IngestService::new(
        Arc::clone(&store) as Arc<dyn DocumentStore>,
        Arc::new(MemoryStorage::new()),
        Arc::new(ScriptedRenderer::with_pages(1)),
        None,
        None,
        pdf_validator(),
    );

    let doc = service
        .ingest("user-1", PDF_BYTES.to_vec(), "lecture.pdf", "application/pdf")
        .await
        .unwrap();

    assert_eq!(doc.ocr_text.as_deref(), Some(""));
    assert!(doc.text_spans.is_none());
    assert_eq!(doc.page_count, Some(1));
}

#[tokio::test]
async fn test_validation_rejects_before_any_record() {
    let f = fixture();

    let result = f
        .service
        .ingest("user-1", PDF_BYTES.to_vec(), "photo.png", "image/png")
        .await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));

    let oversized = vec![0u8; 11 * 1024 * 1024];
    let result = f
        .service
        .ingest("user-1", oversized, "big.pdf", "application/pdf")
        .await;
    assert!(matches!(result, Err(AppError::PayloadTooLarge(_))));

    assert_eq!(f.store.record_count(), 0);
    assert_eq!(f.storage.object_count(), 0);
}

#[tokio::test]
async fn test_get_is_ownership_scoped() {
    let f = fixture();

    let doc = f
        .service
        .ingest("user-1", PDF_BYTES.to_vec(), "lecture.pdf", "application/pdf")
        .await
        .unwrap();

    assert!(f.service.get("user-1", doc.id).await.is_ok());
    assert!(matches!(
        f.service.get("user-2", doc.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_download_round_trip() {
    let f = fixture();

    let doc = f
        .service
        .ingest("user-1", PDF_BYTES.to_vec(), "lecture.pdf", "application/pdf")
        .await
        .unwrap();

    let bytes = f.service.download("user-1", doc.id).await.unwrap();
    assert_eq!(bytes, PDF_BYTES);
}

#[tokio::test]
async fn test_delete_removes_assets_and_record() {
    let f = fixture();

    let doc = f
        .service
        .ingest("user-1", PDF_BYTES.to_vec(), "lecture.pdf", "application/pdf")
        .await
        .unwrap();

    // Raw document + thumbnail + 3 page assets.
    assert_eq!(f.storage.object_count(), 5);

    f.service.delete("user-1", doc.id).await.unwrap();

    assert_eq!(f.storage.object_count(), 0);
    assert_eq!(f.store.record_count(), 0);
}

#[tokio::test]
async fn test_delete_is_ownership_scoped() {
    let f = fixture();

    let doc = f
        .service
        .ingest("user-1", PDF_BYTES.to_vec(), "lecture.pdf", "application/pdf")
        .await
        .unwrap();

    assert!(matches!(
        f.service.delete("user-2", doc.id).await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(f.store.record_count(), 1);
}

#[tokio::test]
async fn test_list_returns_owner_documents() {
    let f = fixture();

    f.service
        .ingest("user-1", PDF_BYTES.to_vec(), "a.pdf", "application/pdf")
        .await
        .unwrap();
    f.service
        .ingest("user-1", b"%PDF-1.4 other".to_vec(), "b.pdf", "application/pdf")
        .await
        .unwrap();

    let docs = f.service.list("user-1").await.unwrap();
    assert_eq!(docs.len(), 2);
    assert!(f.service.list("user-2").await.unwrap().is_empty());
}
