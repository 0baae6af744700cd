use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a document record.
///
/// `Failed` exists in the state machine but is never persisted: when the
/// mandatory storage stage fails the record is retracted instead of being
/// left behind in a failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploading,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploading => "uploading",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploading" => Some(DocumentStatus::Uploading),
            "completed" => Some(DocumentStatus::Completed),
            "failed" => Some(DocumentStatus::Failed),
            _ => None,
        }
    }
}

/// One rendered page of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAsset {
    pub page_number: i32,
    pub asset_url: String,
}

/// One positioned text span extracted from a document page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub id: String,
    pub text: String,
    pub page_number: i32,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub font_size: f64,
    pub font_name: String,
    pub page_width: f64,
    pub page_height: f64,
}

/// The persisted document record, owned by the document store and mutated
/// only by the ingestion pipeline.
///
/// Derived-asset fields are optional: each is present only if the
/// corresponding derivation stage succeeded. `ocr_text` is the exception and
/// is set to the empty string when OCR was skipped or failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAsset {
    pub id: Uuid,
    pub owner_id: String,
    pub display_name: String,
    pub storage_key: String,
    pub storage_url: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
    pub status: DocumentStatus,
    pub content_hash: Option<String>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_kind: Option<String>,
    pub page_count: Option<i32>,
    pub page_assets: Option<Vec<PageAsset>>,
    pub ocr_text: Option<String>,
    pub text_spans: Option<Vec<TextSpan>>,
}

impl DocumentAsset {
    /// True if this record carries at least one rendered page.
    pub fn has_rendered_pages(&self) -> bool {
        self.page_assets.as_ref().is_some_and(|p| !p.is_empty())
    }
}

/// Partial update applied to a document record in one batch write.
///
/// Every field is an explicit present/absent variant: `None` means "do not
/// touch", `Some` overwrites. Both store backends share these semantics via
/// [`DocumentAssetUpdate::apply_to`].
#[derive(Debug, Clone, Default)]
pub struct DocumentAssetUpdate {
    pub status: Option<DocumentStatus>,
    pub storage_url: Option<String>,
    pub content_hash: Option<String>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_kind: Option<String>,
    pub page_count: Option<i32>,
    pub page_assets: Option<Vec<PageAsset>>,
    pub ocr_text: Option<String>,
    pub text_spans: Option<Vec<TextSpan>>,
}

impl DocumentAssetUpdate {
    /// Merge this update into a record. Absent fields leave the record
    /// untouched.
    pub fn apply_to(&self, doc: &mut DocumentAsset) {
        if let Some(status) = self.status {
            doc.status = status;
        }
        if let Some(url) = &self.storage_url {
            doc.storage_url = url.clone();
        }
        if let Some(hash) = &self.content_hash {
            doc.content_hash = Some(hash.clone());
        }
        if let Some(url) = &self.thumbnail_url {
            doc.thumbnail_url = Some(url.clone());
        }
        if let Some(kind) = &self.thumbnail_kind {
            doc.thumbnail_kind = Some(kind.clone());
        }
        if let Some(count) = self.page_count {
            doc.page_count = Some(count);
        }
        if let Some(pages) = &self.page_assets {
            doc.page_assets = Some(pages.clone());
        }
        if let Some(text) = &self.ocr_text {
            doc.ocr_text = Some(text.clone());
        }
        if let Some(spans) = &self.text_spans {
            doc.text_spans = Some(spans.clone());
        }
    }
}

/// Caller-facing projection of a document record.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentAssetResponse {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_assets: Option<Vec<PageAsset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_spans: Option<Vec<TextSpan>>,
}

impl From<DocumentAsset> for DocumentAssetResponse {
    fn from(doc: DocumentAsset) -> Self {
        DocumentAssetResponse {
            id: doc.id,
            name: doc.display_name,
            url: doc.storage_url,
            size_bytes: doc.size_bytes,
            uploaded_at: doc.uploaded_at,
            status: doc.status,
            thumbnail_url: doc.thumbnail_url,
            page_count: doc.page_count,
            page_assets: doc.page_assets,
            ocr_text: doc.ocr_text,
            text_spans: doc.text_spans,
        }
    }
}
