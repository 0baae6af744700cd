//! Batch rendering orchestration: page count → bounded waves → settle-all.
//!
//! Page-render work is dispatched in strictly ordered waves whose width is
//! derived from available parallelism, clamped to `[2, 8]`. A failed page
//! task never aborts its siblings; the final page list contains only the
//! successful outcomes, sorted by page number.

use anyhow::{bail, Context, Result};
use futures::future::join_all;
use noteilus_core::models::PageAsset;
use noteilus_storage::{keys, Storage};
use std::sync::Arc;
use uuid::Uuid;

use crate::pdf::PageRenderer;

const MIN_RENDER_WORKERS: usize = 2;
const MAX_RENDER_WORKERS: usize = 8;

const PAGE_CONTENT_TYPE: &str = "image/svg+xml";
const THUMBNAIL_KIND: &str = "svg";

/// Orchestrates per-page rendering of a document under bounded parallelism.
pub struct BatchRenderOrchestrator {
    renderer: Arc<dyn PageRenderer>,
    storage: Arc<dyn Storage>,
    width_override: Option<usize>,
}

impl BatchRenderOrchestrator {
    pub fn new(renderer: Arc<dyn PageRenderer>, storage: Arc<dyn Storage>) -> Self {
        Self {
            renderer,
            storage,
            width_override: None,
        }
    }

    #[cfg(test)]
    fn with_batch_width(mut self, width: usize) -> Self {
        self.width_override = Some(width);
        self
    }

    /// Wave width: available parallelism with a floor of 2 (some concurrency
    /// even on constrained hosts) and a ceiling of 8 (bounded external
    /// process fan-out).
    fn batch_width(&self) -> usize {
        if let Some(width) = self.width_override {
            return width;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .clamp(MIN_RENDER_WORKERS, MAX_RENDER_WORKERS)
    }

    /// Render every page of the document into an independent page asset.
    ///
    /// Any subset of pages (including all or none) may be missing from the
    /// result; total inability to determine the page count yields an empty
    /// result rather than an error.
    pub async fn render_document(
        &self,
        owner_id: &str,
        document_id: Uuid,
        data: &[u8],
    ) -> Vec<PageAsset> {
        let page_count = match self.renderer.page_count(data).await {
            Ok(0) => {
                tracing::warn!(document_id = %document_id, "Inspector reported zero pages, skipping rendering");
                return Vec::new();
            }
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(
                    document_id = %document_id,
                    error = %format!("{:#}", e),
                    "Failed to determine page count, skipping rendering"
                );
                return Vec::new();
            }
        };

        let width = self.batch_width();
        tracing::info!(
            document_id = %document_id,
            page_count,
            batch_width = width,
            "Rendering document pages"
        );

        let pages: Vec<u32> = (1..=page_count).collect();
        let mut rendered = Vec::with_capacity(pages.len());

        // Waves run strictly in order; tasks within a wave run concurrently
        // and settle independently.
        for wave in pages.chunks(width) {
            let tasks = wave.iter().map(|&page| async move {
                (
                    page,
                    self.render_page_task(owner_id, document_id, data, page).await,
                )
            });

            for (page, outcome) in join_all(tasks).await {
                match outcome {
                    Ok(asset) => rendered.push(asset),
                    Err(e) => {
                        tracing::warn!(
                            document_id = %document_id,
                            page,
                            error = %format!("{:#}", e),
                            "Page render failed"
                        );
                    }
                }
            }
        }

        // Intra-wave completion order is nondeterministic; the persisted
        // order is by page number.
        rendered.sort_by_key(|asset| asset.page_number);
        rendered
    }

    async fn render_page_task(
        &self,
        owner_id: &str,
        document_id: Uuid,
        data: &[u8],
        page_number: u32,
    ) -> Result<PageAsset> {
        let bytes = self.renderer.render_page(data, page_number).await?;
        if bytes.is_empty() {
            bail!("Renderer produced empty output for page {}", page_number);
        }

        let key = keys::page_asset_key(owner_id, document_id, page_number);
        let asset_url = self
            .storage
            .upload_with_key(&key, bytes, PAGE_CONTENT_TYPE)
            .await
            .context("Failed to upload page asset")?;

        Ok(PageAsset {
            page_number: page_number as i32,
            asset_url,
        })
    }

    /// Render the first page as the cover thumbnail.
    ///
    /// Independent of full per-page rendering; returns `(url, kind)` on
    /// success, `None` on failure.
    pub async fn render_thumbnail(
        &self,
        owner_id: &str,
        document_id: Uuid,
        data: &[u8],
    ) -> Option<(String, String)> {
        match self.thumbnail_task(owner_id, document_id, data).await {
            Ok(url) => Some((url, THUMBNAIL_KIND.to_string())),
            Err(e) => {
                tracing::warn!(
                    document_id = %document_id,
                    error = %format!("{:#}", e),
                    "Thumbnail render failed"
                );
                None
            }
        }
    }

    async fn thumbnail_task(
        &self,
        owner_id: &str,
        document_id: Uuid,
        data: &[u8],
    ) -> Result<String> {
        let bytes = self.renderer.render_page(data, 1).await?;
        if bytes.is_empty() {
            bail!("Renderer produced empty output for thumbnail");
        }

        let key = keys::thumbnail_key(owner_id, document_id);
        self.storage
            .upload_with_key(&key, bytes, PAGE_CONTENT_TYPE)
            .await
            .context("Failed to upload thumbnail")
    }
}
