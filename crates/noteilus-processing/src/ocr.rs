//! OCR adapter.
//!
//! [`OcrEngine`] is the seam the pipeline works against;
//! [`RemoteOcrClient`] calls an external OCR HTTP service that returns
//! per-page markdown blocks. The transcript is the page texts joined by a
//! blank line, in the page order reported by the service.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Extracts a text transcript from raw document bytes.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn extract_text(&self, data: &[u8]) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct OcrRequest {
    model: String,
    document: OcrDocument,
}

#[derive(Debug, Serialize)]
struct OcrDocument {
    #[serde(rename = "type")]
    document_type: String,
    document_url: String,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    pages: Vec<OcrPage>,
}

#[derive(Debug, Deserialize)]
struct OcrPage {
    index: i32,
    #[serde(default)]
    markdown: String,
}

/// OCR client for an HTTP OCR service with bearer authentication.
pub struct RemoteOcrClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl RemoteOcrClient {
    pub fn new(
        endpoint: String,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for OCR")?;

        Ok(Self {
            http_client,
            endpoint,
            api_key,
            model,
        })
    }
}

fn assemble_transcript(mut pages: Vec<OcrPage>) -> String {
    pages.sort_by_key(|p| p.index);
    pages
        .into_iter()
        .map(|p| p.markdown)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl OcrEngine for RemoteOcrClient {
    async fn extract_text(&self, data: &[u8]) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        let request = OcrRequest {
            model: self.model.clone(),
            document: OcrDocument {
                document_type: "document_url".to_string(),
                document_url: format!("data:application/pdf;base64,{}", encoded),
            },
        };

        let start = std::time::Instant::now();
        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("OCR request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("OCR service returned {}: {}", status, body);
        }

        let parsed: OcrResponse = response
            .json()
            .await
            .context("Unparsable OCR service response")?;

        tracing::debug!(
            page_count = parsed.pages.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "OCR transcript received"
        );

        Ok(assemble_transcript(parsed.pages))
    }
}
