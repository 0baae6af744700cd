//! Layout extraction adapter.
//!
//! [`SpanExtractor`] is the seam the pipeline works against;
//! [`TextLayoutExtractor`] invokes an external extraction script against a
//! temporary copy of the raw bytes and flattens its page-partitioned JSON
//! output into positioned text spans.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use noteilus_core::models::TextSpan;
use serde::Deserialize;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::timeout;

/// Extracts positioned text spans from raw document bytes.
#[async_trait]
pub trait SpanExtractor: Send + Sync {
    async fn extract_spans(&self, data: &[u8]) -> Result<Vec<TextSpan>>;
}

#[derive(Debug, Deserialize)]
struct LayoutOutput {
    #[serde(default)]
    pages: Vec<LayoutPage>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutPage {
    page_number: i32,
    page_width: f64,
    page_height: f64,
    #[serde(default)]
    spans: Vec<LayoutSpan>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutSpan {
    id: String,
    #[serde(default)]
    text: String,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    font_size: f64,
    #[serde(default)]
    font: String,
}

fn parse_spans(stdout: &str) -> Result<Vec<TextSpan>> {
    let output: LayoutOutput =
        serde_json::from_str(stdout).context("Unparsable layout extractor output")?;

    if let Some(error) = output.error {
        bail!("Layout extractor reported an error: {}", error);
    }

    let mut spans = Vec::new();
    for page in output.pages {
        for span in page.spans {
            spans.push(TextSpan {
                id: span.id,
                text: span.text,
                page_number: page.page_number,
                x0: span.x0,
                y0: span.y0,
                x1: span.x1,
                y1: span.y1,
                font_size: span.font_size,
                font_name: span.font,
                page_width: page.page_width,
                page_height: page.page_height,
            });
        }
    }
    Ok(spans)
}

/// Span extractor backed by an external extraction script
/// (`<interpreter> <script> <file>`, span JSON on stdout).
pub struct TextLayoutExtractor {
    interpreter: String,
    script_path: String,
    timeout: Duration,
}

impl TextLayoutExtractor {
    pub fn new(interpreter: String, script_path: String, timeout: Duration) -> Self {
        Self {
            interpreter,
            script_path,
            timeout,
        }
    }
}

#[async_trait]
impl SpanExtractor for TextLayoutExtractor {
    async fn extract_spans(&self, data: &[u8]) -> Result<Vec<TextSpan>> {
        let workspace = TempDir::new().context("Failed to create layout workspace")?;
        let input_path = workspace.path().join("input.pdf");
        tokio::fs::write(&input_path, data)
            .await
            .context("Failed to write document to layout workspace")?;

        let mut command = Command::new(&self.interpreter);
        command
            .arg(&self.script_path)
            .arg(&input_path)
            .kill_on_drop(true);

        let output = timeout(self.timeout, command.output())
            .await
            .with_context(|| format!("Layout extractor timed out after {:?}", self.timeout))?
            .context("Failed to run layout extractor")?;

        if !output.status.success() {
            bail!(
                "Layout extractor exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        parse_spans(&String::from_utf8_lossy(&output.stdout))
    }
}
