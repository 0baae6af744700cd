//! Page rendering adapters.
//!
//! [`PageRenderer`] is the seam the orchestrator works against;
//! [`PdfToSvgRenderer`] implements it on top of the external `pdfinfo`
//! page-count inspector and the `pdftocairo` single-page SVG renderer. Every
//! invocation gets its own temporary workspace and is time-bounded; a
//! timed-out invocation is a failed invocation.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::timeout;

/// Renders document pages into vector images.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Total page count of the document.
    async fn page_count(&self, data: &[u8]) -> Result<u32>;

    /// Render one page (1-based) into an SVG image.
    async fn render_page(&self, data: &[u8], page_number: u32) -> Result<Vec<u8>>;
}

/// Page renderer backed by the poppler command-line tools.
pub struct PdfToSvgRenderer {
    pdftocairo_path: String,
    pdfinfo_path: String,
    timeout: Duration,
}

impl PdfToSvgRenderer {
    pub fn new(pdftocairo_path: String, pdfinfo_path: String, timeout: Duration) -> Self {
        Self {
            pdftocairo_path,
            pdfinfo_path,
            timeout,
        }
    }

    /// Write the document into an isolated workspace and return (dir, path).
    async fn stage_input(&self, data: &[u8]) -> Result<(TempDir, std::path::PathBuf)> {
        let dir = TempDir::new().context("Failed to create render workspace")?;
        let input_path = dir.path().join("input.pdf");
        tokio::fs::write(&input_path, data)
            .await
            .context("Failed to write document to render workspace")?;
        Ok((dir, input_path))
    }

    async fn run_tool(&self, tool: &str, mut command: Command) -> Result<Output> {
        command.kill_on_drop(true);
        let output = timeout(self.timeout, command.output())
            .await
            .with_context(|| format!("{} timed out after {:?}", tool, self.timeout))?
            .with_context(|| format!("Failed to run {}", tool))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                tool,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(output)
    }

    fn parse_page_count(stdout: &str) -> Result<u32> {
        for line in stdout.lines() {
            if let Some(rest) = line.strip_prefix("Pages:") {
                return rest
                    .trim()
                    .parse::<u32>()
                    .context("Unparsable page count in inspector output");
            }
        }
        bail!("No page count in inspector output")
    }
}

#[async_trait]
impl PageRenderer for PdfToSvgRenderer {
    async fn page_count(&self, data: &[u8]) -> Result<u32> {
        let (_workspace, input_path) = self.stage_input(data).await?;

        let mut command = Command::new(&self.pdfinfo_path);
        command.arg(&input_path);
        let output = self.run_tool("pdfinfo", command).await?;

        Self::parse_page_count(&String::from_utf8_lossy(&output.stdout))
    }

    async fn render_page(&self, data: &[u8], page_number: u32) -> Result<Vec<u8>> {
        let (workspace, input_path) = self.stage_input(data).await?;
        let output_path = workspace.path().join(format!("page-{}.svg", page_number));

        let mut command = Command::new(&self.pdftocairo_path);
        command
            .arg("-svg")
            .arg("-f")
            .arg(page_number.to_string())
            .arg("-l")
            .arg(page_number.to_string())
            .arg(&input_path)
            .arg(&output_path);
        self.run_tool("pdftocairo", command).await?;

        read_rendered_page(&output_path, page_number).await
    }
}

async fn read_rendered_page(path: &Path, page_number: u32) -> Result<Vec<u8>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        bail!("Renderer produced no output for page {}", page_number);
    }
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read rendered page {}", page_number))
}
