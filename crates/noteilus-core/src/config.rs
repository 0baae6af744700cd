//! Configuration module
//!
//! This module provides the environment-driven configuration for the
//! ingestion service: database, storage backend, external tool paths, and
//! processing limits.

use std::env;

use crate::storage_types::StorageBackend;

const MAX_DOCUMENT_SIZE_MB: usize = 10;
const RENDER_TIMEOUT_SECS: u64 = 60;
const OCR_TIMEOUT_SECS: u64 = 120;
const LAYOUT_TIMEOUT_SECS: u64 = 30;

/// Application configuration for the ingestion service.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub database_url: String,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Upload validation
    pub max_document_size_bytes: usize,
    pub document_allowed_extensions: Vec<String>,
    pub document_allowed_content_types: Vec<String>,
    // Page rendering (external tools)
    pub pdftocairo_path: String,
    pub pdfinfo_path: String,
    pub render_timeout_secs: u64,
    // OCR service (optional; stage is skipped when unset)
    pub ocr_endpoint: Option<String>,
    pub ocr_api_key: Option<String>,
    pub ocr_model: String,
    pub ocr_timeout_secs: u64,
    // Layout extraction (optional; stage is skipped when script unset)
    pub layout_interpreter: String,
    pub layout_script_path: Option<String>,
    pub layout_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend =
            env::var("STORAGE_BACKEND")
                .ok()
                .and_then(|s| match s.to_lowercase().as_str() {
                    "local" => Some(StorageBackend::Local),
                    "memory" => Some(StorageBackend::Memory),
                    _ => None,
                });

        let max_document_size_mb = env::var("MAX_DOCUMENT_SIZE_MB")
            .unwrap_or_else(|_| MAX_DOCUMENT_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_DOCUMENT_SIZE_MB);

        let config = Config {
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            max_document_size_bytes: max_document_size_mb * 1024 * 1024,
            document_allowed_extensions: env::var("DOCUMENT_ALLOWED_EXTENSIONS")
                .unwrap_or_else(|_| "pdf".to_string())
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .collect(),
            document_allowed_content_types: env::var("DOCUMENT_ALLOWED_CONTENT_TYPES")
                .unwrap_or_else(|_| "application/pdf".to_string())
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .collect(),
            pdftocairo_path: env::var("PDFTOCAIRO_PATH")
                .unwrap_or_else(|_| "pdftocairo".to_string()),
            pdfinfo_path: env::var("PDFINFO_PATH").unwrap_or_else(|_| "pdfinfo".to_string()),
            render_timeout_secs: env::var("RENDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| RENDER_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(RENDER_TIMEOUT_SECS),
            ocr_endpoint: env::var("OCR_ENDPOINT").ok().filter(|s| !s.is_empty()),
            ocr_api_key: env::var("OCR_API_KEY").ok().filter(|s| !s.is_empty()),
            ocr_model: env::var("OCR_MODEL").unwrap_or_else(|_| "mistral-ocr-latest".to_string()),
            ocr_timeout_secs: env::var("OCR_TIMEOUT_SECS")
                .unwrap_or_else(|_| OCR_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(OCR_TIMEOUT_SECS),
            layout_interpreter: env::var("LAYOUT_INTERPRETER")
                .unwrap_or_else(|_| "python3".to_string()),
            layout_script_path: env::var("LAYOUT_SCRIPT_PATH").ok().filter(|s| !s.is_empty()),
            layout_timeout_secs: env::var("LAYOUT_TIMEOUT_SECS")
                .unwrap_or_else(|_| LAYOUT_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(LAYOUT_TIMEOUT_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.max_document_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_DOCUMENT_SIZE_MB must be greater than 0"));
        }

        let backend = self.storage_backend.unwrap_or(StorageBackend::Local);
        if backend == StorageBackend::Local {
            if self.local_storage_path.is_none() {
                return Err(anyhow::anyhow!(
                    "LOCAL_STORAGE_PATH must be set when using local storage backend"
                ));
            }
            if self.local_storage_base_url.is_none() {
                return Err(anyhow::anyhow!(
                    "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                ));
            }
        }

        if self.ocr_endpoint.is_some() && self.ocr_api_key.is_none() {
            return Err(anyhow::anyhow!(
                "OCR_API_KEY must be set when OCR_ENDPOINT is configured"
            ));
        }

        Ok(())
    }
}
