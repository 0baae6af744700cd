//! Noteilus CLI — ingest documents and inspect their derived assets.
//!
//! Requires DATABASE_URL plus the storage backend configuration; see
//! `Config::from_env` for the full set of environment variables.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use noteilus_cli::{format_size, init_tracing};
use noteilus_core::models::DocumentAssetResponse;
use noteilus_core::Config;
use noteilus_db::{DocumentStore, PgDocumentStore};
use noteilus_processing::{
    DocumentValidator, IngestService, OcrEngine, PageRenderer, PdfToSvgRenderer, RemoteOcrClient,
    SpanExtractor, TextLayoutExtractor,
};
use noteilus_storage::create_storage;

#[derive(Parser)]
#[command(name = "noteilus", about = "Noteilus document ingestion CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a document and derive its assets
    Ingest {
        /// Path to the document to ingest
        file: PathBuf,
        /// Owner id the document belongs to
        #[arg(long)]
        owner: String,
        /// Display name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// List documents for an owner
    List {
        /// Owner id
        #[arg(long)]
        owner: String,
    },
    /// Get a single document by id
    Get {
        /// Document UUID
        id: String,
        /// Owner id
        #[arg(long)]
        owner: String,
    },
    /// Delete a document and its derived assets
    Delete {
        /// Document UUID
        id: String,
        /// Owner id
        #[arg(long)]
        owner: String,
    },
}

async fn build_service(config: &Config) -> Result<IngestService> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let store = PgDocumentStore::new(pool);
    store.migrate().await.context("Failed to run migrations")?;

    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage backend")?;

    let renderer: Arc<dyn PageRenderer> = Arc::new(PdfToSvgRenderer::new(
        config.pdftocairo_path.clone(),
        config.pdfinfo_path.clone(),
        Duration::from_secs(config.render_timeout_secs),
    ));

    let ocr: Option<Arc<dyn OcrEngine>> =
        match (config.ocr_endpoint.clone(), config.ocr_api_key.clone()) {
            (Some(endpoint), Some(api_key)) => Some(Arc::new(RemoteOcrClient::new(
                endpoint,
                api_key,
                config.ocr_model.clone(),
                Duration::from_secs(config.ocr_timeout_secs),
            )?)),
            _ => None,
        };

    let layout: Option<Arc<dyn SpanExtractor>> =
        config.layout_script_path.clone().map(|script_path| {
            Arc::new(TextLayoutExtractor::new(
                config.layout_interpreter.clone(),
                script_path,
                Duration::from_secs(config.layout_timeout_secs),
            )) as Arc<dyn SpanExtractor>
        });

    let validator = DocumentValidator::new(
        config.max_document_size_bytes,
        config.document_allowed_extensions.clone(),
        config.document_allowed_content_types.clone(),
    );

    Ok(IngestService::new(
        Arc::new(store) as Arc<dyn DocumentStore>,
        storage,
        renderer,
        ocr,
        layout,
        validator,
    ))
}

fn print_document(doc: DocumentAssetResponse) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let service = build_service(&config).await?;

    match cli.command {
        Commands::Ingest { file, owner, name } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let filename = name.unwrap_or_else(|| {
                file.file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("document.pdf")
                    .to_string()
            });

            let doc = service
                .ingest(&owner, data, &filename, "application/pdf")
                .await?;
            print_document(doc.into())?;
        }
        Commands::List { owner } => {
            let docs = service.list(&owner).await?;
            for doc in docs {
                println!(
                    "{}  {:<12} {:>10}  {}  {}",
                    doc.id,
                    doc.status.as_str(),
                    format_size(doc.size_bytes),
                    doc.uploaded_at.format("%Y-%m-%d %H:%M"),
                    doc.display_name
                );
            }
        }
        Commands::Get { id, owner } => {
            let id = Uuid::parse_str(&id).context("Invalid document id")?;
            let doc = service.get(&owner, id).await?;
            print_document(doc.into())?;
        }
        Commands::Delete { id, owner } => {
            let id = Uuid::parse_str(&id).context("Invalid document id")?;
            service.delete(&owner, id).await?;
            println!("Deleted {}", id);
        }
    }

    Ok(())
}
