//! Noteilus Processing Library
//!
//! This crate implements the document ingestion pipeline: content hashing
//! and cache lookup, bounded-parallelism page rendering, OCR and layout
//! extraction adapters, and the controller that sequences the mandatory and
//! best-effort stages into one consistent metadata record.

pub mod hash;
pub mod ingest;
pub mod layout;
pub mod ocr;
pub mod pdf;
pub mod render;
pub mod validator;

pub use hash::content_hash;
pub use ingest::IngestService;
pub use layout::{SpanExtractor, TextLayoutExtractor};
pub use ocr::{OcrEngine, RemoteOcrClient};
pub use pdf::{PageRenderer, PdfToSvgRenderer};
pub use render::BatchRenderOrchestrator;
pub use validator::{DocumentValidator, ValidationError};
