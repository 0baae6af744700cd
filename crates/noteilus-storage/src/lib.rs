//! Noteilus Storage Library
//!
//! This crate provides the object-storage abstraction and implementations for
//! Noteilus. It includes the Storage trait plus local-filesystem and
//! in-memory backends.
//!
//! # Storage key format
//!
//! Keys are scoped by owner and purpose. All backends use the same layout:
//!
//! - **Raw documents**: `documents/{owner}/{filename}`
//! - **Page assets**: `pages/{owner}/{document_id}/page-{n}.svg`
//! - **Thumbnails**: `thumbnails/{owner}/{document_id}.svg`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so all backends and the pipeline stay consistent.

pub mod factory;
pub mod keys;
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use noteilus_core::StorageBackend;
pub use traits::{Storage, StorageError, StorageResult};
