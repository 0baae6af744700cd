//! Noteilus DB Library
//!
//! This crate provides the document metadata store: the [`DocumentStore`]
//! trait, a PostgreSQL implementation backed by sqlx, and an in-memory
//! implementation used as a test double.

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::InMemoryDocumentStore;
pub use postgres::PgDocumentStore;
pub use store::DocumentStore;
