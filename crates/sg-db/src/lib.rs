//! sg-db: song catalog persistence.
//!
//! This crate provides SQLite-backed storage with connection pooling,
//! embedded migrations, the [`Song`](models::Song) model, and the
//! [`SongCatalog`](catalog::SongCatalog) lookup used while streaming.

pub mod catalog;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

pub use catalog::{SongCatalog, SqliteCatalog};
pub use models::Song;
