//! Rust structs mapping to database tables.

use serde::Serialize;

/// A streamable song and the bucket folder holding its HLS rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Song {
    /// Public stream identifier.
    pub id: String,
    pub name: String,
    pub duration_seconds: i64,
    /// Folder reference as uploaded; normalized at request time.
    pub bucket_folder: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Song {
    /// Column list matching [`Song::from_row`].
    pub const COLUMNS: &'static str =
        "id, name, duration_seconds, bucket_folder, created_at, updated_at";

    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            duration_seconds: row.get(2)?,
            bucket_folder: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}
