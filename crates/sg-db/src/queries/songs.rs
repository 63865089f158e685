//! Song catalog operations.

use chrono::Utc;
use rusqlite::Connection;
use sg_core::{Error, Result};

use crate::models::Song;

/// Insert a song, or update name, duration and folder of an existing one.
pub fn upsert_song(
    conn: &Connection,
    id: &str,
    name: &str,
    duration_seconds: i64,
    bucket_folder: &str,
) -> Result<Song> {
    if id.trim().is_empty() {
        return Err(Error::Validation("song id must not be empty".into()));
    }
    if bucket_folder.trim().is_empty() {
        return Err(Error::Validation("bucket folder must not be empty".into()));
    }

    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO songs (id, name, duration_seconds, bucket_folder, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             duration_seconds = excluded.duration_seconds,
             bucket_folder = excluded.bucket_folder,
             updated_at = excluded.updated_at",
        rusqlite::params![id, name, duration_seconds, bucket_folder, now],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    get_song(conn, id)?.ok_or_else(|| Error::Internal(format!("song {id} vanished after upsert")))
}

/// Get a song by its stream identifier.
pub fn get_song(conn: &Connection, id: &str) -> Result<Option<Song>> {
    let sql = format!("SELECT {} FROM songs WHERE id = ?1", Song::COLUMNS);
    let result = conn.query_row(&sql, [id], Song::from_row);
    match result {
        Ok(song) => Ok(Some(song)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List all songs ordered by name.
pub fn list_songs(conn: &Connection) -> Result<Vec<Song>> {
    let sql = format!("SELECT {} FROM songs ORDER BY name ASC, id ASC", Song::COLUMNS);
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], Song::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Delete a song. Returns true if a row was deleted.
pub fn delete_song(conn: &Connection, id: &str) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM songs WHERE id = ?1", [id])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
