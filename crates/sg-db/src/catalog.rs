//! Song lookup seam used by the streaming gateway.

use sg_core::Result;

use crate::models::Song;
use crate::pool::{get_conn, DbPool};
use crate::queries::songs;

/// Looks up songs by stream identifier.
pub trait SongCatalog: Send + Sync {
    fn get_song(&self, id: &str) -> Result<Option<Song>>;
}

/// [`SongCatalog`] backed by the SQLite pool.
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: DbPool,
}

impl SqliteCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl SongCatalog for SqliteCatalog {
    fn get_song(&self, id: &str) -> Result<Option<Song>> {
        let conn = get_conn(&self.pool)?;
        songs::get_song(&conn, id)
    }
}
