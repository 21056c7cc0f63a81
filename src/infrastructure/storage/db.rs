use crate::domain::error::ScrapeError;
use crate::domain::model::{CacheEntry, RequestKey};
use crate::domain::traits::CacheBackend;
use async_trait::async_trait;
use std::io::Cursor;
use std::path::Path;
use tokio_rusqlite::{params, Connection};
use zstd::stream::{decode_all, encode_all};

pub async fn init_database(db_path: &Path) -> Result<Connection, ScrapeError> {
    let db = Connection::open(db_path.to_path_buf()).await?;

    db.call(|conn| {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache (
                key TEXT PRIMARY KEY,
                data BLOB NOT NULL,
                compressed_size INTEGER NOT NULL,
                original_size INTEGER NOT NULL,
                fetched_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_cache_fetched ON cache(fetched_at)",
            [],
        )?;

        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    Ok(db)
}

/// SQLite cache backend.
///
/// Each row holds the whole [`CacheEntry`] as zstd-compressed JSON. The
/// `fetched_at` column mirrors the entry's timestamp (unix seconds) for
/// inspection only; reads always use the timestamp inside the blob.
pub struct SqliteCacheStore {
    conn: Connection,
}

impl SqliteCacheStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub async fn open(db_path: &Path) -> Result<Self, ScrapeError> {
        Ok(Self::new(init_database(db_path).await?))
    }

    pub async fn count(&self) -> Result<usize, ScrapeError> {
        let count: i64 = self
            .conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM cache", [], |row| row.get(0)))
            .await?;

        Ok(count as usize)
    }
}

#[async_trait]
impl CacheBackend for SqliteCacheStore {
    async fn get(&self, key: &RequestKey) -> Result<Option<CacheEntry>, ScrapeError> {
        use rusqlite::OptionalExtension;

        let key_string = key.as_str().to_string();
        let compressed: Option<Vec<u8>> = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT data FROM cache WHERE key = ?",
                    params![key_string],
                    |row| row.get(0),
                )
                .optional()
            })
            .await?;

        let Some(compressed) = compressed else {
            return Ok(None);
        };

        let decompressed = decode_all(Cursor::new(&compressed))
            .map_err(|e| ScrapeError::Compression(e.to_string()))?;
        let entry: CacheEntry = serde_json::from_slice(&decompressed)?;

        Ok(Some(entry))
    }

    async fn put(&self, key: &RequestKey, entry: &CacheEntry) -> Result<(), ScrapeError> {
        let serialized = serde_json::to_vec(entry)?;
        let compressed = encode_all(Cursor::new(&serialized), 0)
            .map_err(|e| ScrapeError::Compression(e.to_string()))?;
        let now = chrono::Utc::now().timestamp();
        let fetched_at = entry.fetched_at.timestamp();

        let key_string = key.as_str().to_string();
        let compressed_len = compressed.len();
        let original_len = serialized.len();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO cache (key, data, compressed_size, original_size, fetched_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?)",
                    params![
                        key_string,
                        compressed,
                        compressed_len,
                        original_len,
                        fetched_at,
                        now
                    ],
                )
            })
            .await?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
