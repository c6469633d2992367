//! Persistent song/tag store over SQLite
//!
//! Owns the schema and the primitives the reconciliation engine runs inside
//! a transaction, plus the read/delete helpers the import tooling needs.
//! No two songs share the same `(title, artist)` pair; tag names are unique
//! and associations cascade on delete from either side.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, Transaction};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub tags: Vec<String>,
    pub created_at: String,
}

#[derive(Clone)]
pub struct SongStore {
    pool: SqlitePool,
}

impl SongStore {
    /// Open (or create) the song database at `db_path`.
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let connection_string = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to song database at: {}", db_path.display()))?;

        let store = Self { pool };
        store.initialize().await?;

        tracing::info!("Song database initialized: {}", db_path.display());
        Ok(store)
    }

    /// Initialize database schema
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS songs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                artist TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create songs table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create tags table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS song_tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                song_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                FOREIGN KEY (song_id) REFERENCES songs(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE,
                UNIQUE(song_id, tag_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create song_tags table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_songs_title_artist
            ON songs(title, artist)
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create index")?;

        Ok(())
    }

    /// Begin a write transaction covering a whole import batch.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .context("Failed to begin transaction")
    }

    /// Get a song with its tags by ID.
    pub async fn get_song(&self, id: i64) -> Result<Option<Song>> {
        let row = sqlx::query_as::<_, (i64, String, String, String)>(
            "SELECT id, title, artist, created_at FROM songs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch song")?;

        if let Some((id, title, artist, created_at)) = row {
            let tags = self.get_song_tags(id).await?;
            Ok(Some(Song {
                id,
                title,
                artist,
                tags,
                created_at,
            }))
        } else {
            Ok(None)
        }
    }

    /// List all songs with their tags, newest first.
    pub async fn list_songs(&self) -> Result<Vec<Song>> {
        let rows = sqlx::query_as::<_, (i64, String, String, String)>(
            r#"
            SELECT id, title, artist, created_at
            FROM songs
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch songs")?;

        // One joined query for all associations instead of one per song.
        let tag_rows = sqlx::query_as::<_, (i64, String)>(
            r#"
            SELECT st.song_id, t.name
            FROM song_tags st
            JOIN tags t ON t.id = st.tag_id
            ORDER BY t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch song tags")?;

        let mut tags_by_song: HashMap<i64, Vec<String>> = HashMap::new();
        for (song_id, name) in tag_rows {
            tags_by_song.entry(song_id).or_default().push(name);
        }

        let songs = rows
            .into_iter()
            .map(|(id, title, artist, created_at)| Song {
                id,
                title,
                artist,
                tags: tags_by_song.remove(&id).unwrap_or_default(),
                created_at,
            })
            .collect();
        Ok(songs)
    }

    async fn get_song_tags(&self, song_id: i64) -> Result<Vec<String>> {
        let tags = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT t.name
            FROM tags t
            JOIN song_tags st ON t.id = st.tag_id
            WHERE st.song_id = ?
            ORDER BY t.name
            "#,
        )
        .bind(song_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch song tags")?;

        Ok(tags.into_iter().map(|(name,)| name).collect())
    }

    pub async fn song_count(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM songs")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count songs")
    }

    /// Look up a tag ID by exact name.
    pub async fn find_tag_id(&self, name: &str) -> Result<Option<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up tag")
    }

    /// Delete songs by ID; associations go with them via cascade.
    /// Returns the number of songs actually deleted.
    pub async fn delete_songs(&self, ids: &[i64]) -> Result<u64> {
        let mut tx = self.begin().await?;
        let mut deleted = 0;
        for id in ids {
            let result = sqlx::query("DELETE FROM songs WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete song")?;
            deleted += result.rows_affected();
        }
        tx.commit().await.context("Failed to commit delete")?;

        tracing::info!("Deleted {} of {} songs", deleted, ids.len());
        Ok(deleted)
    }
}

// Transaction-scoped primitives. These take the connection of an open
// transaction so a whole import batch commits or rolls back together.

/// Find a song by exact `(title, artist)` match.
pub async fn find_song_by_title_artist(
    conn: &mut SqliteConnection,
    title: &str,
    artist: &str,
) -> Result<Option<i64>> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM songs WHERE title = ? AND artist = ?")
        .bind(title)
        .bind(artist)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to check for existing song")
}

/// Insert a song and return its ID.
pub async fn insert_song(conn: &mut SqliteConnection, title: &str, artist: &str) -> Result<i64> {
    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query("INSERT INTO songs (title, artist, created_at) VALUES (?, ?, ?)")
        .bind(title)
        .bind(artist)
        .bind(&now)
        .execute(&mut *conn)
        .await
        .context("Failed to insert song")?;

    Ok(result.last_insert_rowid())
}

/// Look up a tag by name.
pub async fn find_tag(conn: &mut SqliteConnection, name: &str) -> Result<Option<i64>> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM tags WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to look up tag")
}

/// Look up a tag by name, creating it if missing. Returns the tag ID.
pub async fn find_or_create_tag(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    if let Some(id) = find_tag(conn, name).await? {
        return Ok(id);
    }

    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query("INSERT INTO tags (name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(&now)
        .execute(&mut *conn)
        .await
        .context("Failed to create tag")?;

    tracing::debug!("Created tag \"{}\"", name);
    Ok(result.last_insert_rowid())
}

/// Associate a song with a tag. Idempotent: an existing association is
/// left untouched.
pub async fn link_song_tag(conn: &mut SqliteConnection, song_id: i64, tag_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO song_tags (song_id, tag_id) VALUES (?, ?)")
        .bind(song_id)
        .bind(tag_id)
        .execute(&mut *conn)
        .await
        .context("Failed to link song and tag")?;

    Ok(())
}
