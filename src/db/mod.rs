pub mod migrations;
pub mod models;
pub mod schema;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{EtlError, Result};
use models::*;

/// Rows per INSERT statement; keeps bound parameters far below SQLite's limit.
const UPSERT_CHUNK: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VideoSort {
    Views,
    Published,
    Recorded,
    Title,
}

impl VideoSort {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "views" => Some(VideoSort::Views),
            "published" | "date" => Some(VideoSort::Published),
            "recorded" => Some(VideoSort::Recorded),
            "title" => Some(VideoSort::Title),
            _ => None,
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            VideoSort::Views => "views DESC, video_id",
            VideoSort::Published => "datetime(published_at) DESC, video_id",
            VideoSort::Recorded => "recorded_at DESC, video_id",
            VideoSort::Title => "title COLLATE NOCASE, video_id",
        }
    }
}

pub struct Database {
    pub conn: Connection,
    pub path: PathBuf,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EtlError::StorageUnavailable(format!(
                    "Failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            EtlError::StorageUnavailable(format!(
                "Failed to open database {}: {e}",
                path.display()
            ))
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        schema::create_schema(&conn)?;
        migrations::run_migrations(&conn)?;

        info!("Opened database: {}", path.display());

        Ok(Database {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Default database path: ~/.yts/yts.db
    pub fn default_db_path() -> anyhow::Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(home.join(".yts").join("yts.db"))
    }

    /// Insert or refresh every record of the snapshot in one transaction.
    ///
    /// New ids are inserted whole. Existing ids get their metrics and
    /// `recorded_at` overwritten; `title` and `published_at` keep the values
    /// from the first insert. Nothing is visible unless the whole batch commits.
    pub fn upsert_videos(&self, snapshot: &VideoSnapshot) -> Result<UpsertResult> {
        if snapshot.is_empty() {
            return Ok(UpsertResult::default());
        }

        // Dropping an uncommitted transaction rolls it back.
        let tx = self.conn.unchecked_transaction()?;

        let recorded_at = next_recorded_at(&tx)?;

        let mut updated = 0usize;
        {
            let mut exists =
                tx.prepare("SELECT COUNT(*) FROM youtube_videos WHERE video_id = ?1")?;
            for record in snapshot.records() {
                let count: i64 = exists.query_row([&record.video_id], |r| r.get(0))?;
                if count > 0 {
                    updated += 1;
                }
            }
        }

        for chunk in snapshot.records().chunks(UPSERT_CHUNK) {
            let mut placeholders = Vec::with_capacity(chunk.len());
            let mut values: Vec<Value> = Vec::with_capacity(chunk.len() * 7);
            for (i, record) in chunk.iter().enumerate() {
                let base = i * 7;
                placeholders.push(format!(
                    "(?{}, ?{}, ?{}, ?{}, ?{}, ?{}, ?{})",
                    base + 1,
                    base + 2,
                    base + 3,
                    base + 4,
                    base + 5,
                    base + 6,
                    base + 7
                ));
                values.push(Value::Text(record.video_id.clone()));
                values.push(Value::Text(record.title.clone()));
                values.push(Value::Text(
                    record
                        .published_at
                        .to_rfc3339_opts(SecondsFormat::Secs, true),
                ));
                values.push(Value::Integer(to_sql_count(record.views, "views", record)?));
                values.push(Value::Integer(to_sql_count(record.likes, "likes", record)?));
                values.push(Value::Integer(to_sql_count(
                    record.comments,
                    "comments",
                    record,
                )?));
                values.push(Value::Text(recorded_at.clone()));
            }

            let sql = format!(
                "INSERT INTO youtube_videos (video_id, title, published_at, views, likes, comments, recorded_at)
                 VALUES {}
                 ON CONFLICT(video_id) DO UPDATE SET
                     views = excluded.views,
                     likes = excluded.likes,
                     comments = excluded.comments,
                     recorded_at = excluded.recorded_at",
                placeholders.join(", ")
            );
            tx.execute(&sql, rusqlite::params_from_iter(values))?;
        }

        tx.commit()?;

        let result = UpsertResult {
            inserted: snapshot.len() - updated,
            updated,
        };
        debug!(
            "Upserted {} videos ({} new, {} updated) at {}",
            snapshot.len(),
            result.inserted,
            result.updated,
            recorded_at
        );
        Ok(result)
    }

    /// Get a single stored video by ID.
    pub fn get_video(&self, video_id: &str) -> Result<Option<StoredVideo>> {
        let result = self
            .conn
            .query_row(
                "SELECT video_id, title, published_at, views, likes, comments, recorded_at
                 FROM youtube_videos WHERE video_id = ?1",
                [video_id],
                row_to_stored_video,
            )
            .optional()?;
        Ok(result)
    }

    /// List stored videos.
    pub fn list_videos(&self, sort: VideoSort, limit: usize) -> Result<Vec<StoredVideo>> {
        let sql = format!(
            "SELECT video_id, title, published_at, views, likes, comments, recorded_at
             FROM youtube_videos ORDER BY {} LIMIT ?1",
            sort.order_by()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([limit as i64], row_to_stored_video)?;

        let mut videos = Vec::new();
        for row in rows {
            videos.push(row?);
        }
        Ok(videos)
    }

    /// Rebuild a snapshot from the latest stored statistics, newest first.
    pub fn load_snapshot(&self) -> Result<VideoSnapshot> {
        let stored = self.list_videos(VideoSort::Published, i64::MAX as usize)?;
        let mut snapshot = VideoSnapshot::new();
        for v in stored {
            match DateTime::parse_from_rfc3339(&v.published_at) {
                Ok(published_at) => snapshot.merge(VideoRecord {
                    video_id: v.video_id,
                    title: v.title,
                    published_at,
                    views: v.views,
                    likes: v.likes,
                    comments: v.comments,
                }),
                Err(e) => warn!(
                    "Skipping stored video {} with bad published_at {:?}: {}",
                    v.video_id, v.published_at, e
                ),
            }
        }
        Ok(snapshot)
    }

    /// Get database statistics.
    pub fn stats(&self) -> Result<DbStats> {
        let (videos, total_views, total_likes, total_comments, last_recorded_at) =
            self.conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(views), 0), COALESCE(SUM(likes), 0),
                        COALESCE(SUM(comments), 0), MAX(recorded_at)
                 FROM youtube_videos",
                [],
                |r| {
                    Ok((
                        r.get::<_, i64>(0)?,
                        r.get::<_, i64>(1)?,
                        r.get::<_, i64>(2)?,
                        r.get::<_, i64>(3)?,
                        r.get::<_, Option<String>>(4)?,
                    ))
                },
            )?;
        let runs: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pipeline_runs", [], |r| r.get(0))?;
        let failed_runs: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pipeline_runs WHERE status = 'failed'",
            [],
            |r| r.get(0),
        )?;

        let db_size_bytes = std::fs::metadata(&self.path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(DbStats {
            videos,
            total_views,
            total_likes,
            total_comments,
            last_recorded_at,
            runs,
            failed_runs,
            db_size_bytes,
        })
    }

    /// Read a value from yts_meta.
    pub fn meta(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM yts_meta WHERE key = ?1", [key], |r| {
                r.get(0)
            })
            .optional()?;
        Ok(value)
    }
}

fn row_to_stored_video(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredVideo> {
    Ok(StoredVideo {
        video_id: row.get(0)?,
        title: row.get(1)?,
        published_at: row.get(2)?,
        views: row.get::<_, i64>(3)?.max(0) as u64,
        likes: row.get::<_, i64>(4)?.max(0) as u64,
        comments: row.get::<_, i64>(5)?.max(0) as u64,
        recorded_at: row.get(6)?,
    })
}

fn to_sql_count(value: u64, field: &str, record: &VideoRecord) -> Result<i64> {
    i64::try_from(value).map_err(|_| {
        EtlError::StorageConstraint(format!(
            "{field} = {value} for video {} does not fit in an INTEGER column",
            record.video_id
        ))
    })
}

/// Write timestamp for this upsert: wall-clock now, but never at or before
/// the newest `recorded_at` already stored.
fn next_recorded_at(conn: &Connection) -> Result<String> {
    let mut now = Utc::now();
    let latest: Option<String> =
        conn.query_row("SELECT MAX(recorded_at) FROM youtube_videos", [], |r| {
            r.get(0)
        })?;
    if let Some(latest) = latest.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()) {
        let latest = latest.with_timezone(&Utc);
        if now <= latest {
            now = latest + Duration::milliseconds(1);
        }
    }
    Ok(now.to_rfc3339_opts(SecondsFormat::Millis, true))
}
