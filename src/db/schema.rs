use rusqlite::Connection;

use crate::error::Result;

pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Version tracking
        CREATE TABLE IF NOT EXISTS yts_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Latest observed statistics per video
        CREATE TABLE IF NOT EXISTS youtube_videos (
            video_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            published_at TEXT NOT NULL,
            views INTEGER NOT NULL DEFAULT 0 CHECK (views >= 0),
            likes INTEGER NOT NULL DEFAULT 0 CHECK (likes >= 0),
            comments INTEGER NOT NULL DEFAULT 0 CHECK (comments >= 0),
            recorded_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        -- One row per orchestrated run
        CREATE TABLE IF NOT EXISTS pipeline_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            channel_id TEXT NOT NULL,
            started_at TEXT NOT NULL,
            completed_at TEXT,
            status TEXT NOT NULL DEFAULT 'running',
            videos_found INTEGER NOT NULL DEFAULT 0,
            inserted INTEGER NOT NULL DEFAULT 0,
            updated INTEGER NOT NULL DEFAULT 0,
            error TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_videos_published ON youtube_videos(published_at);
        CREATE INDEX IF NOT EXISTS idx_runs_channel ON pipeline_runs(channel_id);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO yts_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
