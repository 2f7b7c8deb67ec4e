use rusqlite::Connection;

use crate::db::models::PipelineRun;
use crate::error::Result;

/// Record the start of a pipeline run. Returns the run ID.
pub fn start_run(conn: &Connection, channel_id: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO pipeline_runs (channel_id, started_at, status)
         VALUES (?1, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), 'running')",
        [channel_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Complete a pipeline run with final counts.
pub fn complete_run(
    conn: &Connection,
    run_id: i64,
    status: &str,
    videos_found: usize,
    inserted: usize,
    updated: usize,
    error: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE pipeline_runs SET
            completed_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now'),
            status = ?2,
            videos_found = ?3,
            inserted = ?4,
            updated = ?5,
            error = ?6
         WHERE id = ?1",
        rusqlite::params![run_id, status, videos_found, inserted, updated, error],
    )?;
    Ok(())
}

/// Most recent runs first.
pub fn recent_runs(conn: &Connection, limit: usize) -> Result<Vec<PipelineRun>> {
    let mut stmt = conn.prepare(
        "SELECT id, channel_id, started_at, completed_at, status, videos_found, inserted, updated, error
         FROM pipeline_runs ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit as i64], |row| {
        Ok(PipelineRun {
            id: row.get(0)?,
            channel_id: row.get(1)?,
            started_at: row.get(2)?,
            completed_at: row.get(3)?,
            status: row.get(4)?,
            videos_found: row.get(5)?,
            inserted: row.get(6)?,
            updated: row.get(7)?,
            error: row.get(8)?,
        })
    })?;
    let mut runs = Vec::new();
    for row in rows {
        runs.push(row?);
    }
    Ok(runs)
}
