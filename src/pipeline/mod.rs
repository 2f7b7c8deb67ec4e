pub mod state;

use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::analyze::{self, RecommendationReport};
use crate::db::models::UpsertResult;
use crate::db::Database;
use crate::error::{EtlError, Result};
use crate::extract::{self, VideoPlatform};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    /// The channel had no videos; nothing was analyzed or loaded.
    Empty,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Empty => "empty",
            RunStatus::Failed => "failed",
        }
    }
}

pub struct PipelineOptions {
    pub channel_id: String,
    pub max_results: usize,
    /// Extra attempts per step for retryable errors.
    pub retries: u32,
    pub retry_delay: Duration,
}

/// Result of one extract → analyze → load run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: i64,
    pub channel_id: String,
    pub status: RunStatus,
    pub videos_found: usize,
    pub report: Option<RecommendationReport>,
    pub upsert: UpsertResult,
    pub duration_secs: f64,
}

/// Run Extract → Analyze → Load once, sequentially, retrying each step on
/// transient failures. The run is recorded in `pipeline_runs`.
pub fn run_pipeline(
    platform: &dyn VideoPlatform,
    db: &Database,
    opts: &PipelineOptions,
) -> Result<RunReport> {
    let start = Instant::now();
    let run_id = state::start_run(&db.conn, &opts.channel_id)?;

    match run_steps(platform, db, opts) {
        Ok((status, videos_found, report, upsert)) => {
            state::complete_run(
                &db.conn,
                run_id,
                status.as_str(),
                videos_found,
                upsert.inserted,
                upsert.updated,
                None,
            )?;
            let duration_secs = start.elapsed().as_secs_f64();
            info!(
                "Run {} for {} {}: {} videos, {} new, {} updated ({:.1}s)",
                run_id,
                opts.channel_id,
                status.as_str(),
                videos_found,
                upsert.inserted,
                upsert.updated,
                duration_secs
            );
            Ok(RunReport {
                run_id,
                channel_id: opts.channel_id.clone(),
                status,
                videos_found,
                report,
                upsert,
                duration_secs,
            })
        }
        Err(e) => {
            let message = e.to_string();
            if let Err(record_err) = state::complete_run(
                &db.conn,
                run_id,
                RunStatus::Failed.as_str(),
                0,
                0,
                0,
                Some(&message),
            ) {
                warn!("Could not record failure of run {}: {}", run_id, record_err);
            }
            Err(e)
        }
    }
}

fn run_steps(
    platform: &dyn VideoPlatform,
    db: &Database,
    opts: &PipelineOptions,
) -> Result<(RunStatus, usize, Option<RecommendationReport>, UpsertResult)> {
    eprintln!(
        "Extracting up to {} videos from {}...",
        opts.max_results, opts.channel_id
    );
    let snapshot = with_retry("extract", opts, || {
        extract::fetch_channel_stats(platform, &opts.channel_id, opts.max_results)
    })?;
    let videos_found = snapshot.len();
    eprintln!("  Fetched statistics for {} videos", videos_found);

    let report = match analyze::analyze(&snapshot) {
        Ok(report) => report,
        Err(EtlError::EmptyInput) => {
            warn!("Channel {} returned no videos; skipping analysis and load", opts.channel_id);
            return Ok((RunStatus::Empty, 0, None, UpsertResult::default()));
        }
        Err(e) => return Err(e),
    };

    eprintln!("Loading {} videos...", videos_found);
    let upsert = with_retry("load", opts, || db.upsert_videos(&snapshot))?;
    eprintln!(
        "  {} inserted, {} updated",
        upsert.inserted, upsert.updated
    );

    Ok((RunStatus::Completed, videos_found, Some(report), upsert))
}

fn with_retry<T>(step: &str, opts: &PipelineOptions, mut f: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempt = 0u32;
    loop {
        match f() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < opts.retries => {
                attempt += 1;
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {}s",
                    step,
                    attempt,
                    opts.retries + 1,
                    e,
                    opts.retry_delay.as_secs()
                );
                std::thread::sleep(opts.retry_delay);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::fake::FakePlatform;

    fn temp_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("yts.db")).unwrap();
        (dir, db)
    }

    fn opts(retries: u32) -> PipelineOptions {
        PipelineOptions {
            channel_id: "UC_test".to_string(),
            max_results: 20,
            retries,
            retry_delay: Duration::ZERO,
        }
    }

    #[test]
    fn full_run_loads_snapshot_and_reports() {
        let (_dir, db) = temp_db();
        let fake = FakePlatform::with_videos(25);

        let run = run_pipeline(&fake, &db, &opts(0)).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.videos_found, 20);
        assert_eq!(run.upsert, UpsertResult { inserted: 20, updated: 0 });
        assert!(run.report.is_some());
        assert_eq!(db.stats().unwrap().videos, 20);

        let again = run_pipeline(&fake, &db, &opts(0)).unwrap();
        assert_eq!(again.upsert, UpsertResult { inserted: 0, updated: 20 });

        let runs = state::recent_runs(&db.conn, 10).unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.status == "completed"));
    }

    #[test]
    fn transient_extract_failure_is_retried() {
        let (_dir, db) = temp_db();
        let fake = FakePlatform::with_videos(5);
        fake.stats_failures.set(1);

        let run = run_pipeline(&fake, &db, &opts(1)).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(fake.stats_calls.borrow().len(), 2);
    }

    #[test]
    fn exhausted_retries_fail_the_run() {
        let (_dir, db) = temp_db();
        let fake = FakePlatform::with_videos(5);
        fake.channel_failures.set(3);

        let err = run_pipeline(&fake, &db, &opts(1)).unwrap_err();
        assert!(matches!(err, EtlError::ExternalService(_)));
        assert_eq!(fake.channel_failures.get(), 1);

        let runs = state::recent_runs(&db.conn, 1).unwrap();
        assert_eq!(runs[0].status, "failed");
        assert!(runs[0].error.as_deref().unwrap().contains("timed out"));
        assert_eq!(db.stats().unwrap().videos, 0);
    }

    #[test]
    fn not_found_is_not_retried() {
        let (_dir, db) = temp_db();
        let fake = FakePlatform::with_videos(5);
        let options = PipelineOptions {
            channel_id: "UC_nobody".to_string(),
            ..opts(5)
        };

        let err = run_pipeline(&fake, &db, &options).unwrap_err();
        assert!(matches!(err, EtlError::NotFound(_)));
        assert!(fake.listing_calls.borrow().is_empty());
    }

    #[test]
    fn channel_without_videos_completes_as_empty() {
        let (_dir, db) = temp_db();
        let fake = FakePlatform::with_videos(0);

        let run = run_pipeline(&fake, &db, &opts(0)).unwrap();
        assert_eq!(run.status, RunStatus::Empty);
        assert!(run.report.is_none());
        assert_eq!(state::recent_runs(&db.conn, 1).unwrap()[0].status, "empty");
    }
}
