use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One observation of a video's public metrics at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    /// Keeps the offset it was published with; day/hour analytics use it as-is.
    pub published_at: DateTime<FixedOffset>,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
}

/// The records produced by a single extraction run.
///
/// Ids are unique: merging a record whose id is already present replaces the
/// earlier entry in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoSnapshot {
    records: Vec<VideoRecord>,
}

impl VideoSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record, latest wins on duplicate `video_id`.
    pub fn merge(&mut self, record: VideoRecord) {
        match self
            .records
            .iter_mut()
            .find(|r| r.video_id == record.video_id)
        {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    pub fn records(&self) -> &[VideoRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<VideoRecord> {
        self.records
    }
}

impl FromIterator<VideoRecord> for VideoSnapshot {
    fn from_iter<I: IntoIterator<Item = VideoRecord>>(iter: I) -> Self {
        let mut snapshot = VideoSnapshot::new();
        for record in iter {
            snapshot.merge(record);
        }
        snapshot
    }
}

/// A row of `youtube_videos` as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredVideo {
    pub video_id: String,
    pub title: String,
    pub published_at: String,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub recorded_at: String,
}

/// Outcome of one batched upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertResult {
    pub inserted: usize,
    pub updated: usize,
}

/// Bookkeeping row for one orchestrated run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: i64,
    pub channel_id: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub status: String,
    pub videos_found: i64,
    pub inserted: i64,
    pub updated: i64,
    pub error: Option<String>,
}

/// Stats returned by `yts stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStats {
    pub videos: i64,
    pub total_views: i64,
    pub total_likes: i64,
    pub total_comments: i64,
    pub last_recorded_at: Option<String>,
    pub runs: i64,
    pub failed_runs: i64,
    pub db_size_bytes: u64,
}
