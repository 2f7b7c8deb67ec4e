//! Content-strategy recommendations derived from a single snapshot.
//!
//! Everything here is a pure function of its input: no clock, no randomness,
//! and every tie is broken by snapshot order.

pub mod engagement;
pub mod keywords;
pub mod schedule;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

use crate::db::models::{VideoRecord, VideoSnapshot};
use crate::error::{EtlError, Result};

/// Records considered "top performers" for keyword and schedule analysis.
pub const TOP_VIDEOS: usize = 10;
pub const MAX_KEYWORDS: usize = 10;
pub const BEST_SLOTS: usize = 2;
pub const MAX_ENGAGING_TITLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationReport {
    /// Most frequent first.
    pub suggested_keywords: Vec<String>,
    /// Full English weekday names, most frequent first.
    pub best_days: Vec<String>,
    /// Hours 0-23 in the offset each video was published with.
    pub best_hours: Vec<u32>,
    /// Most engaging first.
    pub engaging_titles: Vec<String>,
}

/// Derive recommendations from a snapshot.
pub fn analyze(snapshot: &VideoSnapshot) -> Result<RecommendationReport> {
    if snapshot.is_empty() {
        return Err(EtlError::EmptyInput);
    }

    let top = top_by_views(snapshot.records(), TOP_VIDEOS);
    let titles: Vec<&str> = top.iter().map(|r| r.title.as_str()).collect();

    Ok(RecommendationReport {
        suggested_keywords: keywords::extract_keywords(&titles, MAX_KEYWORDS),
        best_days: schedule::best_days(&top, BEST_SLOTS),
        best_hours: schedule::best_hours(&top, BEST_SLOTS),
        engaging_titles: engagement::most_engaging(snapshot.records(), MAX_ENGAGING_TITLES)
            .into_iter()
            .map(|r| r.title.clone())
            .collect(),
    })
}

/// The `n` most viewed records; equal view counts keep snapshot order.
pub fn top_by_views(records: &[VideoRecord], n: usize) -> Vec<&VideoRecord> {
    let mut sorted: Vec<&VideoRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.views.cmp(&a.views));
    sorted.truncate(n);
    sorted
}

/// The `n` most frequent values, ties broken by first appearance.
pub(crate) fn most_frequent<T, I>(values: I, n: usize) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut index: HashMap<T, usize> = HashMap::new();
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values {
        let seen = index.get(&value).copied();
        match seen {
            Some(i) => counts[i].1 += 1,
            None => {
                index.insert(value.clone(), counts.len());
                counts.push((value, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(n).map(|(v, _)| v).collect()
}
