pub mod youtube;

use chrono::DateTime;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::db::models::{VideoRecord, VideoSnapshot};
use crate::error::{EtlError, Result};

/// Hard cap on entries per uploads-listing page.
pub const PAGE_SIZE: usize = 50;
/// Hard cap on ids per statistics request. Independent of `PAGE_SIZE`.
pub const STATS_BATCH_SIZE: usize = 50;

/// One page of the uploads listing.
#[derive(Debug, Clone, Default)]
pub struct PlaylistPage {
    /// Raw listing entries; each should carry `contentDetails.videoId`.
    pub items: Vec<Value>,
    pub next_page_token: Option<String>,
}

/// Read-only access to a video platform.
///
/// Implementations return raw JSON items so that one malformed entry can be
/// dropped without losing the rest of its page or batch.
pub trait VideoPlatform {
    /// Resolve a channel to its uploads collection. `None` when the channel
    /// does not exist.
    fn uploads_playlist_id(&self, channel_id: &str) -> Result<Option<String>>;

    /// Fetch one page (at most `page_size` entries) of a collection.
    fn list_playlist_page(
        &self,
        playlist_id: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<PlaylistPage>;

    /// Fetch snippet and statistics for at most `STATS_BATCH_SIZE` ids.
    fn video_items(&self, video_ids: &[String]) -> Result<Vec<Value>>;
}

/// Extract the latest statistics for up to `max_results` of a channel's uploads.
pub fn fetch_channel_stats(
    platform: &dyn VideoPlatform,
    channel_id: &str,
    max_results: usize,
) -> Result<VideoSnapshot> {
    let video_ids = list_channel_videos(platform, channel_id, max_results)?;
    fetch_video_stats(platform, &video_ids)
}

/// Collect up to `max_results` distinct video ids from the channel's uploads.
///
/// Stops when enough ids are collected or the listing has no continuation
/// token, whichever comes first. A page with no items that still carries a
/// token is a malformed response and fails the listing.
pub fn list_channel_videos(
    platform: &dyn VideoPlatform,
    channel_id: &str,
    max_results: usize,
) -> Result<Vec<String>> {
    let playlist_id = platform
        .uploads_playlist_id(channel_id)?
        .ok_or_else(|| EtlError::NotFound(channel_id.to_string()))?;

    let mut video_ids = Vec::new();
    let mut seen = HashSet::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    while video_ids.len() < max_results {
        let page_size = PAGE_SIZE.min(max_results - video_ids.len());
        let page = platform.list_playlist_page(&playlist_id, page_size, page_token.as_deref())?;
        pages += 1;

        let next = page.next_page_token.filter(|t| !t.is_empty());

        if page.items.is_empty() && next.is_some() {
            return Err(EtlError::ExternalService(format!(
                "Uploads listing for {channel_id} returned an empty page with a continuation token after {} id(s)",
                video_ids.len()
            )));
        }

        for item in &page.items {
            if video_ids.len() >= max_results {
                break;
            }
            match item.pointer("/contentDetails/videoId").and_then(Value::as_str) {
                Some(id) if !id.is_empty() => {
                    if seen.insert(id.to_string()) {
                        video_ids.push(id.to_string());
                    }
                }
                _ => warn!("Skipping uploads entry without a video id: {}", item),
            }
        }

        match next {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    debug!(
        "Collected {} video ids for {} in {} listing call(s)",
        video_ids.len(),
        channel_id,
        pages
    );
    Ok(video_ids)
}

/// Fetch statistics for the given ids in batches of `STATS_BATCH_SIZE`.
///
/// Batches are requested and concatenated in order. A malformed item is
/// dropped with a warning; a failed request aborts the whole extraction.
pub fn fetch_video_stats(platform: &dyn VideoPlatform, video_ids: &[String]) -> Result<VideoSnapshot> {
    let mut snapshot = VideoSnapshot::new();
    let mut skipped = 0usize;

    for batch in video_ids.chunks(STATS_BATCH_SIZE) {
        let items = platform.video_items(batch)?;
        for item in &items {
            match parse_video_item(item) {
                Ok(record) => snapshot.merge(record),
                Err(reason) => {
                    skipped += 1;
                    warn!("Skipping malformed video item: {}", reason);
                }
            }
        }
    }

    if snapshot.len() < video_ids.len() {
        warn!(
            "Kept {} of {} requested videos ({} malformed, rest not returned)",
            snapshot.len(),
            video_ids.len(),
            skipped
        );
    }
    Ok(snapshot)
}

/// Build a record from one statistics item. Missing counters are zero.
pub fn parse_video_item(item: &Value) -> std::result::Result<VideoRecord, String> {
    let video_id = item
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing id in {item}"))?;

    let title = item
        .pointer("/snippet/title")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("{video_id}: missing snippet.title"))?;

    let published_raw = item
        .pointer("/snippet/publishedAt")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("{video_id}: missing snippet.publishedAt"))?;
    let published_at = DateTime::parse_from_rfc3339(published_raw)
        .map_err(|e| format!("{video_id}: bad publishedAt {published_raw:?}: {e}"))?;

    let stats = item.get("statistics");
    let count = |field: &str| -> std::result::Result<u64, String> {
        match stats.and_then(|s| s.get(field)) {
            None | Some(Value::Null) => Ok(0),
            Some(Value::String(s)) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("{video_id}: non-numeric {field} {s:?}")),
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| format!("{video_id}: non-numeric {field} {n}")),
            Some(other) => Err(format!("{video_id}: non-numeric {field} {other}")),
        }
    };

    Ok(VideoRecord {
        video_id: video_id.to_string(),
        title: title.to_string(),
        published_at,
        views: count("viewCount")?,
        likes: count("likeCount")?,
        comments: count("commentCount")?,
    })
}


#[cfg(test)]
mod tests {
    use super::fake::{video_json, FakePlatform};
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn unknown_channel_is_not_found() {
        let fake = FakePlatform::with_videos(3);
        let err = fetch_channel_stats(&fake, "UC_missing", 10).unwrap_err();
        assert!(matches!(err, EtlError::NotFound(ref id) if id == "UC_missing"));
    }

    #[test]
    fn pagination_stops_at_max_results() {
        let fake = FakePlatform::with_videos(200);
        let ids = list_channel_videos(&fake, "UC_test", 120).unwrap();

        assert_eq!(ids.len(), 120);
        assert_eq!(*fake.listing_calls.borrow(), vec![50, 50, 20]);
        assert_eq!(ids[0], "vid000");
        assert_eq!(ids[119], "vid119");
    }

    #[test]
    fn pagination_stops_when_collection_is_exhausted() {
        let fake = FakePlatform::with_videos(30);
        let ids = list_channel_videos(&fake, "UC_test", 100).unwrap();

        assert_eq!(ids.len(), 30);
        assert_eq!(fake.listing_calls.borrow().len(), 1);
    }

    #[test]
    fn listing_calls_stay_within_ceiling() {
        for (available, max) in [(0, 20), (49, 50), (50, 50), (51, 50), (101, 150), (500, 101)] {
            let fake = FakePlatform::with_videos(available);
            let ids = list_channel_videos(&fake, "UC_test", max).unwrap();
            assert_eq!(ids.len(), available.min(max));
            assert!(fake.listing_calls.borrow().len() <= max.div_ceil(PAGE_SIZE).max(1));
        }
    }

    /// Serves fixed listing pages; tokens are page indexes.
    struct ScriptedListing {
        pages: Vec<(Vec<&'static str>, Option<&'static str>)>,
        calls: Cell<usize>,
    }

    impl VideoPlatform for ScriptedListing {
        fn uploads_playlist_id(&self, _channel_id: &str) -> Result<Option<String>> {
            Ok(Some("UU".to_string()))
        }

        fn list_playlist_page(
            &self,
            _playlist_id: &str,
            _page_size: usize,
            page_token: Option<&str>,
        ) -> Result<PlaylistPage> {
            self.calls.set(self.calls.get() + 1);
            let index: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
            let (ids, next) = &self.pages[index];
            Ok(PlaylistPage {
                items: ids
                    .iter()
                    .map(|id| json!({ "contentDetails": { "videoId": id } }))
                    .collect(),
                next_page_token: next.map(str::to_string),
            })
        }

        fn video_items(&self, _video_ids: &[String]) -> Result<Vec<Value>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn empty_page_with_token_is_an_error() {
        let listing = ScriptedListing {
            pages: vec![
                (vec!["a", "b"], Some("1")),
                (vec![], Some("2")),
                (vec!["c", "d"], None),
            ],
            calls: Cell::new(0),
        };

        let err = list_channel_videos(&listing, "UC", 10).unwrap_err();
        assert!(matches!(err, EtlError::ExternalService(_)));
        assert!(err.is_retryable());
        assert_eq!(listing.calls.get(), 2);
    }

    #[test]
    fn empty_last_page_without_token_is_exhaustion() {
        let listing = ScriptedListing {
            pages: vec![(vec!["a", "b"], Some("1")), (vec![], None)],
            calls: Cell::new(0),
        };

        let ids = list_channel_videos(&listing, "UC", 10).unwrap();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn statistics_are_fetched_in_independent_batches() {
        let fake = FakePlatform::with_videos(120);
        let snapshot = fetch_channel_stats(&fake, "UC_test", 120).unwrap();

        assert_eq!(snapshot.len(), 120);
        assert_eq!(*fake.stats_calls.borrow(), vec![50, 50, 20]);
        let ids: Vec<&str> = snapshot.records().iter().map(|r| r.video_id.as_str()).collect();
        assert_eq!(ids[0], "vid000");
        assert_eq!(ids[50], "vid050");
        assert_eq!(ids[119], "vid119");
    }

    #[test]
    fn empty_id_list_yields_empty_snapshot() {
        let fake = FakePlatform::default();
        let snapshot = fetch_video_stats(&fake, &[]).unwrap();
        assert!(snapshot.is_empty());
        assert!(fake.stats_calls.borrow().is_empty());
    }

    #[test]
    fn malformed_item_is_skipped_without_failing_batch() {
        let mut fake = FakePlatform::with_videos(3);
        fake.items.insert(
            "vid001".to_string(),
            json!({ "id": "vid001", "snippet": { "title": "No date" } }),
        );

        let snapshot = fetch_channel_stats(&fake, "UC_test", 3).unwrap();
        let ids: Vec<&str> = snapshot.records().iter().map(|r| r.video_id.as_str()).collect();
        assert_eq!(ids, vec!["vid000", "vid002"]);
    }

    #[test]
    fn ids_missing_from_statistics_are_left_out() {
        let mut fake = FakePlatform::with_videos(3);
        fake.items.remove("vid002");

        let snapshot = fetch_channel_stats(&fake, "UC_test", 3).unwrap();
        let ids: Vec<&str> = snapshot.records().iter().map(|r| r.video_id.as_str()).collect();
        assert_eq!(ids, vec!["vid000", "vid001"]);
    }

    #[test]
    fn failed_batch_aborts_extraction() {
        let fake = FakePlatform::with_videos(80);
        fake.stats_failures.set(1);

        let err = fetch_channel_stats(&fake, "UC_test", 80).unwrap_err();
        assert!(matches!(err, EtlError::ExternalService(_)));
    }

    #[test]
    fn missing_statistics_default_to_zero() {
        let item = json!({
            "id": "abc",
            "snippet": { "title": "Comments off", "publishedAt": "2024-02-03T04:05:06Z" },
            "statistics": { "viewCount": "42" }
        });
        let record = parse_video_item(&item).unwrap();
        assert_eq!((record.views, record.likes, record.comments), (42, 0, 0));

        let no_stats = json!({
            "id": "def",
            "snippet": { "title": "Private stats", "publishedAt": "2024-02-03T04:05:06Z" }
        });
        let record = parse_video_item(&no_stats).unwrap();
        assert_eq!((record.views, record.likes, record.comments), (0, 0, 0));
    }

    #[test]
    fn non_numeric_statistic_is_malformed() {
        let mut item = video_json("abc", "Title", "2024-02-03T04:05:06Z", 10);
        item["statistics"]["likeCount"] = json!("lots");
        assert!(parse_video_item(&item).is_err());
    }

    #[test]
    fn published_at_keeps_its_offset() {
        let item = video_json("abc", "Title", "2024-02-03T23:30:00-05:00", 10);
        let record = parse_video_item(&item).unwrap();
        assert_eq!(record.published_at.offset().local_minus_utc(), -5 * 3600);
    }
}
