use crate::db::models::VideoRecord;

/// `(likes + comments) / views`, with zero views counted as one.
pub fn engagement_score(record: &VideoRecord) -> f64 {
    let interactions = record.likes.saturating_add(record.comments) as f64;
    interactions / record.views.max(1) as f64
}

/// The `n` highest-scoring records; equal scores keep snapshot order.
pub fn most_engaging(records: &[VideoRecord], n: usize) -> Vec<&VideoRecord> {
    let mut scored: Vec<(f64, &VideoRecord)> =
        records.iter().map(|r| (engagement_score(r), r)).collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(n).map(|(_, r)| r).collect()
}
