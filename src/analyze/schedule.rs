use chrono::{Datelike, Timelike, Weekday};

use super::most_frequent;
use crate::db::models::VideoRecord;

/// Most common publish weekdays, as full English names.
pub fn best_days(records: &[&VideoRecord], n: usize) -> Vec<String> {
    most_frequent(records.iter().map(|r| r.published_at.weekday()), n)
        .into_iter()
        .map(|d| weekday_name(d).to_string())
        .collect()
}

/// Most common publish hours, in each record's own offset.
pub fn best_hours(records: &[&VideoRecord], n: usize) -> Vec<u32> {
    most_frequent(records.iter().map(|r| r.published_at.hour()), n)
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
