//! Extract a channel's video statistics from YouTube, derive content
//! recommendations from them, and upsert the latest numbers into SQLite.

pub mod analyze;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
