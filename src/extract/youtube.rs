use serde_json::Value;
use tracing::debug;

use crate::error::{EtlError, Result};
use crate::extract::{PlaylistPage, VideoPlatform};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// YouTube Data API v3 client authenticated with an API key.
pub struct YouTubeClient {
    api_key: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl YouTubeClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            api_key,
            base_url,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        // The key travels in the query string; strip URLs from errors so it
        // never reaches logs.
        let resp = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .send()
            .map_err(|e| {
                EtlError::ExternalService(format!("Failed to GET {path}: {}", e.without_url()))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(EtlError::ExternalService(format!(
                "YouTube API returned {status} for {path}: {}",
                api_error_message(&text)
            )));
        }

        resp.json().map_err(|e| {
            EtlError::ExternalService(format!(
                "Failed to parse YouTube response for {path}: {}",
                e.without_url()
            ))
        })
    }
}

impl VideoPlatform for YouTubeClient {
    fn uploads_playlist_id(&self, channel_id: &str) -> Result<Option<String>> {
        let json = self.get_json(
            "/channels",
            &[("part", "contentDetails"), ("id", channel_id)],
        )?;

        // An unknown channel comes back as 200 with no `items`.
        let Some(first) = json
            .get("items")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
        else {
            return Ok(None);
        };

        first
            .pointer("/contentDetails/relatedPlaylists/uploads")
            .and_then(Value::as_str)
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| {
                EtlError::ExternalService(format!(
                    "Channel {channel_id} response has no uploads playlist"
                ))
            })
    }

    fn list_playlist_page(
        &self,
        playlist_id: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<PlaylistPage> {
        let max_results = page_size.to_string();
        let mut query = vec![
            ("part", "contentDetails"),
            ("playlistId", playlist_id),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let json = self.get_json("/playlistItems", &query)?;
        parse_playlist_page(&json)
    }

    fn video_items(&self, video_ids: &[String]) -> Result<Vec<Value>> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = video_ids.join(",");
        let json = self.get_json("/videos", &[("part", "snippet,statistics"), ("id", ids.as_str())])?;
        items_array(&json, "videos")
    }
}

fn parse_playlist_page(json: &Value) -> Result<PlaylistPage> {
    Ok(PlaylistPage {
        items: items_array(json, "playlistItems")?,
        next_page_token: json
            .get("nextPageToken")
            .and_then(Value::as_str)
            .map(|s| s.to_string()),
    })
}

fn items_array(json: &Value, endpoint: &str) -> Result<Vec<Value>> {
    json.get("items")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| {
            EtlError::ExternalService(format!(
                "Unexpected response structure from {endpoint}: no items array"
            ))
        })
}

/// Pull `error.message` out of a Google API error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| body.trim().to_string())
}
