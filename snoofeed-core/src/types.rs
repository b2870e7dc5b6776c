use serde::{Deserialize, Serialize};

/// One upstream submission, as harvested and persisted in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Fullname (`t3_…`), used as the pagination cursor and dedup key.
    pub id: String,
    pub created_utc: i64,
    pub subreddit: String,
    pub score: i64,
    pub num_comments: u64,
    pub url: String,
    pub permalink: String,
    pub is_self: bool,
    pub title: String,
    /// Raw markdown body, only kept for self posts.
    #[serde(default)]
    pub selftext: Option<String>,
    /// Rendered body as raw HTML (listings are requested with `raw_json=1`).
    #[serde(default)]
    pub selftext_html: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub media: Option<MediaEmbed>,
    #[serde(default)]
    pub preview: Vec<PreviewImage>,
    #[serde(default)]
    pub gallery: Vec<ImageSource>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaEmbed {
    pub provider: Option<String>,
    pub html: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
}

impl MediaEmbed {
    pub fn is_empty(&self) -> bool {
        self.html.is_none() && self.thumbnail_url.is_none() && self.video_url.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewImage {
    pub source: ImageSource,
    #[serde(default)]
    pub resolutions: Vec<ImageSource>,
}

impl PreviewImage {
    /// Widest rendition among the source and its resolutions.
    pub fn largest(&self) -> &ImageSource {
        self.resolutions
            .iter()
            .fold(&self.source, |best, candidate| {
                if candidate.width > best.width {
                    candidate
                } else {
                    best
                }
            })
    }
}

/// A subscribed community and its size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub subreddit: String,
    pub subscribers: u64,
}

/// One page of the `/new` listing, newest first.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Item>,
    /// The listing reported that no further page exists past this one.
    pub is_last: bool,
}

/// Everything carried between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub posts: Vec<Item>,
}
