use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use snoofeed_core::{
    CoreError, ImageSource, Item, MediaEmbed, PreviewImage, RedditApiError, Subscription,
};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

/// Thumbnail values Reddit uses as placeholders instead of a URL.
const PLACEHOLDER_THUMBNAILS: &[&str] = &["self", "default", "nsfw", "spoiler", "image", ""];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub selftext_html: Option<String>,
    pub subreddit: String,
    pub url: String,
    pub permalink: String,
    pub created_utc: f64,
    pub score: i64,
    pub num_comments: i64,
    pub is_self: bool,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub media: Option<RedditMedia>,
    #[serde(default)]
    pub secure_media: Option<RedditMedia>,
    #[serde(default)]
    pub preview: Option<RedditPreview>,
    #[serde(default)]
    pub media_metadata: Option<HashMap<String, RedditMediaMetadata>>,
    #[serde(default)]
    pub gallery_data: Option<RedditGalleryData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedditMedia {
    #[serde(default)]
    pub oembed: Option<RedditOembed>,
    #[serde(default)]
    pub reddit_video: Option<RedditVideo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedditOembed {
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedditVideo {
    #[serde(default)]
    pub fallback_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedditPreview {
    #[serde(default)]
    pub images: Vec<RedditPreviewImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPreviewImage {
    pub source: RedditImage,
    #[serde(default)]
    pub resolutions: Vec<RedditImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedditMediaMetadata {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub s: Option<RedditMediaSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedditMediaSource {
    #[serde(default)]
    pub u: Option<String>,
    #[serde(default)]
    pub gif: Option<String>,
    #[serde(default)]
    pub x: u32,
    #[serde(default)]
    pub y: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedditGalleryData {
    #[serde(default)]
    pub items: Vec<RedditGalleryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditGalleryItem {
    pub media_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditSubredditData {
    pub display_name: String,
    #[serde(default)]
    pub subscribers: Option<u64>,
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            user_agent,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", REDDIT_API_BASE, endpoint);

        let request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token)
            .query(query_params);

        debug!("Making Reddit API request: {} {} {:?}", method, endpoint, query_params);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        let api_error = match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!("Rate limited, retry after {} seconds", retry_after);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            StatusCode::UNAUTHORIZED => RedditApiError::InvalidToken,
            StatusCode::FORBIDDEN => RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            },
            StatusCode::NOT_FOUND => RedditApiError::InvalidResponse {
                details: "Resource not found".to_string(),
            },
            s if s.is_server_error() => RedditApiError::ServerError {
                status_code: s.as_u16(),
            },
            s => RedditApiError::InvalidResponse {
                details: format!("Unexpected status {} for {}", s, endpoint),
            },
        };
        Err(CoreError::RedditApi(api_error))
    }

    /// One page of the front-page `/new` listing preceding `before`.
    pub async fn get_new_posts(
        &self,
        access_token: &str,
        before: Option<&str>,
        limit: u32,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let limit_str = limit.to_string();
        let mut params = vec![("limit", limit_str.as_str()), ("raw_json", "1")];
        if let Some(before_val) = before {
            params.push(("before", before_val));
        }

        let response = self
            .make_request(Method::GET, "/new", access_token, &params)
            .await?;

        let listing: RedditListing<RedditPostData> = response.json().await.map_err(|e| {
            error!("Failed to parse new posts: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse /new listing: {}", e),
            })
        })?;
        validate_listing(&listing, "t3")?;

        info!(
            "Retrieved {} new posts (before: {:?})",
            listing.data.children.len(),
            before
        );
        Ok(listing)
    }

    pub async fn get_user_subreddits(
        &self,
        access_token: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<RedditListing<RedditSubredditData>, CoreError> {
        let endpoint = "/subreddits/mine/subscriber";
        let limit_str = limit.to_string();
        let mut params = vec![("limit", limit_str.as_str())];
        if let Some(after_val) = after {
            params.push(("after", after_val));
        }

        let response = self
            .make_request(Method::GET, endpoint, access_token, &params)
            .await?;

        let listing: RedditListing<RedditSubredditData> = response.json().await.map_err(|e| {
            error!("Failed to parse user subreddits: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: "Failed to parse user subreddits".to_string(),
            })
        })?;
        validate_listing(&listing, "t5")?;

        debug!("Retrieved {} user subreddits", listing.data.children.len());
        Ok(listing)
    }
}

/// Reject payloads that are not a listing of `child_kind` things.
pub fn validate_listing<T>(listing: &RedditListing<T>, child_kind: &str) -> Result<(), CoreError> {
    if listing.kind != "Listing" {
        return Err(invalid_response(format!(
            "expected a Listing, got {}",
            listing.kind
        )));
    }
    if let Some(child) = listing.data.children.iter().find(|c| c.kind != child_kind) {
        return Err(invalid_response(format!(
            "expected {} children, got {}",
            child_kind, child.kind
        )));
    }
    Ok(())
}

fn invalid_response(details: String) -> CoreError {
    CoreError::RedditApi(RedditApiError::InvalidResponse { details })
}

impl TryFrom<RedditPostData> for Item {
    type Error = CoreError;

    fn try_from(post_data: RedditPostData) -> Result<Self, Self::Error> {
        if !post_data.name.starts_with("t3_") {
            return Err(invalid_response(format!(
                "post fullname {} is not a link",
                post_data.name
            )));
        }
        if !post_data.created_utc.is_finite() || post_data.created_utc < 0.0 {
            return Err(invalid_response(format!(
                "post {} has invalid created_utc {}",
                post_data.name, post_data.created_utc
            )));
        }
        let num_comments = u64::try_from(post_data.num_comments).map_err(|_| {
            invalid_response(format!(
                "post {} has negative comment count",
                post_data.name
            ))
        })?;

        let gallery = gallery_images(
            post_data.media_metadata.as_ref(),
            post_data.gallery_data.as_ref(),
        );
        let media = post_data
            .secure_media
            .or(post_data.media)
            .map(media_embed)
            .filter(|embed| !embed.is_empty());
        let preview = post_data
            .preview
            .map(|p| p.images.into_iter().map(preview_image).collect())
            .unwrap_or_default();

        Ok(Self {
            id: post_data.name,
            created_utc: post_data.created_utc as i64,
            subreddit: post_data.subreddit,
            score: post_data.score,
            num_comments,
            url: post_data.url,
            permalink: post_data.permalink,
            is_self: post_data.is_self,
            title: post_data.title,
            selftext: if post_data.is_self && !post_data.selftext.is_empty() {
                Some(post_data.selftext)
            } else {
                None
            },
            selftext_html: post_data.selftext_html.filter(|html| !html.is_empty()),
            thumbnail: post_data
                .thumbnail
                .filter(|t| !PLACEHOLDER_THUMBNAILS.contains(&t.as_str()) && t.starts_with("http")),
            media,
            preview,
            gallery,
        })
    }
}

impl From<RedditSubredditData> for Subscription {
    fn from(data: RedditSubredditData) -> Self {
        Self {
            subreddit: data.display_name,
            subscribers: data.subscribers.unwrap_or(0),
        }
    }
}

fn media_embed(media: RedditMedia) -> MediaEmbed {
    let oembed = media.oembed.unwrap_or_default();
    MediaEmbed {
        provider: oembed.provider_name,
        html: oembed.html,
        thumbnail_url: oembed.thumbnail_url,
        video_url: media.reddit_video.and_then(|v| v.fallback_url),
    }
}

fn image_source(image: RedditImage) -> ImageSource {
    ImageSource {
        url: decode_amp(&image.url),
        width: image.width,
        height: image.height,
    }
}

fn preview_image(image: RedditPreviewImage) -> PreviewImage {
    PreviewImage {
        source: image_source(image.source),
        resolutions: image.resolutions.into_iter().map(image_source).collect(),
    }
}

fn gallery_images(
    metadata: Option<&HashMap<String, RedditMediaMetadata>>,
    gallery: Option<&RedditGalleryData>,
) -> Vec<ImageSource> {
    let Some(metadata) = metadata else {
        return Vec::new();
    };

    // gallery_data carries the display order; fall back to key order
    let ids: Vec<&String> = match gallery {
        Some(g) if !g.items.is_empty() => g.items.iter().map(|i| &i.media_id).collect(),
        _ => {
            let mut keys: Vec<&String> = metadata.keys().collect();
            keys.sort();
            keys
        }
    };

    ids.into_iter()
        .filter_map(|id| metadata.get(id))
        .filter(|m| m.status.as_deref().map_or(true, |s| s == "valid"))
        .filter_map(|m| m.s.as_ref())
        .filter_map(|s| {
            s.u.as_ref().or(s.gif.as_ref()).map(|url| ImageSource {
                url: decode_amp(url),
                width: s.x,
                height: s.y,
            })
        })
        .collect()
}

/// Listings fetched without `raw_json` escape `&` in URLs.
fn decode_amp(url: &str) -> String {
    url.replace("&amp;", "&")
}
