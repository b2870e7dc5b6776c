//! Canned listings for exercising code that talks to a [`PostSource`].
//!
//! Compiled only with the `test-support` feature.

use crate::{CoreError, Item, Page, PostSource, Subscription};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// A popular link post with a distinct url.
pub fn item(id: &str, created_utc: i64, subreddit: &str) -> Item {
    post(id, created_utc, subreddit, 1_000, 100)
}

pub fn post(id: &str, created_utc: i64, subreddit: &str, score: i64, comments: u64) -> Item {
    Item {
        id: id.to_string(),
        created_utc,
        subreddit: subreddit.to_string(),
        score,
        num_comments: comments,
        url: format!("https://example.com/{}", id),
        permalink: format!("/r/{}/comments/{}/", subreddit, id),
        is_self: false,
        title: format!("Post {}", id),
        selftext: None,
        selftext_html: None,
        thumbnail: None,
        media: None,
        preview: Vec::new(),
        gallery: Vec::new(),
    }
}

/// Newest-first page built from `(id, created_utc)` pairs given oldest first.
pub fn page(entries: &[(&str, i64)], is_last: bool) -> Page {
    page_of(
        entries
            .iter()
            .map(|(id, created)| item(id, *created, "rust"))
            .collect(),
        is_last,
    )
}

/// Newest-first page from items given oldest first.
pub fn page_of(mut items: Vec<Item>, is_last: bool) -> Page {
    items.reverse();
    Page { items, is_last }
}

/// Replays canned pages and records every cursor it was asked for. Once the
/// script runs out every further request gets an empty page.
pub struct ScriptedSource {
    pages: Mutex<VecDeque<Result<Page, CoreError>>>,
    requested: Mutex<Vec<Option<String>>>,
    subscriptions: Vec<Subscription>,
}

impl ScriptedSource {
    pub fn new(pages: Vec<Page>) -> Self {
        Self::from_results(pages.into_iter().map(Ok).collect())
    }

    /// Script that may also fail partway through.
    pub fn from_results(pages: Vec<Result<Page, CoreError>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            requested: Mutex::new(Vec::new()),
            subscriptions: vec![Subscription {
                subreddit: "rust".to_string(),
                subscribers: 5_000,
            }],
        }
    }

    pub fn with_subscriptions(mut self, subscriptions: &[(&str, u64)]) -> Self {
        self.subscriptions = subscriptions
            .iter()
            .map(|(subreddit, subscribers)| Subscription {
                subreddit: subreddit.to_string(),
                subscribers: *subscribers,
            })
            .collect();
        self
    }

    pub fn requested(&self) -> Vec<Option<String>> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PostSource for ScriptedSource {
    async fn list_new(&self, before: Option<&str>, _limit: u32) -> Result<Page, CoreError> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(before.map(str::to_string));
        self.pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Ok(Page::default()))
    }

    async fn list_subscriptions(&self, _limit: u32) -> Result<Vec<Subscription>, CoreError> {
        Ok(self.subscriptions.clone())
    }
}
