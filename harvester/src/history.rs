use chrono::{DateTime, Utc};
use feed_renderer::{render_feed, Channel};
use snoofeed_core::{CoreError, Item, PersistedState};
use std::collections::HashMap;
use std::path::PathBuf;
use storage::{write_atomic, StateStore};
use tracing::{debug, info};

/// Merge a run's batch into the persisted history.
///
/// Items are deduplicated by id with the most recently fetched copy winning,
/// stably sorted by creation time and trimmed from the oldest end down to
/// `max_items`.
pub fn merge_history(history: Vec<Item>, batch: Vec<Item>, max_items: usize) -> Vec<Item> {
    let combined: Vec<Item> = history.into_iter().chain(batch).collect();

    let mut last_seen: HashMap<&str, usize> = HashMap::with_capacity(combined.len());
    for (index, item) in combined.iter().enumerate() {
        last_seen.insert(item.id.as_str(), index);
    }
    let keep: Vec<bool> = combined
        .iter()
        .enumerate()
        .map(|(index, item)| last_seen.get(item.id.as_str()) == Some(&index))
        .collect();

    let mut merged: Vec<Item> = combined
        .into_iter()
        .zip(keep)
        .filter_map(|(item, keep)| keep.then_some(item))
        .collect();
    merged.sort_by_key(|item| item.created_utc);

    if merged.len() > max_items {
        let excess = merged.len() - max_items;
        merged.drain(..excess);
    }
    merged
}

/// Owns the persisted `{ cursor, posts }` record and the feed artifact.
pub struct HistoryStore<St> {
    store: St,
    feed_path: PathBuf,
    max_items: usize,
    channel: Channel,
}

impl<St: StateStore> HistoryStore<St> {
    pub fn new(store: St, feed_path: impl Into<PathBuf>, max_items: usize) -> Self {
        Self {
            store,
            feed_path: feed_path.into(),
            max_items,
            channel: Channel::default(),
        }
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    pub async fn load(&self) -> Result<PersistedState, CoreError> {
        self.store.load().await
    }

    /// Merge, persist history and cursor together, then re-render the feed
    /// from the persisted history.
    pub async fn commit(
        &self,
        previous: Vec<Item>,
        batch: Vec<Item>,
        cursor: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PersistedState, CoreError> {
        let batch_size = batch.len();
        let state = PersistedState {
            cursor,
            posts: merge_history(previous, batch, self.max_items),
        };
        self.store.save(&state).await?;
        debug!(
            cursor = ?state.cursor,
            batch_size,
            history_len = state.posts.len(),
            "History persisted"
        );

        let feed = render_feed(&state.posts, &self.channel, now);
        write_atomic(&self.feed_path, feed.as_bytes()).await?;
        info!(
            "Feed written to {} ({} posts)",
            self.feed_path.display(),
            state.posts.len()
        );

        Ok(state)
    }
}
