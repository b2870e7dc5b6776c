use crate::{CoreError, Page, Subscription};

/// Paginated upstream listing consumed by the harvester.
pub trait PostSource {
    /// Items preceding `before` in the `/new` listing, newest first. May be
    /// shorter than `limit`, including empty.
    async fn list_new(&self, before: Option<&str>, limit: u32) -> Result<Page, CoreError>;

    /// All subscribed communities with their subscriber counts.
    async fn list_subscriptions(&self, limit: u32) -> Result<Vec<Subscription>, CoreError>;
}
