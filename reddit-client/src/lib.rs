pub mod api;
pub mod auth;


pub use api::RedditApiClient;
pub use auth::{RedditToken, ScriptAuth, ScriptCredentials};

use snoofeed_core::{
    ConfigError, CoreError, HarvestConfig, Item, Page, PostSource, Subscription,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Authenticated Reddit client serving as the harvester's upstream source.
pub struct RedditClient {
    api: RedditApiClient,
    auth: ScriptAuth,
    token: Mutex<Option<RedditToken>>,
}

impl RedditClient {
    pub fn new(api: RedditApiClient, auth: ScriptAuth) -> Self {
        Self {
            api,
            auth,
            token: Mutex::new(None),
        }
    }

    pub fn from_config(config: &HarvestConfig) -> Result<Self, CoreError> {
        let reddit = &config.reddit;
        let credentials = ScriptCredentials {
            client_id: reddit.client_id.clone(),
            client_secret: reddit
                .client_secret
                .clone()
                .ok_or_else(|| missing("reddit.client_secret"))?,
            username: reddit.username.clone(),
            password: reddit
                .password
                .clone()
                .ok_or_else(|| missing("reddit.password"))?,
        };

        let api = RedditApiClient::new(config.user_agent())?;
        let auth = ScriptAuth::new(credentials)?;
        Ok(Self::new(api, auth))
    }

    /// Current access token, requesting a fresh one when missing or expired.
    async fn access_token(&self) -> Result<String, CoreError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|token| !token.is_expired()) {
            return Ok(token.access_token.clone());
        }

        debug!("No valid token cached, authenticating");
        let token = self.auth.request_token().await?;
        let access_token = token.access_token.clone();
        *guard = Some(token);
        Ok(access_token)
    }
}

impl PostSource for RedditClient {
    async fn list_new(&self, before: Option<&str>, limit: u32) -> Result<Page, CoreError> {
        let access_token = self.access_token().await?;
        let listing = self.api.get_new_posts(&access_token, before, limit).await?;

        let is_last = listing.data.before.is_none();
        let items = listing
            .data
            .children
            .into_iter()
            .map(|child| Item::try_from(child.data))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page { items, is_last })
    }

    async fn list_subscriptions(&self, limit: u32) -> Result<Vec<Subscription>, CoreError> {
        let access_token = self.access_token().await?;
        let mut subscriptions = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let listing = self
                .api
                .get_user_subreddits(&access_token, limit, after.as_deref())
                .await?;
            subscriptions.extend(
                listing
                    .data
                    .children
                    .into_iter()
                    .map(|child| Subscription::from(child.data)),
            );

            match listing.data.after {
                Some(next) => after = Some(next),
                None => break,
            }
        }

        info!("Loaded {} subscriptions", subscriptions.len());
        Ok(subscriptions)
    }
}

fn missing(field: &str) -> CoreError {
    CoreError::Config(ConfigError::MissingField {
        field: field.to_string(),
    })
}
