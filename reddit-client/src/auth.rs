use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, ResourceOwnerPassword, ResourceOwnerUsername, Scope,
    TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use snoofeed_core::{CoreError, RedditApiError};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info};

const AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Tokens are refreshed this long before Reddit would reject them.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Reddit issues script tokens for one hour.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() + EXPIRY_MARGIN >= self.expires_at
    }
}

/// Credentials of a Reddit "script" application.
#[derive(Debug, Clone)]
pub struct ScriptCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

/// Password-grant authenticator for script applications.
pub struct ScriptAuth {
    oauth_client: BasicClient,
    username: ResourceOwnerUsername,
    password: ResourceOwnerPassword,
}

impl ScriptAuth {
    pub fn new(credentials: ScriptCredentials) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(AUTH_URL.to_string()).map_err(auth_failed)?;
        let token_url = TokenUrl::new(TOKEN_URL.to_string()).map_err(auth_failed)?;

        let oauth_client = BasicClient::new(
            ClientId::new(credentials.client_id),
            Some(ClientSecret::new(credentials.client_secret)),
            auth_url,
            Some(token_url),
        );

        Ok(Self {
            oauth_client,
            username: ResourceOwnerUsername::new(credentials.username),
            password: ResourceOwnerPassword::new(credentials.password),
        })
    }

    pub fn required_scopes() -> Vec<&'static str> {
        vec!["identity", "read", "mysubreddits"]
    }

    pub async fn request_token(&self) -> Result<RedditToken, CoreError> {
        debug!("Requesting script token for {}", self.username.as_str());

        let response = self
            .oauth_client
            .exchange_password(&self.username, &self.password)
            .add_scopes(
                Self::required_scopes()
                    .into_iter()
                    .map(|s| Scope::new(s.to_string())),
            )
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                error!("Token request failed: {}", e);
                auth_failed(e)
            })?;

        let lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let scope = response
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();

        info!("Authenticated as {}", self.username.as_str());
        Ok(RedditToken {
            access_token: response.access_token().secret().clone(),
            expires_at: SystemTime::now() + lifetime,
            scope,
        })
    }
}

fn auth_failed(e: impl std::fmt::Display) -> CoreError {
    CoreError::RedditApi(RedditApiError::AuthenticationFailed {
        reason: e.to_string(),
    })
}
