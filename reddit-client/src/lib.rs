pub mod api;
pub mod rate_limiter;

#[cfg(test)]
mod tests;

use api::{RedditApiClient, MAX_PAGE_SIZE};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use stonks_core::{
    CommentNode, ConfigError, ContentSource, CoreError, Credentials, Post, RedditApiError,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);
// Renew slightly before Reddit would reject the token.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RedditOAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub user_agent: String,
}

impl RedditOAuth2Config {
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        user_agent: String,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            user_agent,
        }
    }
}

impl From<&Credentials> for RedditOAuth2Config {
    fn from(creds: &Credentials) -> Self {
        Self::new(
            creds.client_id.clone(),
            creds.client_secret.clone(),
            creds.redirect_url.clone(),
            creds.user_agent.clone(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() + TOKEN_EXPIRY_MARGIN >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub enum AuthState {
    NotAuthenticated,
    Authenticated { expires_at: SystemTime },
    TokenExpired { expired_at: SystemTime },
}

/// A read-only Reddit session using application-only OAuth.
///
/// The client never issues mutating calls; the only scope requested is `read`.
#[derive(Debug)]
pub struct RedditClient {
    oauth_client: BasicClient,
    api: RedditApiClient,
    token: Mutex<Option<RedditToken>>,
}

impl RedditClient {
    pub fn new(config: RedditOAuth2Config) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(|e| {
            CoreError::Internal {
                message: format!("Invalid Reddit authorize URL: {}", e),
            }
        })?;
        let token_url = TokenUrl::new(REDDIT_TOKEN_URL.to_string()).map_err(|e| {
            CoreError::Internal {
                message: format!("Invalid Reddit token URL: {}", e),
            }
        })?;
        let redirect_url = RedirectUrl::new(config.redirect_uri.clone()).map_err(|_| {
            ConfigError::InvalidValue {
                field: "REDDIT_REDIRECT_URL".to_string(),
                value: config.redirect_uri.clone(),
            }
        })?;

        let oauth_client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        )
        .set_redirect_uri(redirect_url);

        Ok(Self {
            oauth_client,
            api: RedditApiClient::new(config.user_agent)?,
            token: Mutex::new(None),
        })
    }

    /// Builds the client and obtains its first access token.
    pub async fn connect(config: RedditOAuth2Config) -> Result<Self, CoreError> {
        let client = Self::new(config)?;
        client.authenticate().await?;
        Ok(client)
    }

    pub fn get_required_scopes() -> Vec<&'static str> {
        vec!["read"]
    }

    /// Runs the client-credentials grant and stores the resulting token.
    pub async fn authenticate(&self) -> Result<(), CoreError> {
        let mut request = self.oauth_client.exchange_client_credentials();
        for scope in Self::get_required_scopes() {
            request = request.add_scope(Scope::new(scope.to_string()));
        }

        let http_client = self.api.http_client();
        let response = request
            .request_async(|req| token_http_client(http_client, req))
            .await
            .map_err(|e| {
                CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    reason: e.to_string(),
                })
            })?;

        let lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let token = RedditToken {
            access_token: response.access_token().secret().clone(),
            expires_at: SystemTime::now() + lifetime,
            scope: response
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.as_str().to_owned()).collect())
                .unwrap_or_default(),
        };

        info!(
            "Authenticated with Reddit (read-only), token valid for {:?}",
            lifetime
        );
        self.set_token(token).await;
        Ok(())
    }

    pub async fn set_token(&self, token: RedditToken) {
        *self.token.lock().await = Some(token);
    }

    pub async fn get_auth_state(&self) -> AuthState {
        match self.token.lock().await.as_ref() {
            None => AuthState::NotAuthenticated,
            Some(token) if token.is_expired() => AuthState::TokenExpired {
                expired_at: token.expires_at,
            },
            Some(token) => AuthState::Authenticated {
                expires_at: token.expires_at,
            },
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        matches!(self.get_auth_state().await, AuthState::Authenticated { .. })
    }

    /// Returns a usable access token, renewing it when it has expired.
    pub async fn ensure_authenticated(&self) -> Result<String, CoreError> {
        match self.get_auth_state().await {
            AuthState::Authenticated { .. } => {}
            AuthState::NotAuthenticated => {
                return Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    reason: "Not authenticated; call connect() first".to_string(),
                }));
            }
            AuthState::TokenExpired { .. } => {
                debug!("Access token expired, requesting a new one");
                self.authenticate().await?;
            }
        }

        self.token
            .lock()
            .await
            .as_ref()
            .map(|token| token.access_token.clone())
            .ok_or_else(|| CoreError::RedditApi(RedditApiError::InvalidToken))
    }

    pub fn api(&self) -> &RedditApiClient {
        &self.api
    }

    /// Newest posts of a subreddit, newest first, following `after` cursors
    /// until `limit` posts were collected or the listing ends.
    pub async fn fetch_new_posts(
        &self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<Post>, CoreError> {
        let mut posts: Vec<Post> = Vec::with_capacity(limit.min(1000) as usize);
        let mut after: Option<String> = None;

        while posts.len() < limit as usize {
            let token = self.ensure_authenticated().await?;
            let wanted = (limit as usize - posts.len()).min(MAX_PAGE_SIZE as usize) as u32;
            let listing = self
                .api
                .get_new_posts(&token, subreddit, wanted, after.as_deref())
                .await?;

            let page_len = listing.data.children.len();
            for child in listing.data.children {
                posts.push(Post::try_from(child.data)?);
            }
            debug!(
                "r/{}: page of {} posts ({} collected, limit {})",
                subreddit,
                page_len,
                posts.len(),
                limit
            );

            after = listing.data.after;
            if page_len == 0 || after.is_none() {
                break;
            }
        }

        posts.truncate(limit as usize);
        info!("Retrieved {} posts from r/{}", posts.len(), subreddit);
        Ok(posts)
    }

    pub async fn fetch_comments(&self, post_id: &str) -> Result<Vec<CommentNode>, CoreError> {
        let token = self.ensure_authenticated().await?;
        let listing = self.api.get_post_comments(&token, post_id).await?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(CommentNode::from)
            .collect())
    }
}

#[async_trait::async_trait]
impl ContentSource for RedditClient {
    async fn newest_posts(&self, forum: &str, limit: u32) -> Result<Vec<Post>, CoreError> {
        self.fetch_new_posts(forum, limit).await
    }

    async fn comment_tree(&self, post: &Post) -> Result<Vec<CommentNode>, CoreError> {
        self.fetch_comments(&post.id).await
    }
}

/// Sends the token request through our own HTTP client so it carries the
/// configured user agent, which Reddit requires on every call.
async fn token_http_client(
    client: &reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = client
        .request(request.method, request.url)
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}
