use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use chrono::{TimeZone, Utc};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use stonks_core::{CommentNode, CoreError, Post, RedditApiError};
use tracing::{debug, error, warn};

pub(crate) const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<C> {
    pub kind: String,
    pub data: RedditListingData<C>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<C> {
    pub children: Vec<C>,
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

pub type PostListing = RedditListing<RedditListingChild<RedditPostData>>;
pub type CommentListing = RedditListing<RedditCommentThing>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    pub subreddit: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub num_comments: u32,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub stickied: bool,
    /// Set by Reddit when the authenticated account has already opened the post.
    #[serde(default)]
    pub clicked: bool,
}

/// An entry of a comment listing: a loaded comment or a "load more" stub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum RedditCommentThing {
    #[serde(rename = "t1")]
    Comment(RedditCommentData),
    #[serde(rename = "more")]
    More(RedditMoreData),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub replies: RedditReplies,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditMoreData {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub children: Vec<String>,
}

/// Reddit sends `""` instead of an empty listing when a comment has no replies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RedditReplies {
    Listing(Box<CommentListing>),
    Empty(String),
    #[default]
    Absent,
}

impl RedditReplies {
    pub fn into_nodes(self) -> Vec<CommentNode> {
        match self {
            RedditReplies::Listing(listing) => listing
                .data
                .children
                .into_iter()
                .map(CommentNode::from)
                .collect(),
            RedditReplies::Empty(_) | RedditReplies::Absent => Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: RateLimiter,
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
            rate_limiter: RateLimiter::new(RateLimitConfig::reddit_oauth()),
            user_agent,
        })
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Sends one request and returns the response whatever its status.
    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", REDDIT_API_BASE, endpoint);
        let start_time = Instant::now();

        let permit = self.rate_limiter.acquire_permit().await;
        if !permit.queue_wait_time.is_zero() {
            debug!(
                "Waited {:?} for rate limit window before {} {}",
                permit.queue_wait_time, method, endpoint
            );
        }

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token)
            .header("User-Agent", &self.user_agent);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }

        debug!("Making Reddit API request: {} {}", method, endpoint);
        let response = request_builder.send().await.map_err(|e| {
            error!("Network error for {} {}: {}", method, endpoint, e);
            if e.is_timeout() {
                CoreError::RedditApi(RedditApiError::RequestTimeout)
            } else {
                CoreError::Network(e)
            }
        })?;

        self.rate_limiter.update_from_headers(response.headers()).await;
        debug!(
            "{} {} answered {} in {:?}",
            method,
            endpoint,
            response.status(),
            start_time.elapsed()
        );

        Ok(response)
    }

    pub async fn get_new_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<PostListing, CoreError> {
        let endpoint = format!("/r/{}/new", subreddit);
        let limit_str = limit.min(MAX_PAGE_SIZE).to_string();
        let mut params = vec![("limit", limit_str.as_str()), ("raw_json", "1")];
        if let Some(after_val) = after {
            params.push(("after", after_val));
        }

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(params.as_slice()))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CoreError::RedditApi(RedditApiError::SubredditNotFound {
                subreddit: subreddit.to_string(),
            }));
        }
        let response = check_status(response, &endpoint)?;

        let listing: PostListing = response.json().await.map_err(|e| {
            error!("Failed to parse subreddit posts: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse posts for r/{}", subreddit),
            })
        })?;

        debug!(
            "Retrieved {} posts from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing)
    }

    pub async fn get_post_comments(
        &self,
        access_token: &str,
        post_id: &str,
    ) -> Result<CommentListing, CoreError> {
        let endpoint = format!("/comments/{}", post_id);
        let params = [("raw_json", "1")];

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(&params[..]))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CoreError::RedditApi(RedditApiError::PostNotFound {
                post_id: post_id.to_string(),
            }));
        }
        let response = check_status(response, &endpoint)?;

        // The body is a pair: the post itself, then its comment listing.
        let (_post, comments): (IgnoredAny, CommentListing) =
            response.json().await.map_err(|e| {
                error!("Failed to parse comments: {}", e);
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("Failed to parse comments for post {}", post_id),
                })
            })?;

        Ok(comments)
    }
}

fn check_status(response: Response, endpoint: &str) -> Result<Response, CoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    error!("Request failed with status: {} for {}", status, endpoint);
    let error = match status.as_u16() {
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(60);
            warn!("Rate limited, retry after {} seconds", retry_after);
            RedditApiError::RateLimitExceeded { retry_after }
        }
        401 => RedditApiError::InvalidToken,
        403 => RedditApiError::Forbidden {
            resource: endpoint.to_string(),
        },
        404 => RedditApiError::InvalidResponse {
            details: format!("Resource not found: {}", endpoint),
        },
        code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
        code => RedditApiError::InvalidResponse {
            details: format!("Unexpected status {} for {}", code, endpoint),
        },
    };
    Err(CoreError::RedditApi(error))
}

impl TryFrom<RedditPostData> for Post {
    type Error = CoreError;

    fn try_from(post_data: RedditPostData) -> Result<Self, Self::Error> {
        let created_utc = Utc
            .timestamp_opt(post_data.created_utc.trunc() as i64, 0)
            .single()
            .ok_or_else(|| {
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!(
                        "Post {} has an invalid creation time {}",
                        post_data.id, post_data.created_utc
                    ),
                })
            })?;

        Ok(Self {
            id: post_data.id,
            title: post_data.title,
            subreddit: post_data.subreddit,
            created_utc,
            seen: post_data.clicked,
            num_comments: post_data.num_comments,
        })
    }
}

impl From<RedditCommentThing> for CommentNode {
    fn from(thing: RedditCommentThing) -> Self {
        match thing {
            RedditCommentThing::Comment(data) => {
                CommentNode::comment(data.body, data.replies.into_nodes())
            }
            RedditCommentThing::More(more) => CommentNode::More { count: more.count },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_client_creation() {
        let client = RedditApiClient::new("test-user-agent/1.0".to_string()).unwrap();
        assert_eq!(client.user_agent(), "test-user-agent/1.0");
    }

    #[test]
    fn test_reddit_post_conversion() {
        let post_data = RedditPostData {
            id: "test123".to_string(),
            title: "Buy GME now".to_string(),
            subreddit: "wallstreetbets".to_string(),
            author: "test_user".to_string(),
            permalink: "/r/wallstreetbets/comments/test123".to_string(),
            created_utc: 1640995200.0,
            num_comments: 5,
            score: 42,
            stickied: false,
            clicked: true,
        };

        let post = Post::try_from(post_data).unwrap();
        assert_eq!(post.id, "test123");
        assert_eq!(post.title, "Buy GME now");
        assert_eq!(post.created_utc.timestamp(), 1640995200);
        assert!(post.seen);
    }

    #[test]
    fn test_post_listing_parsing() {
        let raw = r#"{
            "kind": "Listing",
            "data": {
                "after": "t3_def",
                "before": null,
                "dist": 2,
                "modhash": "",
                "children": [
                    {"kind": "t3", "data": {"id": "abc", "title": "AMC to the moon",
                        "subreddit": "wallstreetbets", "created_utc": 1640995200.0,
                        "num_comments": 3, "clicked": false, "ups": 10}},
                    {"kind": "t3", "data": {"id": "def", "title": "nothing here",
                        "subreddit": "wallstreetbets", "created_utc": 1640995100.0}}
                ]
            }
        }"#;

        let listing: PostListing = serde_json::from_str(raw).unwrap();
        assert_eq!(listing.data.after.as_deref(), Some("t3_def"));
        assert_eq!(listing.data.children.len(), 2);
        assert!(!listing.data.children[1].data.clicked);
        assert_eq!(listing.data.children[1].data.num_comments, 0);
    }

    #[test]
    fn test_comment_pair_parsing() {
        let raw = r#"[
            {"kind": "Listing", "data": {"children": [{"kind": "t3", "data": {"id": "abc"}}]}},
            {"kind": "Listing", "data": {"after": null, "children": [
                {"kind": "t1", "data": {"id": "c1", "body": "GME", "replies": {
                    "kind": "Listing", "data": {"children": [
                        {"kind": "t1", "data": {"id": "c2", "body": "AMC", "replies": ""}},
                        {"kind": "more", "data": {"count": 4, "children": ["c9"]}}
                    ]}
                }}},
                {"kind": "t1", "data": {"id": "c3", "body": "TSLA", "replies": ""}},
                {"kind": "more", "data": {"count": 120, "children": ["c4", "c5"]}}
            ]}}
        ]"#;

        let (_post, comments): (IgnoredAny, CommentListing) = serde_json::from_str(raw).unwrap();
        let nodes: Vec<CommentNode> = comments
            .data
            .children
            .into_iter()
            .map(CommentNode::from)
            .collect();

        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].body(), Some("GME"));
        assert_eq!(nodes[0].replies().len(), 2);
        assert_eq!(nodes[0].replies()[0].body(), Some("AMC"));
        assert!(nodes[0].replies()[1].is_expandable());
        assert!(nodes[1].replies().is_empty());
        assert!(matches!(nodes[2], CommentNode::More { count: 120 }));
    }
}
