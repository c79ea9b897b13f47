use crate::error::*;
use tracing::{debug, error};

/// Operator-facing view of an error: a stable code and a one-line message.
pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> &'static str;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        match self {
            CoreError::RedditApi(e) => {
                e.log_error();
            }
            CoreError::Config(e) => {
                e.log_error();
            }
            other => error!("{} ({})", other, other.error_code()),
        }
        self
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Io(e) => format!("Reading or writing a local file failed: {}", e),
            CoreError::Network(_) => {
                "Could not reach Reddit. Check the network connection and run again.".to_string()
            }
            CoreError::Matcher(_) => {
                "The ticker lists could not be compiled into a matcher. Check the reference files."
                    .to_string()
            }
            CoreError::Internal { message } => format!("The run was stopped: {}", message),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            CoreError::RedditApi(_) => "REDDIT_API",
            CoreError::Config(_) => "CONFIG",
            CoreError::Io(_) => "IO",
            CoreError::Network(_) => "NETWORK",
            CoreError::Matcher(_) => "MATCHER",
            CoreError::Internal { .. } => "INTERNAL",
        }
    }
}

impl ErrorExt for RedditApiError {
    fn log_error(&self) -> &Self {
        error!("Reddit request failed: {} ({})", self, self.error_code());
        self
    }

    fn user_friendly_message(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } | RedditApiError::InvalidToken => {
                "Reddit rejected the app credentials. Check creds.yaml or the REDDIT_* variables."
                    .to_string()
            }
            RedditApiError::RateLimitExceeded { retry_after } => format!(
                "Reddit rate limit reached. Wait {} seconds before the next run.",
                retry_after
            ),
            RedditApiError::Forbidden { resource } => {
                format!("Reddit refused access to {}.", resource)
            }
            RedditApiError::SubredditNotFound { subreddit } => {
                format!("Subreddit '{}' does not exist or is private.", subreddit)
            }
            RedditApiError::PostNotFound { post_id } => {
                format!("Post '{}' disappeared while it was being read.", post_id)
            }
            RedditApiError::RequestTimeout => "Reddit did not answer in time.".to_string(),
            RedditApiError::InvalidResponse { .. } | RedditApiError::ServerError { .. } => {
                "Reddit returned an unexpected response. Try again later.".to_string()
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            RedditApiError::AuthenticationFailed { .. } => "REDDIT_AUTH_FAILED",
            RedditApiError::RateLimitExceeded { .. } => "REDDIT_RATE_LIMIT",
            RedditApiError::Forbidden { .. } => "REDDIT_FORBIDDEN",
            RedditApiError::SubredditNotFound { .. } => "REDDIT_SUBREDDIT_NOT_FOUND",
            RedditApiError::PostNotFound { .. } => "REDDIT_POST_NOT_FOUND",
            RedditApiError::InvalidToken => "REDDIT_INVALID_TOKEN",
            RedditApiError::RequestTimeout => "REDDIT_TIMEOUT",
            RedditApiError::InvalidResponse { .. } => "REDDIT_INVALID_RESPONSE",
            RedditApiError::ServerError { .. } => "REDDIT_SERVER_ERROR",
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("Startup check failed: {} ({})", self, self.error_code());
        self
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => format!("Required file '{}' not found.", path),
            ConfigError::MissingField { field } => format!("'{}' is missing or empty.", field),
            ConfigError::InvalidValue { field, value } => {
                format!("'{}' is not a valid value for {}.", value, field)
            }
            ConfigError::MissingEnvironmentVariable { var_name } => {
                format!("Environment variable '{}' must be set.", var_name)
            }
            ConfigError::Parse(_) => "Settings file could not be parsed as TOML.".to_string(),
            ConfigError::Yaml(_) => "Credentials file could not be parsed as YAML.".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND",
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD",
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR",
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR",
            ConfigError::Yaml(_) => "CONFIG_YAML_ERROR",
        }
    }
}

/// Turns a failed run into log records and the line printed to the operator.
#[derive(Debug, Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    /// Logs `error` and returns `[CODE] message` for stderr.
    pub fn report_error(&self, error: &CoreError) -> String {
        error.log_error();
        debug!("Failure details: {:?}", error);
        format!("[{}] {}", error.error_code(), error.user_friendly_message())
    }
}
