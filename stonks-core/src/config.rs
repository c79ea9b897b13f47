//! Run settings and Reddit credentials.
//!
//! Settings come from an optional TOML file and fall back to defaults when the
//! file is absent. Credentials are resolved from the process environment first
//! and from a YAML file second.

use crate::{ConfigError, CoreError};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SETTINGS_PATH_ENV: &str = "STONKS_CONFIG";
pub const DEFAULT_SETTINGS_PATH: &str = "stonks.toml";

pub const ENV_CLIENT_ID: &str = "REDDIT_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "REDDIT_CLIENT_SECRET";
pub const ENV_REDIRECT_URL: &str = "REDDIT_REDIRECT_URL";
pub const ENV_USER_AGENT: &str = "REDDIT_USER_AGENT";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub subreddits: Vec<String>,
    pub number_of_posts: u32,
    pub number_of_days: u32,
    pub tickers_path: PathBuf,
    pub foreign_tickers_path: PathBuf,
    pub output_path: PathBuf,
    pub credentials_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            subreddits: vec!["wallstreetbets".to_string(), "wallstreetbetsnew".to_string()],
            number_of_posts: 2000,
            number_of_days: 1,
            tickers_path: PathBuf::from("data/tickers.txt"),
            foreign_tickers_path: PathBuf::from("data/EU_tickers.txt"),
            output_path: PathBuf::from("output/mentions.csv"),
            credentials_path: PathBuf::from("creds.yaml"),
        }
    }
}

impl Settings {
    /// Path of the settings file: `$STONKS_CONFIG` or `stonks.toml`.
    pub fn default_path() -> PathBuf {
        std::env::var(SETTINGS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SETTINGS_PATH))
    }

    /// Loads settings from `path`, or returns the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            info!(
                "No settings file at {}, using defaults",
                path.display()
            );
            let settings = Self::default();
            settings.validate()?;
            return Ok(settings);
        }

        let raw = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&raw)?;
        debug!("Loaded settings from {}: {:?}", path.display(), settings);
        Ok(settings)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CoreError> {
        let settings: Settings = toml::from_str(raw).map_err(ConfigError::from)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subreddits.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "subreddits".to_string(),
                value: "[]".to_string(),
            });
        }
        if let Some(blank) = self.subreddits.iter().find(|s| s.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "subreddits".to_string(),
                value: format!("{:?}", blank),
            });
        }
        if self.number_of_posts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "number_of_posts".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// The four values needed to open a Reddit session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub user_agent: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct CredentialsFile {
    #[serde(rename = "REDDIT_CLIENT_ID")]
    client_id: Option<String>,
    #[serde(rename = "REDDIT_CLIENT_SECRET")]
    client_secret: Option<String>,
    #[serde(rename = "REDDIT_REDIRECT_URL")]
    redirect_url: Option<String>,
    #[serde(rename = "REDDIT_USER_AGENT")]
    user_agent: Option<String>,
}

impl Credentials {
    /// Resolves credentials from the process environment, then `creds_path`.
    pub fn resolve(creds_path: &Path) -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok(), creds_path)
    }

    /// Same as [`Credentials::resolve`] with an injected environment lookup.
    pub fn from_lookup<F>(lookup: F, creds_path: &Path) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = if lookup(ENV_CLIENT_ID).is_some() {
            debug!("Reading Reddit credentials from environment");
            CredentialsFile {
                client_id: lookup(ENV_CLIENT_ID),
                client_secret: Some(require_env(&lookup, ENV_CLIENT_SECRET)?),
                redirect_url: Some(require_env(&lookup, ENV_REDIRECT_URL)?),
                user_agent: Some(require_env(&lookup, ENV_USER_AGENT)?),
            }
        } else if creds_path.exists() {
            debug!("Reading Reddit credentials from {}", creds_path.display());
            let raw = std::fs::read_to_string(creds_path)?;
            if raw.trim().is_empty() {
                CredentialsFile::default()
            } else {
                serde_yaml::from_str(&raw).map_err(ConfigError::from)?
            }
        } else {
            CredentialsFile::default()
        };

        let client_id = file
            .client_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: format!(
                    "{} (credentials not found; create a Reddit app at \
                     https://www.reddit.com/prefs/apps and put {}, {}, {}, {} \
                     either in environment variables or in {})",
                    ENV_CLIENT_ID,
                    ENV_CLIENT_ID,
                    ENV_CLIENT_SECRET,
                    ENV_REDIRECT_URL,
                    ENV_USER_AGENT,
                    creds_path.display()
                ),
            })?;

        Ok(Self {
            client_id,
            client_secret: require_field(file.client_secret, ENV_CLIENT_SECRET)?,
            redirect_url: require_field(file.redirect_url, ENV_REDIRECT_URL)?,
            user_agent: require_field(file.user_agent, ENV_USER_AGENT)?,
        })
    }
}

fn require_env<F>(lookup: &F, var_name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var_name).ok_or_else(|| ConfigError::MissingEnvironmentVariable {
        var_name: var_name.to_string(),
    })
}

fn require_field(value: Option<String>, field: &str) -> Result<String, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingField {
        field: field.to_string(),
    })
}
