#[cfg(test)]
mod tests {
    use crate::{AuthState, RedditClient, RedditOAuth2Config, RedditToken};
    use stonks_core::{ConfigError, CoreError, Credentials, RedditApiError};
    use std::time::{Duration, SystemTime};

    fn create_test_config() -> RedditOAuth2Config {
        RedditOAuth2Config::new(
            "test_client_id".to_string(),
            "test_client_secret".to_string(),
            "http://localhost:8080/callback".to_string(),
            "stonks-bot/0.1 by test_user".to_string(),
        )
    }

    fn token_expiring_at(expires_at: SystemTime) -> RedditToken {
        RedditToken {
            access_token: "token".to_string(),
            expires_at,
            scope: vec!["read".to_string()],
        }
    }

    #[test]
    fn test_config_creation() {
        let config = create_test_config();
        assert_eq!(config.client_id, "test_client_id");
        assert_eq!(config.client_secret, "test_client_secret");
        assert_eq!(config.redirect_uri, "http://localhost:8080/callback");
        assert_eq!(config.user_agent, "stonks-bot/0.1 by test_user");
    }

    #[test]
    fn test_config_from_credentials() {
        let creds = Credentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            redirect_url: "http://localhost:8080".to_string(),
            user_agent: "ua".to_string(),
        };
        let config = RedditOAuth2Config::from(&creds);
        assert_eq!(config.client_id, "id");
        assert_eq!(config.redirect_uri, "http://localhost:8080");
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = RedditClient::new(create_test_config()).unwrap();
        assert!(!client.is_authenticated().await);
        assert!(matches!(
            client.get_auth_state().await,
            AuthState::NotAuthenticated
        ));
    }

    #[test]
    fn test_invalid_redirect_url_is_config_error() {
        let mut config = create_test_config();
        config.redirect_uri = "not a url".to_string();
        let result = RedditClient::new(config);
        assert!(matches!(
            result,
            Err(CoreError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_required_scopes_are_read_only() {
        assert_eq!(RedditClient::get_required_scopes(), vec!["read"]);
    }

    #[tokio::test]
    async fn test_token_states() {
        let client = RedditClient::new(create_test_config()).unwrap();

        client
            .set_token(token_expiring_at(SystemTime::now() + Duration::from_secs(3600)))
            .await;
        assert!(client.is_authenticated().await);

        client
            .set_token(token_expiring_at(SystemTime::now() - Duration::from_secs(10)))
            .await;
        assert!(!client.is_authenticated().await);
        assert!(matches!(
            client.get_auth_state().await,
            AuthState::TokenExpired { .. }
        ));
    }

    #[test]
    fn test_token_near_expiry_counts_as_expired() {
        let token = token_expiring_at(SystemTime::now() + Duration::from_secs(5));
        assert!(token.is_expired());
    }

    #[test]
    fn test_ensure_authenticated_requires_connect() {
        let client = RedditClient::new(create_test_config()).unwrap();
        let result = tokio_test::block_on(client.ensure_authenticated());
        if let Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })) = result {
            assert!(reason.contains("Not authenticated"));
        } else {
            panic!("Expected AuthenticationFailed error");
        }
    }

    #[tokio::test]
    async fn test_ensure_authenticated_returns_current_token() {
        let client = RedditClient::new(create_test_config()).unwrap();
        client
            .set_token(token_expiring_at(SystemTime::now() + Duration::from_secs(3600)))
            .await;
        assert_eq!(client.ensure_authenticated().await.unwrap(), "token");
    }

    #[test]
    fn test_token_serialization() {
        let token = RedditToken {
            access_token: "test_access_token".to_string(),
            expires_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1640995200),
            scope: vec!["read".to_string()],
        };

        let serialized = serde_json::to_string(&token).unwrap();
        assert!(serialized.contains("test_access_token"));

        let deserialized: RedditToken = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized.access_token, token.access_token);
        assert_eq!(deserialized.scope, token.scope);
        assert_eq!(deserialized.expires_at, token.expires_at);
    }

    #[tokio::test]
    async fn test_api_client_shares_user_agent() {
        let client = RedditClient::new(create_test_config()).unwrap();
        assert_eq!(client.api().user_agent(), "stonks-bot/0.1 by test_user");

        let status = client.api().rate_limiter().get_rate_limit_status().await;
        assert_eq!(status.requests_made, 0);
    }
}
