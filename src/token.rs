//!
//! src/token.rs  Oct 19th, 2026
//!
//! App-level bearer tokens for platforms that use the oauth2
//! client_credentials grant. Each platform owns one provider; refreshes
//! are serialized so concurrent lookups share a single token request.
//!

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::TrackError;
use crate::fetch::{send_json, TokenClient};

const DEFAULT_EXPIRES_IN: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Usable when more than `margin` remains before expiry. A margin
    /// reaching past the start of time leaves nothing usable.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        self.expires_at
            .checked_sub_signed(margin)
            .is_some_and(|deadline| now < deadline)
    }
}

/// Token endpoint response body
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default = "bearer_type")]
    pub token_type: String,
    pub expires_in: Option<i64>,
}

fn bearer_type() -> String { "Bearer".to_string() }

impl TokenGrant {
    pub fn into_token(self, issued_at: DateTime<Utc>) -> Result<AccessToken, TrackError> {
        let ttl = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN).max(0);
        let expires_at = chrono::Duration::try_seconds(ttl)
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .ok_or_else(|| TrackError::AuthFailure(
                format!("token response: expires_in {ttl} out of range")
            ))?;
        Ok(AccessToken {
            value: self.access_token,
            token_type: self.token_type,
            expires_at,
        })
    }
}

/// Where fresh grants come from
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self) -> Result<TokenGrant, TrackError>;
}

/// Production source: basic-auth POST to the platform's token endpoint
pub struct ClientCredentials {
    client: TokenClient,
}

impl ClientCredentials {
    pub fn new(client: TokenClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenSource for ClientCredentials {
    async fn fetch(&self) -> Result<TokenGrant, TrackError> {
        let body = send_json(self.client.token_request())
            .await
            .map_err(|e| TrackError::AuthFailure(format!("token request: {e}")))?;

        let grant: TokenGrant = serde_json::from_value(body)
            .map_err(|e| TrackError::AuthFailure(format!("token response: {e}")))?;
        if grant.access_token.trim().is_empty() {
            return Err(TrackError::AuthFailure("token response: empty access_token".into()));
        }
        Ok(grant)
    }
}

pub struct TokenProvider {
    name: &'static str,
    source: Arc<dyn TokenSource>,
    margin: chrono::Duration,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    pub fn new(name: &'static str, source: Arc<dyn TokenSource>, margin: Duration) -> Self {
        let margin = chrono::Duration::from_std(margin)
            .unwrap_or(chrono::Duration::MAX);
        Self { name, source, margin, cached: Mutex::new(None) }
    }

    pub async fn bearer(&self) -> Result<AccessToken, TrackError> {
        self.bearer_at(Utc::now()).await
    }

    /// The lock is held across the refresh, so a caller that queued behind
    /// a refresh sees the new token instead of fetching its own.
    pub async fn bearer_at(&self, now: DateTime<Utc>) -> Result<AccessToken, TrackError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh_at(now, self.margin) {
                return Ok(token.clone());
            }
            debug!(provider = self.name, expires_at = %token.expires_at, "token.stale");
        }

        let grant = self.source.fetch().await?;
        let token = grant.into_token(now)?;
        info!(provider = self.name, expires_at = %token.expires_at, "token.refresh");
        *cached = Some(token.clone());
        Ok(token)
    }

    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use chrono::TimeZone;

    struct CountingSource {
        calls: AtomicUsize,
        expires_in: i64,
        delay: Duration,
    }

    impl CountingSource {
        fn new(expires_in: i64) -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), expires_in, delay: Duration::ZERO })
        }
        fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch(&self) -> Result<TokenGrant, TrackError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(TokenGrant {
                access_token: format!("token-{n}"),
                token_type: "Bearer".to_string(),
                expires_in: Some(self.expires_in),
            })
        }
    }

    struct FailingSource;

    #[async_trait]
    impl TokenSource for FailingSource {
        async fn fetch(&self) -> Result<TokenGrant, TrackError> {
            Err(TrackError::AuthFailure("bad client secret".into()))
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn reuses_until_inside_margin() {
        let source = CountingSource::new(3600);
        let provider = TokenProvider::new("test", source.clone(), Duration::from_secs(300));

        let first = provider.bearer_at(t0()).await.unwrap();
        let expiry = first.expires_at;
        assert_eq!(expiry, t0() + chrono::Duration::hours(1));

        let six_before = expiry - chrono::Duration::minutes(6);
        let reused = provider.bearer_at(six_before).await.unwrap();
        assert_eq!(reused.value, "token-1");
        assert_eq!(source.calls(), 1);

        let four_before = expiry - chrono::Duration::minutes(4);
        let refreshed = provider.bearer_at(four_before).await.unwrap();
        assert_eq!(refreshed.value, "token-2");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            expires_in: 3600,
            delay: Duration::from_millis(50),
        });
        let provider = Arc::new(
            TokenProvider::new("test", source.clone(), Duration::from_secs(300))
        );

        let mut handles = Vec::new();
        for _ in 0..8 {
            let provider = provider.clone();
            handles.push(tokio::spawn(async move { provider.bearer_at(t0()).await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().value, "token-1");
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn failures_surface_and_leave_cache_empty() {
        let provider = TokenProvider::new("test", Arc::new(FailingSource), Duration::from_secs(300));
        let err = provider.bearer_at(t0()).await.unwrap_err();
        assert_eq!(err.kind(), "auth_failure");
        assert!(provider.cached.lock().await.is_none());
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let source = CountingSource::new(3600);
        let provider = TokenProvider::new("test", source.clone(), Duration::from_secs(300));
        provider.bearer_at(t0()).await.unwrap();
        provider.invalidate().await;
        assert_eq!(provider.bearer_at(t0()).await.unwrap().value, "token-2");
    }

    #[test]
    fn missing_ttl_defaults_to_an_hour() {
        let grant: TokenGrant = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        let token = grant.into_token(t0()).unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_at, t0() + chrono::Duration::seconds(3600));
    }

    #[test]
    fn huge_margin_is_never_fresh() {
        let token = AccessToken {
            value: "abc".into(),
            token_type: "Bearer".into(),
            expires_at: t0() + chrono::Duration::hours(1),
        };
        assert!(token.is_fresh_at(t0(), chrono::Duration::minutes(5)));
        assert!(!token.is_fresh_at(t0(), chrono::Duration::MAX));
    }

    #[tokio::test]
    async fn huge_margin_refetches_instead_of_panicking() {
        let source = CountingSource::new(3600);
        let provider = TokenProvider::new("test", source.clone(), Duration::from_secs(u64::MAX));
        assert_eq!(provider.bearer_at(t0()).await.unwrap().value, "token-1");
        assert_eq!(provider.bearer_at(t0()).await.unwrap().value, "token-2");
    }

    #[tokio::test]
    async fn out_of_range_expiry_is_an_auth_failure() {
        use crate::config::{CredentialsConfig, HttpConfig};

        let mut server = mockito::Server::new_async().await;
        let m = server.mock("POST", "/v1/oauth2/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"tok","expires_in":9223372036854775807}"#)
            .create_async()
            .await;

        let cfg = CredentialsConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
            token_url: url::Url::parse(&format!("{}/v1/oauth2/token", server.url())).unwrap(),
        };
        let source = ClientCredentials::new(TokenClient::new(&HttpConfig::default(), &cfg).unwrap());
        let provider = TokenProvider::new("test", Arc::new(source), Duration::from_secs(300));

        let err = provider.bearer().await.unwrap_err();
        assert_eq!(err.kind(), "auth_failure");
        assert!(provider.cached.lock().await.is_none());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn client_credentials_posts_basic_auth_form() {
        use crate::config::{CredentialsConfig, HttpConfig};
        use mockito::Matcher;

        let mut server = mockito::Server::new_async().await;
        // "id:secret" in base64
        let m = server.mock("POST", "/v1/oauth2/token")
            .match_header("authorization", "Basic aWQ6c2VjcmV0")
            .match_body(Matcher::Exact("grant_type=client_credentials".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"tok","token_type":"Bearer","expires_in":86400}"#)
            .create_async()
            .await;

        let cfg = CredentialsConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
            token_url: url::Url::parse(&format!("{}/v1/oauth2/token", server.url())).unwrap(),
        };
        let source = ClientCredentials::new(TokenClient::new(&HttpConfig::default(), &cfg).unwrap());
        let grant = source.fetch().await.unwrap();
        assert_eq!(grant.access_token, "tok");
        assert_eq!(grant.expires_in, Some(86400));
        m.assert_async().await;
    }
}
