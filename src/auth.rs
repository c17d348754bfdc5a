//! Service account authentication for the Google Drive API.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::{DriveError, Result};
use crate::models::{ServiceAccountCredentials, TokenResponse};

/// Default Google OAuth2 token endpoint, used when the key file carries none.
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Google Drive API scope.
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Lifetime requested for each JWT assertion.
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// Refresh the cached token this long before it actually expires.
const EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// JWT claims for the service-account assertion.
#[derive(Debug, Serialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    exp: u64,
    iat: u64,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: SystemTime,
}

/// Authenticator exchanging a service-account key for OAuth2 access tokens.
///
/// Tokens are cached in-process and refreshed shortly before expiry, so the
/// long-lived request path only pays for a read lock.
#[derive(Clone)]
pub struct Authenticator {
    credentials: Arc<ServiceAccountCredentials>,
    client: Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl Authenticator {
    /// Create an authenticator from a service account JSON key file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let credentials: ServiceAccountCredentials = serde_json::from_str(&content)?;
        Ok(Self::new(credentials))
    }

    /// Create an authenticator from already-parsed credentials.
    pub fn new(credentials: ServiceAccountCredentials) -> Self {
        Self {
            credentials: Arc::new(credentials),
            client: Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Create an authenticator that always yields `token` without any
    /// network round trip. Intended for tests against mock servers.
    pub fn fixed(token: impl Into<String>) -> Self {
        let cached = CachedToken {
            access_token: token.into(),
            expires_at: SystemTime::now() + Duration::from_secs(u32::MAX as u64),
        };
        Self {
            credentials: Arc::new(ServiceAccountCredentials {
                client_email: String::new(),
                private_key: String::new(),
                token_uri: None,
            }),
            client: Client::new(),
            cached_token: Arc::new(RwLock::new(Some(cached))),
        }
    }

    /// Get a valid access token, refreshing it if necessary.
    pub async fn access_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > SystemTime::now() + EXPIRY_BUFFER {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let new_token = self.refresh_token().await?;
        let access_token = new_token.access_token.clone();
        *self.cached_token.write().await = Some(new_token);
        Ok(access_token)
    }

    fn token_uri(&self) -> &str {
        self.credentials
            .token_uri
            .as_deref()
            .unwrap_or(DEFAULT_TOKEN_URI)
    }

    /// Exchange a freshly signed JWT assertion for an access token.
    async fn refresh_token(&self) -> Result<CachedToken> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let claims = Claims {
            iss: self.credentials.client_email.clone(),
            scope: DRIVE_SCOPE.to_string(),
            aud: self.token_uri().to_string(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let header = Header::new(Algorithm::RS256);
        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())?;
        let assertion = encode(&header, &claims, &key)?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", &assertion),
        ];

        let response = self
            .client
            .post(self.token_uri())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::TokenRefresh(format!(
                "Status {}: {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response.json().await?;
        let expires_at = SystemTime::now() + Duration::from_secs(token_response.expires_in);

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_serialize_with_scope_and_audience() {
        let claims = Claims {
            iss: "svc@project.iam.gserviceaccount.com".to_string(),
            scope: DRIVE_SCOPE.to_string(),
            aud: DEFAULT_TOKEN_URI.to_string(),
            iat: 1234567890,
            exp: 1234571490,
        };

        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains("svc@project.iam.gserviceaccount.com"));
        assert!(json.contains(DRIVE_SCOPE));
        assert!(json.contains(DEFAULT_TOKEN_URI));
    }

    #[test]
    fn token_uri_falls_back_to_default() {
        let auth = Authenticator::new(ServiceAccountCredentials {
            client_email: "svc@project.iam.gserviceaccount.com".to_string(),
            private_key: "key".to_string(),
            token_uri: None,
        });
        assert_eq!(auth.token_uri(), DEFAULT_TOKEN_URI);

        let auth = Authenticator::new(ServiceAccountCredentials {
            client_email: "svc@project.iam.gserviceaccount.com".to_string(),
            private_key: "key".to_string(),
            token_uri: Some("https://example.test/token".to_string()),
        });
        assert_eq!(auth.token_uri(), "https://example.test/token");
    }

    #[tokio::test]
    async fn fixed_authenticator_returns_its_token() {
        let auth = Authenticator::fixed("test-token");
        assert_eq!(auth.access_token().await.unwrap(), "test-token");
    }
}
