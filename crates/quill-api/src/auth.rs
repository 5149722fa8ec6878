use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use quill_persist::User;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ApiError;

/// Password hash stored for accounts created through Google sign-in. Never a valid bcrypt hash.
pub const GOOGLE_PASSWORD_MARKER: &str = "google-oauth";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User email
    pub sub: String,
    #[serde(rename = "type")]
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 access tokens with a fixed lifetime
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expiry: chrono::Duration,
}

impl TokenService {
    pub fn new(secret: &str, expiry_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            expiry: chrono::Duration::minutes(expiry_minutes),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.email.clone(),
            role: user.role.clone(),
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .context("failed to sign access token")
            .map_err(ApiError::from)
    }

    /// Signature and expiry check. Whether `sub` still names a user is up to the caller.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected access token");
                ApiError::invalid_token()
            })
    }
}

pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("password hashing task failed")?
        .context("failed to hash password")?;
    Ok(hashed)
}

/// `false` for a mismatch and for stored values that are not bcrypt hashes
pub async fn verify_password(password: String, password_hash: String) -> bool {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

/// Identity asserted by a verified Google ID token
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleIdentity {
    pub email: String,
    pub name: Option<String>,
}

impl GoogleIdentity {
    /// Display name, falling back to the local part of the email
    pub fn display_name(&self) -> String {
        match self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => name.to_string(),
            None => self
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: Option<String>,
    email: Option<String>,
    name: Option<String>,
}

/// Checks Google ID tokens against the `tokeninfo` endpoint
#[derive(Clone)]
pub struct GoogleVerifier {
    http_client: reqwest::Client,
    client_id: Option<String>,
    tokeninfo_url: String,
}

impl GoogleVerifier {
    pub fn new(client_id: Option<String>, tokeninfo_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            client_id,
            tokeninfo_url: tokeninfo_url.into(),
        })
    }

    pub async fn verify(&self, id_token: &str) -> Result<GoogleIdentity> {
        let client_id = self
            .client_id
            .as_deref()
            .context("GOOGLE_CLIENT_ID not set")?;

        let info: TokenInfo = self
            .http_client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .context("tokeninfo request failed")?
            .error_for_status()?
            .json()
            .await
            .context("invalid tokeninfo response")?;

        if info.aud.as_deref() != Some(client_id) {
            anyhow::bail!("token audience does not match client id");
        }
        let email = info
            .email
            .filter(|e| !e.is_empty())
            .context("token carries no email")?;

        Ok(GoogleIdentity {
            email,
            name: info.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        User {
            id: "u1".to_string(),
            email: email.to_string(),
            name: "Ada".to_string(),
            password_hash: String::new(),
            role: "admin".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let tokens = TokenService::new("secret", 60);
        let token = tokens.issue(&user("a@x.com")).unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "a@x.com");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_rejects_wrong_secret_and_expiry() {
        let token = TokenService::new("secret", 60).issue(&user("a@x.com")).unwrap();
        assert!(TokenService::new("other", 60).verify(&token).is_err());

        // well past the default validation leeway
        let expired = TokenService::new("secret", -10).issue(&user("a@x.com")).unwrap();
        assert!(TokenService::new("secret", 60).verify(&expired).is_err());

        assert!(TokenService::new("secret", 60).verify("not-a-jwt").is_err());
    }

    #[tokio::test]
    async fn test_password_hash_and_verify() {
        let hash = hash_password("pw1".to_string(), 4).await.unwrap();
        assert!(verify_password("pw1".to_string(), hash.clone()).await);
        assert!(!verify_password("pw2".to_string(), hash).await);
        assert!(!verify_password("pw1".to_string(), GOOGLE_PASSWORD_MARKER.to_string()).await);
    }

    #[test]
    fn test_display_name_fallback() {
        let named = GoogleIdentity {
            email: "ada@x.com".to_string(),
            name: Some("Ada Lovelace".to_string()),
        };
        assert_eq!(named.display_name(), "Ada Lovelace");

        let unnamed = GoogleIdentity {
            email: "ada@x.com".to_string(),
            name: None,
        };
        assert_eq!(unnamed.display_name(), "ada");
    }

    #[tokio::test]
    async fn test_google_verify_checks_audience() {
        let mut server = mockito::Server::new_async().await;
        let _good = server
            .mock("GET", "/tokeninfo")
            .match_query(mockito::Matcher::UrlEncoded("id_token".into(), "good".into()))
            .with_status(200)
            .with_body(r#"{"aud": "client-1", "email": "g@x.com", "name": "Gee"}"#)
            .create_async()
            .await;
        let _other = server
            .mock("GET", "/tokeninfo")
            .match_query(mockito::Matcher::UrlEncoded("id_token".into(), "other-app".into()))
            .with_status(200)
            .with_body(r#"{"aud": "client-2", "email": "g@x.com"}"#)
            .create_async()
            .await;

        let verifier =
            GoogleVerifier::new(Some("client-1".to_string()), format!("{}/tokeninfo", server.url()))
                .unwrap();

        let identity = verifier.verify("good").await.unwrap();
        assert_eq!(identity.email, "g@x.com");
        assert_eq!(identity.name.as_deref(), Some("Gee"));

        assert!(verifier.verify("other-app").await.is_err());
    }

    #[tokio::test]
    async fn test_google_verify_without_client_id() {
        let verifier = GoogleVerifier::new(None, "http://127.0.0.1:9/tokeninfo").unwrap();
        let err = verifier.verify("anything").await.unwrap_err();
        assert!(err.to_string().contains("GOOGLE_CLIENT_ID"));
    }
}
