//! Identity providers for bearer tokens
//!
//! A provider turns the raw bearer credential into an [`Identity`]; turning
//! that identity into a user row is the authenticator's job.

use crate::config::AuthConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// Subject used by the development provider
pub const NO_AUTH_SUBJECT: &str = "no-auth-user";

/// Who a bearer token belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The `sub` claim; doubles as the user id
    pub subject: Uuid,
    pub email: String,
    pub name: String,
}

/// Validates bearer tokens from an external identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token, failing with `Unauthorized` when it is not valid
    async fn identify(&self, bearer: &str) -> Result<Identity>;

    /// Identity for requests without credentials, if the provider has one
    fn default_identity(&self) -> Option<Identity> {
        None
    }
}

// ============================================================================
// OIDC
// ============================================================================

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Discovery {
    jwks_uri: String,
}

enum KeySource {
    /// Fetched from the issuer and cached for a TTL
    Remote { jwks_url: Option<String> },
    /// Fixed key set, never refreshed
    Static(JwkSet),
}

struct CachedKeys {
    set: JwkSet,
    fetched_at: Instant,
}

/// OpenID Connect provider validating JWTs against the issuer's JWKS
pub struct OidcProvider {
    client: reqwest::Client,
    issuer: String,
    audience: Option<String>,
    source: KeySource,
    cache_ttl: Duration,
    keys: RwLock<Option<CachedKeys>>,
}

impl OidcProvider {
    /// Create a provider that discovers and caches signing keys
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            issuer: config.issuer_url.trim_end_matches('/').to_string(),
            audience: config
                .audience
                .clone()
                .or_else(|| Some(config.client_id.clone()).filter(|id| !id.is_empty())),
            source: KeySource::Remote {
                jwks_url: config.jwks_url.clone(),
            },
            cache_ttl: Duration::from_secs(config.jwks_cache_ttl_secs),
            keys: RwLock::new(None),
        })
    }

    /// Create a provider with a fixed key set
    pub fn with_keys(issuer: impl Into<String>, audience: Option<String>, keys: JwkSet) -> Self {
        Self {
            client: reqwest::Client::new(),
            issuer: issuer.into(),
            audience,
            source: KeySource::Static(keys),
            cache_ttl: Duration::MAX,
            keys: RwLock::new(None),
        }
    }

    /// Signing key for `kid`, refreshing the key set once when it is unknown
    async fn signing_key(&self, kid: Option<&str>) -> Result<Jwk> {
        {
            let cached = self.keys.read().await;
            if let Some(cached) = cached.as_ref() {
                if cached.fetched_at.elapsed() < self.cache_ttl {
                    if let Some(jwk) = select_key(&cached.set, kid) {
                        return Ok(jwk);
                    }
                }
            }
        }

        let set = self.load_keys().await?;
        let jwk = select_key(&set, kid);
        *self.keys.write().await = Some(CachedKeys {
            set,
            fetched_at: Instant::now(),
        });

        jwk.ok_or_else(|| {
            warn!(kid = ?kid, "Bearer token signed with unknown key");
            AppError::unauthorized("Invalid bearer token")
        })
    }

    async fn load_keys(&self) -> Result<JwkSet> {
        let jwks_url = match &self.source {
            KeySource::Static(set) => return Ok(set.clone()),
            KeySource::Remote { jwks_url: Some(url) } => url.clone(),
            KeySource::Remote { jwks_url: None } => self.discover_jwks_url().await?,
        };

        debug!(url = %jwks_url, "Fetching JWKS");
        let set = self
            .client
            .get(&jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await?;
        Ok(set)
    }

    async fn discover_jwks_url(&self) -> Result<String> {
        let url = format!("{}/.well-known/openid-configuration", self.issuer);
        let discovery = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Discovery>()
            .await?;
        Ok(discovery.jwks_uri)
    }
}

fn select_key(set: &JwkSet, kid: Option<&str>) -> Option<Jwk> {
    match kid {
        Some(kid) => set.find(kid).cloned(),
        None if set.keys.len() == 1 => set.keys.first().cloned(),
        None => None,
    }
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    async fn identify(&self, bearer: &str) -> Result<Identity> {
        let invalid = |reason: String| {
            debug!(reason = %reason, "Bearer token rejected");
            AppError::unauthorized("Invalid bearer token")
        };

        let header = decode_header(bearer).map_err(|e| invalid(e.to_string()))?;
        let jwk = self.signing_key(header.kid.as_deref()).await?;
        let key = DecodingKey::from_jwk(&jwk).map_err(|e| invalid(e.to_string()))?;

        let mut validation = Validation::new(header.alg);
        if !self.issuer.is_empty() {
            validation.set_issuer(&[self.issuer.as_str()]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience.as_str()]),
            None => validation.validate_aud = false,
        }

        let claims = decode::<Claims>(bearer, &key, &validation)
            .map_err(|e| invalid(e.to_string()))?
            .claims;

        let subject = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::unauthorized("Token subject is not a valid user id"))?;
        let email = claims.email.unwrap_or_default();
        let name = claims.name.unwrap_or_else(|| email.clone());

        Ok(Identity {
            subject,
            email,
            name,
        })
    }
}

// ============================================================================
// Authentication disabled
// ============================================================================

/// Resolves every caller to one fixed development user
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthProvider;

impl NoAuthProvider {
    pub fn identity() -> Identity {
        Identity {
            subject: Uuid::new_v5(&Uuid::NAMESPACE_OID, NO_AUTH_SUBJECT.as_bytes()),
            email: "noauth@localhost".to_string(),
            name: "No Auth User".to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for NoAuthProvider {
    async fn identify(&self, _bearer: &str) -> Result<Identity> {
        Ok(Self::identity())
    }

    fn default_identity(&self) -> Option<Identity> {
        Some(Self::identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use serde_json::json;

    const ISSUER: &str = "https://issuer.test";
    const SECRET: &[u8] = b"secret-key-for-carbonserver-tests";

    fn keys() -> JwkSet {
        serde_json::from_value(json!({
            "keys": [{
                "kty": "oct",
                "kid": "k1",
                "alg": "HS256",
                "k": "c2VjcmV0LWtleS1mb3ItY2FyYm9uc2VydmVyLXRlc3Rz"
            }]
        }))
        .unwrap()
    }

    fn sign(claims: serde_json::Value, kid: &str) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(kid.to_string());
        encode(&header, &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn exp() -> i64 {
        chrono::Utc::now().timestamp() + 600
    }

    #[tokio::test]
    async fn test_valid_token_yields_identity() {
        let provider = OidcProvider::with_keys(ISSUER, None, keys());
        let sub = Uuid::new_v4();
        let token = sign(
            json!({"sub": sub, "email": "ada@example.org", "name": "Ada", "iss": ISSUER, "exp": exp()}),
            "k1",
        );
        let identity = provider.identify(&token).await.unwrap();
        assert_eq!(identity.subject, sub);
        assert_eq!(identity.name, "Ada");
        assert_eq!(identity.email, "ada@example.org");
    }

    #[tokio::test]
    async fn test_name_falls_back_to_email() {
        let provider = OidcProvider::with_keys(ISSUER, None, keys());
        let token = sign(
            json!({"sub": Uuid::new_v4(), "email": "bob@example.org", "iss": ISSUER, "exp": exp()}),
            "k1",
        );
        assert_eq!(provider.identify(&token).await.unwrap().name, "bob@example.org");
    }

    #[tokio::test]
    async fn test_rejections_are_unauthorized() {
        let provider = OidcProvider::with_keys(ISSUER, Some("carbonserver".into()), keys());
        let sub = Uuid::new_v4();
        let cases = vec![
            // wrong issuer
            sign(json!({"sub": sub, "iss": "https://evil.test", "aud": "carbonserver", "exp": exp()}), "k1"),
            // wrong audience
            sign(json!({"sub": sub, "iss": ISSUER, "aud": "other", "exp": exp()}), "k1"),
            // expired
            sign(json!({"sub": sub, "iss": ISSUER, "aud": "carbonserver", "exp": 1_000}), "k1"),
            // unknown key
            sign(json!({"sub": sub, "iss": ISSUER, "aud": "carbonserver", "exp": exp()}), "k2"),
            // subject is not a uuid
            sign(json!({"sub": "alice", "iss": ISSUER, "aud": "carbonserver", "exp": exp()}), "k1"),
            "not-a-jwt".to_string(),
        ];
        for token in cases {
            let err = provider.identify(&token).await.unwrap_err();
            assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_no_auth_identity_is_stable() {
        let provider = NoAuthProvider;
        let a = tokio_test::block_on(provider.identify("anything")).unwrap();
        let b = provider.default_identity().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.email, "noauth@localhost");
        assert!(OidcProvider::with_keys(ISSUER, None, keys()).default_identity().is_none());
    }
}
