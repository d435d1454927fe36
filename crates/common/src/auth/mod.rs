//! Authentication and authorization
//!
//! Provides:
//! - Project token issuance and verification
//! - Bearer token validation through an identity provider
//! - Principal resolution with first-login provisioning
//! - The access-control evaluator

pub mod access;
pub mod identity;
pub mod tokens;

pub use access::{AccessControl, Action, Principal, Resource};
pub use identity::{Identity, IdentityProvider, NoAuthProvider, OidcProvider};
pub use tokens::{
    Argon2Hasher, IssuedToken, RandomTokenGenerator, TokenGenerator, TokenHasher, TokenService,
    TOKEN_PREFIX,
};

use crate::db::models::User;
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::metrics;
use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderName};
use std::sync::Arc;
use tracing::debug;

/// Default header carrying project tokens
pub const PROJECT_TOKEN_HEADER: &str = "x-project-token";

/// Extract the credential from an `Authorization: Bearer` value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    let (scheme, token) = auth_header.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|token| !token.is_empty())
}

/// Resolves request headers to a [`Principal`]
#[derive(Clone)]
pub struct Authenticator {
    repo: Repository,
    provider: Arc<dyn IdentityProvider>,
    token_header: HeaderName,
}

impl Authenticator {
    pub fn new(repo: Repository, provider: Arc<dyn IdentityProvider>, token_header: &str) -> Result<Self> {
        let token_header = HeaderName::from_bytes(token_header.as_bytes()).map_err(|_| {
            AppError::Configuration {
                message: format!("Invalid project token header name: {}", token_header),
            }
        })?;
        Ok(Self {
            repo,
            provider,
            token_header,
        })
    }

    /// Work out who is calling.
    ///
    /// A bearer token takes precedence over a project token. Without either,
    /// the provider's default identity is used when it has one, otherwise the
    /// caller is anonymous.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal> {
        if let Some(value) = headers.get(AUTHORIZATION) {
            let bearer = value
                .to_str()
                .ok()
                .and_then(extract_bearer)
                .ok_or_else(|| AppError::unauthorized("Malformed Authorization header"))?;
            let identity = self.provider.identify(bearer).await?;
            return self.resolve_user(identity).await.map(Principal::User);
        }

        if let Some(value) = headers.get(&self.token_header) {
            let raw = value
                .to_str()
                .map(str::trim)
                .map_err(|_| AppError::unauthorized("Malformed project token header"))?;
            if !raw.is_empty() {
                return Ok(Principal::ProjectToken(raw.to_string()));
            }
        }

        match self.provider.default_identity() {
            Some(identity) => self.resolve_user(identity).await.map(Principal::User),
            None => Ok(Principal::Anonymous),
        }
    }

    /// User row for an identity, provisioned on first sight
    async fn resolve_user(&self, identity: Identity) -> Result<User> {
        let provisioned = self
            .repo
            .provision_user(identity.subject, identity.name, identity.email)
            .await?;
        if provisioned.created {
            metrics::record_user_provisioned();
        }
        debug!(user_id = %provisioned.user.id, "Authenticated user");
        Ok(provisioned.user)
    }
}
