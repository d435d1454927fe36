//! Project token issuance and verification
//!
//! A raw token is `cpt_` followed by 64 hex characters. The server keeps two
//! derived values: the first 8 hex characters of its SHA-256 (`lookup_value`,
//! a non-unique index) and an Argon2 hash (`hashed_token`) that is the only
//! thing a presented token is actually checked against.

use crate::clock::Clock;
use crate::db::models::{AccessLevel, ProjectToken};
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::schemas::ProjectTokenCreate;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Prefix that makes project tokens recognizable
pub const TOKEN_PREFIX: &str = "cpt_";

/// Number of hex characters kept for the lookup value
pub const LOOKUP_VALUE_LEN: usize = 8;

/// Short deterministic digest used to find candidate rows
pub fn lookup_value(raw: &str) -> String {
    let digest = hex::encode(Sha256::digest(raw.as_bytes()));
    digest[..LOOKUP_VALUE_LEN].to_string()
}

/// Source of new raw tokens
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// 32 random bytes, hex encoded, behind the `cpt_` prefix
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> String {
        let random_bytes: [u8; 32] = rand::random();
        format!("{}{}", TOKEN_PREFIX, hex::encode(random_bytes))
    }
}

/// Slow one-way hash for stored tokens
pub trait TokenHasher: Send + Sync {
    fn hash(&self, raw: &str) -> Result<String>;
    fn verify(&self, raw: &str, hashed: &str) -> bool;
}

/// Argon2id with a per-token random salt
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, 1, None).map_err(|e| {
            AppError::Configuration {
                message: format!("Invalid argon2 parameters: {}", e),
            }
        })?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl TokenHasher for Argon2Hasher {
    fn hash(&self, raw: &str) -> Result<String> {
        let salt_bytes: [u8; 16] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AppError::Internal {
            message: format!("Failed to encode salt: {}", e),
        })?;
        self.argon2()
            .hash_password(raw.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal {
                message: format!("Failed to hash token: {}", e),
            })
    }

    fn verify(&self, raw: &str, hashed: &str) -> bool {
        match PasswordHash::new(hashed) {
            Ok(parsed) => self.argon2().verify_password(raw.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}

/// Whether `raw` is the live token behind `token` at `now`
pub fn token_matches(hasher: &dyn TokenHasher, raw: &str, token: &ProjectToken, now: DateTime<Utc>) -> bool {
    !token.revoked && !token.is_expired(now) && hasher.verify(raw, &token.hashed_token)
}

/// Creation response; the only time the raw token leaves the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub token: String,
    pub access: AccessLevel,
    pub expiration_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Issues, verifies and retires project tokens
#[derive(Clone)]
pub struct TokenService {
    repo: Repository,
    hasher: Arc<dyn TokenHasher>,
    generator: Arc<dyn TokenGenerator>,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(
        repo: Repository,
        hasher: Arc<dyn TokenHasher>,
        generator: Arc<dyn TokenGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            hasher,
            generator,
            clock,
        }
    }

    /// Create a token for a project and return its raw value once
    pub async fn issue(&self, project_id: Uuid, payload: ProjectTokenCreate) -> Result<IssuedToken> {
        let raw = self.generator.generate();
        let lookup = lookup_value(&raw);

        let hasher = self.hasher.clone();
        let to_hash = raw.clone();
        let hashed = tokio::task::spawn_blocking(move || hasher.hash(&to_hash)).await??;

        let stored = self
            .repo
            .insert_project_token(
                project_id,
                payload.name,
                hashed,
                lookup,
                payload.access,
                payload.expiration_date,
            )
            .await?;

        metrics::record_token_issued();
        info!(
            token_id = %stored.id,
            project_id = %project_id,
            access = %payload.access,
            "Project token issued"
        );

        Ok(IssuedToken {
            id: stored.id,
            project_id: stored.project_id,
            name: stored.name,
            token: raw,
            access: payload.access,
            expiration_date: stored.expiration_date,
            created_at: stored.created_at,
        })
    }

    /// Check a presented token against a project and the access it needs.
    ///
    /// No match (unknown, revoked or expired) is `Unauthorized`; a match
    /// whose level does not cover `required` is `Forbidden`. A successful
    /// check stamps `last_used`.
    pub async fn verify(&self, raw: &str, project_id: Uuid, required: AccessLevel) -> Result<ProjectToken> {
        if !raw.starts_with(TOKEN_PREFIX) {
            metrics::record_token_verification("rejected");
            return Err(AppError::unauthorized("Invalid project token"));
        }

        let now = self.clock.now();
        let candidates = self
            .repo
            .find_token_candidates(&lookup_value(raw), project_id)
            .await?;

        let hasher = self.hasher.clone();
        let presented = raw.to_string();
        let matched = tokio::task::spawn_blocking(move || {
            candidates
                .into_iter()
                .find(|token| token_matches(hasher.as_ref(), &presented, token, now))
        })
        .await?;

        let token = match matched {
            Some(token) => token,
            None => {
                metrics::record_token_verification("rejected");
                return Err(AppError::unauthorized("Invalid project token"));
            }
        };

        let level = token.access_level().ok_or_else(|| AppError::Internal {
            message: format!("Project token {} has unknown access level {}", token.id, token.access),
        })?;
        if !level.permits(required) {
            metrics::record_token_verification("forbidden");
            return Err(AppError::forbidden(format!(
                "Project token grants {} access, {} required",
                level, required
            )));
        }

        self.repo.touch_project_token(token.id, now).await?;
        metrics::record_token_verification("accepted");
        Ok(token)
    }

    /// Tokens of a project (hashes are never serialized)
    pub async fn list(&self, project_id: Uuid) -> Result<Vec<ProjectToken>> {
        self.repo.list_project_tokens(project_id).await
    }

    /// Revoke a token; it stays listed but never verifies again
    pub async fn revoke(&self, project_id: Uuid, token_id: Uuid) -> Result<ProjectToken> {
        let token = self.repo.revoke_project_token(project_id, token_id).await?;
        info!(token_id = %token_id, project_id = %project_id, "Project token revoked");
        Ok(token)
    }

    /// Remove a token entirely
    pub async fn delete(&self, project_id: Uuid, token_id: Uuid) -> Result<()> {
        self.repo.delete_project_token(project_id, token_id).await?;
        info!(token_id = %token_id, project_id = %project_id, "Project token deleted");
        Ok(())
    }
}
