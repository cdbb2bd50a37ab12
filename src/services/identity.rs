// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-user identity token verification.
//!
//! The same identity token authenticates `/api/*` requests and travels as the
//! OAuth `state` parameter, so both paths go through [`IdentityVerifier`].

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Lifetime of locally minted session tokens.
const SESSION_TOKEN_TTL_SECS: usize = 60 * 60;

/// A verified end user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Opaque subject ID; the key for all per-user state.
    pub subject: String,
}

/// Identity verification error categories.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// The token is malformed, expired, or signed by someone else.
    #[error("invalid identity token: {0}")]
    Invalid(String),
    /// Verification could not complete (e.g. signing keys unavailable).
    #[error("identity verification unavailable: {0}")]
    Unavailable(String),
}

/// `verify(token) -> subject | invalid`
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError>;
}

/// JWT claims of a locally minted session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// HS256 verifier for identity tokens signed with a shared key.
///
/// Used for local development and tests, where no Google project issues ID
/// tokens.
pub struct SessionTokenVerifier {
    key: DecodingKey,
}

impl SessionTokenVerifier {
    pub fn new(signing_key: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(signing_key),
        }
    }
}

#[async_trait]
impl IdentityVerifier for SessionTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<SessionClaims>(token, &self.key, &validation)
            .map_err(|e| IdentityError::Invalid(e.to_string()))?;

        if token_data.claims.sub.trim().is_empty() {
            return Err(IdentityError::Invalid("empty subject".to_string()));
        }

        Ok(VerifiedIdentity {
            subject: token_data.claims.sub,
        })
    }
}

/// Mint a session token for a user.
pub fn create_session_token(user_id: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = SessionClaims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + SESSION_TOKEN_TTL_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
