use axum::http::{header, HeaderMap};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::AuthConfig;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingCredentials,

    #[error("invalid credentials")]
    InvalidCredentials,
}

/// Resolves a presented token to an identity before a session may open
#[async_trait::async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: Option<&str>) -> Result<Identity, AuthError>;
}

/// Accepts every caller. Used when no tokens are configured.
pub struct AllowAnonymous;

#[async_trait::async_trait]
impl CredentialVerifier for AllowAnonymous {
    async fn verify(&self, _token: Option<&str>) -> Result<Identity, AuthError> {
        Ok(Identity {
            subject: "anonymous".to_string(),
        })
    }
}

/// Accepts bearer tokens from a fixed list
pub struct StaticTokenVerifier {
    tokens: HashSet<String>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }
}

#[async_trait::async_trait]
impl CredentialVerifier for StaticTokenVerifier {
    async fn verify(&self, token: Option<&str>) -> Result<Identity, AuthError> {
        let token = token.ok_or(AuthError::MissingCredentials)?;
        if !self.tokens.contains(token) {
            return Err(AuthError::InvalidCredentials);
        }

        // Never log or echo the full token
        let prefix: String = token.chars().take(4).collect();
        Ok(Identity {
            subject: format!("token:{}...", prefix),
        })
    }
}

/// Pick the verifier for the configured token list
pub fn verifier_from_config(config: &AuthConfig) -> Arc<dyn CredentialVerifier> {
    if config.tokens.is_empty() {
        Arc::new(AllowAnonymous)
    } else {
        Arc::new(StaticTokenVerifier::new(config.tokens.iter().cloned()))
    }
}

/// Extract `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
