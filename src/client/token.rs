//! Simple [`TokenProvider`] implementations for hosts that already hold a
//! credential. Interactive sign-in stays outside this crate.

use async_trait::async_trait;

use super::traits::TokenProvider;
use crate::error::{ResubmitError, ResubmitResult};

/// Fixed bearer token, e.g. acquired by the embedding application
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// A provider that always fails with `NotAuthenticated`
    pub fn signed_out() -> Self {
        Self { token: None }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self, _scope: &str) -> ResubmitResult<String> {
        match self.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => Err(ResubmitError::NotAuthenticated(
                "no bearer token available".to_string(),
            )),
        }
    }
}

/// Reads the bearer token from an environment variable on every request,
/// so a refreshed value is picked up without restarting.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    variable: String,
}

impl EnvTokenProvider {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn get_token(&self, _scope: &str) -> ResubmitResult<String> {
        match std::env::var(&self.variable) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(ResubmitError::NotAuthenticated(format!(
                "environment variable {} does not hold a bearer token",
                self.variable
            ))),
        }
    }
}
