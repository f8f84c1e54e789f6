use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use tracing::warn;

use crate::limits::MAX_TOKEN_CACHE;
use crate::model::UserId;

/// The authenticated caller, as the identity provider reports them. Passed
/// into every service call that needs an identity — nothing reads ambient
/// request state below the HTTP layer.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

#[derive(Debug)]
pub enum AuthError {
    /// The provider rejected the token.
    InvalidToken,
    /// The provider could not be reached or answered garbage. Treated as
    /// unauthenticated by callers — never as a server error.
    Provider(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidToken => write!(f, "invalid token"),
            AuthError::Provider(e) => write!(f, "identity provider error: {e}"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Token-verification boundary to the third-party identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError>;
}

/// Verifies bearer tokens against the provider's userinfo endpoint and
/// caches successes. Tokens are opaque here; the provider owns their format
/// and expiry — restarting this process empties the cache, which is the only
/// revocation story innkeep needs.
pub struct RemoteIdentity {
    client: reqwest::Client,
    userinfo_url: String,
    cache: DashMap<String, AuthUser>,
}

impl RemoteIdentity {
    pub fn new(userinfo_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            userinfo_url,
            cache: DashMap::new(),
        }
    }
}

#[async_trait]
impl IdentityProvider for RemoteIdentity {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        if let Some(user) = self.cache.get(token) {
            return Ok(user.value().clone());
        }

        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidToken);
        }
        let user: AuthUser = response
            .error_for_status()
            .map_err(|e| AuthError::Provider(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        if self.cache.len() >= MAX_TOKEN_CACHE {
            self.cache.clear();
        }
        self.cache.insert(token.to_string(), user.clone());
        Ok(user)
    }
}

/// Installed when no provider is configured: every token fails. Keeps the
/// public routes usable while making the misconfiguration loud.
pub struct DenyAll;

#[async_trait]
impl IdentityProvider for DenyAll {
    async fn verify(&self, _token: &str) -> Result<AuthUser, AuthError> {
        warn!("authentication attempted but no identity provider is configured");
        Err(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deny_all_rejects() {
        let result = DenyAll.verify("any-token").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }
}
