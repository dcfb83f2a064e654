//! Registry control-plane abstraction
//!
//! The pipeline only needs three calls from the registry service. Concrete
//! implementations live outside this crate (see `rigger-aws`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors reported by a registry control plane
#[derive(Debug, Error)]
pub enum RegistryApiError {
    /// The one lookup failure that means "the repository does not exist"
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Registry API error: {0}")]
    Api(String),
}

/// Raw authorization data returned by the control plane
#[derive(Clone)]
pub struct AuthorizationData {
    /// Base64 encoded `username:password`
    pub token: String,

    /// Registry endpoint including scheme (e.g. `https://1234.dkr.ecr.eu-west-1.amazonaws.com`)
    pub proxy_endpoint: String,

    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for AuthorizationData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationData")
            .field("token", &"<redacted>")
            .field("proxy_endpoint", &self.proxy_endpoint)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Image registry control plane
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Fetch a short-lived authorization token
    ///
    /// `registry_id` scopes the token to a specific registry; `None` means the
    /// caller's default registry.
    async fn get_authorization_token(
        &self,
        registry_id: Option<&str>,
    ) -> Result<AuthorizationData, RegistryApiError>;

    /// Look up a repository by exact name
    async fn describe_repository(&self, name: &str) -> Result<(), RegistryApiError>;

    /// Create a repository
    async fn create_repository(&self, name: &str) -> Result<(), RegistryApiError>;
}
