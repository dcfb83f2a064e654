//! Secret store abstraction

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error("Parameter not found: {0}")]
    NotFound(String),

    #[error("Parameter '{key}' could not be read: {message}")]
    Access { key: String, message: String },
}

/// Key-value secret store (e.g. SSM Parameter Store)
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read a parameter value, decrypting it when `decrypt` is set
    async fn get_parameter(&self, key: &str, decrypt: bool) -> Result<String, SecretStoreError>;
}
