//! SSM Parameter Store secret lookup

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ssm::Client;
use aws_sdk_ssm::error::DisplayErrorContext;
use rigger_build::{SecretStore, SecretStoreError};

/// SSM Parameter Store implementation of [`SecretStore`]
#[derive(Debug, Clone)]
pub struct SsmSecretStore {
    client: Client,
}

impl SsmSecretStore {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl SecretStore for SsmSecretStore {
    async fn get_parameter(&self, key: &str, decrypt: bool) -> Result<String, SecretStoreError> {
        let output = self
            .client
            .get_parameter()
            .name(key)
            .with_decryption(decrypt)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_parameter_not_found())
                {
                    SecretStoreError::NotFound(key.to_string())
                } else {
                    SecretStoreError::Access {
                        key: key.to_string(),
                        message: DisplayErrorContext(&e).to_string(),
                    }
                }
            })?;

        output
            .parameter()
            .and_then(|p| p.value())
            .map(str::to_string)
            .ok_or_else(|| SecretStoreError::Access {
                key: key.to_string(),
                message: "parameter has no value".to_string(),
            })
    }
}
