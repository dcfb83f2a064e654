//! Amazon ECR control plane

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ecr::Client;
use aws_sdk_ecr::error::DisplayErrorContext;
use aws_sdk_ecr::types::AuthorizationData as EcrAuthorizationData;
use chrono::{DateTime, Utc};
use rigger_build::{AuthorizationData, RegistryApi, RegistryApiError};

/// ECR implementation of [`RegistryApi`]
#[derive(Debug, Clone)]
pub struct EcrRegistry {
    client: Client,
}

impl EcrRegistry {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl RegistryApi for EcrRegistry {
    async fn get_authorization_token(
        &self,
        registry_id: Option<&str>,
    ) -> Result<AuthorizationData, RegistryApiError> {
        let mut request = self.client.get_authorization_token();
        // no id: the account's default registry
        if let Some(id) = registry_id {
            // Deprecated by ECR but still honoured: it picks the proxy endpoint returned.
            #[allow(deprecated)]
            {
                request = request.registry_ids(id);
            }
        }

        let output = request
            .send()
            .await
            .map_err(|e| RegistryApiError::Api(DisplayErrorContext(&e).to_string()))?;

        let data = output.authorization_data().first().ok_or_else(|| {
            RegistryApiError::Api("GetAuthorizationToken returned no authorization data".into())
        })?;

        convert_authorization_data(data)
    }

    async fn describe_repository(&self, name: &str) -> Result<(), RegistryApiError> {
        match self
            .client
            .describe_repositories()
            .repository_names(name)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_repository_not_found_exception()) =>
            {
                Err(RegistryApiError::RepositoryNotFound(name.to_string()))
            }
            Err(e) => Err(RegistryApiError::Api(DisplayErrorContext(&e).to_string())),
        }
    }

    async fn create_repository(&self, name: &str) -> Result<(), RegistryApiError> {
        self.client
            .create_repository()
            .repository_name(name)
            .send()
            .await
            .map_err(|e| RegistryApiError::Api(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

fn convert_authorization_data(
    data: &EcrAuthorizationData,
) -> Result<AuthorizationData, RegistryApiError> {
    let token = data
        .authorization_token()
        .ok_or_else(|| RegistryApiError::Api("authorization token missing".into()))?;
    let proxy_endpoint = data
        .proxy_endpoint()
        .ok_or_else(|| RegistryApiError::Api("proxy endpoint missing".into()))?;

    Ok(AuthorizationData {
        token: token.to_string(),
        proxy_endpoint: proxy_endpoint.to_string(),
        expires_at: data
            .expires_at()
            .and_then(|at| DateTime::<Utc>::from_timestamp(at.secs(), at.subsec_nanos())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ecr::primitives::DateTime as SmithyDateTime;

    #[test]
    fn test_convert_authorization_data() {
        let data = EcrAuthorizationData::builder()
            .authorization_token("QVdTOnNlY3JldA==")
            .proxy_endpoint("https://123456789012.dkr.ecr.eu-west-1.amazonaws.com")
            .expires_at(SmithyDateTime::from_secs(1_700_000_000))
            .build();

        let converted = convert_authorization_data(&data).unwrap();
        assert_eq!(converted.token, "QVdTOnNlY3JldA==");
        assert_eq!(
            converted.proxy_endpoint,
            "https://123456789012.dkr.ecr.eu-west-1.amazonaws.com"
        );
        assert_eq!(
            converted.expires_at.map(|at| at.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn test_convert_requires_token_and_endpoint() {
        let data = EcrAuthorizationData::builder()
            .proxy_endpoint("https://r.example")
            .build();
        assert!(convert_authorization_data(&data).is_err());

        let data = EcrAuthorizationData::builder()
            .authorization_token("QVdTOnNlY3JldA==")
            .build();
        assert!(convert_authorization_data(&data).is_err());
    }
}
