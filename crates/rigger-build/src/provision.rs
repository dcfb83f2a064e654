//! プッシュ先リポジトリの用意
//!
//! 存在確認で「リポジトリが無い」と明示された場合だけ作成する。
//! それ以外の確認エラーは不在とみなさず、そのまま失敗させる。

use crate::error::{BuildError, BuildResult};
use crate::registry::{RegistryApi, RegistryApiError};

/// `ensure_repository` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryStatus {
    Existing,
    Created,
}

impl std::fmt::Display for RepositoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryStatus::Existing => write!(f, "existing"),
            RepositoryStatus::Created => write!(f, "created"),
        }
    }
}

/// リポジトリが存在することを保証
pub async fn ensure_repository(
    registry: &dyn RegistryApi,
    name: &str,
) -> BuildResult<RepositoryStatus> {
    match registry.describe_repository(name).await {
        Ok(()) => {
            tracing::debug!("Repository {} already exists", name);
            Ok(RepositoryStatus::Existing)
        }
        Err(RegistryApiError::RepositoryNotFound(_)) => {
            tracing::info!("Repository {} not found, creating it", name);
            registry
                .create_repository(name)
                .await
                .map_err(|e| BuildError::RepositoryCreate {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;
            tracing::info!("Created repository {}", name);
            Ok(RepositoryStatus::Created)
        }
        Err(RegistryApiError::Api(message)) => Err(BuildError::RepositoryLookup {
            name: name.to_string(),
            message,
        }),
    }
}
