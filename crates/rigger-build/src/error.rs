use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid source reference '{reference}': {reason}")]
    InvalidSourceReference { reference: String, reason: String },

    #[error("Credential decode error: {0}")]
    CredentialDecode(String),

    #[error("Registry authorization failed: {0}")]
    RegistryAuth(String),

    #[error("Secret not found: {0}")]
    SecretNotFound(String),

    #[error("Secret access failed for '{key}': {message}")]
    SecretAccess { key: String, message: String },

    #[error("Repository lookup failed for '{name}': {message}")]
    RepositoryLookup { name: String, message: String },

    #[error("Repository creation failed for '{name}': {message}")]
    RepositoryCreate { name: String, message: String },

    #[error("Build could not be started: {0}")]
    BuildInitiation(String),

    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error("Push could not be started: {0}")]
    PushInitiation(String),

    #[error("Push failed: {0}")]
    PushFailed(String),

    #[error("Docker connection error: {0}")]
    DockerConnection(#[from] bollard::errors::Error),
}

impl BuildError {
    pub(crate) fn invalid_reference(reference: &str, reason: impl Into<String>) -> Self {
        BuildError::InvalidSourceReference {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }

    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::InvalidSourceReference { reference, reason } => {
                format!(
                    "リポジトリ指定が不正です: {}\n\
                     理由: {}\n\
                     \n\
                     指定例:\n\
                     - github.com/org/app.git\n\
                     - github.com/org/app.git#release-1\n\
                     - github.com/org/mono.git#main:docker/app",
                    reference, reason
                )
            }
            BuildError::RegistryAuth(msg) => {
                format!(
                    "レジストリの認証トークンを取得できませんでした: {}\n\
                     \n\
                     AWS の認証情報とリージョン (--region) を確認してください。",
                    msg
                )
            }
            BuildError::SecretNotFound(key) => {
                format!(
                    "パラメータが見つかりません: {}\n\
                     \n\
                     -c で指定した SSM パラメータ名とリージョンを確認してください。",
                    key
                )
            }
            BuildError::BuildFailed(msg) => {
                format!(
                    "ビルドに失敗しました: {}\n\
                     \n\
                     リポジトリ内の Dockerfile の内容を確認してください。",
                    msg
                )
            }
            BuildError::DockerConnection(e) => {
                format!(
                    "Dockerに接続できません: {}\n\
                     \n\
                     Dockerが起動しているか、DOCKER_HOST が正しいか確認してください。",
                    e
                )
            }
            _ => format!("{}", self),
        }
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
