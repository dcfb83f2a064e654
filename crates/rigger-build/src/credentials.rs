//! レジストリ / ソースリポジトリの認証情報解決
//!
//! レジストリのコントロールプレーンから短命トークンを取得して
//! Bollard の `DockerCredentials` に変換し、
//! シークレットストアからソースリポジトリの認証情報を取り出します。

use crate::error::{BuildError, BuildResult};
use crate::registry::RegistryApi;
use crate::secrets::{SecretStore, SecretStoreError};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use bollard::auth::DockerCredentials;
use chrono::{DateTime, Utc};

/// レジストリ認証情報
///
/// 1 回の実行につき 1 度だけ取得し、メモリ上にのみ保持する。更新はしない。
#[derive(Clone)]
pub struct RegistryCredential {
    endpoint: String,
    host: String,
    username: String,
    password: String,
    expires_at: Option<DateTime<Utc>>,
}

impl RegistryCredential {
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        let endpoint = endpoint.into();
        let host = strip_scheme(&endpoint).trim_end_matches('/').to_string();
        Self {
            endpoint,
            host,
            username: username.into(),
            password: password.into(),
            expires_at,
        }
    }

    /// スキーム付きのエンドポイント
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// スキームを除いたレジストリホスト（タグの接頭辞になる）
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// `registryHost/imageName`
    pub fn image_reference(&self, image_name: &str) -> String {
        format!("{}/{}", self.host, image_name)
    }

    /// ビルド / プッシュ API に渡す認証ブロブ
    ///
    /// Bollard が base64url でエンコードして `X-Registry-Auth` に載せる。
    pub fn to_docker_credentials(&self) -> DockerCredentials {
        DockerCredentials {
            username: Some(self.username.clone()),
            password: Some(self.password.clone()),
            serveraddress: Some(self.endpoint.clone()),
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for RegistryCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCredential")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// ソースリポジトリの認証情報（`username:password` 形式のテキスト）
///
/// ログに出さないため `Display` は実装しない。
#[derive(Clone, PartialEq, Eq)]
pub struct SourceCredential(String);

impl SourceCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// URL に埋め込むための生の値
    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SourceCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SourceCredential(<redacted>)")
    }
}

/// レジストリの認証トークンを取得してデコード
///
/// # Arguments
/// * `registry_id` - トークンのスコープ。`None` または空文字ならデフォルトレジストリ
pub async fn resolve_registry_auth(
    registry: &dyn RegistryApi,
    registry_id: Option<&str>,
) -> BuildResult<RegistryCredential> {
    let registry_id = registry_id.filter(|id| !id.is_empty());

    let data = registry
        .get_authorization_token(registry_id)
        .await
        .map_err(|e| BuildError::RegistryAuth(e.to_string()))?;

    let (username, password) = decode_registry_token(&data.token)?;
    let credential =
        RegistryCredential::new(data.proxy_endpoint, username, password, data.expires_at);

    tracing::info!(
        "Got authentication token for registry: {}",
        credential.host()
    );
    if let Some(expires_at) = credential.expires_at() {
        tracing::debug!("Registry token expires at {}", expires_at);
    }

    Ok(credential)
}

/// `base64("username:password")` をデコード
pub fn decode_registry_token(token: &str) -> BuildResult<(String, String)> {
    let decoded = STANDARD
        .decode(token.trim())
        .map_err(|e| BuildError::CredentialDecode(format!("registry token is not base64: {}", e)))?;

    let text = String::from_utf8(decoded).map_err(|e| {
        BuildError::CredentialDecode(format!("registry token is not UTF-8: {}", e))
    })?;

    let fields: Vec<&str> = text.split(':').collect();
    match fields.as_slice() {
        [username, password] => Ok((username.to_string(), password.to_string())),
        _ => Err(BuildError::CredentialDecode(format!(
            "registry token must be 'user:password', got {} field(s)",
            fields.len()
        ))),
    }
}

/// シークレットストアからソースリポジトリの認証情報を取得
///
/// キーが未指定（または空）なら何もせず `None` を返す。
pub async fn resolve_source_credential(
    secrets: &dyn SecretStore,
    key: Option<&str>,
) -> BuildResult<Option<SourceCredential>> {
    let Some(key) = key.filter(|k| !k.is_empty()) else {
        return Ok(None);
    };

    let value = secrets.get_parameter(key, true).await.map_err(|e| match e {
        SecretStoreError::NotFound(key) => BuildError::SecretNotFound(key),
        SecretStoreError::Access { key, message } => BuildError::SecretAccess { key, message },
    })?;

    tracing::info!("Loaded source repository credentials from {}", key);
    decode_source_credential(&value).map(Some)
}

/// パラメータ値は URL-safe base64 で保存される。標準アルファベットも受け付ける
pub fn decode_source_credential(value: &str) -> BuildResult<SourceCredential> {
    let value = value.trim();
    let decoded = URL_SAFE
        .decode(value)
        .or_else(|_| STANDARD.decode(value))
        .map_err(|e| {
            BuildError::CredentialDecode(format!("source credential is not base64: {}", e))
        })?;

    let text = String::from_utf8(decoded).map_err(|e| {
        BuildError::CredentialDecode(format!("source credential is not UTF-8: {}", e))
    })?;

    if text.is_empty() {
        return Err(BuildError::CredentialDecode(
            "source credential is empty".to_string(),
        ));
    }

    Ok(SourceCredential(text))
}

fn strip_scheme(endpoint: &str) -> &str {
    endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .unwrap_or(endpoint)
}
