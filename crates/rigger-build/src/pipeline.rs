//! ビルド → プッシュのパイプライン
//!
//! ```text
//! Start → ResolveRegistryAuth → ResolveSourceCredential → Build
//!       → EnsureRepository → Push → Done
//! ```
//!
//! 各ステージの結果は戻り値として次のステージに渡す。
//! どのステージで失敗しても、その時点でパイプラインを止める（リトライ・巻き戻しなし）。

use crate::builder::{BuiltImage, ImageBuilder};
use crate::credentials::{resolve_registry_auth, resolve_source_credential};
use crate::error::{BuildError, BuildResult};
use crate::provision::{RepositoryStatus, ensure_repository};
use crate::pusher::{ImagePusher, PushSummary};
use crate::registry::RegistryApi;
use crate::runtime::ContainerRuntime;
use crate::secrets::SecretStore;
use crate::source::SourceReference;

/// 1 回の実行の入力
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub source: SourceReference,
    /// 未指定ならソース参照から導出
    pub image_name: Option<String>,
    /// ソースリポジトリ認証情報のパラメータ名
    pub credentials_key: Option<String>,
    /// 認証トークンのスコープ（レジストリ ID）
    pub registry_id: Option<String>,
}

impl BuildRequest {
    /// 参照を検証して要求を組み立てる。ネットワークには触れない
    ///
    /// `image_name` が空なら、ここで導出できるかまで確認する。
    pub fn new(reference: &str, image_name: Option<String>) -> BuildResult<Self> {
        let source = SourceReference::parse(reference)?;
        let image_name = image_name.filter(|n| !n.is_empty());
        if image_name.is_none() {
            source.derive_image_name()?;
        }
        Ok(Self {
            source,
            image_name,
            credentials_key: None,
            registry_id: None,
        })
    }

    pub fn with_credentials_key(mut self, key: Option<String>) -> Self {
        self.credentials_key = key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_registry_id(mut self, id: Option<String>) -> Self {
        self.registry_id = id.filter(|i| !i.is_empty());
        self
    }
}

/// パイプラインのステージ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolveRegistryAuth,
    ResolveSourceCredential,
    Build,
    EnsureRepository,
    Push,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::ResolveRegistryAuth => "resolve-registry-auth",
            Stage::ResolveSourceCredential => "resolve-source-credential",
            Stage::Build => "build",
            Stage::EnsureRepository => "ensure-repository",
            Stage::Push => "push",
        };
        f.write_str(name)
    }
}

/// 失敗したステージとその原因
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: BuildError,
}

/// 成功時の結果
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub image: BuiltImage,
    pub repository: RepositoryStatus,
    pub push: PushSummary,
}

pub struct Pipeline<'a> {
    registry: &'a dyn RegistryApi,
    secrets: &'a dyn SecretStore,
    runtime: &'a dyn ContainerRuntime,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        registry: &'a dyn RegistryApi,
        secrets: &'a dyn SecretStore,
        runtime: &'a dyn ContainerRuntime,
    ) -> Self {
        Self {
            registry,
            secrets,
            runtime,
        }
    }

    pub async fn run(&self, request: &BuildRequest) -> Result<PipelineOutcome, PipelineError> {
        let credential = resolve_registry_auth(self.registry, request.registry_id.as_deref())
            .await
            .map_err(fail(Stage::ResolveRegistryAuth))?;

        let source_credential =
            resolve_source_credential(self.secrets, request.credentials_key.as_deref())
                .await
                .map_err(fail(Stage::ResolveSourceCredential))?;

        let image = ImageBuilder::new(self.runtime)
            .build(
                &request.source,
                &credential,
                source_credential.as_ref(),
                request.image_name.as_deref(),
            )
            .await
            .map_err(fail(Stage::Build))?;

        let repository = ensure_repository(self.registry, &image.name)
            .await
            .map_err(fail(Stage::EnsureRepository))?;

        let push = ImagePusher::new(self.runtime)
            .push(&image, &credential)
            .await
            .map_err(fail(Stage::Push))?;

        Ok(PipelineOutcome {
            image,
            repository,
            push,
        })
    }
}

fn fail(stage: Stage) -> impl FnOnce(BuildError) -> PipelineError {
    move |source| {
        tracing::error!(stage = %stage, "{}", source);
        PipelineError { stage, source }
    }
}
