//! コンテナランタイム（Docker Engine）との境界

use crate::credentials::{RegistryCredential, SourceCredential};
use crate::error::BuildResult;
use crate::event::{EventStream, ProgressEvent, StreamError};
use crate::source::SourceReference;
use bollard::Docker;
use bollard::query_parameters::{BuildImageOptionsBuilder, PushImageOptions};
use futures_util::StreamExt;
use std::collections::HashMap;

/// リモートコンテキストからのビルド要求
#[derive(Debug, Clone)]
pub struct RemoteBuild {
    pub source: SourceReference,
    pub source_credential: Option<SourceCredential>,
    /// `registryHost/imageName`
    pub tag: String,
    /// ベースイメージ取得用のレジストリ認証
    pub registry: Option<RegistryCredential>,
    /// 失敗時も中間コンテナを削除する
    pub force_remove: bool,
}

impl RemoteBuild {
    /// Docker に渡すコンテキスト URL（認証情報を含みうる）
    pub fn context_url(&self) -> String {
        self.source.context_url(self.source_credential.as_ref())
    }
}

/// ビルドとプッシュを行うコンテナランタイム
///
/// どちらも結果をバッファせず、生きたイベントストリームを返す。
/// 呼び出し側は終端まで読み切ること。
///
/// `StreamError::Decode` の後もストリームが続くとは限らない。
/// `DockerRuntime` では bollard のデコーダが壊れたレコード以降を捨てるため、
/// そこで終端になり、最後のレコード（イメージ ID やタグ結果）が届かないことがある。
pub trait ContainerRuntime: Send + Sync {
    fn build_remote(&self, build: &RemoteBuild) -> EventStream<'_>;

    /// `reference` の全タグをプッシュ
    ///
    /// `DockerRuntime` の `Status` には `id` が付かない（bollard の `PushImageInfo` に無いため）。
    fn push(&self, reference: &str, credential: &RegistryCredential) -> EventStream<'_>;
}

/// Bollard 経由の Docker Engine 実装
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// `DOCKER_HOST` またはローカルのソケットに接続
    pub fn connect() -> BuildResult<Self> {
        Ok(Self::new(Docker::connect_with_local_defaults()?))
    }
}

impl ContainerRuntime for DockerRuntime {
    fn build_remote(&self, build: &RemoteBuild) -> EventStream<'_> {
        let options = BuildImageOptionsBuilder::default()
            .remote(&build.context_url())
            .t(&build.tag)
            .rm(true)
            .forcerm(build.force_remove)
            .build();

        tracing::debug!(
            "Build options: remote={} t={} forcerm={}",
            build.source.display_url(),
            build.tag,
            build.force_remove
        );

        let registry_config = build.registry.as_ref().map(|credential| {
            HashMap::from([(
                credential.host().to_string(),
                credential.to_docker_credentials(),
            )])
        });

        self.docker
            .build_image(options, registry_config, None)
            .map(|item| match item {
                Ok(info) => Ok(ProgressEvent::from(info)),
                Err(e) => runtime_error(e),
            })
            .boxed()
    }

    fn push(&self, reference: &str, credential: &RegistryCredential) -> EventStream<'_> {
        // タグ未指定で全タグをプッシュ
        self.docker
            .push_image(
                reference,
                None::<PushImageOptions>,
                Some(credential.to_docker_credentials()),
            )
            .map(|item| match item {
                Ok(info) => Ok(ProgressEvent::from(info)),
                Err(e) => runtime_error(e),
            })
            .boxed()
    }
}

fn runtime_error(err: bollard::errors::Error) -> Result<ProgressEvent, StreamError> {
    match err {
        // ストリーム内の {"error": ...} は bollard がエラーとして返してくる
        bollard::errors::Error::DockerStreamError { error } => Ok(ProgressEvent::Error(error)),
        other => Err(StreamError::from(other)),
    }
}
