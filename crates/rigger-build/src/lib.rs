//! rigger build pipeline
//!
//! リモートの git リポジトリからコンテナイメージをビルドし、
//! レジストリへプッシュするまでのパイプラインを提供します。
//! 認証情報の解決、リポジトリの用意、ビルド / プッシュの進捗ストリーム処理を含みます。

pub mod builder;
pub mod credentials;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod provision;
pub mod pusher;
pub mod registry;
pub mod runtime;
pub mod secrets;
pub mod source;

#[cfg(test)]
mod testing;

pub use builder::{BuiltImage, ImageBuilder};
pub use credentials::{
    RegistryCredential, SourceCredential, resolve_registry_auth, resolve_source_credential,
};
pub use error::{BuildError, BuildResult};
pub use event::{EventStream, ProgressEvent, StreamError, TagResult};
pub use pipeline::{BuildRequest, Pipeline, PipelineError, PipelineOutcome, Stage};
pub use provision::{RepositoryStatus, ensure_repository};
pub use pusher::{ImagePusher, PushSummary};
pub use registry::{AuthorizationData, RegistryApi, RegistryApiError};
pub use runtime::{ContainerRuntime, DockerRuntime, RemoteBuild};
pub use secrets::{SecretStore, SecretStoreError};
pub use source::SourceReference;
