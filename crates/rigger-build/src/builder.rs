use crate::credentials::{RegistryCredential, SourceCredential};
use crate::error::{BuildError, BuildResult};
use crate::event::{ProgressEvent, StreamError};
use crate::runtime::{ContainerRuntime, RemoteBuild};
use crate::source::SourceReference;
use futures_util::stream::StreamExt;

/// ビルド済みイメージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltImage {
    /// レジストリ上のリポジトリ名
    pub name: String,
    /// `registryHost/imageName`
    pub reference: String,
    pub image_id: Option<String>,
    /// 出力されたビルドログの行数
    pub output_lines: usize,
    /// 読めなかった進捗レコードの数
    pub skipped_records: usize,
}

pub struct ImageBuilder<'a> {
    runtime: &'a dyn ContainerRuntime,
}

impl<'a> ImageBuilder<'a> {
    pub fn new(runtime: &'a dyn ContainerRuntime) -> Self {
        Self { runtime }
    }

    /// リモートの git リポジトリからイメージをビルド
    ///
    /// `explicit_name` が無ければ参照からイメージ名を導出する。
    /// イベントストリームは成功時も終端まで読み切る。
    pub async fn build(
        &self,
        source: &SourceReference,
        registry: &RegistryCredential,
        source_credential: Option<&SourceCredential>,
        explicit_name: Option<&str>,
    ) -> BuildResult<BuiltImage> {
        let name = match explicit_name.filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => source.derive_image_name()?,
        };
        let reference = registry.image_reference(&name);

        let build = RemoteBuild {
            source: source.clone(),
            source_credential: source_credential.cloned(),
            tag: reference.clone(),
            registry: Some(registry.clone()),
            force_remove: true,
        };

        tracing::info!("Building {} from {}", reference, source.display_url());

        let mut stream = self.runtime.build_remote(&build);
        let mut image_id = None;
        let mut output_lines = 0;
        let mut skipped_records = 0;
        let mut failure: Option<String> = None;

        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => {
                    self.handle_build_event(event, &mut image_id, &mut output_lines, &mut failure)
                }
                Err(StreamError::Decode(message)) => {
                    tracing::warn!("Build: skipping malformed progress record: {}", message);
                    skipped_records += 1;
                }
                Err(e) => return Err(BuildError::BuildInitiation(e.to_string())),
            }
        }

        if let Some(message) = failure {
            return Err(BuildError::BuildFailed(message));
        }

        if skipped_records > 0 {
            tracing::warn!(
                "Build finished for {} with {} unreadable progress record(s); the result may be incomplete",
                reference,
                skipped_records
            );
        } else {
            tracing::info!("Successfully built: {}", reference);
        }
        Ok(BuiltImage {
            name,
            reference,
            image_id,
            output_lines,
            skipped_records,
        })
    }

    /// ビルド出力の処理
    fn handle_build_event(
        &self,
        event: ProgressEvent,
        image_id: &mut Option<String>,
        output_lines: &mut usize,
        failure: &mut Option<String>,
    ) {
        match event {
            ProgressEvent::Stream(line) => {
                let line = line.trim_end();
                if !line.is_empty() {
                    tracing::info!("Build: {}", line);
                    *output_lines += 1;
                }
            }
            ProgressEvent::BuildId(id) => {
                tracing::info!("Build: ID: {}", id);
                *image_id = Some(id);
            }
            ProgressEvent::Status { status, id } => match id {
                Some(id) => tracing::info!("Build: {} id:{}", status, id),
                None => tracing::info!("Build: {}", status),
            },
            ProgressEvent::Error(message) => {
                // 最初のエラーを保持し、ストリームは最後まで読む
                tracing::error!("Build: {}", message);
                failure.get_or_insert(message);
            }
            ProgressEvent::UnknownAux(aux) => {
                tracing::debug!("Build: unrecognised aux record: {}", aux);
            }
            ProgressEvent::TagResult(result) => {
                tracing::debug!("Build: unexpected tag record for {}", result.tag);
            }
            ProgressEvent::Empty => {}
        }
    }
}
