//! イメージプッシュ処理
//!
//! ビルドしたイメージをレジストリにプッシュします。
//! プッシュ先リポジトリは事前に `ensure_repository` で用意しておくこと。

use crate::builder::BuiltImage;
use crate::credentials::RegistryCredential;
use crate::error::{BuildError, BuildResult};
use crate::event::{ProgressEvent, StreamError, TagResult};
use crate::runtime::ContainerRuntime;
use futures_util::StreamExt;

/// 高頻度で流れてくるため出力しないステータス
const IN_PROGRESS_STATUS: &str = "Pushing";

/// プッシュ結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSummary {
    pub reference: String,
    pub tags: Vec<TagResult>,
    /// 読めなかった進捗レコードの数
    pub skipped_records: usize,
}

/// イメージプッシュを実行するハンドラ
pub struct ImagePusher<'a> {
    runtime: &'a dyn ContainerRuntime,
}

impl<'a> ImagePusher<'a> {
    pub fn new(runtime: &'a dyn ContainerRuntime) -> Self {
        Self { runtime }
    }

    /// イメージの全タグをレジストリにプッシュ
    pub async fn push(
        &self,
        image: &BuiltImage,
        credential: &RegistryCredential,
    ) -> BuildResult<PushSummary> {
        if credential.is_expired(chrono::Utc::now()) {
            tracing::warn!(
                "Registry token for {} has expired; the push will likely be rejected",
                credential.host()
            );
        }

        tracing::info!("Pushing {}", image.reference);

        let mut stream = self.runtime.push(&image.reference, credential);
        let mut tags = Vec::new();
        let mut skipped_records = 0;
        let mut error_message: Option<String> = None;

        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => self.handle_progress(event, &mut tags, &mut error_message),
                Err(StreamError::Decode(message)) => {
                    tracing::warn!("Push: skipping malformed progress record: {}", message);
                    skipped_records += 1;
                }
                Err(e) => return Err(BuildError::PushInitiation(e.to_string())),
            }
        }

        // エラーがあった場合
        if let Some(err) = error_message {
            return Err(BuildError::PushFailed(err));
        }

        if skipped_records > 0 {
            tracing::warn!(
                "Push finished for {} with {} unreadable progress record(s); the tag list may be incomplete",
                image.reference,
                skipped_records
            );
        } else {
            tracing::info!("Pushed {} ({} tag(s))", image.reference, tags.len());
        }
        Ok(PushSummary {
            reference: image.reference.clone(),
            tags,
            skipped_records,
        })
    }

    /// プッシュ進捗をログに出す
    fn handle_progress(
        &self,
        event: ProgressEvent,
        tags: &mut Vec<TagResult>,
        error_message: &mut Option<String>,
    ) {
        match event {
            ProgressEvent::Status { status, .. } if status == IN_PROGRESS_STATUS => {}
            ProgressEvent::Status { status, id: Some(id) } => {
                tracing::info!("Push: {} id:{}", status, id);
            }
            ProgressEvent::Status { status, id: None } => {
                tracing::info!("Push: {}", status);
            }
            ProgressEvent::TagResult(result) => {
                tracing::info!(
                    tag = %result.tag,
                    digest = %result.digest,
                    size = result.size,
                    "Push: Tag: {}, Digest: {}, Size: {}",
                    result.tag,
                    result.digest,
                    result.size
                );
                // 同じタグのサマリー行が重複して届くことがある
                if !tags.contains(&result) {
                    tags.push(result);
                }
            }
            ProgressEvent::Error(message) => {
                tracing::error!("Push: {}", message);
                error_message.get_or_insert(message);
            }
            ProgressEvent::Stream(line) => {
                tracing::debug!("Push: {}", line.trim_end());
            }
            ProgressEvent::BuildId(_) | ProgressEvent::UnknownAux(_) | ProgressEvent::Empty => {}
        }
    }
}
