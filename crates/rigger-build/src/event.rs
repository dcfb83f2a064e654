//! ビルド / プッシュの進捗イベント
//!
//! Docker Engine はビルドとプッシュの進捗をレコードの列で返します。
//! bollard の型付きレコードをここで一度だけ `ProgressEvent` に分類し、
//! 呼び出し側は網羅的な match で処理します。

use futures_util::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;

/// ランタイムから流れてくる進捗イベントのストリーム
///
/// ストリームの終端（`None`）が操作の完了を意味する。
pub type EventStream<'a> = BoxStream<'a, Result<ProgressEvent, StreamError>>;

/// ストリーム読み取り中のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamError {
    /// 壊れたレコード。読み飛ばすが、以降が届かないこともある
    #[error("Malformed progress record: {0}")]
    Decode(String),

    /// ランタイムがリクエスト自体を拒否した
    #[error("Rejected by container runtime: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl StreamError {
    /// 読み飛ばしてよいエラーか
    pub fn is_tolerated(&self) -> bool {
        matches!(self, StreamError::Decode(_))
    }
}

impl From<bollard::errors::Error> for StreamError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::JsonDataError { .. }
            | bollard::errors::Error::JsonSerdeError { .. } => StreamError::Decode(err.to_string()),
            bollard::errors::Error::DockerResponseServerError {
                status_code,
                message,
            } => StreamError::Rejected(format!("{} ({})", message, status_code)),
            other => StreamError::Transport(other.to_string()),
        }
    }
}

/// プッシュ完了時のタグごとの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagResult {
    pub tag: String,
    pub digest: String,
    pub size: u64,
}

impl TagResult {
    /// `"latest: digest: sha256:... size: 528"` 形式のステータス行を解析
    pub fn from_summary(status: &str) -> Option<Self> {
        let (tag, rest) = status.split_once(": digest: ")?;
        let (digest, size) = rest.split_once(" size: ")?;
        Some(Self {
            tag: tag.trim().to_string(),
            digest: digest.trim().to_string(),
            size: size.trim().parse().ok()?,
        })
    }
}

/// 分類済みの進捗イベント
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// ビルドステップの出力行
    Stream(String),
    /// ビルドされたイメージの ID
    BuildId(String),
    Status {
        status: String,
        id: Option<String>,
    },
    TagResult(TagResult),
    /// ランタイムがストリーム内に埋め込んだエラー
    Error(String),
    /// 形が想定外の `aux`。致命的ではない
    UnknownAux(Value),
    /// 進捗バーだけのレコードなど
    Empty,
}

impl From<bollard::models::BuildInfo> for ProgressEvent {
    fn from(info: bollard::models::BuildInfo) -> Self {
        if let Some(message) = error_message(info.error, info.error_detail) {
            return ProgressEvent::Error(message);
        }

        if let Some(aux) = info.aux {
            return match aux.id {
                Some(id) => ProgressEvent::BuildId(id),
                None => ProgressEvent::UnknownAux(serde_json::to_value(aux).unwrap_or_default()),
            };
        }

        if let Some(line) = info.stream {
            return ProgressEvent::Stream(line);
        }

        match info.status {
            Some(status) => ProgressEvent::Status {
                status,
                id: info.id,
            },
            None => ProgressEvent::Empty,
        }
    }
}

impl From<bollard::models::PushImageInfo> for ProgressEvent {
    fn from(info: bollard::models::PushImageInfo) -> Self {
        if let Some(message) = error_message(info.error, info.error_detail) {
            return ProgressEvent::Error(message);
        }

        // PushImageInfo には id / aux がないため、タグ結果はサマリ行から拾う
        match info.status {
            Some(status) => match TagResult::from_summary(&status) {
                Some(result) => ProgressEvent::TagResult(result),
                None => ProgressEvent::Status { status, id: None },
            },
            None => ProgressEvent::Empty,
        }
    }
}

fn error_message(
    error: Option<String>,
    detail: Option<bollard::models::ErrorDetail>,
) -> Option<String> {
    error
        .filter(|m| !m.is_empty())
        .or_else(|| detail.map(|d| d.message.unwrap_or_else(|| "Unknown error".to_string())))
}
