//! レポート画像生成サービスとの境界
//!
//! リクエスト/レスポンスのワイヤ形式と、多重実行を防ぐゲート。
//! 通信そのものは各ホスト（CLI / デスクトップ）が担当する。

use crate::types::{DamageMarker, Snapshot};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// 未保存レコードに割り当てられる仮ID
pub const UNSAVED_SUBJECT_PLACEHOLDER: &str = "temp-car-id";

/// 永続化済みの対象IDを取り出す（未保存・空なら None）
pub fn persisted_subject_id(subject: Option<&str>) -> Option<&str> {
    let id = subject?.trim();
    if id.is_empty() || id == UNSAVED_SUBJECT_PLACEHOLDER {
        None
    } else {
        Some(id)
    }
}

/// レンダリングサービスへのリクエスト
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    #[serde(rename = "carId")]
    pub subject_id: String,
    #[serde(rename = "damageAnnotations")]
    pub markers: Vec<DamageMarker>,
    #[serde(rename = "inspectionNotes")]
    pub notes: String,
}

impl RenderRequest {
    pub fn new(subject_id: impl Into<String>, snapshot: &Snapshot) -> Self {
        Self {
            subject_id: subject_id.into(),
            markers: snapshot.markers.clone(),
            notes: snapshot.notes.clone(),
        }
    }
}

/// レンダリングサービスのレスポンス
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderResponse {
    pub success: bool,
    pub image_url: Option<String>,
    pub file_name: Option<String>,
    pub error: Option<String>,
    /// 失敗時の補足（文字列またはオブジェクト）
    pub details: Option<serde_json::Value>,
}

/// 生成された画像の参照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedReport {
    pub image_url: String,
    pub file_name: String,
}

impl RenderResponse {
    /// 成功なら画像参照、失敗ならオペレータ向けメッセージ
    pub fn into_outcome(self) -> std::result::Result<RenderedReport, String> {
        if !self.success {
            let mut message = self
                .error
                .unwrap_or_else(|| "renderer reported failure".to_string());
            match self.details {
                Some(serde_json::Value::String(details)) if !details.is_empty() => {
                    message = format!("{} ({})", message, details);
                }
                Some(serde_json::Value::String(_)) | Some(serde_json::Value::Null) | None => {}
                Some(other) => {
                    message = format!("{} ({})", message, other);
                }
            }
            return Err(message);
        }

        let image_url = match self.image_url {
            Some(url) if !url.trim().is_empty() => url,
            _ => return Err("renderer returned no image URL".to_string()),
        };
        let file_name = self
            .file_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| file_name_from_url(&image_url));

        Ok(RenderedReport {
            image_url,
            file_name,
        })
    }
}

fn file_name_from_url(url: &str) -> String {
    url.split('?')
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("damage-report.png")
        .to_string()
}

/// 生成処理の多重実行防止
///
/// 実行中は `try_acquire` が `None` を返す。許可証をドロップすると解放。
#[derive(Debug, Default)]
pub struct RenderGate {
    in_flight: AtomicBool,
}

impl RenderGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<RenderPermit<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RenderPermit { gate: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct RenderPermit<'a> {
    gate: &'a RenderGate,
}

impl Drop for RenderPermit<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::Release);
    }
}
