//! 点検レコードファイル（ホスト側の永続化先）
//!
//! マーカーと点検メモを1つのJSONファイルに保存する。
//! コアからの保存要求はベストエフォートで、失敗はログに残すのみ。

use crate::error::{DamageReportError, Result};
use damage_report_common::{
    DamageMarker, DescriptionPolicy, MarkingSession, SessionEvent, SessionInit, Snapshot,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// レコードファイルの構造
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRecord {
    /// 保存済み車両ID（未保存なら None）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub markers: Vec<DamageMarker>,
    #[serde(default)]
    pub notes: String,
    /// 最終保存日時 (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
}

impl InspectionRecord {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DamageReportError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let record: InspectionRecord = serde_json::from_str(&content)?;
        Ok(record)
    }

    /// ファイルが無ければ空のレコード
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn session_init(&self, policy: DescriptionPolicy, read_only: bool) -> SessionInit {
        SessionInit {
            markers: self.markers.clone(),
            notes: self.notes.clone(),
            read_only,
            description_policy: policy,
        }
    }
}

/// 保存コールバック
pub trait SnapshotSink {
    fn persist(&self, snapshot: &Snapshot) -> Result<()>;
}

impl<F> SnapshotSink for F
where
    F: Fn(&Snapshot) -> Result<()>,
{
    fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        self(snapshot)
    }
}

/// レコードファイルへ保存する
#[derive(Debug, Clone)]
pub struct RecordFileSink {
    path: PathBuf,
    subject_id: Option<String>,
}

impl RecordFileSink {
    pub fn new(path: impl Into<PathBuf>, subject_id: Option<String>) -> Self {
        Self {
            path: path.into(),
            subject_id,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSink for RecordFileSink {
    fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let record = InspectionRecord {
            subject_id: self.subject_id.clone(),
            markers: snapshot.markers.clone(),
            notes: snapshot.notes.clone(),
            saved_at: Some(chrono::Local::now().to_rfc3339()),
        };
        record.save(&self.path)?;
        log::info!(
            "saved {} markers to {}",
            snapshot.markers.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// 保存要求を実行（失敗はログのみ、呼び出し元には返さない）
pub fn persist_best_effort(sink: &dyn SnapshotSink, snapshot: &Snapshot) {
    if let Err(err) = sink.persist(snapshot) {
        log::warn!("persistence failed (ignored): {}", err);
    }
}

/// セッションに溜まった保存要求をすべて流す。処理件数を返す
pub fn flush_events(session: &mut MarkingSession, sink: &dyn SnapshotSink) -> usize {
    let events = session.drain_events();
    let count = events.len();
    for event in events {
        match event {
            SessionEvent::Persist(snapshot) => persist_best_effort(sink, &snapshot),
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_record_deserialize_minimal() {
        let record: InspectionRecord = serde_json::from_str("{}").unwrap();
        assert!(record.subject_id.is_none());
        assert!(record.markers.is_empty());
        assert_eq!(record.notes, "");
    }

    #[test]
    fn test_record_serialize_skips_empty_subject() {
        let json = serde_json::to_string(&InspectionRecord::default()).unwrap();
        assert!(!json.contains("subjectId"));
        assert!(!json.contains("savedAt"));
    }

    #[test]
    fn test_closure_sink() {
        let seen = RefCell::new(Vec::new());
        let sink = |snapshot: &Snapshot| -> Result<()> {
            seen.borrow_mut().push(snapshot.notes.clone());
            Ok(())
        };
        persist_best_effort(&sink, &Snapshot {
            markers: Vec::new(),
            notes: "hello".to_string(),
        });
        assert_eq!(seen.borrow().as_slice(), ["hello".to_string()]);
    }

    #[test]
    fn test_failing_sink_is_swallowed() {
        let sink = |_: &Snapshot| -> Result<()> { Err(DamageReportError::Config("down".into())) };
        persist_best_effort(&sink, &Snapshot::default());
    }
}
