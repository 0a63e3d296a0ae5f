use damage_report_common::{DamageMarker, DescriptionPolicy, MarkingSession, SessionInit, Snapshot};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 点検レコードファイル（CLIと同じ形式）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    pub markers: Vec<DamageMarker>,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
}

impl RecordFile {
    pub fn from_snapshot(subject_id: Option<String>, snapshot: Snapshot) -> Self {
        Self {
            subject_id,
            markers: snapshot.markers,
            notes: snapshot.notes,
            saved_at: None,
        }
    }
}

pub struct AppState {
    pub session: MarkingSession,
    pub subject_id: String,
    pub source_path: Option<PathBuf>,
    pub policy: DescriptionPolicy,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_policy(DescriptionPolicy::Required)
    }
}

impl AppState {
    /// 空のレコードで開始
    pub fn with_policy(policy: DescriptionPolicy) -> Self {
        Self::from_record(RecordFile::default(), None, false, policy)
    }

    pub fn from_record(
        record: RecordFile,
        source_path: Option<PathBuf>,
        read_only: bool,
        policy: DescriptionPolicy,
    ) -> Self {
        let session = MarkingSession::new(SessionInit {
            markers: record.markers,
            notes: record.notes,
            read_only,
            description_policy: policy,
        });
        Self {
            session,
            subject_id: record.subject_id.unwrap_or_default(),
            source_path,
            policy,
        }
    }

    /// 閲覧専用の切替（現在の内容でセッションを作り直す）
    pub fn set_read_only(&mut self, read_only: bool) {
        if self.session.is_read_only() == read_only {
            return;
        }
        let snapshot = self.session.snapshot();
        self.session = MarkingSession::new(SessionInit {
            markers: snapshot.markers,
            notes: snapshot.notes,
            read_only,
            description_policy: self.policy,
        });
    }

    pub fn subject(&self) -> Option<String> {
        let trimmed = self.subject_id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    pub fn to_record(&self, snapshot: Snapshot) -> RecordFile {
        RecordFile::from_snapshot(self.subject(), snapshot)
    }
}
