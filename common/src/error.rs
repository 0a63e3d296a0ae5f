//! エラー型定義

use thiserror::Error;

/// マーキング操作の拒否理由
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkingError {
    #[error("session is read-only")]
    ReadOnly,

    #[error("a damage form is already open")]
    FormOpen,

    #[error("no damage form is open")]
    NoForm,

    #[error("action is only available while idle")]
    NotIdle,

    #[error("unknown marker: {0}")]
    UnknownMarker(String),

    #[error("description is required")]
    DescriptionRequired,
}

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown damage type: {0}")]
    UnknownDamageType(String),

    #[error("Unknown severity: {0}")]
    UnknownSeverity(String),

    #[error("Marking error: {0}")]
    Marking(#[from] MarkingError),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
