use thiserror::Error;

#[derive(Error, Debug)]
pub enum DamageReportError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("先に車両を保存してからレポート画像を生成してください")]
    MissingSubject,

    #[error("レポート画像を生成中です。完了までお待ちください")]
    RenderInFlight,

    #[error("レポート画像の生成に失敗: {0}")]
    RenderFailed(String),

    #[error("位置が不正です: {0}")]
    InvalidPosition(String),

    #[error("入力エラー: {0}")]
    Prompt(String),

    #[error("HTTP通信エラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] damage_report_common::Error),
}

impl From<damage_report_common::MarkingError> for DamageReportError {
    fn from(err: damage_report_common::MarkingError) -> Self {
        DamageReportError::Common(err.into())
    }
}

pub type Result<T> = std::result::Result<T, DamageReportError>;
