//! ダメージマーカーの型定義
//!
//! CLIとデスクトップで共有される型:
//! - DamageType: 16種類の損傷コード
//! - Severity: 損傷の程度（色分け・レポートのグループ化に使用）
//! - DamageMarker: 図面上の1つの損傷記録（唯一の永続化エンティティ）
//! - Snapshot: 永続化メッセージのペイロード

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 基準図面の幅（キャンバス座標系）
pub const CANVAS_WIDTH: f64 = 2029.0;
/// 基準図面の高さ（キャンバス座標系）
pub const CANVAS_HEIGHT: f64 = 765.0;
/// マーカー円の半径（キャンバス座標系）
pub const MARKER_RADIUS: f64 = 32.0;

/// 損傷種別コード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DamageType {
    #[serde(rename = "B")]
    Bent,
    #[serde(rename = "BR")]
    Broken,
    #[serde(rename = "C")]
    Cut,
    #[serde(rename = "CR")]
    Cracked,
    #[serde(rename = "D")]
    Dented,
    #[serde(rename = "F")]
    Faded,
    #[serde(rename = "FI")]
    Filler,
    #[serde(rename = "L")]
    Loose,
    #[serde(rename = "M")]
    Missing,
    #[serde(rename = "P")]
    Pitted,
    #[serde(rename = "PA")]
    Painted,
    #[serde(rename = "PC")]
    PaintChip,
    #[serde(rename = "R")]
    Rubbed,
    #[serde(rename = "RU")]
    Rust,
    #[default]
    #[serde(rename = "S")]
    Scratched,
    #[serde(rename = "ST")]
    Stained,
}

impl DamageType {
    /// 選択肢の表示順（フォームのドロップダウン順）
    pub const ALL: [DamageType; 16] = [
        DamageType::Bent,
        DamageType::Broken,
        DamageType::Cut,
        DamageType::Cracked,
        DamageType::Dented,
        DamageType::Faded,
        DamageType::Filler,
        DamageType::Loose,
        DamageType::Missing,
        DamageType::Pitted,
        DamageType::Painted,
        DamageType::PaintChip,
        DamageType::Rubbed,
        DamageType::Rust,
        DamageType::Scratched,
        DamageType::Stained,
    ];

    /// 短縮コード（"S", "RU" 等）
    pub fn code(&self) -> &'static str {
        match self {
            DamageType::Bent => "B",
            DamageType::Broken => "BR",
            DamageType::Cut => "C",
            DamageType::Cracked => "CR",
            DamageType::Dented => "D",
            DamageType::Faded => "F",
            DamageType::Filler => "FI",
            DamageType::Loose => "L",
            DamageType::Missing => "M",
            DamageType::Pitted => "P",
            DamageType::Painted => "PA",
            DamageType::PaintChip => "PC",
            DamageType::Rubbed => "R",
            DamageType::Rust => "RU",
            DamageType::Scratched => "S",
            DamageType::Stained => "ST",
        }
    }

    /// 人間向けの名称（"Scratched" 等）
    pub fn name(&self) -> &'static str {
        match self {
            DamageType::Bent => "Bent",
            DamageType::Broken => "Broken",
            DamageType::Cut => "Cut",
            DamageType::Cracked => "Cracked",
            DamageType::Dented => "Dented",
            DamageType::Faded => "Faded",
            DamageType::Filler => "Filler",
            DamageType::Loose => "Loose",
            DamageType::Missing => "Missing",
            DamageType::Pitted => "Pitted",
            DamageType::Painted => "Painted",
            DamageType::PaintChip => "Paint Chip",
            DamageType::Rubbed => "Rubbed",
            DamageType::Rust => "Rust",
            DamageType::Scratched => "Scratched",
            DamageType::Stained => "Stained",
        }
    }

    /// 表示ラベル（"S - Scratched"）。レポート見出しはこれを大文字化したもの
    pub fn label(&self) -> String {
        format!("{} - {}", self.code(), self.name())
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for DamageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_uppercase();
        DamageType::ALL
            .iter()
            .copied()
            .find(|t| t.code() == code || t.name().to_uppercase() == code)
            .ok_or_else(|| Error::UnknownDamageType(s.to_string()))
    }
}

/// 損傷の程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Minor,
    Moderate,
    Major,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Minor, Severity::Moderate, Severity::Major];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Major => "major",
        }
    }

    /// マーカー描画色 (RGB)
    pub fn color_rgb(&self) -> [u8; 3] {
        match self {
            Severity::Minor => [0xFF, 0xA5, 0x00],
            Severity::Moderate => [0xFF, 0x6B, 0x35],
            Severity::Major => [0xFF, 0x00, 0x00],
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "minor" | "min" => Ok(Severity::Minor),
            "moderate" | "mod" => Ok(Severity::Moderate),
            "major" | "maj" => Ok(Severity::Major),
            _ => Err(Error::UnknownSeverity(s.to_string())),
        }
    }
}

/// マーカーID（ストア内で一意、編集しても不変）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(String);

impl MarkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MarkerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// ダメージマーカー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageMarker {
    pub id: MarkerId,
    /// キャンバス座標 (0..=2029)
    pub x: f64,
    /// キャンバス座標 (0..=765)
    pub y: f64,
    pub damage_type: DamageType,
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
}

/// 追加前のマーカー（IDは未割り当てでもよい）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkerDraft {
    pub id: Option<MarkerId>,
    pub x: f64,
    pub y: f64,
    pub damage_type: DamageType,
    pub severity: Severity,
    pub description: String,
}

impl MarkerDraft {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    pub fn with_type(mut self, damage_type: DamageType) -> Self {
        self.damage_type = damage_type;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl From<DamageMarker> for MarkerDraft {
    fn from(marker: DamageMarker) -> Self {
        Self {
            id: Some(marker.id),
            x: marker.x,
            y: marker.y,
            damage_type: marker.damage_type,
            severity: marker.severity,
            description: marker.description,
        }
    }
}

/// 部分更新（Noneのフィールドは変更しない）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkerPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub damage_type: Option<DamageType>,
    pub severity: Option<Severity>,
    pub description: Option<String>,
}

impl MarkerPatch {
    pub fn apply(self, marker: &mut DamageMarker) {
        if let Some(x) = self.x {
            marker.x = x;
        }
        if let Some(y) = self.y {
            marker.y = y;
        }
        if let Some(damage_type) = self.damage_type {
            marker.damage_type = damage_type;
        }
        if let Some(severity) = self.severity {
            marker.severity = severity;
        }
        if let Some(description) = self.description {
            marker.description = description;
        }
    }
}

/// 永続化コールバックに渡す (markers, notes) の組
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub markers: Vec<DamageMarker>,
    pub notes: String,
}
