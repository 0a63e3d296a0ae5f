use anyhow::{Context, Result};
use damage_report_common::DescriptionPolicy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::RecordFile;

/// CLI設定ファイルのうちエディタが使う項目
#[derive(Debug, Deserialize)]
#[serde(default)]
struct SharedConfig {
    require_description: bool,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            require_description: true,
        }
    }
}

fn shared_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("damage-report").join("config.json"))
}

/// CLIと同じ設定ファイルから説明必須かどうかを決める（読めなければ必須）
pub fn load_description_policy() -> DescriptionPolicy {
    match shared_config_path() {
        Some(path) if path.exists() => description_policy_from(&path),
        _ => DescriptionPolicy::Required,
    }
}

fn description_policy_from(path: &Path) -> DescriptionPolicy {
    let config = fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))
        .and_then(|content| {
            serde_json::from_str::<SharedConfig>(&content)
                .with_context(|| format!("parse {}", path.display()))
        });
    match config {
        Ok(config) if !config.require_description => DescriptionPolicy::Optional,
        Ok(_) => DescriptionPolicy::Required,
        Err(err) => {
            log::warn!("config ignored: {err:#}");
            DescriptionPolicy::Required
        }
    }
}

pub fn load_record(path: &Path) -> Result<RecordFile> {
    let content = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let record: RecordFile =
        serde_json::from_str(&content).with_context(|| format!("parse {}", path.display()))?;
    Ok(record)
}

pub fn save_record(path: &Path, record: &RecordFile) -> Result<()> {
    let content = serde_json::to_string_pretty(record)?;
    fs::write(path, content).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// 背景図面を読み込み、RGBAピクセルにする
pub fn load_diagram_pixels(path: &Path) -> Result<([usize; 2], Vec<u8>)> {
    let image = image::ImageReader::open(path)
        .with_context(|| format!("open {}", path.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("decode {}", path.display()))?;
    let size = [image.width() as usize, image.height() as usize];
    Ok((size, image.to_rgba8().into_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use damage_report_common::{DamageMarker, DamageType, MarkerId, Severity};

    #[test]
    fn test_description_policy_from_cli_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        fs::write(&path, r#"{"renderer_url":"http://x","require_description":false}"#).unwrap();
        assert_eq!(description_policy_from(&path), DescriptionPolicy::Optional);

        fs::write(&path, r#"{"settle_delay_ms":0}"#).unwrap();
        assert_eq!(description_policy_from(&path), DescriptionPolicy::Required);

        fs::write(&path, "not json").unwrap();
        assert_eq!(description_policy_from(&path), DescriptionPolicy::Required);
    }

    #[test]
    fn test_save_and_load_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("car.json");
        let record = RecordFile {
            subject_id: Some("car-9".to_string()),
            markers: vec![DamageMarker {
                id: MarkerId::new("m1"),
                x: 1.0,
                y: 2.0,
                damage_type: DamageType::Rust,
                severity: Severity::Moderate,
                description: "sill".to_string(),
            }],
            notes: "notes".to_string(),
            saved_at: None,
        };

        save_record(&path, &record).unwrap();
        let loaded = load_record(&path).unwrap();
        assert_eq!(loaded.subject_id.as_deref(), Some("car-9"));
        assert_eq!(loaded.markers, record.markers);
        assert_eq!(loaded.notes, "notes");
    }

    #[test]
    fn test_load_missing_record_has_context() {
        let err = load_record(Path::new("/nonexistent/car.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/car.json"));
    }

    #[test]
    fn test_load_diagram_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagram.png");
        image::RgbaImage::from_pixel(4, 2, image::Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let (size, pixels) = load_diagram_pixels(&path).unwrap();
        assert_eq!(size, [4, 2]);
        assert_eq!(pixels.len(), 4 * 2 * 4);
    }
}
