use crate::error::{DamageReportError, Result};
use damage_report_common::DescriptionPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// レンダリングサービスURLを上書きする環境変数
pub const RENDERER_URL_ENV: &str = "DAMAGE_REPORT_RENDERER_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub renderer_url: String,
    /// 保存後、生成リクエストを送るまでの待ち時間
    pub settle_delay_ms: u64,
    pub timeout_seconds: u64,
    /// 説明文が空の損傷は登録させない
    pub require_description: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DamageReportError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("damage-report").join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            renderer_url: "http://localhost:3000/api/generate-damage-report-image".into(),
            settle_delay_ms: 500,
            timeout_seconds: 60,
            require_description: true,
        }
    }

    pub fn renderer_url(&self) -> String {
        // 環境変数を優先
        match std::env::var(RENDERER_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => self.renderer_url.clone(),
        }
    }

    pub fn set_renderer_url(&mut self, url: String) -> Result<()> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(DamageReportError::Config(format!(
                "URLは http:// または https:// で始めてください: {}",
                url
            )));
        }
        self.renderer_url = url;
        self.save()
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn description_policy(&self) -> DescriptionPolicy {
        if self.require_description {
            DescriptionPolicy::Required
        } else {
            DescriptionPolicy::Optional
        }
    }
}
