use super::RenderTransport;
use crate::error::{DamageReportError, Result};
use damage_report_common::{RenderRequest, RenderResponse};
use std::time::Duration;

const BODY_PREVIEW_CHARS: usize = 200;

/// HTTP (JSON POST) によるレンダリングサービス呼び出し
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > BODY_PREVIEW_CHARS {
        let head: String = trimmed.chars().take(BODY_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}

impl RenderTransport for HttpTransport {
    async fn send(&self, request: &RenderRequest) -> Result<RenderResponse> {
        let response = self.client.post(&self.url).json(request).send().await?;
        let status = response.status();
        let text = response.text().await?;
        log::debug!("renderer responded {} ({} bytes)", status, text.len());

        match serde_json::from_str::<RenderResponse>(&text) {
            Ok(mut body) => {
                if !status.is_success() {
                    body.success = false;
                    if body.error.is_none() {
                        body.error = Some(format!("renderer returned {}", status));
                    }
                }
                Ok(body)
            }
            Err(_) if status.is_success() => Err(DamageReportError::RenderFailed(format!(
                "レスポンスを解釈できません: {}",
                preview(&text)
            ))),
            Err(_) => Ok(RenderResponse {
                success: false,
                error: Some(format!("renderer returned {}: {}", status, preview(&text))),
                ..Default::default()
            }),
        }
    }
}
