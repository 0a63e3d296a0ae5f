//! レポート画像生成クライアント
//!
//! 1. 多重実行チェック（実行中なら即座に拒否、通信しない）
//! 2. 保存済み車両IDの確認（未保存なら拒否、通信しない）
//! 3. 現在の (markers, notes) を保存し、少し待つ
//! 4. レンダリングサービスへ1回だけリクエスト
//!
//! 失敗してもローカルのマーカー/メモには一切触れない。

mod http;

pub use http::HttpTransport;

use crate::error::{DamageReportError, Result};
use crate::record::{persist_best_effort, SnapshotSink};
use damage_report_common::render::persisted_subject_id;
use damage_report_common::{RenderGate, RenderRequest, RenderResponse, RenderedReport, Snapshot};
use std::future::Future;
use std::time::Duration;

/// レンダリングサービスとの通信路
pub trait RenderTransport {
    fn send(&self, request: &RenderRequest) -> impl Future<Output = Result<RenderResponse>> + Send;
}

pub struct ReportRenderer<T> {
    transport: T,
    gate: RenderGate,
    settle_delay: Duration,
}

impl<T: RenderTransport> ReportRenderer<T> {
    pub fn new(transport: T, settle_delay: Duration) -> Self {
        Self {
            transport,
            gate: RenderGate::new(),
            settle_delay,
        }
    }

    /// 生成中か（ボタンの無効化に使う）
    pub fn is_busy(&self) -> bool {
        self.gate.is_in_flight()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// レポート画像を生成し、画像の参照を返す
    pub async fn generate(
        &self,
        subject_id: Option<&str>,
        snapshot: &Snapshot,
        sink: &dyn SnapshotSink,
    ) -> Result<RenderedReport> {
        let _permit = self
            .gate
            .try_acquire()
            .ok_or(DamageReportError::RenderInFlight)?;

        let subject_id = persisted_subject_id(subject_id).ok_or(DamageReportError::MissingSubject)?;

        // 生成画像と保存済みメモがずれないよう、先に保存しておく
        log::info!("saving notes before rendering report for {}", subject_id);
        persist_best_effort(sink, snapshot);
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let request = RenderRequest::new(subject_id, snapshot);
        log::info!(
            "requesting damage report image: {} markers",
            request.markers.len()
        );
        let response = self.transport.send(&request).await?;

        match response.into_outcome() {
            Ok(report) => {
                log::info!("damage report image generated: {}", report.image_url);
                Ok(report)
            }
            Err(message) => {
                log::warn!("damage report image failed: {}", message);
                Err(DamageReportError::RenderFailed(message))
            }
        }
    }
}
