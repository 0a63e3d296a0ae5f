use clap::Parser;
use damage_report_common::MarkerId;
use damage_report_rust::{cli, config, error, inspect, render};
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use inspect::{Classification, Inspection, Placement};
use render::{HttpTransport, ReportRenderer};
use std::io::IsTerminal;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let mut config = Config::load()?;
    let interactive = std::io::stdin().is_terminal();

    match cli.command {
        Commands::Notes { record, regenerate } => {
            let inspection = Inspection::open(&record, config.description_policy())?;
            let notes = inspection.notes(regenerate);
            if notes.is_empty() {
                println!("(点検メモはありません)");
            } else {
                println!("{}", notes);
            }
            log::debug!("notes: {}", inspection.session().notes().limit_label());
        }

        Commands::Add {
            record,
            x,
            y,
            rendered_width,
            rendered_height,
            damage_type,
            severity,
            description,
        } => {
            println!("🚗 damage-report - 損傷を追加\n");

            let mut inspection = Inspection::open(&record, config.description_policy())?;
            let placement = Placement {
                x,
                y,
                rendered: rendered_width.zip(rendered_height),
            };
            let classification = Classification { damage_type, severity, description };

            let id = inspection.add_marker(placement, &classification, interactive)?;
            if let Some(marker) = inspection.session().store().get(&id) {
                println!(
                    "✔ {} を追加: {} ({}) at ({:.0}, {:.0})",
                    id, marker.damage_type.label(), marker.severity, marker.x, marker.y
                );
            }
            println!("✔ 保存: {}", inspection.path().display());
            print_limit(&inspection);
        }

        Commands::Update {
            record,
            id,
            damage_type,
            severity,
            description,
        } => {
            let mut inspection = Inspection::open(&record, config.description_policy())?;
            let id = MarkerId::new(id);
            let classification = Classification { damage_type, severity, description };

            inspection.update_marker(&id, &classification, interactive)?;
            println!("✔ {} を更新しました", id);
            print_limit(&inspection);
        }

        Commands::Delete { record, id } => {
            let mut inspection = Inspection::open(&record, config.description_policy())?;
            let id = MarkerId::new(id);

            if inspection.delete_marker(&id)? {
                println!("✔ {} を削除しました", id);
            } else {
                println!("{} は存在しません", id);
            }
        }

        Commands::Clear { record } => {
            let mut inspection = Inspection::open(&record, config.description_policy())?;
            let count = inspection.session().store().len();
            inspection.clear()?;
            println!("✔ {}件の損傷と点検メモを消去しました", count);
        }

        Commands::Render { record, subject, json } => {
            let mut inspection = Inspection::open(&record, config.description_policy())?;
            if let Some(subject) = subject {
                inspection.set_subject_id(subject);
            }

            let transport = HttpTransport::new(config.renderer_url(), config.timeout())?;
            let renderer = ReportRenderer::new(transport, config.settle_delay());

            let spinner = ProgressBar::new_spinner();
            if !json {
                spinner.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                spinner.set_message("レポート画像を生成中...");
                spinner.enable_steady_tick(Duration::from_millis(120));
            }

            let snapshot = inspection.session_mut().begin_render_save();
            let result = renderer
                .generate(inspection.subject_id(), &snapshot, inspection.sink())
                .await;
            inspection.session_mut().finish_render_save();
            spinner.finish_and_clear();

            let report = result?;
            if json {
                println!("{}", serde_json::to_string(&report)?);
            } else {
                println!("✅ レポート画像を生成しました");
                println!("  URL: {}", report.image_url);
                println!("  ファイル名: {}", report.file_name);
            }
        }

        Commands::Config { set_renderer_url, show } => {
            if let Some(url) = set_renderer_url {
                config.set_renderer_url(url)?;
                println!("✔ レンダリングサービスのURLを設定しました");
            }

            if show {
                println!("設定:");
                println!("  レンダリングURL: {}", config.renderer_url());
                println!("  保存後の待ち時間: {}ms", config.settle_delay_ms);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!(
                    "  説明の入力: {}",
                    if config.require_description { "必須" } else { "任意" }
                );
                println!("  設定ファイル: {}", Config::config_path()?.display());
            }
        }
    }

    Ok(())
}

/// 点検メモの文字数（上限超過は警告）
fn print_limit(inspection: &Inspection) {
    let notes = inspection.session().notes();
    if notes.is_over_limit() {
        println!("⚠ 点検メモが長すぎます: {}", notes.limit_label());
    } else {
        println!("  点検メモ: {}", notes.limit_label());
    }
}
