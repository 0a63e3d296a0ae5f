use clap::{Parser, Subcommand};
use damage_report_common::{DamageType, Severity};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "damage-report")]
#[command(about = "中古車 事前点検の損傷マーキング・点検メモ生成ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 点検メモを表示
    Notes {
        /// 点検レコードJSONファイル
        #[arg(required = true)]
        record: PathBuf,

        /// マーカーから再生成したメモを表示（手入力分は無視）
        #[arg(long)]
        regenerate: bool,
    },

    /// 損傷を追加（未指定の分類は対話入力）
    Add {
        /// 点検レコードJSONファイル（無ければ作成）
        #[arg(required = true)]
        record: PathBuf,

        /// X座標（表示サイズ指定時は画面ピクセル）
        #[arg(short, long)]
        x: f64,

        /// Y座標（表示サイズ指定時は画面ピクセル）
        #[arg(short, long)]
        y: f64,

        /// 図面の表示幅（px）
        #[arg(long, requires = "rendered_height")]
        rendered_width: Option<f64>,

        /// 図面の表示高さ（px）
        #[arg(long, requires = "rendered_width")]
        rendered_height: Option<f64>,

        /// 損傷種別コード (B/BR/C/CR/D/F/FI/L/M/P/PA/PC/R/RU/S/ST)
        #[arg(short = 't', long = "type")]
        damage_type: Option<DamageType>,

        /// 程度 (minor/moderate/major)
        #[arg(short, long)]
        severity: Option<Severity>,

        /// 説明
        #[arg(short, long)]
        description: Option<String>,
    },

    /// 既存の損傷を編集
    Update {
        /// 点検レコードJSONファイル
        #[arg(required = true)]
        record: PathBuf,

        /// マーカーID
        #[arg(long)]
        id: String,

        /// 損傷種別コード
        #[arg(short = 't', long = "type")]
        damage_type: Option<DamageType>,

        /// 程度
        #[arg(short, long)]
        severity: Option<Severity>,

        /// 説明
        #[arg(short, long)]
        description: Option<String>,
    },

    /// 損傷を削除
    Delete {
        /// 点検レコードJSONファイル
        #[arg(required = true)]
        record: PathBuf,

        /// マーカーID
        #[arg(long)]
        id: String,
    },

    /// すべての損傷と点検メモを消去
    Clear {
        /// 点検レコードJSONファイル
        #[arg(required = true)]
        record: PathBuf,
    },

    /// レポート画像を生成
    Render {
        /// 点検レコードJSONファイル
        #[arg(required = true)]
        record: PathBuf,

        /// 車両ID（省略時はレコードの値）
        #[arg(long)]
        subject: Option<String>,

        /// 結果をJSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 設定を表示/編集
    Config {
        /// レンダリングサービスのURLを設定
        #[arg(long)]
        set_renderer_url: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_with_classification() {
        let cli = Cli::try_parse_from([
            "damage-report", "add", "car.json", "-x", "500", "-y", "200",
            "--rendered-width", "1000", "--rendered-height", "400",
            "--type", "pc", "--severity", "major", "-d", "bonnet",
        ])
        .unwrap();

        match cli.command {
            Commands::Add { x, rendered_width, damage_type, severity, description, .. } => {
                assert_eq!(x, 500.0);
                assert_eq!(rendered_width, Some(1000.0));
                assert_eq!(damage_type, Some(DamageType::PaintChip));
                assert_eq!(severity, Some(Severity::Major));
                assert_eq!(description.as_deref(), Some("bonnet"));
            }
            _ => panic!("Addとして解析されない"),
        }
    }

    #[test]
    fn test_parse_rendered_size_requires_both() {
        let result = Cli::try_parse_from([
            "damage-report", "add", "car.json", "-x", "1", "-y", "1", "--rendered-width", "1000",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_unknown_damage_type() {
        let result = Cli::try_parse_from([
            "damage-report", "update", "car.json", "--id", "m1", "--type", "ZZ",
        ]);
        assert!(result.is_err());
    }
}
