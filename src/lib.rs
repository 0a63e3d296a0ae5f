//! damage-report - 中古車 事前点検の損傷マーキングツール
//!
//! 車両図面への損傷マーキング、点検メモの自動生成、
//! 外部レンダリングサービスによるレポート画像生成を行う。

pub mod cli;
pub mod config;
pub mod error;
pub mod inspect;
pub mod record;
pub mod render;
