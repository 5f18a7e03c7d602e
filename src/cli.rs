use crate::config::{ClientMode, MockKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vision-assistant")]
#[command(about = "画像AI解析・チャットアシスタント", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// モッククライアントを使う（設定より優先）
    #[arg(long, global = true)]
    pub mock: bool,

    /// モック応答の種類
    #[arg(long, global = true)]
    pub mock_kind: Option<MockKind>,

    /// エンドポイントURL（設定より優先）
    #[arg(long, global = true)]
    pub endpoint: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像を解析して結果を表示
    Analyze {
        /// 画像ファイル (JPEG/PNG/GIF, 4MBまで)
        #[arg(required = true)]
        file: PathBuf,

        /// 解析後に対話チャットを開始
        #[arg(short, long)]
        chat: bool,

        /// 解析結果をJSONで出力
        #[arg(long)]
        json: bool,
    },

    /// メタデータのみ送信してバックエンドの設定状況を確認
    Probe {
        /// 画像ファイル
        #[arg(required = true)]
        file: PathBuf,
    },

    /// 設定の表示・変更
    Config {
        /// エンドポイントURLを設定
        #[arg(long)]
        set_endpoint: Option<String>,

        /// クライアント種別を設定 (http/mock)
        #[arg(long)]
        set_client: Option<ClientMode>,

        /// 現在の設定を表示
        #[arg(long)]
        show: bool,
    },
}
