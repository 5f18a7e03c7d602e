//! 端末での対話モード
//!
//! 解析結果の表示と、チャット・ファイル選び直しのコマンドループ。
//!
//! コマンド:
//! - `/open <path>` 画像を選び直す
//! - `/analyze` 選択中の画像を解析（失敗後の再試行にも使う）
//! - `/probe` メタデータのみで接続確認
//! - `/history` 会話履歴を表示
//! - `/quit` 終了
//! - それ以外の入力は質問として送信

use crate::chat::ChatMessage;
use crate::error::{Result, VisionError};
use crate::workflow::{AnalysisUpdate, WorkflowController, WorkflowState};
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use vision_assistant_common::{describe_probe, AnalysisResult, RenderDescription};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(PathBuf),
    Analyze,
    Probe,
    History,
    Help,
    Quit,
    Ask(String),
}

/// 入力行をコマンドに変換
pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Ask(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "open" if !arg.is_empty() => Command::Open(PathBuf::from(arg)),
        "analyze" | "retry" => Command::Analyze,
        "probe" => Command::Probe,
        "history" => Command::History,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Help,
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// 選択中の画像を解析して結果を表示。成功したら true
pub async fn run_analysis(wf: &mut WorkflowController, json: bool) -> Result<bool> {
    let pb = spinner("解析中...");
    let update = wf.analyze().await;
    pb.finish_and_clear();

    match update? {
        AnalysisUpdate::Completed { description, system_prompt } => {
            let output = completed_output(wf.current_result(), &description, &system_prompt, json)?;
            print!("{}", output.stdout);
            eprint!("{}", output.stderr);
            Ok(true)
        }
        AnalysisUpdate::Failed { message, .. } => {
            println!("❌ 解析に失敗しました: {}", message);
            println!("   /analyze で再試行できます");
            Ok(false)
        }
        AnalysisUpdate::Discarded { .. } => Ok(false),
    }
}

/// 解析成功時の出力
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CompletedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// 解析成功時の表示内容を組み立てる
///
/// `json` のときは標準出力を解析結果のJSONだけにし、最初のAI発言は標準エラーへ回す。
pub fn completed_output(
    result: Option<&AnalysisResult>,
    description: &RenderDescription,
    system_prompt: &str,
    json: bool,
) -> Result<CompletedOutput> {
    let prompt_line = format!("🤖 AI: {}\n", system_prompt);
    if !json {
        return Ok(CompletedOutput {
            stdout: format!("{}\n{}", description, prompt_line),
            stderr: String::new(),
        });
    }

    let stdout = match result {
        Some(result) => format!("{}\n", serde_json::to_string_pretty(result)?),
        None => String::new(),
    };
    Ok(CompletedOutput {
        stdout,
        stderr: prompt_line,
    })
}

/// 接続確認を実行して表示
pub async fn run_probe(wf: &WorkflowController) -> Result<()> {
    let pb = spinner("接続確認中...");
    let probe = wf.probe().await;
    pb.finish_and_clear();

    println!("{}", describe_probe(&probe?));
    Ok(())
}

fn print_message(message: &ChatMessage) {
    println!(
        "[{}] {}: {}",
        message.timestamp.format("%H:%M:%S"),
        message.sender.label(),
        message.text
    );
}

fn print_help() {
    println!("コマンド: /open <path>  /analyze  /probe  /history  /quit");
    println!("それ以外の入力は解析結果への質問として送信します");
}

fn prompt_label(state: WorkflowState) -> &'static str {
    match state {
        WorkflowState::AnalysisComplete => "質問",
        WorkflowState::AnalysisFailed => "再試行は /analyze",
        _ => "コマンド",
    }
}

/// 対話ループ
pub async fn run_chat_loop(wf: &mut WorkflowController) -> Result<()> {
    print_help();

    loop {
        let line: String = Input::new()
            .with_prompt(prompt_label(wf.state()))
            .allow_empty(true)
            .interact_text()
            .map_err(|e| VisionError::Prompt(e.to_string()))?;

        match parse_command(&line) {
            Command::Quit => break,
            Command::Help => print_help(),
            Command::History => wf.transcript().iter().for_each(print_message),
            Command::Open(path) => match wf.select_path(&path) {
                Ok(file) => println!(
                    "✔ {} ({} • {})  /analyze で解析します",
                    file.name(),
                    file.size_label(),
                    file.mime_type()
                ),
                Err(e) => println!("❌ {}", e),
            },
            Command::Analyze => {
                if let Err(e) = run_analysis(wf, false).await {
                    report(wf, e);
                }
            }
            Command::Probe => {
                if let Err(e) = run_probe(wf).await {
                    report(wf, e);
                }
            }
            Command::Ask(question) => match wf.ask(&question).await {
                Ok(reply) => println!("🤖 AI: {}", reply),
                Err(e) => println!("❌ {}", wf.user_message(&e)),
            },
        }
    }

    Ok(())
}

fn report(wf: &WorkflowController, err: VisionError) {
    println!("❌ {}", error_message(wf, &err));
}

/// 利用者に見せるエラー文言（ワークフローのエラーは接続先URL付き）
pub fn error_message(wf: &WorkflowController, err: &VisionError) -> String {
    match err {
        VisionError::Workflow(e) => wf.user_message(e),
        other => other.to_string(),
    }
}
