//! 画像選択 → 解析 → チャット のワークフロー制御
//!
//! 状態遷移:
//! - Idle / FileSelected / AnalysisComplete / AnalysisFailed --select--> FileSelected
//! - FileSelected / AnalysisFailed --analyze--> Analyzing
//! - Analyzing --成功--> AnalysisComplete / --失敗--> AnalysisFailed
//! - AnalysisComplete --ask--> AwaitingAnswer --回答--> AnalysisComplete
//!
//! 解析は `begin_analysis` → `AnalysisJob::run` → `apply_analysis` の3段階に
//! 分かれており、実行中でもファイルを選び直せる。各ジョブには世代番号が付き、
//! 選び直し後に届いた古い応答は `apply_analysis` で破棄される。

use crate::chat::{ChatMessage, ChatSession};
use crate::client::{AnalysisClient, Clients};
use crate::error::{AnalysisError, Result, WorkflowError};
use crate::intake::{self, SelectedFile};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use vision_assistant_common::{
    describe, initial_prompt, AnalysisResult, ProbeResult, RenderDescription,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    FileSelected,
    Analyzing,
    AnalysisComplete,
    AnalysisFailed,
    AwaitingAnswer,
}

impl WorkflowState {
    /// 解析ボタンを押せる状態か
    pub fn can_analyze(&self) -> bool {
        matches!(self, WorkflowState::FileSelected | WorkflowState::AnalysisFailed)
    }

    /// 質問を送れる状態か
    pub fn can_ask(&self) -> bool {
        matches!(self, WorkflowState::AnalysisComplete)
    }
}

/// 実行中の解析1件分
///
/// コントローラを借用しないので、待っている間も選び直しができる。
pub struct AnalysisJob {
    generation: u64,
    file: SelectedFile,
    client: Arc<dyn AnalysisClient>,
}

impl AnalysisJob {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn file(&self) -> &SelectedFile {
        &self.file
    }

    pub async fn run(self) -> AnalysisOutcome {
        let encoded = self.file.encode();
        let result = self.client.analyze(&encoded).await;
        AnalysisOutcome {
            generation: self.generation,
            result,
        }
    }
}

#[derive(Debug)]
pub struct AnalysisOutcome {
    pub generation: u64,
    pub result: std::result::Result<AnalysisResult, AnalysisError>,
}

/// 解析結果を反映した結果
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisUpdate {
    Completed {
        description: RenderDescription,
        system_prompt: String,
    },
    Failed {
        message: String,
        error: AnalysisError,
    },
    /// 選び直し済みのため破棄した
    Discarded { generation: u64 },
}

/// スコープを抜けるとき（future の破棄を含む）に状態を戻す
struct RestoreState<'a> {
    state: &'a watch::Sender<WorkflowState>,
    to: WorkflowState,
}

impl Drop for RestoreState<'_> {
    fn drop(&mut self) {
        let prev = self.state.send_replace(self.to);
        if prev != self.to {
            info!(from = ?prev, to = ?self.to, "状態遷移");
        }
    }
}

pub struct WorkflowController {
    analysis: Arc<dyn AnalysisClient>,
    chat: ChatSession,
    state: watch::Sender<WorkflowState>,
    generation: u64,
    selected: Option<SelectedFile>,
    result: Option<AnalysisResult>,
}

impl WorkflowController {
    pub fn new(clients: Clients) -> Self {
        let (state, _) = watch::channel(WorkflowState::Idle);
        Self {
            analysis: clients.analysis,
            chat: ChatSession::new(clients.chat),
            state,
            generation: 0,
            selected: None,
            result: None,
        }
    }

    pub fn state(&self) -> WorkflowState {
        *self.state.borrow()
    }

    /// 状態の変化を購読する（描画層でボタンの有効/無効を切り替える用）
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state.subscribe()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn current_result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        self.chat.transcript()
    }

    pub fn endpoint(&self) -> &str {
        self.analysis.endpoint()
    }

    fn set_state(&self, next: WorkflowState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            info!(from = ?prev, to = ?next, "状態遷移");
        }
    }

    /// ファイルを選択する。不正なファイルの場合は状態を変えない
    pub fn select_file(
        &mut self,
        name: impl Into<String>,
        mime_type: &str,
        bytes: impl Into<Arc<[u8]>>,
    ) -> std::result::Result<&SelectedFile, WorkflowError> {
        let file = intake::validate(name, mime_type, bytes)?;
        Ok(self.accept_file(file))
    }

    /// パスから読み込んで選択する
    pub fn select_path(&mut self, path: &Path) -> Result<&SelectedFile> {
        let file = intake::load(path)?;
        Ok(self.accept_file(file))
    }

    fn accept_file(&mut self, file: SelectedFile) -> &SelectedFile {
        if self.state() == WorkflowState::Analyzing {
            warn!(generation = self.generation, "解析中に選び直されたため応答を破棄します");
        }
        self.generation += 1;
        self.result = None;
        info!(file = %file.name(), size = file.size_bytes(), "ファイル選択");
        self.set_state(WorkflowState::FileSelected);
        self.selected.insert(file)
    }

    /// 解析を開始する
    pub fn begin_analysis(&mut self) -> std::result::Result<AnalysisJob, WorkflowError> {
        if self.state() == WorkflowState::Analyzing {
            return Err(WorkflowError::AnalysisInProgress);
        }
        let file = self.selected.clone().ok_or(WorkflowError::NoFileSelected)?;

        self.generation += 1;
        self.set_state(WorkflowState::Analyzing);

        Ok(AnalysisJob {
            generation: self.generation,
            file,
            client: self.analysis.clone(),
        })
    }

    /// 解析結果を反映する。世代が古い応答は破棄する
    pub fn apply_analysis(&mut self, outcome: AnalysisOutcome) -> AnalysisUpdate {
        if outcome.generation != self.generation || self.state() != WorkflowState::Analyzing {
            warn!(
                stale = outcome.generation,
                current = self.generation,
                "古い解析結果を破棄"
            );
            return AnalysisUpdate::Discarded {
                generation: outcome.generation,
            };
        }

        match outcome.result {
            Ok(result) => {
                let description = describe(&result);
                let system_prompt = initial_prompt(&result);

                self.chat.seed(result.chat_context().clone());
                self.chat.push_system(system_prompt.clone());
                self.result = Some(result);
                self.selected = None;
                self.set_state(WorkflowState::AnalysisComplete);

                AnalysisUpdate::Completed {
                    description,
                    system_prompt,
                }
            }
            Err(error) => {
                warn!(error = %error, "解析失敗");
                let message = self.user_message(&WorkflowError::Analysis(error.clone()));
                self.set_state(WorkflowState::AnalysisFailed);
                AnalysisUpdate::Failed { message, error }
            }
        }
    }

    /// 開始から反映までをまとめて行う
    pub async fn analyze(&mut self) -> std::result::Result<AnalysisUpdate, WorkflowError> {
        let job = self.begin_analysis()?;
        let outcome = job.run().await;
        Ok(self.apply_analysis(outcome))
    }

    /// 選択中ファイルのメタデータだけを送り、バックエンドの設定状況を確認する
    ///
    /// ワークフローの状態は変えない。
    pub async fn probe(&self) -> std::result::Result<ProbeResult, WorkflowError> {
        let file = self.selected.as_ref().ok_or(WorkflowError::NoFileSelected)?;
        let metadata = file.metadata(chrono::Local::now().to_rfc3339());
        Ok(self.analysis.probe(&metadata).await?)
    }

    /// 解析結果について質問する
    ///
    /// 通信失敗は履歴内のアシスタント発言として返る（`Ok`）。
    /// 待機中に future が破棄されても状態は `AnalysisComplete` に戻る。
    pub async fn ask(&mut self, question: &str) -> std::result::Result<String, WorkflowError> {
        let state = self.state();
        if !state.can_ask() {
            return Err(WorkflowError::NoAnalysis(state));
        }

        self.set_state(WorkflowState::AwaitingAnswer);
        let _restore = RestoreState {
            state: &self.state,
            to: WorkflowState::AnalysisComplete,
        };
        let reply = self.chat.ask(question).await;

        Ok(reply?)
    }

    /// エラーを利用者向けの文言にする
    ///
    /// 通信・サービスエラーには確認用にエンドポイントURLを付ける。
    pub fn user_message(&self, err: &WorkflowError) -> String {
        match err {
            WorkflowError::Analysis(AnalysisError::Service { .. })
            | WorkflowError::Analysis(AnalysisError::Transport(_)) => {
                format!("{}\nURL: {}", err, self.endpoint())
            }
            _ => err.to_string(),
        }
    }
}
