//! 解析結果をもとにしたチャットセッション
//!
//! 履歴はワークフロー単位で保持し、新しい解析を行っても消さない。
//! `ask` は `&mut self` を取るため、同時に複数の質問が走ることはない。
//! `ask` の future を途中で破棄した場合、その質問は履歴に残らない。

use crate::client::ChatClient;
use crate::error::AnalysisError;
use chrono::{DateTime, Local};
use std::sync::Arc;
use tracing::{debug, warn};
use vision_assistant_common::ChatContext;

/// 回答が含まれない応答のときに表示する文言
pub const NO_ANSWER_PLACEHOLDER: &str = "申し訳ありません、現在お答えできません。";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    System,
    Assistant,
}

impl Sender {
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "👤 あなた",
            Sender::System | Sender::Assistant => "🤖 AI",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl ChatMessage {
    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: Local::now(),
        }
    }
}

pub struct ChatSession {
    client: Arc<dyn ChatClient>,
    context: Option<ChatContext>,
    transcript: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self {
            client,
            context: None,
            transcript: Vec::new(),
        }
    }

    /// 解析完了ごとに1回呼ぶ。以前のコンテキストは置き換える
    pub fn seed(&mut self, context: ChatContext) {
        self.context = Some(context);
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    pub fn push_system(&mut self, text: impl Into<String>) {
        self.transcript.push(ChatMessage::new(Sender::System, text));
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// 質問を送信し、履歴に追加した回答（またはエラー文）を返す
    ///
    /// 空の質問・未解析の場合は通信せず `EmptyQuestion` を返す。
    /// 通信エラーは `Err` にせず、履歴にアシスタントの発言として残す。
    pub async fn ask(&mut self, question: &str) -> Result<String, AnalysisError> {
        let question = question.trim();
        let context = match &self.context {
            Some(context) if !question.is_empty() => context,
            _ => return Err(AnalysisError::EmptyQuestion),
        };

        // 質問と回答は応答が届いてから一緒に追加する（途中で中断されても履歴が崩れない）
        let asked = ChatMessage::new(Sender::User, question);
        debug!(turn = self.transcript.len() + 1, "質問送信");

        let reply = match self.client.chat(question, context).await {
            Ok(Some(answer)) => answer,
            Ok(None) => NO_ANSWER_PLACEHOLDER.to_string(),
            Err(e) => {
                warn!(error = %e, "チャット呼び出し失敗");
                format!("エラー: {}", e)
            }
        };

        self.transcript.push(asked);
        self.transcript.push(ChatMessage::new(Sender::Assistant, reply.clone()));
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::ScriptedClient;
    use serde_json::json;

    fn seeded(client: &Arc<ScriptedClient>) -> ChatSession {
        let mut session = ChatSession::new(client.clone());
        session.seed(ChatContext::new(json!({"image_type": "object"})));
        session
    }

    #[tokio::test]
    async fn test_empty_question_makes_no_call() {
        let client = Arc::new(ScriptedClient::default());
        let mut session = seeded(&client);

        assert_eq!(session.ask("").await, Err(AnalysisError::EmptyQuestion));
        assert_eq!(session.ask("   ").await, Err(AnalysisError::EmptyQuestion));
        assert_eq!(client.chat_count(), 0);
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_unseeded_session_rejects() {
        let client = Arc::new(ScriptedClient::default());
        let mut session = ChatSession::new(client.clone());

        assert_eq!(session.ask("何が写っていますか").await, Err(AnalysisError::EmptyQuestion));
        assert_eq!(client.chat_count(), 0);
        assert!(!session.has_context());
    }

    #[tokio::test]
    async fn test_answer_appended_after_question() {
        let client = Arc::new(ScriptedClient::default());
        client.push_answer(Ok(Some("赤い車です".into())));
        let mut session = seeded(&client);

        let reply = session.ask("  車の色は?  ").await.unwrap();
        assert_eq!(reply, "赤い車です");

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].sender, Sender::User);
        assert_eq!(transcript[0].text, "車の色は?");
        assert_eq!(transcript[1].sender, Sender::Assistant);
        assert_eq!(transcript[1].text, "赤い車です");
        assert_eq!(
            client.last_context.lock().unwrap().clone(),
            Some(ChatContext::new(json!({"image_type": "object"})))
        );
    }

    #[tokio::test]
    async fn test_missing_answer_uses_placeholder() {
        let client = Arc::new(ScriptedClient::default());
        client.push_answer(Ok(None));
        let mut session = seeded(&client);

        assert_eq!(session.ask("質問").await.unwrap(), NO_ANSWER_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_failure_rendered_inline() {
        let client = Arc::new(ScriptedClient::default());
        client.push_answer(Err(AnalysisError::Service {
            status: 500,
            body: "boom".into(),
        }));
        let mut session = seeded(&client);

        let reply = session.ask("質問").await.unwrap();
        assert!(reply.starts_with("エラー: "));
        assert!(reply.contains("500"));
        let last = session.transcript().last().unwrap();
        assert_eq!(last.sender, Sender::Assistant);
        assert_eq!(last.text, reply);
    }

    #[tokio::test]
    async fn test_abandoned_question_leaves_no_trace() {
        let client = Arc::new(ScriptedClient::default());
        *client.chat_delay.lock().unwrap() = std::time::Duration::from_millis(500);
        let mut session = seeded(&client);

        let abandoned =
            tokio::time::timeout(std::time::Duration::from_millis(20), session.ask("一つ目")).await;
        assert!(abandoned.is_err());
        assert!(session.transcript().is_empty());

        *client.chat_delay.lock().unwrap() = std::time::Duration::ZERO;
        client.push_answer(Ok(Some("速い回答".into())));
        session.ask("二つ目").await.unwrap();
        let texts: Vec<&str> = session.transcript().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["二つ目", "速い回答"]);
    }

    #[tokio::test]
    async fn test_reseed_keeps_transcript() {
        let client = Arc::new(ScriptedClient::default());
        client.push_answer(Ok(Some("1".into())));
        client.push_answer(Ok(Some("2".into())));
        let mut session = seeded(&client);

        session.ask("一つ目").await.unwrap();
        session.seed(ChatContext::new(json!({"image_type": "document"})));
        session.ask("二つ目").await.unwrap();

        assert_eq!(session.transcript().len(), 4);
        assert_eq!(
            client.last_context.lock().unwrap().clone(),
            Some(ChatContext::new(json!({"image_type": "document"})))
        );
    }
}
