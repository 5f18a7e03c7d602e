//! HTTPクライアントのテスト
//!
//! ローカルに立てた疑似エンドポイントに対してリクエスト形式と
//! レスポンス・エラーの扱いを検証

mod support;

use serde_json::json;
use std::time::Duration;
use vision_assistant::client::{AnalysisClient, ChatClient, HttpVisionClient};
use vision_assistant::intake::FileMetadata;
use vision_assistant::{AnalysisError, Config};
use vision_assistant_common::{AnalysisResult, ChatContext};

fn config_for(url: &str) -> Config {
    Config {
        endpoint_url: url.to_string(),
        timeout_seconds: 5,
        retry_delay_ms: 1,
        ..Config::default()
    }
}

/// 物体検出レスポンス
#[tokio::test]
async fn test_analyze_object_response() {
    let (url, endpoint) = support::spawn().await;
    endpoint.respond_json(json!({
        "type": "object",
        "data": {
            "objects_detected": [{"object": "car", "confidence": 0.95}],
            "description": "A car",
            "tags": ["vehicle"]
        },
        "chat_context": {"image_type": "object", "custom": [1, 2, 3]}
    }));

    let client = HttpVisionClient::new(&config_for(&url)).unwrap();
    let result = client.analyze("AAAA").await.unwrap();

    let AnalysisResult::Object { data, chat_context } = result else {
        panic!("object expected");
    };
    assert_eq!(data.detected_objects.len(), 1);
    assert_eq!(data.detected_objects[0].label, "car");
    // chat_context はそのまま保持される
    assert_eq!(
        chat_context.as_value(),
        &json!({"image_type": "object", "custom": [1, 2, 3]})
    );

    let requests = endpoint.requests();
    assert_eq!(requests, vec![json!({"action": "analyze", "image": "AAAA"})]);
}

/// 文書レスポンス（chat_context 省略時は null）
#[tokio::test]
async fn test_analyze_document_without_context() {
    let (url, endpoint) = support::spawn().await;
    endpoint.respond_json(json!({
        "type": "document",
        "data": {"text": "請求書", "tables": [], "key_value_pairs": []}
    }));

    let client = HttpVisionClient::new(&config_for(&url)).unwrap();
    let result = client.analyze("AAAA").await.unwrap();

    assert_eq!(result.kind(), "document");
    assert!(result.chat_context().as_value().is_null());
}

/// HTTP 500 はサービスエラー
#[tokio::test]
async fn test_service_error_keeps_status_and_body() {
    let (url, endpoint) = support::spawn().await;
    endpoint.respond(500, "Internal Server Error");

    let client = HttpVisionClient::new(&config_for(&url)).unwrap();
    let err = client.analyze("AAAA").await.unwrap_err();

    assert_eq!(
        err,
        AnalysisError::Service {
            status: 500,
            body: "Internal Server Error".into()
        }
    );
}

/// 不正なレスポンスはデコードエラー
#[tokio::test]
async fn test_malformed_response_is_decode_error() {
    let (url, endpoint) = support::spawn().await;
    endpoint
        .respond(200, "<html>not json</html>")
        .respond_json(json!({"data": {}}))
        .respond_json(json!({"type": "video", "data": {}}));

    let client = HttpVisionClient::new(&config_for(&url)).unwrap();
    for _ in 0..3 {
        let err = client.analyze("AAAA").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)), "unexpected: {:?}", err);
    }
}

/// サービスエラーは再試行しない
#[tokio::test]
async fn test_service_error_not_retried() {
    let (url, endpoint) = support::spawn().await;
    endpoint
        .respond(503, "busy")
        .respond_json(json!({"type": "document", "data": {}}));

    let config = Config {
        max_retries: 3,
        ..config_for(&url)
    };
    let client = HttpVisionClient::new(&config).unwrap();
    let err = client.analyze("AAAA").await.unwrap_err();

    assert!(matches!(err, AnalysisError::Service { status: 503, .. }));
    assert_eq!(endpoint.requests().len(), 1);
}

/// タイムアウト（通信エラー）は設定回数まで再試行する
#[tokio::test]
async fn test_transport_error_retried() {
    let (url, endpoint) = support::spawn().await;
    endpoint
        .respond_after(Duration::from_millis(1500), 200, "{}")
        .respond_json(json!({"type": "document", "data": {"text": "ok"}}));

    let config = Config {
        timeout_seconds: 1,
        max_retries: 1,
        ..config_for(&url)
    };
    let client = HttpVisionClient::new(&config).unwrap();
    let result = client.analyze("AAAA").await.unwrap();

    assert_eq!(result.kind(), "document");
    assert_eq!(endpoint.requests().len(), 2);
}

/// 再試行なしの設定ではタイムアウトがそのまま返る
#[tokio::test]
async fn test_transport_error_without_retry() {
    let (url, endpoint) = support::spawn().await;
    endpoint.respond_after(Duration::from_millis(1500), 200, "{}");

    let config = Config {
        timeout_seconds: 1,
        ..config_for(&url)
    };
    let client = HttpVisionClient::new(&config).unwrap();
    let err = client.analyze("AAAA").await.unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(endpoint.requests().len(), 1);
}

/// チャットのリクエスト形式と回答の取り出し
#[tokio::test]
async fn test_chat_request_and_answer() {
    let (url, endpoint) = support::spawn().await;
    endpoint
        .respond_json(json!({"answer": "赤い車です"}))
        .respond_json(json!({"reply": "古い形式の回答"}))
        .respond_json(json!({"status": "ok"}));

    let client = HttpVisionClient::new(&config_for(&url)).unwrap();
    let context = ChatContext::new(json!({"image_type": "object", "objects": ["car"]}));

    assert_eq!(
        client.chat("車の色は?", &context).await.unwrap(),
        Some("赤い車です".into())
    );
    assert_eq!(
        client.chat("もう一度", &context).await.unwrap(),
        Some("古い形式の回答".into())
    );
    assert_eq!(client.chat("三回目", &context).await.unwrap(), None);

    let first = &endpoint.requests()[0];
    assert_eq!(
        first,
        &json!({
            "action": "chat",
            "question": "車の色は?",
            "image_context": {"image_type": "object", "objects": ["car"]}
        })
    );
}

/// 接続確認はメタデータと test_mode を送る
#[tokio::test]
async fn test_probe_request_and_response() {
    let (url, endpoint) = support::spawn().await;
    endpoint.respond_json(json!({
        "message": "Function is working",
        "config_status": {"vision": true, "form_recognizer": true, "openai": false, "search": true},
        "azure_services_ready": 3,
        "timestamp": "2024-01-15T10:00:00Z"
    }));

    let client = HttpVisionClient::new(&config_for(&url)).unwrap();
    let metadata = FileMetadata {
        filename: "photo.jpg".into(),
        filesize: 2048,
        filetype: "image/jpeg".into(),
        timestamp: "2024-01-15T10:00:00Z".into(),
    };
    let probe = client.probe(&metadata).await.unwrap();

    assert_eq!(probe.services_ready, 3);
    assert_eq!(probe.config_status.get("openai"), Some(&false));
    assert_eq!(
        endpoint.requests()[0],
        json!({
            "action": "analyze",
            "filename": "photo.jpg",
            "filesize": 2048,
            "filetype": "image/jpeg",
            "timestamp": "2024-01-15T10:00:00Z",
            "test_mode": true
        })
    );
}
