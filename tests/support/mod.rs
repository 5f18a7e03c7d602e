//! テスト用のローカル解析エンドポイント
//!
//! 積んだ応答を順番に返し、受け取ったリクエストJSONを記録する。

#![allow(dead_code)]

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ANALYZE_PATH: &str = "/api/analyze_image";

#[derive(Clone)]
struct Scripted {
    delay: Duration,
    status: StatusCode,
    body: String,
}

#[derive(Clone, Default)]
pub struct FakeEndpoint {
    requests: Arc<Mutex<Vec<Value>>>,
    responses: Arc<Mutex<VecDeque<Scripted>>>,
}

impl FakeEndpoint {
    pub fn respond(&self, status: u16, body: impl Into<String>) -> &Self {
        self.respond_after(Duration::ZERO, status, body)
    }

    pub fn respond_json(&self, body: Value) -> &Self {
        self.respond(200, body.to_string())
    }

    pub fn respond_after(&self, delay: Duration, status: u16, body: impl Into<String>) -> &Self {
        self.responses.lock().unwrap().push_back(Scripted {
            delay,
            status: StatusCode::from_u16(status).unwrap(),
            body: body.into(),
        });
        self
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

async fn handle(State(endpoint): State<FakeEndpoint>, Json(body): Json<Value>) -> (StatusCode, String) {
    endpoint.requests.lock().unwrap().push(body);
    let next = endpoint.responses.lock().unwrap().pop_front();
    match next {
        Some(scripted) => {
            if !scripted.delay.is_zero() {
                tokio::time::sleep(scripted.delay).await;
            }
            (scripted.status, scripted.body)
        }
        None => (StatusCode::SERVICE_UNAVAILABLE, "no scripted response".into()),
    }
}

/// 127.0.0.1 の空きポートで起動し、エンドポイントURLを返す
pub async fn spawn() -> (String, FakeEndpoint) {
    let endpoint = FakeEndpoint::default();
    let app = Router::new()
        .route(ANALYZE_PATH, post(handle))
        .layer(DefaultBodyLimit::disable())
        .with_state(endpoint.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}{}", addr, ANALYZE_PATH), endpoint)
}
