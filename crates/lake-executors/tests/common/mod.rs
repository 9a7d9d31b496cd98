#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::{Json, Router, routing::post};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// What the mock coordinator saw on its last statement submission.
#[derive(Debug, Clone, Default)]
pub struct CapturedStatement {
    pub user: Option<String>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub body: String,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: serde_json::Value,
    hits: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<CapturedStatement>>>,
}

pub struct MockTrino {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<CapturedStatement>>>,
}

impl MockTrino {
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub async fn last_statement(&self) -> Option<CapturedStatement> {
        self.last.lock().await.clone()
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn statement(
    State(state): State<MockState>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<serde_json::Value>) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    *state.last.lock().await = Some(CapturedStatement {
        user: header(&headers, "x-trino-user"),
        catalog: header(&headers, "x-trino-catalog"),
        schema: header(&headers, "x-trino-schema"),
        body,
    });
    (state.status, Json(state.body.clone()))
}

/// Coordinator stand-in answering `POST /v1/statement` with a fixed response.
pub async fn spawn_trino(status: u16, body: serde_json::Value) -> MockTrino {
    let hits = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(Mutex::new(None));
    let state = MockState {
        status: StatusCode::from_u16(status).expect("valid status"),
        body,
        hits: Arc::clone(&hits),
        last: Arc::clone(&last),
    };
    let app = Router::new()
        .route("/v1/statement", post(statement))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve app");
    });
    MockTrino { addr, hits, last }
}
