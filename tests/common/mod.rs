// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Stub HTTP server shared by the integration tests
#![allow(dead_code)]

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::Router;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use school_assistant::utils::RetryPolicy;

/// One request seen by the stub
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    }
}

type Responder = Arc<dyn Fn(&Recorded) -> (StatusCode, String) + Send + Sync>;

#[derive(Clone)]
struct StubState {
    recorded: Arc<Mutex<Vec<Recorded>>>,
    responder: Responder,
}

/// Server on 127.0.0.1:0 answering every request with `responder`
pub struct StubServer {
    pub base_url: String,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&Recorded) -> (StatusCode, String) + Send + Sync + 'static,
    {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            recorded: recorded.clone(),
            responder: Arc::new(responder),
        };
        let app = Router::new().fallback(handle).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            recorded,
        }
    }

    /// Stub that always answers with `status` and `body`
    pub async fn fixed(status: StatusCode, body: &str) -> Self {
        let body = body.to_string();
        Self::start(move |_| (status, body.clone())).await
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

async fn handle(
    State(state): State<StubState>,
    headers: HeaderMap,
    uri: Uri,
    body: String,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let recorded = Recorded {
        path: uri.path().to_string(),
        query: uri.query().map(|q| q.to_string()),
        headers,
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    };
    let (status, response) = (state.responder)(&recorded);
    state.recorded.lock().unwrap().push(recorded);
    (status, [(header::CONTENT_TYPE, "application/json")], response)
}

/// One retry with a short backoff so failure paths stay fast
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 1,
        initial_backoff: Duration::from_millis(10),
        attempt_timeout: Duration::from_secs(5),
    }
}
