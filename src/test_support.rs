//! Stub transports and helpers shared by the unit tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::client::AnalysisClient;
use crate::error::TransportError;
use crate::session::{AnalysisEngine, SessionHandle, SessionState};
use crate::transport::{Transport, TransportRequest, TransportResponse};

pub type Reply = Result<TransportResponse, TransportError>;

pub fn ok_json(body: Value) -> Reply {
    Ok(TransportResponse {
        status: 200,
        body: body.to_string(),
    })
}

pub fn status(code: u16, body: &str) -> Reply {
    Ok(TransportResponse {
        status: code,
        body: body.to_string(),
    })
}

pub fn base_url() -> url::Url {
    url::Url::parse("https://analysis.test").unwrap()
}

/// Answers calls from a queue, in order, and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<TransportRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Reply {
        self.calls.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("no scripted reply left".to_string())))
    }
}

/// Holds every call open until the test resolves it
#[derive(Default)]
pub struct GatedTransport {
    gates: Mutex<Vec<Option<oneshot::Sender<Reply>>>>,
    calls: Mutex<Vec<TransportRequest>>,
}

impl GatedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<TransportRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub async fn wait_for_calls(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.call_count() < n {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("transport was not called in time");
    }

    /// Complete the `index`-th call (0-based)
    pub fn resolve(&self, index: usize, reply: Reply) {
        let gate = self.gates.lock().unwrap()[index]
            .take()
            .expect("call already resolved");
        let _ = gate.send(reply);
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn send(&self, request: TransportRequest) -> Reply {
        let (tx, rx) = oneshot::channel();
        {
            // Register the gate before the call becomes visible to waiters
            self.gates.lock().unwrap().push(Some(tx));
            self.calls.lock().unwrap().push(request);
        }
        rx.await
            .unwrap_or_else(|_| Err(TransportError::Other("gate dropped".to_string())))
    }
}

pub fn client_over(transport: Arc<dyn Transport>) -> AnalysisClient {
    AnalysisClient::new(transport, base_url())
}

/// Poll until the session reaches a state matching `pred`
pub async fn wait_for_state<F>(engine: &AnalysisEngine, handle: &SessionHandle, pred: F) -> SessionState
where
    F: Fn(&SessionState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let state = engine.state(handle).unwrap();
            if pred(&state) {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("session did not reach the expected state in time")
}

/// Let spawned tasks run for a moment
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}
