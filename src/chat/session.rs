// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-turn state machine: Idle -> Sending -> (Success | Fallback) -> Idle

use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use super::{ConversationTurn, Sender};
use crate::rag::{RagError, RagPipeline, RetrievalStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    Sending,
    Success,
    Fallback,
}

/// Result of an accepted turn
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReply {
    pub answer: String,
    pub context: Vec<String>,
    pub context_preview: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// `Success` or `Fallback`
    pub outcome: TurnState,
}

/// Clears the busy flag when the turn ends, however it ends
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct SessionState {
    history: Vec<ConversationTurn>,
    turn_state: TurnState,
    last_outcome: Option<TurnState>,
    error_banner: Option<String>,
    last_id: i64,
    last_active: Instant,
}

impl SessionState {
    fn next_id(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }

    fn push(&mut self, text: String, sender: Sender, context: Option<Vec<String>>) {
        let id = self.next_id();
        self.history.push(ConversationTurn {
            id,
            text,
            sender,
            timestamp: Utc::now(),
            context,
        });
        self.last_active = Instant::now();
    }
}

pub struct ChatSession {
    id: String,
    pipeline: Arc<RagPipeline>,
    busy: Arc<AtomicBool>,
    state: Arc<RwLock<SessionState>>,
}

impl ChatSession {
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), pipeline)
    }

    pub fn with_id(id: String, pipeline: Arc<RagPipeline>) -> Self {
        Self {
            id,
            pipeline,
            busy: Arc::new(AtomicBool::new(false)),
            state: Arc::new(RwLock::new(SessionState {
                history: Vec::new(),
                turn_state: TurnState::Idle,
                last_outcome: None,
                error_banner: None,
                last_id: 0,
                last_active: Instant::now(),
            })),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Send one user message through the pipeline
    ///
    /// Rejected before any state change when the message is blank, a turn
    /// is already in flight, or the generative model has no credentials.
    /// Otherwise the user message and one bot message are always appended.
    ///
    /// An accepted turn runs on its own task, so dropping the returned
    /// future does not leave the history without a reply.
    pub async fn send(&self, message: &str) -> Result<TurnReply, RagError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(RagError::EmptyInput);
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RagError::Busy);
        }
        let guard = BusyGuard(self.busy.clone());

        if !self.pipeline.generation_configured() {
            let err = RagError::Configuration("missing Gemini API key".to_string());
            warn!("[{}] session {}: {}", err.error_code(), self.id, err);
            let mut state = self.state.write().await;
            state.error_banner = Some(err.user_message());
            state.last_active = Instant::now();
            return Err(err);
        }

        let turn = run_turn(
            self.id.clone(),
            self.pipeline.clone(),
            self.state.clone(),
            message.to_string(),
            guard,
        );
        tokio::spawn(turn).await.map_err(|e| {
            warn!("Session {} turn task failed: {}", self.id, e);
            RagError::Provider(format!("turn task failed: {}", e))
        })
    }

    /// Snapshot of the conversation so far
    pub async fn history(&self) -> Vec<ConversationTurn> {
        self.state.read().await.history.clone()
    }

    pub async fn state(&self) -> TurnState {
        self.state.read().await.turn_state
    }

    pub async fn last_outcome(&self) -> Option<TurnState> {
        self.state.read().await.last_outcome
    }

    /// User-visible error from the last turn, if any
    pub async fn error_banner(&self) -> Option<String> {
        self.state.read().await.error_banner.clone()
    }

    /// Display previews of the context behind the latest bot answer
    pub async fn context_previews(&self) -> Vec<String> {
        let state = self.state.read().await;
        state
            .history
            .iter()
            .rev()
            .find(|turn| turn.sender == Sender::Bot)
            .and_then(|turn| turn.context.as_ref())
            .map(|context| self.pipeline.assembler().previews(context))
            .unwrap_or_default()
    }

    /// Time since the last message or rejected attempt
    pub async fn idle_for(&self) -> Duration {
        self.state.read().await.last_active.elapsed()
    }
}

/// One accepted turn; holds the busy flag until both messages are appended
async fn run_turn(
    session_id: String,
    pipeline: Arc<RagPipeline>,
    state: Arc<RwLock<SessionState>>,
    message: String,
    _guard: BusyGuard,
) -> TurnReply {
    {
        let mut state = state.write().await;
        state.push(message.clone(), Sender::User, None);
        state.turn_state = TurnState::Sending;
    }

    let outcome = pipeline.answer(&message).await;
    if let RetrievalStatus::Degraded(reason) = &outcome.retrieval {
        info!("Session {} answered without context: {}", session_id, reason);
    }

    let response = outcome.response;
    let turn_outcome = if response.is_fallback() {
        TurnState::Fallback
    } else {
        TurnState::Success
    };
    let context_preview = pipeline.assembler().previews(&response.context);

    {
        let mut state = state.write().await;
        let context = if response.context.is_empty() {
            None
        } else {
            Some(response.context.clone())
        };
        state.push(response.text.clone(), Sender::Bot, context);
        state.error_banner = response.error.clone();
        state.last_outcome = Some(turn_outcome);
        state.turn_state = TurnState::Idle;
    }

    TurnReply {
        answer: response.text,
        context: response.context,
        context_preview,
        error: response.error,
        outcome: turn_outcome,
    }
}
