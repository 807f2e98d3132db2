// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Conversation sessions
//!
//! A [`ChatSession`] owns an append-only history and allows one turn in
//! flight at a time. Every accepted user message is answered by exactly
//! one bot message, even when the answer is the fallback text.
//! A [`SessionStore`] keeps the sessions served over HTTP.

pub mod session;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use session::{ChatSession, TurnReply, TurnState};
pub use store::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One message in a conversation; never mutated after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Monotonic within a session, derived from the creation time in ms
    pub id: i64,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    /// Context passages behind a bot answer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<String>>,
}
