// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory registry of chat sessions served over HTTP
//!
//! A session that has been idle past its TTL, or the least recently active
//! one once the store is full, is dropped together with its history.
//! Sessions with a turn in flight are never evicted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::ChatSession;
use crate::config::SessionConfig;
use crate::rag::RagPipeline;

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Arc<ChatSession>>>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

impl SessionStore {
    pub fn new(idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.idle_ttl(), config.max_sessions)
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    /// Existing live session for `id`, or a new one (keeping `id` when given)
    pub async fn get_or_create(
        &self,
        id: Option<String>,
        pipeline: &Arc<RagPipeline>,
    ) -> Arc<ChatSession> {
        let id = id.filter(|id| !id.trim().is_empty());
        if let Some(id) = &id {
            if let Some(session) = self.get(id).await {
                return session;
            }
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = id.as_ref().and_then(|id| sessions.get(id)) {
            if !self.is_expired(session).await {
                return session.clone();
            }
        }
        self.make_room(&mut sessions).await;

        let session = Arc::new(match id {
            Some(id) => ChatSession::with_id(id, pipeline.clone()),
            None => ChatSession::new(pipeline.clone()),
        });
        sessions.insert(session.id().to_string(), session.clone());
        info!("Chat session {} ({} active)", session.id(), sessions.len());
        session
    }

    /// Live session by id; an expired one counts as absent
    pub async fn get(&self, id: &str) -> Option<Arc<ChatSession>> {
        let session = self.sessions.read().await.get(id).cloned()?;
        if self.is_expired(&session).await {
            None
        } else {
            Some(session)
        }
    }

    /// End a session and drop its history
    pub async fn remove(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(id).is_some() {
            info!("Removed session: {} ({} active)", id, sessions.len());
            true
        } else {
            false
        }
    }

    /// Drop every session idle past the TTL; returns how many went
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let expired = self.expired_ids(&sessions).await;
        for id in &expired {
            sessions.remove(id);
        }
        if !expired.is_empty() {
            info!(
                "Evicted {} idle sessions ({} active)",
                expired.len(),
                sessions.len()
            );
        }
        expired.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Run [`Self::evict_idle`] every `every` until the task is aborted
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let evicted = store.evict_idle().await;
                debug!("Session sweep evicted {}", evicted);
            }
        })
    }

    async fn is_expired(&self, session: &ChatSession) -> bool {
        !session.is_busy() && session.idle_for().await >= self.idle_ttl
    }

    async fn expired_ids(&self, sessions: &HashMap<String, Arc<ChatSession>>) -> Vec<String> {
        let mut expired = Vec::new();
        for (id, session) in sessions {
            if self.is_expired(session).await {
                expired.push(id.clone());
            }
        }
        expired
    }

    /// Called with the write lock held, before inserting one session
    async fn make_room(&self, sessions: &mut HashMap<String, Arc<ChatSession>>) {
        for id in self.expired_ids(sessions).await {
            sessions.remove(&id);
            debug!("Evicted idle session {}", id);
        }
        if sessions.len() < self.max_sessions {
            return;
        }

        let mut oldest: Option<(Duration, String)> = None;
        for (id, session) in sessions.iter() {
            if session.is_busy() {
                continue;
            }
            let idle = session.idle_for().await;
            if oldest.as_ref().map_or(true, |(longest, _)| idle > *longest) {
                oldest = Some((idle, id.clone()));
            }
        }

        match oldest {
            Some((_, id)) => {
                sessions.remove(&id);
                info!("Session store full, evicted least recently active {}", id);
            }
            None => warn!(
                "Session store full ({}) and every session is busy",
                sessions.len()
            ),
        }
    }
}
