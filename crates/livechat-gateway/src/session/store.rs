//! Session store
//!
//! Sessions are only reached by id through this store; callers get owned
//! snapshots, never references into the map.
//!
//! A session with a bound live connection never expires. Context switches are
//! ordered by a per-session counter: a switch resolved asynchronously only
//! lands if no later switch was requested in the meantime.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use livechat_core::{ChatMessage, ContextRef, SessionId, UserId};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Session store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Session {0} belongs to another user")]
    OwnedByOtherUser(SessionId),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "session_not_found",
            Self::OwnedByOtherUser(_) => "session_conflict",
        }
    }
}

/// One logical conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub context: Option<ContextRef>,
    pub history: Vec<ChatMessage>,
    /// Latest context switch requested
    #[serde(skip)]
    context_seq: u64,
    /// Authenticated connections attached to this session
    #[serde(skip)]
    bound_connections: usize,
}

impl Session {
    fn new(id: SessionId, user_id: UserId, context: Option<ContextRef>) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            created_at: now,
            last_active: now,
            context,
            history: Vec::new(),
            context_seq: 0,
            bound_connections: 0,
        }
    }

    fn refresh(&mut self) {
        self.last_active = Utc::now().max(self.last_active);
    }

    /// Last `window` messages, oldest first
    pub fn recent(&self, window: usize) -> &[ChatMessage] {
        let start = self.history.len().saturating_sub(window);
        &self.history[start..]
    }
}

/// Result of `get_or_create`
#[derive(Debug, Clone)]
pub struct Attached {
    pub session: Session,
    /// True when an existing session was found
    pub resumed: bool,
}

/// In-process session store
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, Session>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the session and refresh `last_active`, or create it
    ///
    /// The context of an existing session is kept; `initial_context` only
    /// applies to new sessions. A session owned by another user is refused.
    pub fn get_or_create(
        &self,
        session_id: SessionId,
        user_id: &UserId,
        initial_context: Option<ContextRef>,
    ) -> Result<Attached, SessionError> {
        match self.sessions.entry(session_id) {
            Entry::Occupied(mut entry) => {
                let session = entry.get_mut();
                if &session.user_id != user_id {
                    return Err(SessionError::OwnedByOtherUser(session.id.clone()));
                }
                session.refresh();
                tracing::debug!(session_id = %session.id, "Session reattached");
                Ok(Attached {
                    session: session.clone(),
                    resumed: true,
                })
            }
            Entry::Vacant(entry) => {
                let session = Session::new(entry.key().clone(), user_id.clone(), initial_context);
                tracing::info!(session_id = %session.id, user_id = %user_id, "Session created");
                entry.insert(session.clone());
                Ok(Attached {
                    session,
                    resumed: false,
                })
            }
        }
    }

    /// Snapshot of a session
    pub fn get(&self, session_id: &SessionId) -> Option<Session> {
        self.sessions.get(session_id).map(|s| s.clone())
    }

    fn with_session<R>(
        &self,
        session_id: &SessionId,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Result<R, SessionError> {
        self.sessions
            .get_mut(session_id)
            .map(|mut s| f(&mut *s))
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))
    }

    /// Append to the history, returning the new length
    pub fn append_message(
        &self,
        session_id: &SessionId,
        message: ChatMessage,
    ) -> Result<usize, SessionError> {
        self.with_session(session_id, |session| {
            session.history.push(message);
            session.refresh();
            session.history.len()
        })
    }

    /// Record activity on the session; `false` for unknown ids
    pub fn touch(&self, session_id: &SessionId) -> bool {
        self.with_session(session_id, Session::refresh).is_ok()
    }

    /// Attach a live connection; the session is exempt from expiry while any
    /// connection is attached. Returns the attached count.
    pub fn bind_connection(&self, session_id: &SessionId) -> Result<usize, SessionError> {
        self.with_session(session_id, |session| {
            session.bound_connections += 1;
            session.refresh();
            session.bound_connections
        })
    }

    /// Detach a connection, returning how many remain attached
    pub fn release_connection(&self, session_id: &SessionId) -> usize {
        self.with_session(session_id, |session| {
            session.bound_connections = session.bound_connections.saturating_sub(1);
            session.refresh();
            session.bound_connections
        })
        .unwrap_or(0)
    }

    /// Replace the active context, returning the previous one
    ///
    /// Supersedes any context switch still in flight.
    pub fn update_context(
        &self,
        session_id: &SessionId,
        context: ContextRef,
    ) -> Result<Option<ContextRef>, SessionError> {
        self.with_session(session_id, |session| {
            session.context_seq += 1;
            session.context.replace(context)
        })
    }

    /// Claim the next context switch slot
    ///
    /// The returned ticket is passed to [`apply_context_switch`](Self::apply_context_switch)
    /// once the new context is known. Any later claim or `update_context`
    /// invalidates it.
    pub fn begin_context_switch(&self, session_id: &SessionId) -> Result<u64, SessionError> {
        self.with_session(session_id, |session| {
            session.context_seq += 1;
            session.context_seq
        })
    }

    /// Set the context and append `notice` if `ticket` is still the latest
    /// claim; returns `false` when a newer switch superseded it
    pub fn apply_context_switch(
        &self,
        session_id: &SessionId,
        ticket: u64,
        context: ContextRef,
        notice: ChatMessage,
    ) -> Result<bool, SessionError> {
        self.with_session(session_id, |session| {
            if session.context_seq != ticket {
                return false;
            }
            session.context = Some(context);
            session.history.push(notice);
            session.refresh();
            true
        })
    }

    pub fn context(&self, session_id: &SessionId) -> Result<Option<ContextRef>, SessionError> {
        self.with_session(session_id, |session| session.context.clone())
    }

    /// The replay window handed to a responder
    pub fn recent_history(
        &self,
        session_id: &SessionId,
        window: usize,
    ) -> Result<Vec<ChatMessage>, SessionError> {
        self.with_session(session_id, |session| session.recent(window).to_vec())
    }

    /// Most recent `limit` messages, or all of them
    pub fn history(
        &self,
        session_id: &SessionId,
        limit: Option<usize>,
    ) -> Result<Vec<ChatMessage>, SessionError> {
        self.with_session(session_id, |session| match limit {
            Some(limit) => session.recent(limit).to_vec(),
            None => session.history.clone(),
        })
    }

    /// Remove sessions idle for longer than `threshold`
    pub fn expire_older_than(&self, threshold: Duration) -> usize {
        match chrono::Duration::from_std(threshold) {
            Ok(threshold) => self.expire_inactive_since(Utc::now() - threshold),
            Err(_) => 0,
        }
    }

    /// Remove unbound sessions whose `last_active` predates `cutoff`
    pub fn expire_inactive_since(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.bound_connections > 0 || session.last_active >= cutoff);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            tracing::info!(removed, "Expired inactive sessions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
