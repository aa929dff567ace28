//! Conversation history storage.
//!
//! The pipeline only requires [`ConversationHistory`]; the in-memory
//! [`Session`]/[`SessionStore`] pair is the default implementation, with
//! idle-TTL expiry and history pruning.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::types::{ChatMessage, Role};

/// Ordered, append-only view of a conversation used to rebuild requests.
pub trait ConversationHistory: Send + Sync {
    /// Append one message.
    fn append(&self, message: ChatMessage);

    /// Snapshot of the full history, in order.
    fn snapshot(&self) -> Vec<ChatMessage>;

    /// Drop everything but the system prompt.
    fn clear(&self);
}

struct SessionState {
    messages: Vec<ChatMessage>,
    last_activity: Instant,
}

/// In-memory conversation history for one conversation key.
pub struct Session {
    state: Mutex<SessionState>,
    max_history: usize,
}

impl Session {
    /// Create a session seeded with a system prompt (if non-empty).
    pub fn new(system_prompt: &str, max_history: usize) -> Self {
        let mut messages = Vec::new();
        if !system_prompt.is_empty() {
            messages.push(ChatMessage::system(system_prompt));
        }
        Self {
            state: Mutex::new(SessionState {
                messages,
                last_activity: Instant::now(),
            }),
            max_history,
        }
    }

    fn touch(state: &mut SessionState) {
        state.last_activity = Instant::now();
    }

    /// Drop the oldest non-system messages until the history fits.
    ///
    /// A tool-role message never becomes the first conversational message:
    /// it answers an assistant tool call, so the pair is evicted together.
    fn prune(&self, state: &mut SessionState) {
        if self.max_history == 0 {
            return;
        }
        let system_count = state
            .messages
            .iter()
            .take_while(|m| m.role == Role::System)
            .count();
        while state.messages.len() - system_count > self.max_history {
            state.messages.remove(system_count);
            while state
                .messages
                .get(system_count)
                .is_some_and(|m| m.role == Role::Tool)
            {
                state.messages.remove(system_count);
            }
        }
    }

    fn idle_for(&self) -> Duration {
        let state = self.state.lock().expect("session state poisoned");
        state.last_activity.elapsed()
    }
}

impl ConversationHistory for Session {
    fn append(&self, message: ChatMessage) {
        let mut state = self.state.lock().expect("session state poisoned");
        state.messages.push(message);
        self.prune(&mut state);
        Self::touch(&mut state);
    }

    fn snapshot(&self) -> Vec<ChatMessage> {
        let mut state = self.state.lock().expect("session state poisoned");
        Self::touch(&mut state);
        state.messages.clone()
    }

    fn clear(&self) {
        let mut state = self.state.lock().expect("session state poisoned");
        state.messages.retain(|m| m.role == Role::System);
        Self::touch(&mut state);
    }
}

/// Lazily-populated map of conversation key → session.
///
/// A session idle longer than `ttl` is replaced by a fresh one re-seeded with
/// the system prompt.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    system_prompt: String,
    max_history: usize,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(system_prompt: impl Into<String>, max_history: usize, ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            system_prompt: system_prompt.into(),
            max_history,
            ttl,
        }
    }

    /// Get the session for a key, creating or recycling as needed.
    pub fn get(&self, key: &str) -> Arc<Session> {
        let mut sessions = self.sessions.lock().expect("session store poisoned");
        if let Some(session) = sessions.get(key) {
            if session.idle_for() < self.ttl {
                return session.clone();
            }
            tracing::debug!(conversation = %key, "session_expired");
        }
        let session = Arc::new(Session::new(&self.system_prompt, self.max_history));
        sessions.insert(key.to_string(), session.clone());
        session
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
