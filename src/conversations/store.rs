use dashmap::DashMap;

use super::types::{Role, Turn};

/// Persona seeded as the first turn of every session, exactly once.
pub const EXAMINER_PREAMBLE: &str = "You are an IELTS Speaking Examiner. \
    Engage the user in a real-time speaking simulation. Based on the user's \
    responses, generate follow-up questions that are contextually relevant, \
    challenging, and conversational.";

/// Session used for callers that do not send a session id. All such callers
/// share one transcript.
pub const DEFAULT_SESSION: &str = "default";

/// Ordered, append-only sequence of turns for one interview session.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Seed the system preamble if the conversation is empty. Idempotent.
    pub fn ensure_initialized(&mut self) {
        if self.turns.is_empty() {
            self.turns.push(Turn::new(Role::System, EXAMINER_PREAMBLE));
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }
}

/// Per-session conversation map. Sessions are created on first use, never
/// evicted, and grow without bound for the life of the process.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Conversation>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The history that would go to the chat provider for `user_text`: the
    /// session's committed turns plus the not-yet-committed user turn. Apart
    /// from lazily creating and seeding the session, the store is untouched.
    pub fn staged_history(&self, session_id: &str, user_text: &str) -> Vec<Turn> {
        let mut entry = self.sessions.entry(session_id.to_string()).or_default();
        entry.ensure_initialized();
        let mut turns = entry.turns().to_vec();
        turns.push(Turn::new(Role::User, user_text));
        turns
    }

    /// Commit one completed exchange. The user and model turns land together,
    /// so a provider failure between them can never leave a dangling user
    /// turn. Returns the full history after the commit.
    pub fn commit_exchange(&self, session_id: &str, user_text: &str, question: &str) -> Vec<Turn> {
        let mut entry = self.sessions.entry(session_id.to_string()).or_default();
        entry.ensure_initialized();
        entry.append(Turn::new(Role::User, user_text));
        entry.append(Turn::new(Role::Model, question));
        entry.turns().to_vec()
    }

    /// Full ordered history of a session, if it exists.
    pub fn snapshot(&self, session_id: &str) -> Option<Vec<Turn>> {
        self.sessions.get(session_id).map(|c| c.turns().to_vec())
    }
}
