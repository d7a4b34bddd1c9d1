use serde::{Deserialize, Serialize};

/// Speaker tag for one conversation turn. Serialized lowercase to match the
/// wire format the frontend consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Model,
}

/// One role-tagged message in a conversation history. Immutable once
/// committed to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<String>,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![text.into()],
        }
    }
}
