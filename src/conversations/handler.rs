use serde::Serialize;
use tracing::info;

use super::types::Turn;
use crate::error::ProviderError;
use crate::state::AppState;

/// Outcome of one follow-up exchange: the configured topic plus the full
/// session history including the new user/model pair.
#[derive(Debug, Clone, Serialize)]
pub struct FollowUp {
    pub topic: String,
    pub conversation_history: Vec<Turn>,
}

fn follow_up_instruction(user_text: &str) -> String {
    format!(
        "Based on the user's response: \"{user_text}\", generate a single, concise \
         follow-up question. The question should: 1) be contextually relevant to the \
         user's input, 2) encourage the user to elaborate further, 3) be clear and \
         conversational. Provide only the follow-up question, nothing else."
    )
}

/// Run one follow-up exchange for a session. The user turn is staged, the
/// chat provider is called with the staged history, and the user/model pair
/// is committed only after the provider succeeds.
pub async fn generate_follow_up(
    state: &AppState,
    session_id: &str,
    user_text: &str,
) -> Result<FollowUp, ProviderError> {
    let staged = state.sessions.staged_history(session_id, user_text);
    let instruction = follow_up_instruction(user_text);

    let question = state.chat.generate(&staged, &instruction).await?;
    let history = state
        .sessions
        .commit_exchange(session_id, user_text, question.trim());
    info!(
        "session {}: {} turns after follow-up",
        session_id,
        history.len()
    );

    Ok(FollowUp {
        topic: state.config.topic.clone(),
        conversation_history: history,
    })
}
