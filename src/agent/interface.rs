use async_trait::async_trait;

use crate::conversations::types::Turn;
use crate::error::ProviderError;

/// Chat-completion gateway. Stateless between calls: the caller resends the
/// full conversation every time, plus one instruction message that is not
/// part of the stored history.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, history: &[Turn], instruction: &str) -> Result<String, ProviderError>;
}
