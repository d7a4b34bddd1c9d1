use async_trait::async_trait;

use crate::error::ProviderError;

/// Speech-to-text gateway. Implementations forward the audio to an external
/// service and return the flattened transcript text. No local state is
/// retained between calls.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        mime_hint: Option<&str>,
    ) -> Result<String, ProviderError>;
}
