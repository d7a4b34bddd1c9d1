use std::sync::Arc;

use crate::agent::gemini::GeminiClient;
use crate::agent::interface::ChatModel;
use crate::asr::assemblyai::AssemblyAiClient;
use crate::asr::interface::Transcriber;
use crate::config::Config;
use crate::conversations::store::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub transcriber: Arc<dyn Transcriber>,
    pub chat: Arc<dyn ChatModel>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let transcriber = Arc::new(AssemblyAiClient::new(&config.assemblyai)?);
        let chat = Arc::new(GeminiClient::new(&config.gemini)?);
        Ok(Self::with_providers(config, transcriber, chat))
    }

    /// Build state around explicit provider implementations.
    pub fn with_providers(
        config: Config,
        transcriber: Arc<dyn Transcriber>,
        chat: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            config,
            transcriber,
            chat,
            sessions: Arc::new(SessionStore::new()),
        }
    }
}
