use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info};

use super::interface::Transcriber;
use crate::config::AssemblyAiConfig;
use crate::error::{send_with_retry, ProviderError};

/// AssemblyAI transcription client. Uploads the audio, submits a
/// speaker-labeled transcript job, and polls it to a terminal status.
pub struct AssemblyAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl AssemblyAiClient {
    pub fn new(config: &AssemblyAiConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        info!("Initialized AssemblyAiClient: base_url={}", config.base_url);
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            poll_interval: config.poll_interval,
            poll_timeout: config.poll_timeout,
        })
    }

    async fn upload(&self, audio: Vec<u8>, mime_hint: Option<&str>) -> Result<String, ProviderError> {
        let mut request = self
            .client
            .post(format!("{}/upload", self.base_url))
            .header("authorization", &self.api_key)
            .body(audio);
        if let Some(mime) = mime_hint {
            request = request.header("content-type", mime.to_string());
        }

        let uploaded: UploadResponse = read_json(send_with_retry(request).await?).await?;
        Ok(uploaded.upload_url)
    }

    async fn submit(&self, audio_url: &str) -> Result<TranscriptJob, ProviderError> {
        let request = self
            .client
            .post(format!("{}/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&TranscriptRequest {
                audio_url,
                speaker_labels: true,
            });
        read_json(send_with_retry(request).await?).await
    }

    async fn poll_until_terminal(&self, id: &str) -> Result<TranscriptJob, ProviderError> {
        let deadline = Instant::now() + self.poll_timeout;
        loop {
            let request = self
                .client
                .get(format!("{}/transcript/{}", self.base_url, id))
                .header("authorization", &self.api_key);
            let job: TranscriptJob = read_json(send_with_retry(request).await?).await?;

            match job.status {
                TranscriptStatus::Completed | TranscriptStatus::Error => return Ok(job),
                TranscriptStatus::Queued | TranscriptStatus::Processing => {
                    if Instant::now() >= deadline {
                        return Err(ProviderError::Timeout(format!(
                            "transcript {} not finished after {}s",
                            id,
                            self.poll_timeout.as_secs()
                        )));
                    }
                    debug!("transcript {} is {:?}, polling again", id, job.status);
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

#[async_trait]
impl Transcriber for AssemblyAiClient {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        mime_hint: Option<&str>,
    ) -> Result<String, ProviderError> {
        let upload_url = self.upload(audio, mime_hint).await?;
        let job = self.submit(&upload_url).await?;
        let job = self.poll_until_terminal(&job.id).await?;

        match job.status {
            TranscriptStatus::Completed => {
                let text = job.text.unwrap_or_default();
                info!("Transcription success: {} chars", text.len());
                Ok(text)
            }
            _ => Err(ProviderError::Service(
                job.error
                    .unwrap_or_else(|| "transcription failed".to_string()),
            )),
        }
    }
}

/// Decode a provider response, mapping non-2xx statuses to the message in
/// the `{"error": ...}` body when one is present.
async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(ProviderError::from_reqwest)?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));
        return Err(ProviderError::Service(message));
    }

    serde_json::from_str(&body)
        .map_err(|e| ProviderError::Transport(format!("malformed transcription response: {}", e)))
}

// AssemblyAI API types

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
    speaker_labels: bool,
}

#[derive(Debug, Deserialize)]
struct TranscriptJob {
    id: String,
    status: TranscriptStatus,
    text: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
}
