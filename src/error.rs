use std::time::Duration;

use reqwest::RequestBuilder;
use thiserror::Error;
use tracing::warn;

/// Failures surfaced by the external speech and chat providers.
///
/// `Display` is the bare underlying message so route handlers can propagate
/// it verbatim in the `{"error": ...}` response body.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The provider completed the request but flagged a failure of its own.
    #[error("{0}")]
    Service(String),
    /// The provider did not answer within the configured deadline.
    #[error("{0}")]
    Timeout(String),
    /// The request never completed: connection, TLS, or decoding trouble.
    #[error("{0}")]
    Transport(String),
}

impl ProviderError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Send a provider request, retrying once after a short backoff on
/// non-timeout transport errors. Timeouts are surfaced immediately, as are
/// requests whose body cannot be replayed.
pub async fn send_with_retry(req: RequestBuilder) -> Result<reqwest::Response, ProviderError> {
    let retry = req.try_clone();
    match req.send().await {
        Ok(response) => Ok(response),
        Err(err) if err.is_timeout() => Err(ProviderError::Timeout(err.to_string())),
        Err(err) => {
            let Some(retry) = retry else {
                return Err(ProviderError::Transport(err.to_string()));
            };
            warn!("transport error, retrying once: {}", err);
            tokio::time::sleep(RETRY_BACKOFF).await;
            retry.send().await.map_err(ProviderError::from_reqwest)
        }
    }
}
