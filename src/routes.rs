use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::conversations::handler::{generate_follow_up, FollowUp};
use crate::conversations::store::DEFAULT_SESSION;
use crate::state::AppState;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(home))
        .route("/transcribe", post(transcribe_audio))
        .route("/follow_up", post(follow_up))
}

async fn home() -> Json<Value> {
    info!("Working");
    Json(json!({"message": "Server is working"}))
}

async fn transcribe_audio(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    info!("Transcribing audio...");

    let mut audio: Option<(Vec<u8>, Option<String>, Option<String>)> = None;
    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        if field.name() == Some("audio") {
            let filename = field.file_name().map(str::to_string);
            let mime = field.content_type().map(str::to_string);
            let data = field.bytes().await.unwrap_or_default();
            audio = Some((data.to_vec(), mime, filename));
            break;
        }
    }

    let Some((data, mime, filename)) = audio else {
        return Err(bad_request("No audio file provided"));
    };
    if data.is_empty() {
        return Err(bad_request("No audio file provided"));
    }
    info!("Received file: {:?}, size: {} bytes", filename, data.len());

    match state.transcriber.transcribe(data, mime.as_deref()).await {
        Ok(text) => Ok(Json(json!({"transcript": text}))),
        Err(e) => {
            error!("Error in transcription: {}", e);
            Err(server_error(e.to_string()))
        }
    }
}

#[derive(Debug, Deserialize)]
struct FollowUpRequest {
    text: Option<String>,
    session_id: Option<String>,
}

async fn follow_up(
    State(state): State<AppState>,
    payload: Option<Json<FollowUpRequest>>,
) -> Result<Json<FollowUp>, (StatusCode, Json<Value>)> {
    info!("Generating follow-up question...");

    let Some(Json(request)) = payload else {
        return Err(bad_request("No text provided"));
    };
    let Some(text) = request.text.filter(|t| !t.is_empty()) else {
        return Err(bad_request("No text provided"));
    };
    let session_id = request
        .session_id
        .unwrap_or_else(|| DEFAULT_SESSION.to_string());

    match generate_follow_up(&state, &session_id, &text).await {
        Ok(follow_up) => Ok(Json(follow_up)),
        Err(e) => {
            error!("Error in generating follow-up question: {}", e);
            Err(server_error(e.to_string()))
        }
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message})))
}

fn server_error(message: String) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": message})),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use axum::response::Response;
    use tower::ServiceExt;

    use super::*;
    use crate::agent::interface::ChatModel;
    use crate::asr::interface::Transcriber;
    use crate::config::test_config;
    use crate::conversations::types::Turn;
    use crate::error::ProviderError;

    struct StubTranscriber {
        result: Result<String, ProviderError>,
    }

    #[async_trait]
    impl Transcriber for StubTranscriber {
        async fn transcribe(
            &self,
            _audio: Vec<u8>,
            _mime_hint: Option<&str>,
        ) -> Result<String, ProviderError> {
            self.result.clone()
        }
    }

    struct StubChat {
        reply: &'static str,
    }

    #[async_trait]
    impl ChatModel for StubChat {
        async fn generate(
            &self,
            _history: &[Turn],
            _instruction: &str,
        ) -> Result<String, ProviderError> {
            Ok(self.reply.to_string())
        }
    }

    fn app_with(transcriber: StubTranscriber, chat: StubChat) -> Router {
        let state = AppState::with_providers(test_config(), Arc::new(transcriber), Arc::new(chat));
        create_routes().with_state(state)
    }

    fn app() -> Router {
        app_with(
            StubTranscriber {
                result: Ok("hello world".to_string()),
            },
            StubChat {
                reply: "What draws you to travel?",
            },
        )
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn multipart_request(field_name: &str, payload: &[u8]) -> Request<Body> {
        let boundary = "test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{field_name}\"; \
                 filename=\"clip.wav\"\r\nContent-Type: audio/wav\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/transcribe")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn home_reports_server_working() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"message": "Server is working"})
        );
    }

    #[tokio::test]
    async fn transcribe_without_audio_field_is_client_error() {
        let response = app()
            .oneshot(multipart_request("file", b"not the audio field"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": "No audio file provided"})
        );
    }

    #[tokio::test]
    async fn transcribe_with_empty_payload_is_client_error() {
        let response = app()
            .oneshot(multipart_request("audio", b""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": "No audio file provided"})
        );
    }

    #[tokio::test]
    async fn transcribe_returns_provider_text() {
        let response = app()
            .oneshot(multipart_request("audio", b"fake wav bytes"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"transcript": "hello world"}));
    }

    #[tokio::test]
    async fn transcribe_surfaces_provider_error_message() {
        let app = app_with(
            StubTranscriber {
                result: Err(ProviderError::Service("bad audio".to_string())),
            },
            StubChat { reply: "unused" },
        );
        let response = app
            .oneshot(multipart_request("audio", b"fake wav bytes"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({"error": "bad audio"}));
    }

    #[tokio::test]
    async fn follow_up_without_text_is_client_error() {
        let response = app()
            .oneshot(json_request("/follow_up", json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({"error": "No text provided"}));
    }

    #[tokio::test]
    async fn follow_up_without_body_is_client_error() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/follow_up")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({"error": "No text provided"}));
    }

    #[tokio::test]
    async fn follow_up_returns_topic_and_full_history() {
        let response = app()
            .oneshot(json_request("/follow_up", json!({"text": "I like travel"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["topic"], "Travel");

        let history = body["conversation_history"].as_array().unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0]["role"], "system");
        assert_eq!(history[1], json!({"role": "user", "parts": ["I like travel"]}));
        assert_eq!(
            history[2],
            json!({"role": "model", "parts": ["What draws you to travel?"]})
        );
    }

    #[tokio::test]
    async fn follow_up_history_grows_across_requests() {
        let app = app();

        let first = app
            .clone()
            .oneshot(json_request("/follow_up", json!({"text": "I like travel"})))
            .await
            .unwrap();
        assert_eq!(
            body_json(first).await["conversation_history"]
                .as_array()
                .unwrap()
                .len(),
            3
        );

        let second = app
            .oneshot(json_request(
                "/follow_up",
                json!({"text": "Because it's fun"}),
            ))
            .await
            .unwrap();
        assert_eq!(
            body_json(second).await["conversation_history"]
                .as_array()
                .unwrap()
                .len(),
            5
        );
    }

    #[tokio::test]
    async fn follow_up_sessions_are_kept_apart() {
        let app = app();

        let alice = app
            .clone()
            .oneshot(json_request(
                "/follow_up",
                json!({"text": "I like travel", "session_id": "alice"}),
            ))
            .await
            .unwrap();
        let bob = app
            .oneshot(json_request(
                "/follow_up",
                json!({"text": "I prefer home", "session_id": "bob"}),
            ))
            .await
            .unwrap();

        let alice_history = body_json(alice).await["conversation_history"]
            .as_array()
            .unwrap()
            .len();
        let bob_history = body_json(bob).await["conversation_history"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(alice_history, 3);
        assert_eq!(bob_history, 3);
    }
}
