use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Runtime configuration, read once from the environment at startup.
///
/// The two provider credentials are required; everything else carries the
/// defaults the frontend was built against.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub allowed_origin: String,
    pub topic: String,
    pub assemblyai: AssemblyAiConfig,
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone)]
pub struct AssemblyAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_allowed_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_topic() -> String {
    "Travel".to_string()
}

fn default_assemblyai_base_url() -> String {
    "https://api.assemblyai.com/v2".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("missing required environment variable {}", name))
}

fn optional(name: &str, default: fn() -> String) -> String {
    env::var(name).unwrap_or_else(|_| default())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT is not a valid port number: {}", raw))?,
            Err(_) => 5001,
        };

        Ok(Self {
            host: optional("HOST", default_host),
            port,
            allowed_origin: optional("CORS_ALLOW_ORIGIN", default_allowed_origin),
            topic: optional("FOLLOW_UP_TOPIC", default_topic),
            assemblyai: AssemblyAiConfig {
                api_key: required("ASSEMBLY_AI_API_KEY")?,
                base_url: optional("ASSEMBLY_AI_BASE_URL", default_assemblyai_base_url),
                poll_interval: Duration::from_secs(3),
                poll_timeout: Duration::from_secs(180),
            },
            gemini: GeminiConfig {
                api_key: required("GEMINI_API_KEY")?,
                base_url: optional("GEMINI_BASE_URL", default_gemini_base_url),
                model: optional("GEMINI_MODEL", default_gemini_model),
                request_timeout: Duration::from_secs(60),
            },
        })
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        host: default_host(),
        port: 5001,
        allowed_origin: default_allowed_origin(),
        topic: default_topic(),
        assemblyai: AssemblyAiConfig {
            api_key: "test-key".to_string(),
            base_url: default_assemblyai_base_url(),
            poll_interval: Duration::from_millis(10),
            poll_timeout: Duration::from_secs(1),
        },
        gemini: GeminiConfig {
            api_key: "test-key".to_string(),
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            request_timeout: Duration::from_secs(1),
        },
    }
}
