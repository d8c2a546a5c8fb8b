//! Error taxonomies for the capability surfaces.
//!
//! None of these ever reach the user raw: the dispatcher turns driver and OS
//! failures into action contexts and the conversation turns chat failures
//! into reply text.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("browser is not open")]
    NotInitialized,

    #[error("browser driver does not support {0}")]
    Unsupported(&'static str),

    #[error("no element matching '{0}'")]
    ElementNotFound(String),

    #[error("failed to load {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum OsError {
    #[error("command timed out after {0}s")]
    Timeout(u64),

    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not available in this build")]
    Unsupported(&'static str),

    #[error("screen capture failed: {0}")]
    Capture(String),

    #[error("input synthesis failed: {0}")]
    Input(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("could not connect to {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    #[error("chat endpoint returned HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Other(String),
}

impl ChatError {
    /// Text shown in place of a chat response
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Connection(_) => {
                "❌ Error: not connected to Ollama. Make sure it is running (ollama serve).".to_string()
            }
            ChatError::Timeout => {
                "⏱️ Timeout: the model took too long to answer. Try again.".to_string()
            }
            other => format!("❌ Error: {}", other),
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChatError::Timeout
        } else if e.is_connect() {
            let target = e
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "chat endpoint".to_string());
            ChatError::Connection(target)
        } else if let Some(status) = e.status() {
            ChatError::Status(status.as_u16())
        } else {
            ChatError::Other(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_messages() {
        let refused = ChatError::Connection("http://127.0.0.1:11434".to_string());
        assert!(refused.user_message().contains("not connected"));

        assert!(ChatError::Timeout.user_message().contains("Timeout"));

        let other = ChatError::Other("boom".to_string());
        assert_eq!(other.user_message(), "❌ Error: boom");
    }

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::Navigation {
            url: "https://example.com".to_string(),
            reason: "dns".to_string(),
        };
        assert_eq!(err.to_string(), "failed to load https://example.com: dns");
    }
}
