//! Error types shared across LumaCut crates.

use std::path::PathBuf;

/// Top-level error type for LumaCut operations.
#[derive(Debug, thiserror::Error)]
pub enum LumacutError {
    #[error("Media error: {message}")]
    Media { message: String },

    #[error("Audio error: {message}")]
    Audio { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Asset error: {message}")]
    Asset { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using LumacutError.
pub type LumacutResult<T> = Result<T, LumacutError>;

impl LumacutError {
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media {
            message: msg.into(),
        }
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Plain-text message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Media { message }
            | Self::Audio { message }
            | Self::Render { message }
            | Self::Export { message }
            | Self::Asset { message }
            | Self::Config { message }
            | Self::Unsupported { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_strips_category_prefix() {
        let err = LumacutError::export("Playback failed to start");
        assert_eq!(err.to_string(), "Export error: Playback failed to start");
        assert_eq!(err.user_message(), "Playback failed to start");
    }

    #[test]
    fn test_file_not_found_message_keeps_path() {
        let err = LumacutError::FileNotFound {
            path: PathBuf::from("/tmp/missing.mp4"),
        };
        assert!(err.user_message().contains("/tmp/missing.mp4"));
    }
}
