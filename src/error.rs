use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Failed to read config file at {}: {source}", config_path.display())]
    ConfigRead {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {}: {source}", config_path.display())]
    ConfigParse {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode or decode {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("API request failed: {message}")]
    Api { message: String },

    #[error("Upload halted after failure on {}", path.display())]
    Halted { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        Error::Api {
            message: message.into(),
        }
    }
}
