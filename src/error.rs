use std::path::PathBuf;

use thiserror::Error;

/// Every way a sync run can fail, grouped by what went wrong rather than where.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("credential broker rejected connector `{connector}`: {message}")]
    Credential { connector: String, message: String },

    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{context}: HTTP {status}")]
    Http {
        context: String,
        status: reqwest::StatusCode,
    },

    #[error("{context}: {message}")]
    Decode { context: String, message: String },

    #[error("state file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    pub fn transport(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    pub fn decode(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            context: context.into(),
            message: message.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this failure class. 1 is reserved for usage errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Credential { .. } => 3,
            Self::Transport { .. } | Self::Http { .. } => 4,
            Self::Decode { .. } => 5,
            Self::Io { .. } => 6,
        }
    }
}
