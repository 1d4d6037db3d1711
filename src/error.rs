use std::path::PathBuf;
use thiserror::Error;

/// Failure kinds surfaced to the user. Every one of them ends the invocation.
#[derive(Debug, Error)]
pub enum GenError {
    #[error(
        "Could not read config file {} (run `ged -configure` to create it, then add your API key)",
        .path.display()
    )]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Config file {} could not be parsed (fix it, or remove it and run `ged -configure`)",
        .path.display()
    )]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write config file {}", .path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read input file {}", .path.display())]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read standard input")]
    StdinRead {
        #[source]
        source: std::io::Error,
    },

    #[error("{provider} client error: {message}")]
    ProviderClient {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} request failed: {message}")]
    ProviderRequest {
        provider: &'static str,
        message: String,
    },

    #[error("missing required script argument\n\n{usage}")]
    Usage { usage: String },
}

impl GenError {
    pub fn client(provider: &'static str, message: impl Into<String>) -> Self {
        Self::ProviderClient {
            provider,
            message: message.into(),
        }
    }

    pub fn request(provider: &'static str, message: impl Into<String>) -> Self {
        Self::ProviderRequest {
            provider,
            message: message.into(),
        }
    }
}
