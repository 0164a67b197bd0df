//! Failures of the remote model boundary

use thiserror::Error;

/// Anything that goes wrong between sending a message and the end of its
/// reply stream. The conversation treats every variant the same way; the
/// variants exist so the log says what actually happened.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No credential in the config file or the environment
    #[error("no API key configured (set GEMINI_API_KEY or api_key in config.toml)")]
    MissingApiKey,

    /// Connection, TLS, timeout or body read failure
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The provider reported an error inside the stream
    #[error("provider error: {0}")]
    Remote(String),

    /// A stream chunk could not be decoded
    #[error("malformed stream chunk: {0}")]
    Malformed(String),

    /// The stream ended without a completion signal
    #[error("stream closed before completion")]
    Disconnected,
}
