//! Stage failure taxonomy.

use thiserror::Error;

/// Everything that can go wrong while driving a stage.
///
/// The orchestrator flattens these into its error slot; the variants exist
/// for callers of the raw [`StageApi`](crate::api::StageApi) surface.
#[derive(Debug, Error)]
pub enum StageError {
    /// A required earlier stage output is missing. No request was issued.
    #[error("{0}")]
    Precondition(&'static str),

    /// The transport failed before a usable response arrived.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The service reported `success=false` in its envelope.
    #[error("{0}")]
    Service(String),

    /// The reply did not match the protocol shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The progress channel could not be opened.
    #[error("progress channel: {0}")]
    Channel(String),
}
