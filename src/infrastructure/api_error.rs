use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupersetError {
    #[error("{operation} failed with status {status}: {body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("failed to send {operation} request to Superset")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to parse {operation} response")]
    Decode {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid session header value")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
}

impl SupersetError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SupersetError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Status code of a Superset error buried in an anyhow chain, if any.
pub fn status_of(err: &anyhow::Error) -> Option<StatusCode> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<SupersetError>())
        .and_then(SupersetError::status)
}
