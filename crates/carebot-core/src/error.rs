use reqwest::StatusCode;
use thiserror::Error;

/// Shown when the recommendation service cannot be reached at all.
pub const UNREACHABLE_MESSAGE: &str =
    "Unable to connect to the server. Please check if the recommendation service is running.";

/// Marker used to recognise connectivity failures already in the thread.
pub const UNREACHABLE_MARKER: &str = "Unable to connect to the server";

pub const SERVER_ERROR_MESSAGE: &str = "The server returned an error. Please try again later.";

pub const GENERIC_ERROR_MESSAGE: &str =
    "Sorry, I encountered an error while processing your request.";

/// Failure of a single `/recommend` round trip
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("could not reach the recommendation service: {0}")]
    Unreachable(String),

    #[error("recommendation service returned status {0}")]
    Server(StatusCode),

    #[error("recommendation request failed: {0}")]
    Unknown(String),
}

impl ChatError {
    /// Text appended to the conversation as an error message.
    pub fn user_message(&self) -> &'static str {
        match self {
            ChatError::Unreachable(_) => UNREACHABLE_MESSAGE,
            ChatError::Server(_) => SERVER_ERROR_MESSAGE,
            ChatError::Unknown(_) => GENERIC_ERROR_MESSAGE,
        }
    }

    /// Classify an error from `RequestBuilder::send`.
    ///
    /// Anything that kept the request from producing a response counts as
    /// unreachable; only a malformed request is treated as unknown.
    pub(crate) fn from_send(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ChatError::Unknown(err.to_string())
        } else {
            ChatError::Unreachable(err.to_string())
        }
    }
}

/// True when `text` is the connectivity-failure message.
pub fn is_connectivity_text(text: &str) -> bool {
    text.contains(UNREACHABLE_MARKER)
}
