//! Dispatch error definitions.

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::message::MessageError;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No usable response was obtained (connect, timeout, cancellation, body read).
    Transport,
    /// The target answered with a non-2xx status.
    Protocol,
    /// Both the primary target and the dead-letter sink failed.
    Dual,
}

/// Failure of a single HTTP exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The message could not be written into a request.
    #[error("failed to encode message: {0}")]
    Encode(#[from] MessageError),

    /// Connection, DNS, TLS or I/O failure.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Connect or request deadline elapsed.
    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// The target rejected the event.
    #[error("unexpected HTTP response, expected 2xx, got {}", .0.as_u16())]
    UnexpectedStatus(StatusCode),

    /// The response body exceeded the configured limit.
    #[error("response body too large: limit {limit} bytes")]
    BodyTooLarge { limit: usize },
}

impl ExchangeError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err)
        } else {
            ExchangeError::Transport(err)
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ExchangeError::UnexpectedStatus(_) => FailureKind::Protocol,
            _ => FailureKind::Transport,
        }
    }

    /// Status code of a rejected exchange.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ExchangeError::UnexpectedStatus(status) => Some(*status),
            _ => None,
        }
    }
}

/// Failure of a whole dispatch call.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The destination failed and no dead-letter sink was configured.
    #[error("unable to complete request to {url}: {source}")]
    Destination { url: Url, source: ExchangeError },

    /// The destination and the dead-letter sink both failed.
    #[error(
        "unable to complete request to either {destination} ({destination_error}) \
         or {dead_letter} ({dead_letter_error})"
    )]
    DestinationAndDeadLetter {
        destination: Url,
        destination_error: ExchangeError,
        dead_letter: Url,
        dead_letter_error: ExchangeError,
    },

    /// The reply sink failed and no dead-letter sink was configured.
    #[error("failed to forward reply to {url}: {source}")]
    Reply { url: Url, source: ExchangeError },

    /// The reply sink and the dead-letter sink both failed.
    #[error(
        "failed to forward reply to {reply} ({reply_error}) and failed to send it \
         to the dead letter sink {dead_letter} ({dead_letter_error})"
    )]
    ReplyAndDeadLetter {
        reply: Url,
        reply_error: ExchangeError,
        dead_letter: Url,
        dead_letter_error: ExchangeError,
    },
}

impl DispatchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DispatchError::Destination { source, .. } | DispatchError::Reply { source, .. } => {
                source.kind()
            }
            DispatchError::DestinationAndDeadLetter { .. }
            | DispatchError::ReplyAndDeadLetter { .. } => FailureKind::Dual,
        }
    }

    /// The primary target of the failing hop.
    pub fn target(&self) -> &Url {
        match self {
            DispatchError::Destination { url, .. } | DispatchError::Reply { url, .. } => url,
            DispatchError::DestinationAndDeadLetter { destination, .. } => destination,
            DispatchError::ReplyAndDeadLetter { reply, .. } => reply,
        }
    }

    /// The dead-letter sink, when it was attempted.
    pub fn dead_letter(&self) -> Option<&Url> {
        match self {
            DispatchError::DestinationAndDeadLetter { dead_letter, .. }
            | DispatchError::ReplyAndDeadLetter { dead_letter, .. } => Some(dead_letter),
            _ => None,
        }
    }
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_status_error_display() {
        let err = ExchangeError::UnexpectedStatus(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "unexpected HTTP response, expected 2xx, got 503");
        assert_eq!(err.kind(), FailureKind::Protocol);
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn test_single_hop_error_names_target() {
        let err = DispatchError::Reply {
            url: url("http://reply/"),
            source: ExchangeError::UnexpectedStatus(StatusCode::BAD_GATEWAY),
        };
        assert_eq!(
            err.to_string(),
            "failed to forward reply to http://reply/: unexpected HTTP response, expected 2xx, got 502"
        );
        assert_eq!(err.kind(), FailureKind::Protocol);
        assert_eq!(err.target().as_str(), "http://reply/");
        assert!(err.dead_letter().is_none());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_dual_error_names_both_targets() {
        let err = DispatchError::DestinationAndDeadLetter {
            destination: url("http://dest/"),
            destination_error: ExchangeError::UnexpectedStatus(StatusCode::INTERNAL_SERVER_ERROR),
            dead_letter: url("http://dlq/"),
            dead_letter_error: ExchangeError::BodyTooLarge { limit: 10 },
        };
        let text = err.to_string();
        assert!(text.contains("http://dest/"));
        assert!(text.contains("got 500"));
        assert!(text.contains("http://dlq/"));
        assert!(text.contains("limit 10 bytes"));
        assert_eq!(err.kind(), FailureKind::Dual);
        assert_eq!(err.dead_letter().map(Url::as_str), Some("http://dlq/"));
    }
}
