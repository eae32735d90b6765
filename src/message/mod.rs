//! Event messages and their lifecycle.
//!
//! # Data Flow
//! ```text
//! caller builds Event
//!     → event.rs (EventMessage, structured or binary HTTP encoding)
//!     → dispatched over HTTP
//!     → http.rs (HttpMessage decoded from a 2xx response, if it carries an event)
//!     → tracker.rs (every message finished exactly once when dispatch returns)
//! ```
//!
//! # Design Decisions
//! - Messages are shared as `Arc<dyn Message>` so the tracker and the
//!   in-flight exchange can hold the same message
//! - A message writes its own encoding; the sender never inspects payloads
//! - `finish` is the single release point and fails on a second call

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use thiserror::Error;

pub mod event;
pub mod http;
pub mod tracker;

pub use event::{Event, EventMessage};
pub use http::HttpMessage;
pub use tracker::MessageTracker;

/// Shared handle to a message.
pub type MessageRef = Arc<dyn Message>;

/// How a message is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// The whole event, attributes included, is the body.
    Structured,
    /// Attributes travel as `ce-*` headers, the body is the event data.
    Binary,
    /// Not an event (plain acknowledgement, empty body, ...).
    Unknown,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Structured => "structured",
            Encoding::Binary => "binary",
            Encoding::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while encoding, decoding or releasing a message.
#[derive(Debug, Error)]
pub enum MessageError {
    /// A required event attribute is absent.
    #[error("missing required attribute '{0}'")]
    MissingAttribute(&'static str),

    /// An attribute or extension has an unusable value.
    #[error("invalid attribute '{name}': {reason}")]
    InvalidAttribute { name: String, reason: String },

    /// The JSON event format could not be read or written.
    #[error("invalid JSON event: {0}")]
    Json(#[from] serde_json::Error),

    /// `data_base64` did not hold valid base64.
    #[error("invalid data_base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// An attribute cannot be represented as an HTTP header.
    #[error("cannot encode header '{0}'")]
    InvalidHeader(String),

    /// The message carries no event encoding and cannot be written.
    #[error("message has no event encoding")]
    UnknownEncoding,

    /// `finish` was called more than once.
    #[error("message already finished")]
    AlreadyFinished,
}

/// An encoding-tagged event envelope.
///
/// Every message must be finished exactly once after its last use.
pub trait Message: Send + Sync + fmt::Debug {
    /// Wire encoding of this message.
    fn encoding(&self) -> Encoding;

    /// Write the message into outgoing request headers, returning the body.
    fn write_http(&self, headers: &mut HeaderMap) -> Result<Bytes, MessageError>;

    /// Release the message.
    fn finish(&self) -> Result<(), MessageError>;
}
