//! Messages decoded from HTTP responses.
//!
//! Encoding is decided from headers alone, so a response that is not an
//! event can be discarded without reading its body.

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};

use crate::message::event::{media_type, ATTRIBUTE_PREFIX, STRUCTURED_CONTENT_TYPE};
use crate::message::{Encoding, Message, MessageError};

/// Spec versions accepted in binary mode.
const KNOWN_SPEC_VERSIONS: [&str; 2] = ["1.0", "0.3"];

/// Detect the event encoding of an HTTP message from its headers.
///
/// A structured content type wins over binary attribute headers. Batches
/// are not events.
pub fn detect_encoding(headers: &HeaderMap) -> Encoding {
    let structured = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| media_type(ct) == STRUCTURED_CONTENT_TYPE);
    if structured {
        return Encoding::Structured;
    }

    let binary = headers
        .get("ce-specversion")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| KNOWN_SPEC_VERSIONS.contains(&v.trim()));
    if binary {
        return Encoding::Binary;
    }

    Encoding::Unknown
}

/// An event received as an HTTP response.
#[derive(Debug)]
pub struct HttpMessage {
    headers: HeaderMap,
    body: Bytes,
    encoding: Encoding,
    finished: AtomicBool,
}

impl HttpMessage {
    pub fn new(headers: HeaderMap, body: Bytes) -> Self {
        let encoding = detect_encoding(&headers);
        Self {
            headers,
            body,
            encoding,
            finished: AtomicBool::new(false),
        }
    }

    /// All headers of the response, event attributes included.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl Message for HttpMessage {
    fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn write_http(&self, headers: &mut HeaderMap) -> Result<Bytes, MessageError> {
        if self.encoding == Encoding::Unknown {
            return Err(MessageError::UnknownEncoding);
        }

        for name in self.headers.keys() {
            if name == CONTENT_TYPE || name.as_str().starts_with(ATTRIBUTE_PREFIX) {
                headers.remove(name);
                for value in self.headers.get_all(name) {
                    headers.append(name.clone(), value.clone());
                }
            }
        }
        Ok(self.body.clone())
    }

    fn finish(&self) -> Result<(), MessageError> {
        if self.finished.swap(true, Ordering::AcqRel) {
            return Err(MessageError::AlreadyFinished);
        }
        Ok(())
    }
}
