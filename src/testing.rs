//! Test doubles for code that dispatches events.
//!
//! `CountingMessage` counts releases so tests can check the exactly-once
//! contract, and `CountingResponses` does the same for response events
//! decoded by an [`HttpSender`]. `RecordingDispatcher` stands in for
//! [`HttpMessageDispatcher`] in callers' tests.
//!
//! [`HttpSender`]: crate::dispatch::HttpSender
//!
//! [`HttpMessageDispatcher`]: crate::dispatch::HttpMessageDispatcher

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;

use crate::dispatch::{DispatchError, DispatchResult, Hop, MessageDispatcher, ResponseFactory, Target};
use crate::message::{
    Encoding, Event, EventMessage, HttpMessage, Message, MessageError, MessageRef, MessageTracker,
};

/// A message that counts how often it is written and finished.
#[derive(Debug)]
pub struct CountingMessage {
    inner: EventMessage,
    writes: AtomicUsize,
    finishes: AtomicUsize,
}

impl CountingMessage {
    pub fn new(inner: EventMessage) -> Arc<Self> {
        Arc::new(Self {
            inner,
            writes: AtomicUsize::new(0),
            finishes: AtomicUsize::new(0),
        })
    }

    /// A structured message around [`sample_event`].
    pub fn structured() -> Arc<Self> {
        Self::new(EventMessage::structured(sample_event()))
    }

    /// A binary message around [`sample_event`].
    pub fn binary() -> Arc<Self> {
        Self::new(EventMessage::binary(sample_event()))
    }

    pub fn event(&self) -> &Event {
        self.inner.event()
    }

    pub fn finish_count(&self) -> usize {
        self.finishes.load(Ordering::SeqCst)
    }

    /// How many requests the message was written into.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Message for CountingMessage {
    fn encoding(&self) -> Encoding {
        self.inner.encoding()
    }

    fn write_http(&self, headers: &mut HeaderMap) -> Result<Bytes, MessageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_http(headers)
    }

    fn finish(&self) -> Result<(), MessageError> {
        self.finishes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A response event that counts how often it is finished.
#[derive(Debug)]
pub struct CountingResponse {
    hop: Hop,
    inner: HttpMessage,
    finishes: AtomicUsize,
}

impl CountingResponse {
    /// The hop whose response this is.
    pub fn hop(&self) -> Hop {
        self.hop
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name).and_then(|v| v.to_str().ok())
    }

    pub fn finish_count(&self) -> usize {
        self.finishes.load(Ordering::SeqCst)
    }
}

impl Message for CountingResponse {
    fn encoding(&self) -> Encoding {
        self.inner.encoding()
    }

    fn write_http(&self, headers: &mut HeaderMap) -> Result<Bytes, MessageError> {
        self.inner.write_http(headers)
    }

    fn finish(&self) -> Result<(), MessageError> {
        self.finishes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A [`ResponseFactory`] that keeps every response it hands out.
#[derive(Debug, Default)]
pub struct CountingResponses {
    created: Mutex<Vec<Arc<CountingResponse>>>,
}

impl CountingResponses {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every response created so far, in order.
    pub fn all(&self) -> Vec<Arc<CountingResponse>> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn for_hop(&self, hop: Hop) -> Vec<Arc<CountingResponse>> {
        self.all().into_iter().filter(|r| r.hop == hop).collect()
    }
}

impl ResponseFactory for CountingResponses {
    fn create(&self, hop: Hop, message: HttpMessage) -> MessageRef {
        let response = Arc::new(CountingResponse {
            hop,
            inner: message,
            finishes: AtomicUsize::new(0),
        });
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(response.clone());
        response
    }
}

/// A small JSON event.
pub fn sample_event() -> Event {
    Event::new("sample-1", "/event-dispatch/tests", "dev.event-dispatch.sample")
        .with_data("application/json", r#"{"hello":"world"}"#)
}

/// Arguments of one recorded dispatch call.
#[derive(Debug, Clone)]
pub struct DispatchCall {
    pub encoding: Encoding,
    pub headers: HeaderMap,
    pub destination: Option<Target>,
    pub reply: Option<Target>,
    pub dead_letter: Option<Target>,
}

/// A [`MessageDispatcher`] that records calls instead of sending.
///
/// Results are taken from a script in order; once it runs out every call
/// succeeds. Messages are still finished exactly once per call.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    calls: Mutex<Vec<DispatchCall>>,
    script: Mutex<VecDeque<DispatchResult<()>>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of a future call.
    pub fn push_result(&self, result: DispatchResult<()>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
    }

    /// Queue a failure for a future call.
    pub fn fail_next(&self, err: DispatchError) {
        self.push_result(Err(err));
    }

    pub fn calls(&self) -> Vec<DispatchCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MessageDispatcher for RecordingDispatcher {
    async fn dispatch(
        &self,
        message: MessageRef,
        headers: &HeaderMap,
        destination: Option<Target>,
        reply: Option<Target>,
        dead_letter: Option<Target>,
    ) -> DispatchResult<()> {
        let mut tracker = MessageTracker::new();
        tracker.track(message.clone());

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(DispatchCall {
                encoding: message.encoding(),
                headers: headers.clone(),
                destination,
                reply,
                dead_letter,
            });

        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Ok(()))
    }
}
