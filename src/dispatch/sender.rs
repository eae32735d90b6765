//! HTTP exchange executor.
//!
//! # Responsibilities
//! - Write a message into a `POST` request, additional headers on top
//! - Send it once through the pooled client
//! - Classify the status and decode an event response, if any
//!
//! # Design Decisions
//! - No retries here; callers wrap dispatch for that
//! - Non-event responses are discarded without reading the body
//! - Once a 2xx arrives the hop has succeeded; an event body that cannot be
//!   read is dropped with a warning, never turned into a failure
//! - Only passthrough headers survive to the next hop

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use reqwest::header::HeaderMap;
use tracing::Instrument;
use url::Url;

use crate::config::DispatcherConfig;
use crate::dispatch::error::ExchangeError;
use crate::dispatch::headers::{apply_additional, PassthroughPolicy};
use crate::message::http::detect_encoding;
use crate::message::{Encoding, HttpMessage, Message, MessageRef};
use crate::observability::{metrics, spans};

/// Which leg of a dispatch an exchange belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hop {
    Destination,
    Reply,
    DeadLetter,
}

impl Hop {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hop::Destination => "destination",
            Hop::Reply => "reply",
            Hop::DeadLetter => "dead_letter",
        }
    }
}

/// Result of a successful exchange.
#[derive(Debug, Default)]
pub struct Exchange {
    /// Event carried by the response. The caller must finish it.
    pub message: Option<MessageRef>,
    /// Passthrough headers of the response. Empty when there is no message.
    pub headers: HeaderMap,
}

/// Turns a decoded response event into the message handed back to the
/// dispatcher, which finishes it.
pub trait ResponseFactory: Send + Sync + fmt::Debug {
    fn create(&self, hop: Hop, message: HttpMessage) -> MessageRef;
}

/// Hands responses back as plain [`HttpMessage`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainResponses;

impl ResponseFactory for PlainResponses {
    fn create(&self, _hop: Hop, message: HttpMessage) -> MessageRef {
        Arc::new(message)
    }
}

/// Sends messages over a shared connection pool.
///
/// Cloning is cheap and clones share the pool.
#[derive(Debug, Clone)]
pub struct HttpSender {
    client: reqwest::Client,
    passthrough: PassthroughPolicy,
    responses: Arc<dyn ResponseFactory>,
    max_body_bytes: usize,
    metrics_enabled: bool,
}

impl HttpSender {
    /// Build the pooled client described by `config`.
    pub fn new(config: &DispatcherConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.timeouts.connect())
            .timeout(config.timeouts.request())
            .pool_max_idle_per_host(config.connection.max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(config.connection.idle_timeout_secs));
        if !config.connection.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            passthrough: PassthroughPolicy::from_config(&config.passthrough),
            responses: Arc::new(PlainResponses),
            max_body_bytes: config.limits.max_response_body_bytes,
            metrics_enabled: config.observability.metrics_enabled,
        })
    }

    /// Replace how response events are wrapped before they reach the caller.
    pub fn with_response_factory(mut self, responses: Arc<dyn ResponseFactory>) -> Self {
        self.responses = responses;
        self
    }

    /// Perform one request/response cycle against `url`.
    pub async fn execute(
        &self,
        hop: Hop,
        url: &Url,
        message: &dyn Message,
        headers: &HeaderMap,
    ) -> Result<Exchange, ExchangeError> {
        // Dropped unfinished when the caller cancels, which counts as cancelled.
        let timer = metrics::ExchangeTimer::start(hop, self.metrics_enabled);
        let result = self
            .exchange(hop, url, message, headers)
            .instrument(spans::exchange_span(hop, url))
            .await;
        timer.finish(metrics::outcome(&result));
        result
    }

    async fn exchange(
        &self,
        hop: Hop,
        url: &Url,
        message: &dyn Message,
        headers: &HeaderMap,
    ) -> Result<Exchange, ExchangeError> {
        tracing::debug!(url = %url, encoding = %message.encoding(), "Dispatching event");

        let mut request_headers = HeaderMap::new();
        let body = message.write_http(&mut request_headers)?;
        apply_additional(&mut request_headers, headers);

        let response = self
            .client
            .post(url.clone())
            .headers(request_headers)
            .body(body)
            .send()
            .await
            .map_err(ExchangeError::from_reqwest)?;

        let status = response.status();
        tracing::Span::current().record("http.status_code", status.as_u16());
        if !status.is_success() {
            // Reject non-successful responses.
            return Err(ExchangeError::UnexpectedStatus(status));
        }

        if detect_encoding(response.headers()) == Encoding::Unknown {
            tracing::debug!(status_code = status.as_u16(), "Response is a non event, discarding it");
            return Ok(Exchange::default());
        }

        let response_headers = response.headers().clone();
        let body = match self.read_body(response).await {
            Ok(body) => body,
            Err(err) => {
                tracing::Span::current().record("response.error", tracing::field::display(&err));
                tracing::warn!(
                    url = %url,
                    status_code = status.as_u16(),
                    error = %err,
                    "Accepted response event could not be read, discarding it"
                );
                return Ok(Exchange::default());
            }
        };
        let message = HttpMessage::new(response_headers, body);
        let headers = self.passthrough.filter(message.headers());

        Ok(Exchange {
            message: Some(self.responses.create(hop, message)),
            headers,
        })
    }

    async fn read_body(&self, mut response: reqwest::Response) -> Result<bytes::Bytes, ExchangeError> {
        let limit = self.max_body_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(ExchangeError::BodyTooLarge { limit });
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(ExchangeError::from_reqwest)? {
            if body.len() + chunk.len() > limit {
                return Err(ExchangeError::BodyTooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }
}
