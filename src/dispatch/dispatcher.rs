//! Destination / reply / dead-letter orchestration.
//!
//! # State Machine
//! ```text
//! destination? ──ok──▶ response? ──▶ reply? ──ok──▶ done
//!      │                  │ none       │ none
//!      │                  ▼            ▼
//!      │                 done         done (response absorbed)
//!      │                                │ err
//!      ▼ err                            ▼
//! dead letter (original message)   dead letter (original message)
//! ```
//!
//! No destination means the original message is the response.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use url::Url;

use crate::config::DispatcherConfig;
use crate::dispatch::error::{DispatchError, DispatchResult, ExchangeError};
use crate::dispatch::sender::{Hop, HttpSender};
use crate::dispatch::target::{normalize, Target};
use crate::message::{Message, MessageRef, MessageTracker};

/// Dispatches an event to a destination, forwarding its response to a reply
/// sink and falling back to a dead-letter sink on failure.
#[async_trait]
pub trait MessageDispatcher: Send + Sync {
    /// Deliver `message` with `headers` added to every request.
    ///
    /// `message` and every response produced along the way are finished
    /// before this returns, whatever the outcome.
    async fn dispatch(
        &self,
        message: MessageRef,
        headers: &HeaderMap,
        destination: Option<Target>,
        reply: Option<Target>,
        dead_letter: Option<Target>,
    ) -> DispatchResult<()>;
}

/// The HTTP implementation of [`MessageDispatcher`].
#[derive(Debug, Clone)]
pub struct HttpMessageDispatcher {
    sender: HttpSender,
}

impl HttpMessageDispatcher {
    /// Create a dispatcher with its own connection pool.
    pub fn new(config: &DispatcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_sender(HttpSender::new(config)?))
    }

    /// Create a dispatcher over an existing sender, sharing its pool.
    pub fn with_sender(sender: HttpSender) -> Self {
        Self { sender }
    }

    pub fn sender(&self) -> &HttpSender {
        &self.sender
    }

    /// Send the original message to the dead-letter sink, tracking any response.
    async fn send_dead_letter(
        &self,
        dead_letter: &Url,
        message: &dyn Message,
        headers: &HeaderMap,
        tracker: &mut MessageTracker,
    ) -> Result<(), ExchangeError> {
        let exchange = self
            .sender
            .execute(Hop::DeadLetter, dead_letter, message, headers)
            .await?;
        if let Some(response) = exchange.message {
            tracker.track(response);
        }
        Ok(())
    }
}

#[async_trait]
impl MessageDispatcher for HttpMessageDispatcher {
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

        // Sanitize eventual host-only targets.
        let destination = normalize(destination);
        let reply = normalize(reply);
        let dead_letter = normalize(dead_letter);

        let (response, response_headers) = match &destination {
            Some(destination) => {
                match self
                    .sender
                    .execute(Hop::Destination, destination, message.as_ref(), headers)
                    .await
                {
                    Ok(exchange) => {
                        if let Some(response) = &exchange.message {
                            tracker.track(response.clone());
                        }
                        (exchange.message, exchange.headers)
                    }
                    Err(err) => {
                        let Some(dead_letter) = &dead_letter else {
                            return Err(DispatchError::Destination {
                                url: destination.clone(),
                                source: err,
                            });
                        };
                        tracing::debug!(
                            destination = %destination,
                            dead_letter = %dead_letter,
                            error = %err,
                            "Destination failed, sending to dead letter sink"
                        );
                        return self
                            .send_dead_letter(dead_letter, message.as_ref(), headers, &mut tracker)
                            .await
                            .map_err(|dead_letter_error| DispatchError::DestinationAndDeadLetter {
                                destination: destination.clone(),
                                destination_error: err,
                                dead_letter: dead_letter.clone(),
                                dead_letter_error,
                            });
                    }
                }
            }
            // No destination: the original message goes to the reply, if any.
            None => (Some(message.clone()), headers.clone()),
        };

        // No response, dispatch completed.
        let Some(response) = response else {
            return Ok(());
        };

        let Some(reply) = &reply else {
            tracing::debug!("cannot forward response as reply is empty");
            return Ok(());
        };

        match self
            .sender
            .execute(Hop::Reply, reply, response.as_ref(), &response_headers)
            .await
        {
            Ok(exchange) => {
                if let Some(reply_response) = exchange.message {
                    tracker.track(reply_response);
                }
                Ok(())
            }
            Err(err) => {
                let Some(dead_letter) = &dead_letter else {
                    return Err(DispatchError::Reply {
                        url: reply.clone(),
                        source: err,
                    });
                };
                tracing::debug!(
                    reply = %reply,
                    dead_letter = %dead_letter,
                    error = %err,
                    "Reply failed, sending original event to dead letter sink"
                );
                // The dead letter sink gets the original event, not the response.
                self.send_dead_letter(dead_letter, message.as_ref(), &response_headers, &mut tracker)
                    .await
                    .map_err(|dead_letter_error| DispatchError::ReplyAndDeadLetter {
                        reply: reply.clone(),
                        reply_error: err,
                        dead_letter: dead_letter.clone(),
                        dead_letter_error,
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CountingMessage;

    fn dispatcher() -> HttpMessageDispatcher {
        HttpMessageDispatcher::new(&DispatcherConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_no_targets_is_a_noop() {
        let message = CountingMessage::structured();
        dispatcher()
            .dispatch(message.clone(), &HeaderMap::new(), None, None, None)
            .await
            .unwrap();
        assert_eq!(message.finish_count(), 1);
        assert_eq!(message.write_count(), 0);
    }

    #[tokio::test]
    async fn test_dead_letter_alone_is_never_used() {
        let message = CountingMessage::binary();
        let dead_letter: Target = "127.0.0.1:9".parse().unwrap();
        dispatcher()
            .dispatch(message.clone(), &HeaderMap::new(), None, None, Some(dead_letter))
            .await
            .unwrap();
        assert_eq!(message.finish_count(), 1);
        assert_eq!(message.write_count(), 0);
    }
}
