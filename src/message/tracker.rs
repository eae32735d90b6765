//! Scoped release of the messages touched by one dispatch call.

use crate::message::MessageRef;

/// Ordered set of messages to finish when the tracker goes out of scope.
///
/// Dropping the tracker finishes every tracked message once, in the order
/// they were tracked. This covers normal returns, early returns, a dropped
/// (cancelled) future and unwinding. Release failures are logged.
#[derive(Debug, Default)]
pub struct MessageTracker {
    messages: Vec<MessageRef>,
}

impl MessageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take responsibility for finishing `message`.
    pub fn track(&mut self, message: MessageRef) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Drop for MessageTracker {
    fn drop(&mut self) {
        for message in self.messages.drain(..) {
            if let Err(e) = message.finish() {
                tracing::warn!(
                    encoding = %message.encoding(),
                    error = %e,
                    "Failed to finish message"
                );
            }
        }
    }
}
