//! HTTP delivery engine for event routing.
//!
//! Given an event and up to three targets (destination, reply sink,
//! dead-letter sink) the dispatcher makes one delivery attempt per hop,
//! forwards an event returned by the destination to the reply sink, and
//! reroutes failures to the dead-letter sink when one is configured.
//!
//! Retries, backoff and queuing are left to the caller.

pub mod config;
pub mod dispatch;
pub mod message;
pub mod observability;
pub mod testing;

pub use config::DispatcherConfig;
pub use dispatch::{DispatchError, HttpMessageDispatcher, MessageDispatcher, Target};
pub use message::{Event, EventMessage, Message, MessageRef};
