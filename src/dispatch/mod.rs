//! Event dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! dispatch(message, headers, destination?, reply?, dead_letter?)
//!     → target.rs (normalize targets)
//!     → dispatcher.rs (hop state machine, dead-letter fallback)
//!     → sender.rs (one HTTP exchange per hop)
//!     → headers.rs (additional headers in, passthrough headers out)
//!     → error.rs (single-hop and dual failures)
//! ```
//!
//! # Design Decisions
//! - Stateless per call; the connection pool is the only shared state
//! - At most two network calls per dispatch
//! - Dead-letter sinks always receive the original inbound event

pub mod dispatcher;
pub mod error;
pub mod headers;
pub mod sender;
pub mod target;

pub use dispatcher::{HttpMessageDispatcher, MessageDispatcher};
pub use error::{DispatchError, DispatchResult, ExchangeError, FailureKind};
pub use headers::PassthroughPolicy;
pub use sender::{Exchange, Hop, HttpSender, PlainResponses, ResponseFactory};
pub use target::{normalize, Target};
