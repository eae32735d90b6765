//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every exchange produces:
//!     → spans.rs (one client span per exchange, status recorded on it)
//!     → metrics.rs (counters and latency histograms per hop)
//!     → logging via `tracing` events, formatted by logging.rs
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing subscribers and exporters is the
//!   binary's job
//! - Metric updates go through the `metrics` facade and are no-ops without
//!   a recorder

pub mod logging;
pub mod metrics;
pub mod spans;
