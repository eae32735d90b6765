//! Metrics collection.
//!
//! # Metrics
//! - `event_dispatch_exchanges_total` (counter): exchanges by hop, outcome
//! - `event_dispatch_exchange_duration_seconds` (histogram): latency by hop
//!
//! Outcomes are `success`, `status_error`, `transport_error` and
//! `cancelled`, the last for exchanges dropped before they completed.

use std::time::Instant;

use crate::dispatch::error::{ExchangeError, FailureKind};
use crate::dispatch::sender::Hop;

pub const EXCHANGES_TOTAL: &str = "event_dispatch_exchanges_total";
pub const EXCHANGE_DURATION: &str = "event_dispatch_exchange_duration_seconds";

pub const CANCELLED: &str = "cancelled";

/// Label value for the outcome of an exchange.
pub fn outcome<T>(result: &Result<T, ExchangeError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) if e.kind() == FailureKind::Protocol => "status_error",
        Err(_) => "transport_error",
    }
}

/// Record one finished exchange.
pub fn record_exchange(hop: Hop, outcome: &'static str, started: Instant) {
    metrics::counter!(EXCHANGES_TOTAL, "hop" => hop.as_str(), "outcome" => outcome).increment(1);
    metrics::histogram!(EXCHANGE_DURATION, "hop" => hop.as_str())
        .record(started.elapsed().as_secs_f64());
}

/// Times one exchange and records it exactly once.
///
/// A timer dropped without [`finish`](Self::finish) records `cancelled`.
#[derive(Debug)]
pub struct ExchangeTimer {
    hop: Hop,
    started: Instant,
    enabled: bool,
    recorded: bool,
}

impl ExchangeTimer {
    pub fn start(hop: Hop, enabled: bool) -> Self {
        Self {
            hop,
            started: Instant::now(),
            enabled,
            recorded: false,
        }
    }

    pub fn finish(mut self, outcome: &'static str) {
        self.record(outcome);
    }

    fn record(&mut self, outcome: &'static str) {
        if self.enabled && !self.recorded {
            record_exchange(self.hop, outcome, self.started);
        }
        self.recorded = true;
    }
}

impl Drop for ExchangeTimer {
    fn drop(&mut self) {
        self.record(CANCELLED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
    use reqwest::StatusCode;

    /// Remembers the outcome label of every counter registration.
    #[derive(Default)]
    struct OutcomeRecorder {
        outcomes: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder for OutcomeRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            if key.name() == EXCHANGES_TOTAL {
                let outcome = key
                    .labels()
                    .find(|label| label.key() == "outcome")
                    .map(|label| label.value().to_string())
                    .unwrap_or_default();
                self.outcomes.lock().unwrap().push(outcome);
            }
            Counter::noop()
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    fn outcomes_of(f: impl FnOnce()) -> Vec<String> {
        let recorder = OutcomeRecorder::default();
        let outcomes = recorder.outcomes.clone();
        metrics::with_local_recorder(&recorder, f);
        let recorded = outcomes.lock().unwrap().clone();
        recorded
    }

    #[test]
    fn test_dropped_timer_records_cancelled() {
        let outcomes = outcomes_of(|| drop(ExchangeTimer::start(Hop::Destination, true)));
        assert_eq!(outcomes, vec![CANCELLED.to_string()]);
    }

    #[test]
    fn test_finished_timer_records_once() {
        let outcomes = outcomes_of(|| ExchangeTimer::start(Hop::Reply, true).finish("success"));
        assert_eq!(outcomes, vec!["success".to_string()]);
    }

    #[test]
    fn test_disabled_timer_records_nothing() {
        let outcomes = outcomes_of(|| drop(ExchangeTimer::start(Hop::DeadLetter, false)));
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome::<()>(&Ok(())), "success");
        let rejected: Result<(), _> = Err(ExchangeError::UnexpectedStatus(StatusCode::NOT_FOUND));
        assert_eq!(outcome(&rejected), "status_error");
        let oversized: Result<(), _> = Err(ExchangeError::BodyTooLarge { limit: 1 });
        assert_eq!(outcome(&oversized), "transport_error");
    }
}
