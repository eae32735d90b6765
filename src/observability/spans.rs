//! Tracing spans for outbound exchanges.

use tracing::field::Empty;
use url::Url;

use crate::dispatch::sender::Hop;

/// Client span covering one exchange.
///
/// `http.status_code` is recorded once a response arrives, `response.error`
/// when an accepted response event is dropped.
pub fn exchange_span(hop: Hop, url: &Url) -> tracing::Span {
    tracing::info_span!(
        "event_dispatch.exchange",
        otel.kind = "client",
        hop = hop.as_str(),
        url = %url,
        http.status_code = Empty,
        response.error = Empty,
    )
}
