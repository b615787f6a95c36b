//! Market data stream, decode level.
//!
//! Text frames from the stream are decoded into [`StreamMessage`]s and
//! routed to per-symbol handlers by a [`QuoteRouter`]. The socket itself
//! sits behind the [`QuoteSource`] trait.

mod message;
mod quote;
mod router;

pub use message::{ControlFrame, StreamMessage};
pub use quote::Quote;
pub use router::{QuoteHandler, QuoteRouter, QuoteSource, pump};

/// Quote stream name for `symbol`, e.g. `Q.AAPL`.
pub fn quote_stream(symbol: &str) -> String {
    format!("Q.{}", symbol.trim().to_ascii_uppercase())
}
