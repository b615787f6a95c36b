//! Per-symbol quote routing and the stream protocol handshake.

use super::{ControlFrame, Quote, StreamMessage, quote_stream};
use crate::config::FeedConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::{debug, info, trace, warn};

/// Callback receiving every quote for one stream.
pub type QuoteHandler = Box<dyn FnMut(&Quote)>;

/// Routes decoded stream messages to per-symbol handlers.
///
/// Subscriptions made before the stream is authorized are sent in one
/// `listen` frame once authorization arrives. Later subscriptions produce
/// their own `listen` frame right away.
#[derive(Default)]
pub struct QuoteRouter {
    handlers: IndexMap<String, QuoteHandler>,
    listening: Vec<String>,
    authorized: bool,
}

impl std::fmt::Debug for QuoteRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteRouter")
            .field("streams", &self.handlers.keys().collect::<Vec<_>>())
            .field("listening", &self.listening)
            .field("authorized", &self.authorized)
            .finish()
    }
}

impl QuoteRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticate frame built from the configured credentials.
    pub fn authenticate_frame(config: &FeedConfig) -> Result<ControlFrame> {
        match (&config.key_id, &config.secret_key) {
            (Some(key_id), Some(secret_key)) => Ok(ControlFrame::authenticate(key_id, secret_key)),
            _ => Err(Error::config("Feed credentials (key_id, secret_key) are not set")),
        }
    }

    /// Route quotes for `symbol` to `handler`, replacing any previous handler.
    pub fn subscribe<F>(&mut self, symbol: &str, handler: F) -> Option<ControlFrame>
    where
        F: FnMut(&Quote) + 'static,
    {
        let stream = quote_stream(symbol);
        let is_new = self.handlers.insert(stream.clone(), Box::new(handler)).is_none();
        debug!(%stream, is_new, "subscribed quote handler");
        (self.authorized && is_new).then(|| ControlFrame::listen([stream]))
    }

    /// Stop routing quotes for `symbol`.
    pub fn unsubscribe(&mut self, symbol: &str) -> Option<ControlFrame> {
        let stream = quote_stream(symbol);
        if self.handlers.shift_remove(&stream).is_none() {
            return None;
        }
        self.listening.retain(|s| s != &stream);
        debug!(%stream, "unsubscribed quote handler");
        self.authorized.then(|| ControlFrame::unlisten([stream]))
    }

    /// Streams with a registered handler, in subscription order.
    pub fn streams(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// Streams the server last confirmed.
    pub fn listening(&self) -> &[String] {
        &self.listening
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    /// Apply one message. Returns a frame to send back, if any.
    pub fn handle(&mut self, message: StreamMessage) -> Result<Option<ControlFrame>> {
        match message {
            StreamMessage::Authorized => {
                info!("Streaming connection authorized");
                self.authorized = true;
                let streams = self.streams();
                Ok((!streams.is_empty()).then(|| ControlFrame::listen(streams)))
            }
            StreamMessage::Unauthorized(status) => {
                self.authorized = false;
                Err(Error::feed(format!("Stream authorization failed: {status}")))
            }
            StreamMessage::Listening(streams) => {
                debug!(?streams, "stream listening");
                self.listening = streams;
                Ok(None)
            }
            StreamMessage::Quote(quote) => {
                let stream = quote_stream(&quote.symbol);
                match self.handlers.get_mut(&stream) {
                    Some(handler) => handler(&quote),
                    None => trace!(%stream, "no handler for quote"),
                }
                Ok(None)
            }
            StreamMessage::Other(stream) => {
                trace!(%stream, "ignoring stream event");
                Ok(None)
            }
        }
    }

    /// Decode and apply one text frame.
    pub fn handle_text(&mut self, text: &str) -> Result<Option<ControlFrame>> {
        self.handle(StreamMessage::decode(text)?)
    }
}

/// Transport carrying stream frames, e.g. a WebSocket connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send {
    /// Send one control frame.
    async fn send(&mut self, frame: &ControlFrame) -> Result<()>;

    /// Next text frame, or `None` once the connection closed.
    async fn next_message(&mut self) -> Result<Option<String>>;
}

/// Authenticate on `source` and feed its messages through `router` until
/// the connection closes.
///
/// Undecodable frames are logged and skipped. A rejected authorization
/// ends the session with an error.
pub async fn pump<S>(source: &mut S, router: &mut QuoteRouter, config: &FeedConfig) -> Result<()>
where
    S: QuoteSource + ?Sized,
{
    source.send(&QuoteRouter::authenticate_frame(config)?).await?;

    while let Some(text) = source.next_message().await? {
        let reply = match router.handle_text(&text) {
            Ok(reply) => reply,
            Err(e @ (Error::Parse(_) | Error::Feed(_))) if router.is_authorized() => {
                warn!(error = %e, "skipping stream frame");
                None
            }
            Err(e) => return Err(e),
        };
        if let Some(frame) = reply {
            source.send(&frame).await?;
        }
    }

    info!("Stream connection closed");
    Ok(())
}
