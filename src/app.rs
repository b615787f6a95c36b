//! Main application module.
//!
//! [`App`] wires the dashboard store to the quote router and an optional
//! order gateway, and drives them from a line-oriented console.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::feed::{ControlFrame, Quote, QuoteRouter, StreamMessage};
use crate::model::{Model, SerializeOptions};
use crate::state::{AppStore, AppView, StateChange, StateKey, StateValue};
use crate::trading::{OrderGateway, OrderRequest, OrderSide};

use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

/// A forwarded write to the dashboard store.
pub type AppChange = StateChange<StateKey, StateValue>;

const HELP: &str = "\
Commands:
  view <dashboard|analyze|search>   switch the current view
  select <SYMBOL>                   select a stock and subscribe to its quotes
  feed <json>                       apply one stream frame
  quote <SYMBOL>                    last quote received for a symbol
  state                             print the dashboard state
  frames                            print and clear pending control frames
  buy|sell <SYMBOL> <QTY>           build (and place, if a gateway is set) a market order
  help                              show this help
  quit                              exit";

/// The main application.
pub struct App {
    /// Dashboard store.
    store: AppStore,
    /// Quote routing, shared with the stock selection listener.
    router: Rc<RefCell<QuoteRouter>>,
    /// Control frames waiting to be sent on the stream.
    outbox: Rc<RefCell<Vec<ControlFrame>>>,
    /// Last quote per symbol.
    quotes: Rc<RefCell<IndexMap<String, Quote>>>,
    /// Whether the change stream was handed out.
    changes_taken: bool,
    gateway: Option<Box<dyn OrderGateway>>,
    config: Config,
    running: bool,
}

impl App {
    /// Create a new application.
    pub fn new(config: Config) -> Self {
        let store = AppStore::with_max_depth(config.store.max_dispatch_depth);
        let router = Rc::new(RefCell::new(QuoteRouter::new()));
        let outbox = Rc::new(RefCell::new(Vec::new()));
        let quotes = Rc::new(RefCell::new(IndexMap::new()));

        match QuoteRouter::authenticate_frame(&config.feed) {
            Ok(frame) => outbox.borrow_mut().push(frame),
            Err(e) => debug!(error = %e, "quote stream not authenticated"),
        }

        store.on_change(StateKey::CurrentView, |value, state| {
            if let Some(view) = value.as_view() {
                info!(%view, selected = ?state.selected_stock(), "view switched");
            }
            Ok(())
        });

        {
            let router = Rc::clone(&router);
            let outbox = Rc::clone(&outbox);
            let quotes = Rc::clone(&quotes);
            let subscribed: RefCell<Option<String>> = RefCell::new(None);
            store.on_change(StateKey::SelectedStock, move |value, _| {
                let Some(symbol) = value.as_stock() else {
                    return Ok(());
                };
                let mut subscribed = subscribed.borrow_mut();
                if subscribed.as_deref() == Some(symbol) {
                    return Ok(());
                }

                let mut router = router.borrow_mut();
                let mut outbox = outbox.borrow_mut();
                // Only the selected stock is streamed.
                if let Some(previous) = subscribed.take() {
                    quotes.borrow_mut().shift_remove(&previous);
                    outbox.extend(router.unsubscribe(&previous));
                }
                let quotes = Rc::clone(&quotes);
                outbox.extend(router.subscribe(symbol, move |quote| {
                    quotes
                        .borrow_mut()
                        .insert(quote.symbol.clone(), quote.clone());
                }));
                *subscribed = Some(symbol.to_string());
                Ok(())
            });
        }

        Self {
            store,
            router,
            outbox,
            quotes,
            changes_taken: false,
            gateway: None,
            config,
            running: false,
        }
    }

    /// Place console orders through `gateway` instead of only printing them.
    pub fn with_gateway(mut self, gateway: impl OrderGateway + 'static) -> Self {
        self.gateway = Some(Box::new(gateway));
        self
    }

    pub fn store(&self) -> &AppStore {
        &self.store
    }

    /// Stream of every write to the store from now on. Can be taken once.
    pub fn take_changes(&mut self) -> Option<UnboundedReceiverStream<AppChange>> {
        if self.changes_taken {
            return None;
        }
        self.changes_taken = true;

        let (tx, rx) = mpsc::unbounded_channel();
        self.store.forward(StateKey::CurrentView, tx.clone());
        self.store.forward(StateKey::SelectedStock, tx);
        Some(UnboundedReceiverStream::new(rx))
    }

    /// Drain the control frames waiting to be sent.
    pub fn take_frames(&self) -> Vec<ControlFrame> {
        std::mem::take(&mut *self.outbox.borrow_mut())
    }

    /// Run the console until `quit` or end of input.
    pub async fn run<R, W>(&mut self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.store.show(AppView::Dashboard)?;
        self.running = true;
        info!("Console started");

        let mut lines = reader.lines();
        while self.running {
            let Some(line) = lines.next_line().await? else {
                break;
            };

            let output = match self.execute(&line).await {
                Ok(output) => output,
                Err(e @ Error::Io(_)) => return Err(e),
                Err(e) => {
                    if e.is_recoverable() {
                        debug!(error = %e, "command failed");
                    } else {
                        warn!(error = %e, "command failed");
                    }
                    Some(format!("error: {e}"))
                }
            };

            if let Some(output) = output {
                writer.write_all(output.as_bytes()).await?;
                writer.write_all(b"\n").await?;
            }
            writer.flush().await?;
        }

        self.running = false;
        info!("Console closed");
        Ok(())
    }

    /// Execute one console command.
    pub async fn execute(&mut self, line: &str) -> Result<Option<String>> {
        let line = line.trim();
        let (command, args) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let args = args.trim();

        match command.to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "view" => {
                let view: AppView = args.parse()?;
                self.store.show(view)?;
                Ok(Some(format!("Showing {view}")))
            }
            "select" => {
                self.store.select_stock(args)?;
                let symbol = self.store.selected_stock().unwrap_or_default();
                Ok(Some(format!("Selected {symbol}")))
            }
            "feed" => self.feed(args),
            "quote" => self.quote(args),
            "state" => {
                let text = self
                    .store
                    .snapshot()
                    .record()
                    .to_payload(&SerializeOptions::new().ignore_empty(true).format(true))?
                    .into_text()?;
                Ok(Some(text))
            }
            "frames" => {
                let frames = self
                    .take_frames()
                    .iter()
                    .map(ControlFrame::encode)
                    .collect::<Result<Vec<_>>>()?;
                Ok((!frames.is_empty()).then(|| frames.join("\n")))
            }
            "buy" | "sell" => self.order(command, args).await,
            "help" | "?" => Ok(Some(HELP.to_string())),
            "quit" | "exit" | "q" => {
                self.running = false;
                Ok(None)
            }
            other => Err(Error::invalid_input(format!(
                "Unknown command '{other}', try 'help'"
            ))),
        }
    }

    fn feed(&mut self, text: &str) -> Result<Option<String>> {
        let message = StreamMessage::decode(text)?;
        let symbol = match &message {
            StreamMessage::Quote(quote) => Some(quote.symbol.clone()),
            _ => None,
        };

        if let Some(frame) = self.router.borrow_mut().handle(message)? {
            self.outbox.borrow_mut().push(frame);
        }

        match symbol {
            Some(symbol) => self.quote(&symbol),
            None => Ok(None),
        }
    }

    fn quote(&self, symbol: &str) -> Result<Option<String>> {
        let symbol = symbol.trim().to_ascii_uppercase();
        let quotes = self.quotes.borrow();
        let Some(quote) = quotes.get(&symbol) else {
            return Ok(None);
        };
        Ok(Some(format!(
            "{} bid {} x {} ask {} x {}",
            quote.symbol, quote.bid_price, quote.bid_size, quote.ask_price, quote.ask_size
        )))
    }

    async fn order(&self, side: &str, args: &str) -> Result<Option<String>> {
        let side: OrderSide = side.parse()?;
        let mut parts = args.split_whitespace();
        let (Some(symbol), Some(qty), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(Error::invalid_input(format!("Usage: {side} <SYMBOL> <QTY>")));
        };
        let qty: u32 = qty
            .parse()
            .map_err(|_| Error::invalid_input(format!("Invalid quantity '{qty}'")))?;

        let request = OrderRequest::market(
            symbol,
            qty,
            side,
            self.config.trading.default_time_in_force,
        );
        let body = request.to_wire()?;

        let Some(gateway) = &self.gateway else {
            return Ok(Some(body));
        };
        let ack = gateway.place_order(&request).await?;
        info!(id = %ack.id, status = %ack.status, "order placed");
        Ok(Some(ack.to_json()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading::{MockOrderGateway, OrderAck};
    use pretty_assertions::assert_eq;

    const AUTHORIZED: &str =
        r#"{"stream":"authorization","data":{"action":"authenticate","status":"authorized"}}"#;
    const AAPL_QUOTE: &str = r#"{"stream":"Q.AAPL","data":{"ev":"Q","T":"AAPL","p":127.5,"s":1,"P":127.6,"S":3,"t":1}}"#;

    fn create_test_app() -> App {
        App::new(Config::default())
    }

    #[tokio::test]
    async fn test_view_and_select() {
        let mut app = create_test_app();
        assert_eq!(
            app.execute("view analyze").await.unwrap().as_deref(),
            Some("Showing analyze")
        );
        app.execute("select aapl").await.unwrap();
        assert_eq!(app.store().current_view(), Some(AppView::Analyze));
        assert_eq!(app.store().selected_stock().as_deref(), Some("AAPL"));

        let err = app.execute("view portfolio").await.unwrap_err();
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_state_is_printed_without_unset_fields() {
        let mut app = create_test_app();
        app.execute("view search").await.unwrap();
        assert_eq!(
            app.execute("state").await.unwrap().unwrap(),
            "{\n  \"currentView\": \"search\"\n}"
        );
    }

    #[tokio::test]
    async fn test_selection_subscribes_quotes() {
        let mut app = create_test_app();
        app.execute("select AAPL").await.unwrap();
        // Nothing to send until the stream is authorized.
        assert_eq!(app.execute("frames").await.unwrap(), None);

        app.execute(&format!("feed {AUTHORIZED}")).await.unwrap();
        assert_eq!(
            app.execute("frames").await.unwrap().as_deref(),
            Some(r#"{"action":"listen","data":{"streams":["Q.AAPL"]}}"#)
        );

        assert_eq!(
            app.execute(&format!("feed {AAPL_QUOTE}")).await.unwrap().as_deref(),
            Some("AAPL bid 127.5 x 1 ask 127.6 x 3")
        );
        assert!(app.execute("quote aapl").await.unwrap().is_some());
        assert_eq!(app.execute("quote TSLA").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_new_selection_replaces_old_subscription() {
        let mut app = create_test_app();
        app.execute("select AAPL").await.unwrap();
        app.execute(&format!("feed {AUTHORIZED}")).await.unwrap();
        assert_eq!(app.take_frames(), vec![ControlFrame::listen(["Q.AAPL"])]);
        app.execute(&format!("feed {AAPL_QUOTE}")).await.unwrap();

        app.execute("select MSFT").await.unwrap();
        assert_eq!(
            app.take_frames(),
            vec![
                ControlFrame::unlisten(["Q.AAPL"]),
                ControlFrame::listen(["Q.MSFT"]),
            ]
        );
        assert_eq!(app.router.borrow().streams(), vec!["Q.MSFT".to_string()]);
        assert_eq!(app.execute("quote AAPL").await.unwrap(), None);
        // Quotes for the old selection are no longer routed.
        assert_eq!(app.execute(&format!("feed {AAPL_QUOTE}")).await.unwrap(), None);

        // Selecting the same stock again sends nothing.
        app.execute("select msft").await.unwrap();
        assert!(app.take_frames().is_empty());
    }

    #[tokio::test]
    async fn test_selections_before_authorization_listen_once() {
        let mut app = create_test_app();
        for symbol in ["AAPL", "MSFT", "TSLA", "IBM"] {
            app.execute(&format!("select {symbol}")).await.unwrap();
        }
        app.execute(&format!("feed {AUTHORIZED}")).await.unwrap();
        assert_eq!(
            app.execute("frames").await.unwrap().as_deref(),
            Some(r#"{"action":"listen","data":{"streams":["Q.IBM"]}}"#)
        );
    }

    #[test]
    fn test_changes_are_forwarded_only_once_taken() {
        let mut app = create_test_app();
        assert_eq!(app.store().listener_count(StateKey::CurrentView), 1);
        app.store().show(AppView::Search).unwrap();

        let mut changes = app.take_changes().unwrap().into_inner();
        assert!(app.take_changes().is_none());
        assert_eq!(app.store().listener_count(StateKey::CurrentView), 2);
        assert_eq!(app.store().listener_count(StateKey::SelectedStock), 2);

        app.store().show(AppView::Analyze).unwrap();
        let change = changes.try_recv().unwrap();
        assert_eq!(change.value, StateValue::View(AppView::Analyze));
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_credentials_queue_authenticate_frame() {
        let mut config = Config::default();
        config.feed.key_id = Some("PK1".to_string());
        config.feed.secret_key = Some("secret".to_string());
        let app = App::new(config);
        assert_eq!(
            app.take_frames(),
            vec![ControlFrame::authenticate("PK1", "secret")]
        );
    }

    #[tokio::test]
    async fn test_order_without_gateway_prints_wire_body() {
        let mut app = create_test_app();
        let body = app.execute("buy spy 2").await.unwrap().unwrap();
        assert!(body.starts_with(r#"{"symbol":"SPY","qty":2,"side":"buy","type":"market""#));

        assert!(app.execute("sell SPY").await.is_err());
        assert!(app.execute("sell SPY many").await.is_err());
        assert!(matches!(
            app.execute("buy SPY 0").await,
            Err(Error::Order(_))
        ));
    }

    #[tokio::test]
    async fn test_order_with_gateway() {
        let mut gateway = MockOrderGateway::new();
        gateway
            .expect_place_order()
            .withf(|request| request.symbol == "AAPL" && request.side == OrderSide::Sell)
            .times(1)
            .returning(|request| {
                Ok(OrderAck {
                    id: "ord-7".to_string(),
                    client_order_id: None,
                    symbol: request.symbol.clone(),
                    status: "accepted".to_string(),
                })
            });

        let mut app = create_test_app().with_gateway(gateway);
        assert_eq!(
            app.execute("sell aapl 5").await.unwrap().as_deref(),
            Some(r#"{"id":"ord-7","client_order_id":null,"symbol":"AAPL","status":"accepted"}"#)
        );
    }

    #[tokio::test]
    async fn test_run_console() {
        let mut app = create_test_app();
        let mut changes = app.take_changes().unwrap().into_inner();
        assert!(app.take_changes().is_none());

        let input: &[u8] = b"select msft\nbogus\nview analyze\nquit\nview search\n";
        let mut output = Vec::new();
        app.run(input, &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_eq!(
            output,
            "Selected MSFT\nerror: Invalid input: Unknown command 'bogus', try 'help'\nShowing analyze\n"
        );
        assert_eq!(app.store().current_view(), Some(AppView::Analyze));

        let mut seen = Vec::new();
        while let Ok(change) = changes.try_recv() {
            seen.push((change.key, change.value));
        }
        assert_eq!(
            seen,
            vec![
                (StateKey::CurrentView, StateValue::View(AppView::Dashboard)),
                (StateKey::SelectedStock, StateValue::Stock("MSFT".to_string())),
                (StateKey::CurrentView, StateValue::View(AppView::Analyze)),
            ]
        );
    }
}
