//! # Tickerboard
//!
//! Core plumbing for a stock trading dashboard: shared reactive state, a
//! record serializer, and decode-level quote stream and order handling.
//!
//! ## Architecture
//!
//! - **State**: keyed observable store with per-key listeners
//! - **Model**: record models and their JSON payload mapping
//! - **Feed**: quote stream messages, control frames and routing
//! - **Trading**: order request records and the gateway seam
//! - **App**: console that wires the pieces together
//! - **Config**: layered configuration
//! - **Logging**: tracing subscriber setup

pub mod app;
pub mod config;
pub mod error;
pub mod feed;
pub mod logging;
pub mod model;
pub mod state;
pub mod trading;

pub use crate::config::Config;
pub use app::{App, AppChange};
pub use error::{Error, Result};
pub use feed::{ControlFrame, Quote, QuoteRouter, StreamMessage};
pub use model::{FieldValue, Model, NestedPolicy, SerializeOptions, Serialized};
pub use state::{AppStore, AppView, ObservableStore, Snapshot, StateKey, StateValue};
pub use trading::{OrderGateway, OrderRequest};
