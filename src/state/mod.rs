//! State management for Tickerboard.
//!
//! Shared dashboard state lives in an [`ObservableStore`] keyed by
//! [`StateKey`]. Components write through the store's explicit API and
//! react to each other's writes through listeners registered per key.

mod observable;

pub use observable::{DEFAULT_MAX_DISPATCH_DEPTH, Listener, ObservableStore, Snapshot, StateChange};

use crate::error::{Error, Result};
use crate::model::{FieldValue, Fields, Model, ToField, assign_field};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Names one slot of shared dashboard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    CurrentView,
    SelectedStock,
}

impl StateKey {
    /// Field name used when the state is serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CurrentView => "currentView",
            Self::SelectedStock => "selectedStock",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The top-level view shown by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppView {
    #[default]
    Dashboard,
    Analyze,
    Search,
}

impl AppView {
    pub const ALL: [AppView; 3] = [AppView::Dashboard, AppView::Analyze, AppView::Search];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Analyze => "analyze",
            Self::Search => "search",
        }
    }
}

impl fmt::Display for AppView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppView {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|view| view.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid_input(format!("Unknown view '{s}'")))
    }
}

impl ToField for AppView {
    fn to_field(&self) -> FieldValue {
        FieldValue::Text(self.as_str().to_string())
    }
}

/// A value held by the dashboard store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateValue {
    View(AppView),
    Stock(String),
}

impl StateValue {
    pub fn as_view(&self) -> Option<AppView> {
        match self {
            Self::View(view) => Some(*view),
            Self::Stock(_) => None,
        }
    }

    pub fn as_stock(&self) -> Option<&str> {
        match self {
            Self::Stock(symbol) => Some(symbol),
            Self::View(_) => None,
        }
    }
}

impl From<AppView> for StateValue {
    fn from(view: AppView) -> Self {
        Self::View(view)
    }
}

/// The dashboard's store.
pub type AppStore = ObservableStore<StateKey, StateValue>;

/// Snapshot of the dashboard's store.
pub type AppSnapshot = Snapshot<StateKey, StateValue>;

impl Snapshot<StateKey, StateValue> {
    pub fn current_view(&self) -> Option<AppView> {
        self.get(&StateKey::CurrentView).and_then(StateValue::as_view)
    }

    pub fn selected_stock(&self) -> Option<&str> {
        self.get(&StateKey::SelectedStock).and_then(StateValue::as_stock)
    }

    /// The state as a serializable record.
    pub fn record(&self) -> StateRecord {
        StateRecord {
            current_view: self.current_view(),
            selected_stock: self.selected_stock().map(str::to_string),
        }
    }
}

impl ObservableStore<StateKey, StateValue> {
    pub fn current_view(&self) -> Option<AppView> {
        self.get(StateKey::CurrentView).and_then(|value| value.as_view())
    }

    pub fn selected_stock(&self) -> Option<String> {
        match self.get(StateKey::SelectedStock) {
            Some(StateValue::Stock(symbol)) => Some(symbol),
            _ => None,
        }
    }

    /// Switch the current view.
    pub fn show(&self, view: AppView) -> Result<()> {
        self.set(StateKey::CurrentView, StateValue::View(view))
    }

    /// Select a stock by symbol. Symbols are stored upper-cased.
    pub fn select_stock(&self, symbol: &str) -> Result<()> {
        let symbol = symbol.trim();
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
            return Err(Error::invalid_input(format!("Invalid symbol '{symbol}'")));
        }
        self.set(
            StateKey::SelectedStock,
            StateValue::Stock(symbol.to_ascii_uppercase()),
        )
    }

    /// Write every field present in `record`, notifying listeners.
    pub fn restore(&self, record: &StateRecord) -> Result<()> {
        if let Some(view) = record.current_view {
            self.show(view)?;
        }
        if let Some(symbol) = &record.selected_stock {
            self.select_stock(symbol)?;
        }
        Ok(())
    }
}

/// The dashboard state as a flat record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateRecord {
    pub current_view: Option<AppView>,
    pub selected_stock: Option<String>,
}

impl Model for StateRecord {
    fn fields(&self) -> Fields {
        vec![
            (StateKey::CurrentView.to_string(), self.current_view.to_field()),
            (StateKey::SelectedStock.to_string(), self.selected_stock.to_field()),
        ]
    }

    fn assign(&mut self, field: &str, value: &serde_json::Value) -> Result<bool> {
        match field {
            "currentView" => assign_field(&mut self.current_view, field, value)?,
            "selectedStock" => assign_field(&mut self.selected_stock, field, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SerializeOptions;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_view_parse_and_display() {
        assert_eq!("Analyze".parse::<AppView>().unwrap(), AppView::Analyze);
        assert_eq!(" search ".parse::<AppView>().unwrap(), AppView::Search);
        assert!("portfolio".parse::<AppView>().is_err());
        assert_eq!(AppView::Dashboard.to_string(), "dashboard");
    }

    #[test]
    fn test_typed_accessors() {
        let store = AppStore::new();
        assert_eq!(store.current_view(), None);
        store.show(AppView::Search).unwrap();
        store.select_stock("aapl").unwrap();
        assert_eq!(store.current_view(), Some(AppView::Search));
        assert_eq!(store.selected_stock().as_deref(), Some("AAPL"));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.current_view(), Some(AppView::Search));
        assert_eq!(snapshot.selected_stock(), Some("AAPL"));
    }

    #[test]
    fn test_select_rejects_bad_symbols() {
        let store = AppStore::new();
        assert!(store.select_stock("").is_err());
        assert!(store.select_stock("AA PL").is_err());
        assert_eq!(store.selected_stock(), None);
        store.select_stock("BRK.B").unwrap();
    }

    #[test]
    fn test_view_listener_receives_snapshot() {
        let store = AppStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = Rc::clone(&seen);
            store.on_change(StateKey::CurrentView, move |value, state| {
                seen.borrow_mut()
                    .push((value.as_view(), state.selected_stock().map(str::to_string)));
                Ok(())
            });
        }
        store.select_stock("MSFT").unwrap();
        store.show(AppView::Analyze).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![(Some(AppView::Analyze), Some("MSFT".to_string()))]
        );
    }

    #[test]
    fn test_state_record_serialization() {
        let store = AppStore::new();
        store.show(AppView::Dashboard).unwrap();
        let json = store
            .snapshot()
            .record()
            .to_payload(&SerializeOptions::new().ignore_empty(true))
            .unwrap()
            .into_text()
            .unwrap();
        assert_eq!(json, r#"{"currentView":"dashboard"}"#);
    }

    #[test]
    fn test_restore_from_payload() {
        let record =
            StateRecord::create(r#"{"currentView":"analyze","selectedStock":"tsla"}"#, None)
                .unwrap();
        let store = AppStore::new();
        store.restore(&record).unwrap();
        assert_eq!(store.current_view(), Some(AppView::Analyze));
        assert_eq!(store.selected_stock().as_deref(), Some("TSLA"));
    }
}
