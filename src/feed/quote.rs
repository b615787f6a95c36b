//! Real-time quote record.

use crate::error::Result;
use crate::model::{Fields, Model, ToField, assign_field};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

/// Top-of-book quote for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Quote {
    pub symbol: String,
    pub bid_price: Decimal,
    pub bid_size: u64,
    pub ask_price: Decimal,
    pub ask_size: u64,
    /// Exchange timestamp, nanoseconds since the Unix epoch.
    pub time: i64,
}

impl Quote {
    pub fn spread(&self) -> Decimal {
        self.ask_price - self.bid_price
    }

    pub fn mid_price(&self) -> Decimal {
        (self.bid_price + self.ask_price) / Decimal::TWO
    }
}

impl Model for Quote {
    fn fields(&self) -> Fields {
        vec![
            ("symbol".into(), self.symbol.to_field()),
            ("bidPrice".into(), self.bid_price.to_field()),
            ("bidSize".into(), self.bid_size.to_field()),
            ("askPrice".into(), self.ask_price.to_field()),
            ("askSize".into(), self.ask_size.to_field()),
            ("time".into(), self.time.to_field()),
        ]
    }

    fn assign(&mut self, field: &str, value: &Value) -> Result<bool> {
        match field {
            "symbol" => assign_field(&mut self.symbol, field, value)?,
            "bidPrice" => assign_field(&mut self.bid_price, field, value)?,
            "bidSize" => assign_field(&mut self.bid_size, field, value)?,
            "askPrice" => assign_field(&mut self.ask_price, field, value)?,
            "askSize" => assign_field(&mut self.ask_size, field, value)?,
            "time" => assign_field(&mut self.time, field, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Quote event as sent on the stream, with single-letter field names.
#[derive(Debug, Deserialize)]
pub(crate) struct WireQuote {
    #[serde(rename = "T")]
    symbol: String,
    #[serde(rename = "p")]
    bid_price: Decimal,
    #[serde(rename = "s")]
    bid_size: u64,
    #[serde(rename = "P")]
    ask_price: Decimal,
    #[serde(rename = "S")]
    ask_size: u64,
    #[serde(rename = "t")]
    time: i64,
}

impl From<WireQuote> for Quote {
    fn from(wire: WireQuote) -> Self {
        Self {
            symbol: wire.symbol,
            bid_price: wire.bid_price,
            bid_size: wire.bid_size,
            ask_price: wire.ask_price,
            ask_size: wire.ask_size,
            time: wire.time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn create_test_quote() -> Quote {
        Quote {
            symbol: "AAPL".to_string(),
            bid_price: dec!(127.50),
            bid_size: 1,
            ask_price: dec!(127.60),
            ask_size: 3,
            time: 1_609_866_425_000_000_000,
        }
    }

    #[test]
    fn test_spread_and_mid() {
        let quote = create_test_quote();
        assert_eq!(quote.spread(), dec!(0.10));
        assert_eq!(quote.mid_price(), dec!(127.55));
    }

    #[test]
    fn test_quote_json() {
        let quote = create_test_quote();
        assert_eq!(
            quote.to_json().unwrap(),
            r#"{"symbol":"AAPL","bidPrice":127.5,"bidSize":1,"askPrice":127.6,"askSize":3,"time":1609866425000000000}"#
        );
        assert_eq!(Quote::create(&quote.to_json().unwrap(), None).unwrap(), quote);
    }
}
