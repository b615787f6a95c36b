//! Order requests for the trading API.
//!
//! Only the request/acknowledgement records and the [`OrderGateway`] seam
//! live here. An HTTP client implementing the gateway is supplied by the
//! embedding application.

use crate::error::{Error, Result};
use crate::model::{FieldValue, Fields, Model, SerializeOptions, ToField, assign_field};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Order side (buy/sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    #[default]
    Buy,
    Sell,
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrderType {
    pub fn needs_limit_price(&self) -> bool {
        matches!(self, Self::Limit | Self::StopLimit)
    }

    pub fn needs_stop_price(&self) -> bool {
        matches!(self, Self::Stop | Self::StopLimit)
    }
}

/// How long an order stays working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    #[default]
    Day,
    Gtc,
    Opg,
    Ioc,
}

/// Wire name of a serde-named enum value.
fn wire_name<T: Serialize>(value: &T) -> FieldValue {
    match serde_json::to_value(value) {
        Ok(Value::String(name)) => FieldValue::Text(name),
        _ => FieldValue::Undefined,
    }
}

impl ToField for OrderSide {
    fn to_field(&self) -> FieldValue {
        wire_name(self)
    }
}

impl ToField for OrderType {
    fn to_field(&self) -> FieldValue {
        wire_name(self)
    }
}

impl ToField for TimeInForce {
    fn to_field(&self) -> FieldValue {
        wire_name(self)
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for OrderSide {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "long" => Ok(Self::Buy),
            "sell" | "short" => Ok(Self::Sell),
            other => Err(Error::invalid_input(format!("Unknown order side '{other}'"))),
        }
    }
}

/// Request to place an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub symbol: String,
    pub qty: u32,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    /// Required for limit and stop-limit orders.
    pub limit_price: Option<Decimal>,
    /// Required for stop and stop-limit orders.
    pub stop_price: Option<Decimal>,
    pub client_order_id: Uuid,
}

impl Default for OrderRequest {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            qty: 0,
            side: OrderSide::default(),
            order_type: OrderType::default(),
            time_in_force: TimeInForce::default(),
            limit_price: None,
            stop_price: None,
            client_order_id: Uuid::new_v4(),
        }
    }
}

impl OrderRequest {
    /// A market order for `qty` shares of `symbol`.
    pub fn market(symbol: &str, qty: u32, side: OrderSide, time_in_force: TimeInForce) -> Self {
        Self {
            symbol: symbol.trim().to_ascii_uppercase(),
            qty,
            side,
            time_in_force,
            ..Default::default()
        }
    }

    /// A limit order for `qty` shares of `symbol` at `limit_price`.
    pub fn limit(
        symbol: &str,
        qty: u32,
        side: OrderSide,
        limit_price: Decimal,
        time_in_force: TimeInForce,
    ) -> Self {
        Self {
            order_type: OrderType::Limit,
            limit_price: Some(limit_price),
            ..Self::market(symbol, qty, side, time_in_force)
        }
    }

    /// Check the request before it is sent.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(Error::order("Order has no symbol"));
        }
        if self.qty == 0 {
            return Err(Error::order(format!(
                "Order for {} has zero quantity",
                self.symbol
            )));
        }
        if self.order_type.needs_limit_price() && self.limit_price.is_none() {
            return Err(Error::order(format!(
                "{:?} order for {} needs a limit price",
                self.order_type, self.symbol
            )));
        }
        if self.order_type.needs_stop_price() && self.stop_price.is_none() {
            return Err(Error::order(format!(
                "{:?} order for {} needs a stop price",
                self.order_type, self.symbol
            )));
        }
        Ok(())
    }

    /// JSON body for the order endpoint. Unset prices are left out.
    pub fn to_wire(&self) -> Result<String> {
        self.validate()?;
        self.to_payload(&SerializeOptions::new().ignore_empty(true))?
            .into_text()
    }
}

impl Model for OrderRequest {
    fn fields(&self) -> Fields {
        vec![
            ("symbol".into(), self.symbol.to_field()),
            ("qty".into(), self.qty.to_field()),
            ("side".into(), self.side.to_field()),
            ("type".into(), self.order_type.to_field()),
            ("time_in_force".into(), self.time_in_force.to_field()),
            ("limit_price".into(), self.limit_price.to_field()),
            ("stop_price".into(), self.stop_price.to_field()),
            ("client_order_id".into(), self.client_order_id.to_field()),
        ]
    }

    fn assign(&mut self, field: &str, value: &Value) -> Result<bool> {
        match field {
            "symbol" => assign_field(&mut self.symbol, field, value)?,
            "qty" => assign_field(&mut self.qty, field, value)?,
            "side" => assign_field(&mut self.side, field, value)?,
            "type" => assign_field(&mut self.order_type, field, value)?,
            "time_in_force" => assign_field(&mut self.time_in_force, field, value)?,
            "limit_price" => assign_field(&mut self.limit_price, field, value)?,
            "stop_price" => assign_field(&mut self.stop_price, field, value)?,
            "client_order_id" => assign_field(&mut self.client_order_id, field, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Acknowledgement returned by the order endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderAck {
    pub id: String,
    pub client_order_id: Option<Uuid>,
    pub symbol: String,
    pub status: String,
}

impl Model for OrderAck {
    fn fields(&self) -> Fields {
        vec![
            ("id".into(), self.id.to_field()),
            ("client_order_id".into(), self.client_order_id.to_field()),
            ("symbol".into(), self.symbol.to_field()),
            ("status".into(), self.status.to_field()),
        ]
    }

    fn assign(&mut self, field: &str, value: &Value) -> Result<bool> {
        match field {
            "id" => assign_field(&mut self.id, field, value)?,
            "client_order_id" => assign_field(&mut self.client_order_id, field, value)?,
            "symbol" => assign_field(&mut self.symbol, field, value)?,
            "status" => assign_field(&mut self.status, field, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Places orders with a broker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderAck>;
}
