//! Market Tick - the external event payload
//!
//! The pipeline core treats tick payloads as opaque; this type exists so
//! feeds, demos, and tests have a concrete point-in-time datum to carry.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One observation from an external data feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketTick {
    pub instrument_id: String,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl MarketTick {
    pub fn new(instrument_id: impl Into<String>, price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            price,
            timestamp,
        }
    }
}
