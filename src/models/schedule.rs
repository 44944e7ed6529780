//! # models::schedule
//!
//! Defines [`TradeSchedule`], the server-owned record of a recurring trade
//! plan, together with its small vocabulary types ([`Side`], [`Exchange`],
//! [`ScheduleStatus`], [`ScheduleId`]).
//!
//! The client never owns a schedule's lifecycle; these values are a cache of
//! whatever the API last returned.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{countdown, interval};

/// The only pair the dashboard offers; it is shown but never sent.
pub const DEFAULT_CURRENCY_PAIR: &str = "SAFTP_USDT";

// ─── ScheduleId ───────────────────────────────────────────────────────────────

/// Opaque server-assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(String);

impl ScheduleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScheduleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ─── Side ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(format!("unknown trade side '{other}', expected Buy or Sell")),
        }
    }
}

// ─── Exchange ─────────────────────────────────────────────────────────────────

/// Trading venues a schedule can target.
///
/// Declaration order is the order exchanges are sent to the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Exchange {
    Azbit,
    Coinsbit,
    DexTrade,
}

impl Exchange {
    pub const ALL: [Exchange; 3] = [Exchange::Azbit, Exchange::Coinsbit, Exchange::DexTrade];

    /// Human label as printed in the exchange picker.
    pub fn label(&self) -> &'static str {
        match self {
            Exchange::Azbit => "Azbit",
            Exchange::Coinsbit => "Coinsbit",
            Exchange::DexTrade => "Dex-Trade",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Exchange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "azbit" => Ok(Exchange::Azbit),
            "coinsbit" => Ok(Exchange::Coinsbit),
            "dextrade" => Ok(Exchange::DexTrade),
            _ => Err(format!(
                "unknown exchange '{s}', expected one of Azbit, Coinsbit, Dex-Trade"
            )),
        }
    }
}

// ─── ScheduleStatus ───────────────────────────────────────────────────────────

/// Server status, kept as the raw string.
///
/// Only `Created`, `Started` and `Stopped` are known; anything else is carried
/// through untouched and treated as "not started".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleStatus(String);

impl ScheduleStatus {
    pub const CREATED: &'static str = "Created";
    pub const STARTED: &'static str = "Started";
    pub const STOPPED: &'static str = "Stopped";

    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn created() -> Self {
        Self::new(Self::CREATED)
    }

    pub fn started() -> Self {
        Self::new(Self::STARTED)
    }

    pub fn stopped() -> Self {
        Self::new(Self::STOPPED)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.0 == Self::STARTED
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.0 == Self::STOPPED
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── TradeSchedule ────────────────────────────────────────────────────────────

/// A schedule as returned by `GET /tradeSchedulers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeSchedule {
    #[serde(rename = "_id", alias = "id")]
    pub id: ScheduleId,

    pub status: ScheduleStatus,

    pub side: Side,

    /// Lot size.  Sent as a decimal string; numbers are accepted on input.
    pub trade_quantity: Decimal,

    /// Execution may begin after this instant.
    pub start_time: DateTime<Utc>,

    /// Milliseconds between two trades.
    #[serde(deserialize_with = "number_or_text")]
    pub interval: u64,

    /// Maximum number of trades (the "limit").
    #[serde(deserialize_with = "number_or_text")]
    pub number_of_trades: u64,

    pub exchanges: Vec<Exchange>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TradeSchedule {
    #[inline]
    pub fn is_started(&self) -> bool {
        self.status.is_started()
    }

    /// `interval` rendered for the table, e.g. `"1 min 30 sec"`.
    pub fn interval_display(&self) -> String {
        interval::decode(self.interval)
    }

    /// Countdown to `start_time` as seen at `now`.
    pub fn remaining(&self, now: DateTime<Utc>) -> String {
        countdown::remaining(self.start_time, now)
    }
}

/// Envelope of the list endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleList {
    #[serde(default)]
    pub trade_schedules: Vec<TradeSchedule>,
}

/// The create form once sent `numberOfTrades` as text, so stored records can
/// carry either form.
fn number_or_text<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(u64),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "_id": "6630f1c2a9e4b2d1c8f00011",
        "status": "Created",
        "side": "Buy",
        "tradeQuantity": "15",
        "startTime": "2026-10-17T10:00:00.000Z",
        "interval": 90000,
        "numberOfTrades": "3",
        "exchanges": ["Azbit", "DexTrade"],
        "createdAt": "2026-10-16T09:00:00.000Z",
        "updatedAt": "2026-10-16T09:00:00.000Z",
        "__v": 0
    }"#;

    #[test]
    fn decodes_server_record() {
        let schedule: TradeSchedule = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(schedule.id.as_str(), "6630f1c2a9e4b2d1c8f00011");
        assert_eq!(schedule.status, ScheduleStatus::created());
        assert_eq!(schedule.trade_quantity, Decimal::from(15));
        assert_eq!(schedule.number_of_trades, 3);
        assert_eq!(schedule.exchanges, vec![Exchange::Azbit, Exchange::DexTrade]);
        assert_eq!(schedule.interval_display(), "1 min 30 sec");
        assert!(!schedule.is_started());
    }

    #[test]
    fn unknown_status_is_kept_verbatim() {
        let json = SAMPLE.replace("\"Created\"", "\"Paused\"");
        let schedule: TradeSchedule = serde_json::from_str(&json).unwrap();
        assert_eq!(schedule.status.as_str(), "Paused");
        assert!(!schedule.is_started());
        assert!(!schedule.status.is_stopped());
    }

    #[test]
    fn exchange_parsing_accepts_labels_and_wire_names() {
        assert_eq!("Dex-Trade".parse::<Exchange>(), Ok(Exchange::DexTrade));
        assert_eq!("dextrade".parse::<Exchange>(), Ok(Exchange::DexTrade));
        assert_eq!("AZBIT".parse::<Exchange>(), Ok(Exchange::Azbit));
        assert!("binance".parse::<Exchange>().is_err());
        assert_eq!(serde_json::to_string(&Exchange::DexTrade).unwrap(), "\"DexTrade\"");
    }

    #[test]
    fn side_parsing_is_case_insensitive() {
        assert_eq!(" sell ".parse::<Side>(), Ok(Side::Sell));
        assert!("".parse::<Side>().is_err());
    }
}
