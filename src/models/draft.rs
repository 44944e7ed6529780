//! # models::draft
//!
//! Client-side shapes that flow *towards* the API:
//!
//! * [`ScheduleDraft`]  — the schedule form as typed, loosely typed on purpose
//!   (lot size and limit are raw text until validation).
//! * [`NewSchedule`]    — the validated create / edit body.
//! * [`ScheduleUpdate`] — partial `PUT` body for start / stop / edit.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::ValidationError;
use crate::interval::IntervalFields;
use crate::models::schedule::{
    Exchange, ScheduleStatus, Side, TradeSchedule, DEFAULT_CURRENCY_PAIR,
};
use crate::validate::{self, parse_count, parse_quantity};

// ─── ScheduleDraft ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleDraft {
    pub currency_pair: String,
    /// Lot size as typed.
    pub trade_quantity: String,
    /// `"Buy"`, `"Sell"`, or empty when nothing was picked.
    pub side: String,
    /// Trade limit as typed.
    pub number_of_trades: String,
    pub start_time: Option<DateTime<Utc>>,
    pub interval: IntervalFields,
    pub exchanges: BTreeSet<Exchange>,
}

impl Default for ScheduleDraft {
    /// The form's initial state.
    fn default() -> Self {
        Self {
            currency_pair: DEFAULT_CURRENCY_PAIR.to_string(),
            trade_quantity: "0".to_string(),
            side: String::new(),
            number_of_trades: "0".to_string(),
            start_time: None,
            interval: IntervalFields::default(),
            exchanges: BTreeSet::new(),
        }
    }
}

impl ScheduleDraft {
    /// Pre-fills the edit form from an existing schedule.
    pub fn from_schedule(schedule: &TradeSchedule) -> Self {
        Self {
            currency_pair: DEFAULT_CURRENCY_PAIR.to_string(),
            trade_quantity: schedule.trade_quantity.to_string(),
            side: schedule.side.to_string(),
            number_of_trades: schedule.number_of_trades.to_string(),
            start_time: Some(schedule.start_time),
            interval: IntervalFields::from_millis(schedule.interval),
            exchanges: schedule.exchanges.iter().copied().collect(),
        }
    }

    /// Encoded interval in milliseconds.
    #[inline]
    pub fn interval_ms(&self) -> u64 {
        self.interval.to_millis()
    }

    /// Validates the draft and builds the request body.
    pub fn to_new_schedule(&self) -> Result<NewSchedule, ValidationError> {
        validate::validate(self)?;

        // validate() has already checked every field below parses.
        let missing = ValidationError::MissingRequiredFields;
        let side: Side = self.side.parse().map_err(|_| missing)?;
        let trade_quantity = parse_quantity(&self.trade_quantity).ok_or(missing)?;
        let number_of_trades = parse_count(&self.number_of_trades)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or(missing)?;
        let start_time = self.start_time.ok_or(missing)?;

        Ok(NewSchedule {
            side,
            trade_quantity: trade_quantity.normalize(),
            start_time,
            interval: self.interval_ms(),
            number_of_trades,
            exchanges: self.exchanges.iter().copied().collect(),
        })
    }
}

// ─── NewSchedule ──────────────────────────────────────────────────────────────

/// Body of `POST /tradeSchedulers/new`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSchedule {
    pub side: Side,
    pub trade_quantity: Decimal,
    pub start_time: DateTime<Utc>,
    pub interval: u64,
    pub number_of_trades: u64,
    pub exchanges: Vec<Exchange>,
}

// ─── ScheduleUpdate ───────────────────────────────────────────────────────────

/// Body of `PUT /tradeScheduler/{id}`; `None` fields are left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ScheduleStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_quantity: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_trades: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchanges: Option<Vec<Exchange>>,
}

impl ScheduleUpdate {
    /// The "Start" button: move the start time to `now`.
    pub fn start_at(now: DateTime<Utc>) -> Self {
        Self { start_time: Some(now), ..Self::default() }
    }

    /// The "Stop" button.
    pub fn stop() -> Self {
        Self { status: Some(ScheduleStatus::stopped()), ..Self::default() }
    }

    /// The edit form: overwrite every editable field.
    pub fn replace_with(schedule: NewSchedule) -> Self {
        Self {
            status: None,
            side: Some(schedule.side),
            trade_quantity: Some(schedule.trade_quantity),
            start_time: Some(schedule.start_time),
            interval: Some(schedule.interval),
            number_of_trades: Some(schedule.number_of_trades),
            exchanges: Some(schedule.exchanges),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn valid_draft() -> ScheduleDraft {
        ScheduleDraft {
            trade_quantity: "15".into(),
            side: "Buy".into(),
            number_of_trades: "3".into(),
            start_time: Some(Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()),
            interval: IntervalFields::new(0, 0, 5),
            exchanges: [Exchange::DexTrade, Exchange::Azbit].into_iter().collect(),
            ..ScheduleDraft::default()
        }
    }

    #[test]
    fn new_schedule_matches_create_body() {
        let body = serde_json::to_value(valid_draft().to_new_schedule().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "side": "Buy",
                "tradeQuantity": "15",
                "startTime": "2026-10-18T09:00:00Z",
                "interval": 5000,
                "numberOfTrades": 3,
                "exchanges": ["Azbit", "DexTrade"],
            })
        );
    }

    #[test]
    fn lot_size_keeps_decimal_places() {
        let draft = ScheduleDraft { trade_quantity: "12.50".into(), ..valid_draft() };
        let schedule = draft.to_new_schedule().unwrap();
        assert_eq!(schedule.trade_quantity.to_string(), "12.5");
    }

    #[test]
    fn stop_and_start_bodies_are_partial() {
        assert_eq!(
            serde_json::to_value(ScheduleUpdate::stop()).unwrap(),
            json!({ "status": "Stopped" })
        );
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        assert_eq!(
            serde_json::to_value(ScheduleUpdate::start_at(now)).unwrap(),
            json!({ "startTime": "2026-10-17T12:00:00Z" })
        );
    }

    #[test]
    fn default_draft_is_the_empty_form() {
        let draft = ScheduleDraft::default();
        assert_eq!(draft.currency_pair, "SAFTP_USDT");
        assert_eq!(draft.trade_quantity, "0");
        assert_eq!(draft.to_new_schedule(), Err(ValidationError::MissingRequiredFields));
    }
}
