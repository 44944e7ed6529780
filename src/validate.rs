//! # validate
//!
//! Decides whether a [`ScheduleDraft`] may be submitted.
//!
//! ## Checks (first failure wins)
//!
//! ```text
//! draft
//!   │
//!   ├─ [1] Dex-Trade lot   → DexTrade selected and 0 < lot < 10
//!   │
//!   └─ [2] Required fields → pair, lot > 0, side, limit > 0, start time,
//!                            ≥ 1 exchange, interval ≥ 1000 ms
//! ```
//!
//! Numeric fields arrive as text and are coerced first: blank text counts as
//! zero, anything unparseable fails the required-fields check and never trips
//! the Dex-Trade check.

use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::ValidationError;
use crate::interval::MIN_INTERVAL_MS;
use crate::models::{Exchange, ScheduleDraft, Side};

/// Smallest lot Dex-Trade accepts.
pub const DEX_TRADE_MIN_LOT: Decimal = Decimal::TEN;

/// Pure decision, no side effects.
pub fn validate(draft: &ScheduleDraft) -> Result<(), ValidationError> {
    let quantity = parse_quantity(&draft.trade_quantity);

    // [1] Dex-Trade lot size
    if draft.exchanges.contains(&Exchange::DexTrade) {
        if let Some(lot) = quantity {
            if lot > Decimal::ZERO && lot < DEX_TRADE_MIN_LOT {
                debug!(%lot, "draft rejected: Dex-Trade lot below minimum");
                return Err(ValidationError::DexTradeLotSize);
            }
        }
    }

    // [2] Required fields
    let lot_ok = quantity.is_some_and(|lot| lot > Decimal::ZERO);
    let side_ok = Side::from_str(&draft.side).is_ok();
    let limit_ok = parse_count(&draft.number_of_trades).is_some_and(|n| n > 0);
    let interval_ok = draft.interval_ms() >= MIN_INTERVAL_MS;

    if draft.currency_pair.trim().is_empty()
        || !lot_ok
        || !side_ok
        || !limit_ok
        || draft.start_time.is_none()
        || draft.exchanges.is_empty()
        || !interval_ok
    {
        debug!(
            lot_ok,
            side_ok,
            limit_ok,
            interval_ok,
            has_start = draft.start_time.is_some(),
            exchanges = draft.exchanges.len(),
            "draft rejected: required fields"
        );
        return Err(ValidationError::MissingRequiredFields);
    }

    Ok(())
}

/// Lot size text → decimal.  Blank is zero, garbage is `None`.
pub fn parse_quantity(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Trade limit text → integer.  Blank is zero, garbage is `None`.
///
/// Fractional text such as `"1.5"` is also `None`: the limit is a count of
/// trades, so it fails the required-fields check instead of being accepted
/// as a positive number.
pub fn parse_count(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0);
    }
    text.parse().ok()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
