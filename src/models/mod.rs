//! Domain models shared across the whole admin client.

pub mod draft;
pub mod schedule;

pub use draft::{NewSchedule, ScheduleDraft, ScheduleUpdate};
pub use schedule::{
    Exchange, ScheduleId, ScheduleList, ScheduleStatus, Side, TradeSchedule, DEFAULT_CURRENCY_PAIR,
};
