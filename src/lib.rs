//! # Scheduler Admin — Trade Schedule Admin Client
//!
//! ## Architecture Overview
//!
//! ```text
//!  ┌──────────────┐  draft   ┌────────────┐  NewSchedule  ┌──────────────────────┐
//!  │  Operator    │ ───────▶ │  validate  │ ────────────▶ │  ScheduleList        │
//!  │  (CLI)       │          └────────────┘               │  Synchronizer        │
//!  └──────────────┘                                       │  snapshot (RwLock)   │
//!         ▲                                               └──────────┬───────────┘
//!         │ table + countdown                                        │ HTTP (Bearer)
//!  ┌──────┴───────┐   tick (1s)   ┌──────────────┐        ┌──────────▼───────────┐
//!  │  LiveBoard   │ ◀──────────── │  Countdown   │        │  Schedule API        │
//!  │  (watch)     │               │  Ticker      │        │  /tradeSchedulers    │
//!  └──────────────┘               └──────────────┘        └──────────────────────┘
//!         ▲  tradeScheduleUpdated                                    │
//!         └───────────────── PushSubscription (Socket.IO / WS) ◀─────┘
//! ```
//!
//! ## Environment Variables
//!
//! | Variable                 | Default                          | Description                  |
//! |--------------------------|----------------------------------|------------------------------|
//! | `SCHEDULER_API_URL`      | `http://localhost:5000`          | Schedule API base URL        |
//! | `SCHEDULER_PUSH_URL`     | same as `SCHEDULER_API_URL`      | Socket.IO server URL         |
//! | `SCHEDULER_STORAGE_PATH` | `.scheduler-admin/storage.json`  | Where the login token lives  |
//! | `COUNTDOWN_TICK_MS`      | `1000`                           | Countdown refresh cadence    |
//! | `REQUEST_TIMEOUT_SECS`   | unset                            | Optional HTTP timeout        |
//! | `RUST_LOG`               | `scheduler_admin=info`           | Tracing filter               |

pub mod api;
pub mod board;
pub mod config;
pub mod countdown;
pub mod error;
pub mod interval;
pub mod models;
pub mod push;
pub mod session;
pub mod sync;
pub mod validate;

pub use error::{AdminError, ValidationError};
