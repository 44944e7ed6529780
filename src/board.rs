//! # board
//!
//! **Live Board** — the schedule list as the operator sees it.
//!
//! ```text
//!   CountdownTicker ── tick ──▶ re-render (remaining column only changes)
//!   PushSubscription ─ tradeScheduleUpdated ─▶ refresh() ─▶ re-render
//!   shutdown (Ctrl-C) ──▶ cancel ticker, close push, return
//! ```
//!
//! Row building and table rendering are pure so they can be tested without a
//! runtime; [`LiveBoard::run`] is the `watch` loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::{FutureExt, LocalBoxFuture};
use tracing::{debug, info, warn};

use crate::api::ScheduleRepository;
use crate::countdown::CountdownTicker;
use crate::error::AdminError;
use crate::models::{ScheduleId, TradeSchedule, DEFAULT_CURRENCY_PAIR};
use crate::push::{PushEvent, PushSubscription};
use crate::sync::{RefreshOutcome, ScheduleListSynchronizer};

// ─── Rows ─────────────────────────────────────────────────────────────────────

/// Which actions a row offers.  Start and stop are always offered; edit and
/// delete disappear while the schedule runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowActions {
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_start: bool,
    pub can_stop: bool,
}

impl RowActions {
    pub fn for_schedule(schedule: &TradeSchedule) -> Self {
        let idle = !schedule.is_started();
        Self {
            can_edit: idle,
            can_delete: idle,
            can_start: true,
            can_stop: true,
        }
    }

    pub fn labels(&self) -> Vec<&'static str> {
        [
            (self.can_start, "start"),
            (self.can_stop, "stop"),
            (self.can_edit, "edit"),
            (self.can_delete, "delete"),
        ]
        .into_iter()
        .filter_map(|(on, label)| on.then_some(label))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardRow {
    pub id: ScheduleId,
    pub currency_pair: &'static str,
    pub lot_size: String,
    pub interval: String,
    pub side: String,
    pub limit: u64,
    pub remaining: String,
    pub status: String,
    pub actions: RowActions,
}

impl BoardRow {
    pub fn new(schedule: &TradeSchedule, now: DateTime<Utc>) -> Self {
        Self {
            id: schedule.id.clone(),
            currency_pair: DEFAULT_CURRENCY_PAIR,
            lot_size: schedule.trade_quantity.normalize().to_string(),
            interval: schedule.interval_display(),
            side: schedule.side.to_string(),
            limit: schedule.number_of_trades,
            remaining: schedule.remaining(now),
            status: schedule.status.to_string(),
            actions: RowActions::for_schedule(schedule),
        }
    }
}

pub fn rows(schedules: &[TradeSchedule], now: DateTime<Utc>) -> Vec<BoardRow> {
    schedules.iter().map(|s| BoardRow::new(s, now)).collect()
}

// ─── Rendering ────────────────────────────────────────────────────────────────

const EMPTY_LIST: &str = "No trade schedules.";

/// The live list: one line per schedule with the countdown and the actions
/// the operator may take.
pub fn render_table(schedules: &[TradeSchedule], now: DateTime<Utc>) -> String {
    let headers = [
        "ID", "Currency Pair", "Lot Size", "Interval", "Side", "Limit", "Remaining", "Status", "Actions",
    ];
    let cells: Vec<Vec<String>> = rows(schedules, now)
        .into_iter()
        .map(|row| {
            vec![
                row.id.to_string(),
                row.currency_pair.to_string(),
                row.lot_size,
                row.interval,
                row.side,
                row.limit.to_string(),
                row.remaining,
                row.status,
                row.actions.labels().join(","),
            ]
        })
        .collect();
    layout(&headers, &cells)
}

/// Finished schedules.  No countdown and no actions.
pub fn render_history(schedules: &[TradeSchedule]) -> String {
    let headers = ["ID", "Currency Pair", "Lot Size", "Interval", "Side", "Limit", "Start Time", "Status"];
    let cells: Vec<Vec<String>> = schedules
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                DEFAULT_CURRENCY_PAIR.to_string(),
                s.trade_quantity.normalize().to_string(),
                s.interval_display(),
                s.side.to_string(),
                s.number_of_trades.to_string(),
                s.start_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                s.status.to_string(),
            ]
        })
        .collect();
    layout(&headers, &cells)
}

fn layout(headers: &[&str], cells: &[Vec<String>]) -> String {
    if cells.is_empty() {
        return format!("{EMPTY_LIST}\n");
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();

    let mut out = String::new();
    out.push_str(&line(headers.iter().copied(), &widths));
    out.push_str(&line(rule.iter().map(String::as_str), &widths));
    for row in cells {
        out.push_str(&line(row.iter().map(String::as_str), &widths));
    }
    out
}

fn line<'a>(values: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = values
        .zip(widths)
        .map(|(value, &width)| format!("{value:<width$}"))
        .collect();
    format!("{}\n", padded.join("  ").trim_end())
}

// ─── Watch Loop ───────────────────────────────────────────────────────────────

pub struct LiveBoard<R: ScheduleRepository + ?Sized> {
    sync: Arc<ScheduleListSynchronizer<R>>,
    tick: Duration,
}

impl<R: ScheduleRepository + ?Sized> LiveBoard<R> {
    pub fn new(sync: Arc<ScheduleListSynchronizer<R>>, tick: Duration) -> Self {
        Self { sync, tick }
    }

    /// Runs until `shutdown` resolves.
    ///
    /// The initial load must succeed; after that, failed refreshes and a lost
    /// push channel are logged and the countdown keeps going on the last
    /// snapshot.  `render` receives a complete frame each time.
    pub async fn run<F>(
        &self,
        push: Option<PushSubscription>,
        shutdown: F,
        mut render: impl FnMut(&str),
    ) -> Result<(), AdminError>
    where
        F: Future<Output = ()>,
    {
        self.sync.refresh().await?;
        render(&render_table(&self.sync.schedules().await, Utc::now()));

        let (ticker, mut ticks) = CountdownTicker::start(self.tick);
        let mut push = push;
        tokio::pin!(shutdown);

        // At most one push-driven refresh runs at a time, polled alongside the
        // ticker so a slow backend never freezes the countdown.  Pushes that
        // land meanwhile set `stale` and trigger one more fetch afterwards.
        let mut refreshing: Option<LocalBoxFuture<'_, Result<RefreshOutcome, AdminError>>> = None;
        let mut stale = false;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("👋 Leaving live board");
                    break;
                }

                tick = ticks.recv() => match tick {
                    Some(now) => render(&render_table(&self.sync.schedules().await, now)),
                    None => break,
                },

                outcome = in_flight(&mut refreshing) => {
                    refreshing = None;
                    match outcome {
                        Ok(outcome) => {
                            debug!(?outcome, "push refresh done");
                            render(&render_table(&self.sync.schedules().await, Utc::now()));
                        }
                        Err(e) => warn!(error = %e, "refresh after push failed"),
                    }
                    if std::mem::take(&mut stale) {
                        refreshing = Some(self.sync.refresh().boxed_local());
                    }
                }

                event = next_event(&mut push) => match event {
                    Some(PushEvent::SchedulesChanged) => {
                        info!("🔔 Schedules changed on server, refreshing");
                        if refreshing.is_some() {
                            stale = true;
                        } else {
                            refreshing = Some(self.sync.refresh().boxed_local());
                        }
                    }
                    Some(PushEvent::SchedulesData(payload)) => {
                        debug!(%payload, "tradeSchedulesData received");
                    }
                    Some(PushEvent::Connected) => info!("🔌 Subscribed to schedule updates"),
                    Some(PushEvent::Disconnected) | None => {
                        warn!("push channel lost; countdown continues without live updates");
                        if let Some(subscription) = push.take() {
                            subscription.close().await;
                        }
                    }
                },
            }
        }

        drop(refreshing);
        ticker.cancel();
        if let Some(subscription) = push.take() {
            subscription.close().await;
        }
        Ok(())
    }
}

async fn next_event(push: &mut Option<PushSubscription>) -> Option<PushEvent> {
    match push {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

async fn in_flight<T>(refresh: &mut Option<LocalBoxFuture<'_, T>>) -> T {
    match refresh {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ListKind;
    use crate::models::{NewSchedule, ScheduleStatus, ScheduleUpdate, Side};
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use rust_decimal::Decimal;
    use std::sync::Mutex;
    use tokio::sync::{mpsc, oneshot};

    fn schedule(id: &str, status: &str, start_in_ms: i64, now: DateTime<Utc>) -> TradeSchedule {
        TradeSchedule {
            id: ScheduleId::new(id),
            status: ScheduleStatus::new(status),
            side: Side::Buy,
            trade_quantity: Decimal::new(2050, 2),
            start_time: now + ChronoDuration::milliseconds(start_in_ms),
            interval: 90_000,
            number_of_trades: 7,
            exchanges: vec![crate::models::Exchange::Azbit],
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_row_columns() {
        let now = Utc::now();
        let row = BoardRow::new(&schedule("a1", ScheduleStatus::CREATED, 61_000, now), now);
        assert_eq!(row.currency_pair, "SAFTP_USDT");
        assert_eq!(row.lot_size, "20.5");
        assert_eq!(row.interval, "1 min 30 sec");
        assert_eq!(row.side, "Buy");
        assert_eq!(row.limit, 7);
        assert_eq!(row.remaining, "1 min 1 sec");
    }

    #[test]
    fn test_started_rows_hide_edit_and_delete() {
        let now = Utc::now();
        let running = RowActions::for_schedule(&schedule("a1", ScheduleStatus::STARTED, 0, now));
        assert_eq!(running.labels(), vec!["start", "stop"]);

        let idle = RowActions::for_schedule(&schedule("a2", ScheduleStatus::STOPPED, 0, now));
        assert_eq!(idle.labels(), vec!["start", "stop", "edit", "delete"]);
    }

    #[test]
    fn test_render_table_and_history() {
        let now = Utc::now();
        let list = vec![schedule("a1", ScheduleStatus::CREATED, 500, now)];

        let table = render_table(&list, now);
        assert!(table.starts_with("ID"));
        assert!(table.contains("Remaining"));
        assert!(table.contains("start,stop,edit,delete"));

        let history = render_history(&list);
        assert!(!history.contains("Remaining"));
        assert!(history.contains("Start Time"));

        assert_eq!(render_table(&[], now), "No trade schedules.\n");
    }

    // ── watch loop ──────────────────────────────────────────────────────────

    #[derive(Default)]
    struct ListOnlyRepo {
        schedules: Mutex<Vec<TradeSchedule>>,
    }

    #[async_trait]
    impl ScheduleRepository for ListOnlyRepo {
        async fn list(&self, _kind: ListKind) -> Result<Vec<TradeSchedule>, AdminError> {
            Ok(self.schedules.lock().unwrap().clone())
        }
        async fn create(&self, _: &NewSchedule) -> Result<Option<TradeSchedule>, AdminError> {
            unreachable!()
        }
        async fn update(&self, _: &ScheduleId, _: &ScheduleUpdate) -> Result<Option<TradeSchedule>, AdminError> {
            unreachable!()
        }
        async fn delete(&self, _: &ScheduleId) -> Result<(), AdminError> {
            unreachable!()
        }
    }

    async fn wait_until(frames: &Arc<Mutex<Vec<String>>>, needle: &str) {
        for _ in 0..200 {
            if frames.lock().unwrap().iter().any(|f| f.contains(needle)) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no frame contained {needle:?}");
    }

    #[tokio::test]
    async fn test_push_event_triggers_refresh_and_shutdown_stops() {
        let now = Utc::now();
        let repo = Arc::new(ListOnlyRepo::default());
        repo.schedules.lock().unwrap().push(schedule("first", ScheduleStatus::CREATED, 60_000, now));

        let sync = Arc::new(ScheduleListSynchronizer::new(repo.clone(), ListKind::Existing));
        let board = LiveBoard::new(sync, Duration::from_millis(10));

        let (events_tx, events_rx) = mpsc::channel(4);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let frames = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = frames.clone();

        let driver = async {
            wait_until(&frames, "first").await;
            repo.schedules.lock().unwrap().push(schedule("second", ScheduleStatus::STARTED, 0, now));
            events_tx.send(PushEvent::SchedulesChanged).await.unwrap();
            wait_until(&frames, "second").await;
            stop_tx.send(()).unwrap();
        };

        let watch = board.run(
            Some(PushSubscription::detached(events_rx)),
            async {
                let _ = stop_rx.await;
            },
            move |frame| sink.lock().unwrap().push(frame.to_string()),
        );

        let (result, ()) = tokio::join!(watch, driver);
        assert!(result.is_ok());
        assert!(frames.lock().unwrap().len() >= 2);
    }

    /// First list answers at once; every later one never returns.
    #[derive(Default)]
    struct HangingRepo {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl ScheduleRepository for HangingRepo {
        async fn list(&self, _kind: ListKind) -> Result<Vec<TradeSchedule>, AdminError> {
            let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if call > 0 {
                std::future::pending::<()>().await;
            }
            Ok(vec![schedule("slow", ScheduleStatus::CREATED, 3_600_000, Utc::now())])
        }
        async fn create(&self, _: &NewSchedule) -> Result<Option<TradeSchedule>, AdminError> {
            unreachable!()
        }
        async fn update(&self, _: &ScheduleId, _: &ScheduleUpdate) -> Result<Option<TradeSchedule>, AdminError> {
            unreachable!()
        }
        async fn delete(&self, _: &ScheduleId) -> Result<(), AdminError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_countdown_keeps_ticking_while_refresh_hangs() {
        let repo = Arc::new(HangingRepo::default());
        let sync = Arc::new(ScheduleListSynchronizer::new(repo.clone(), ListKind::Existing));
        let board = LiveBoard::new(sync, Duration::from_millis(20));

        let (events_tx, events_rx) = mpsc::channel(4);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let frames = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = frames.clone();

        let driver = async {
            wait_until(&frames, "slow").await;
            events_tx.send(PushEvent::SchedulesChanged).await.unwrap();
            // A second push while the first fetch hangs must not queue a pile
            // of fetches either.
            events_tx.send(PushEvent::SchedulesChanged).await.unwrap();

            for _ in 0..200 {
                if repo.calls.load(std::sync::atomic::Ordering::SeqCst) >= 2 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            let before = frames.lock().unwrap().len();
            tokio::time::sleep(Duration::from_millis(300)).await;
            let during = frames.lock().unwrap().len() - before;
            assert!(during >= 3, "countdown rendered {during} frames while a refresh hung");

            stop_tx.send(()).unwrap();
        };

        let watch = board.run(
            Some(PushSubscription::detached(events_rx)),
            async {
                let _ = stop_rx.await;
            },
            move |frame| sink.lock().unwrap().push(frame.to_string()),
        );

        let (result, ()) = tokio::time::timeout(Duration::from_secs(5), async { tokio::join!(watch, driver) })
            .await
            .expect("shutdown was ignored while a refresh hung");
        assert!(result.is_ok());
        assert_eq!(repo.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_initial_load_failure_is_returned() {
        struct Down;

        #[async_trait]
        impl ScheduleRepository for Down {
            async fn list(&self, _kind: ListKind) -> Result<Vec<TradeSchedule>, AdminError> {
                Err(AdminError::Auth("no login token stored".into()))
            }
            async fn create(&self, _: &NewSchedule) -> Result<Option<TradeSchedule>, AdminError> {
                unreachable!()
            }
            async fn update(&self, _: &ScheduleId, _: &ScheduleUpdate) -> Result<Option<TradeSchedule>, AdminError> {
                unreachable!()
            }
            async fn delete(&self, _: &ScheduleId) -> Result<(), AdminError> {
                unreachable!()
            }
        }

        let sync = Arc::new(ScheduleListSynchronizer::new(Arc::new(Down), ListKind::Existing));
        let board = LiveBoard::new(sync, Duration::from_millis(10));
        let err = board
            .run(None, std::future::pending(), |_| {})
            .await
            .unwrap_err();
        assert!(err.is_auth());
    }
}
