//! # sync
//!
//! **Schedule List Synchronizer** — keeps the local copy of the operator's
//! schedules in step with the backend.
//!
//! ## Rules
//!
//! * `refresh()` re-fetches the whole list and replaces the snapshot; there is
//!   no incremental merge.
//! * It runs on first load, after every successful mutation, and whenever the
//!   push channel says `tradeScheduleUpdated`.
//! * Each refresh takes a ticket when it starts.  A response whose ticket is
//!   older than the one already applied is dropped, so a slow fetch can never
//!   overwrite a newer list.
//! * A failed mutation leaves the snapshot exactly as it was.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::api::{ListKind, ScheduleRepository};
use crate::error::AdminError;
use crate::models::{NewSchedule, ScheduleId, ScheduleUpdate, TradeSchedule};

// ─── Snapshot ─────────────────────────────────────────────────────────────────

/// The last list that was applied.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub schedules: Vec<TradeSchedule>,
    /// Ticket of the refresh that produced this list (0 = never loaded).
    pub ticket: u64,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn is_loaded(&self) -> bool {
        self.ticket > 0
    }

    pub fn find(&self, id: &ScheduleId) -> Option<&TradeSchedule> {
        self.schedules.iter().find(|s| &s.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The fetched list replaced the snapshot.
    Applied { count: usize },
    /// A newer refresh had already landed; this response was dropped.
    Stale,
}

// ─── Synchronizer ─────────────────────────────────────────────────────────────

pub struct ScheduleListSynchronizer<R: ScheduleRepository + ?Sized> {
    repo: Arc<R>,
    kind: ListKind,
    snapshot: RwLock<Snapshot>,
    next_ticket: AtomicU64,
    /// At most one create / edit submission in flight.
    submitting: AtomicBool,
}

/// Clears the in-flight flag when the submission ends, however it ends.
struct SubmissionGuard<'a>(&'a AtomicBool);

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<R: ScheduleRepository + ?Sized> ScheduleListSynchronizer<R> {
    pub fn new(repo: Arc<R>, kind: ListKind) -> Self {
        Self {
            repo,
            kind,
            snapshot: RwLock::new(Snapshot::default()),
            next_ticket: AtomicU64::new(0),
            submitting: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    /// Copy of the current snapshot (the lock is released on return).
    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }

    pub async fn schedules(&self) -> Vec<TradeSchedule> {
        self.snapshot.read().await.schedules.clone()
    }

    pub async fn find(&self, id: &ScheduleId) -> Option<TradeSchedule> {
        self.snapshot.read().await.find(id).cloned()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    // ── Refresh ──────────────────────────────────────────────────────────────

    /// Fetch the full list and replace the snapshot, unless a newer refresh
    /// already won.
    pub async fn refresh(&self) -> Result<RefreshOutcome, AdminError> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;

        let schedules = self.repo.list(self.kind).await.map_err(|e| {
            error!(ticket, error = %e, "schedule refresh failed");
            e
        })?;

        let mut snapshot = self.snapshot.write().await;
        if ticket <= snapshot.ticket {
            debug!(ticket, applied = snapshot.ticket, "discarding out-of-order refresh");
            return Ok(RefreshOutcome::Stale);
        }

        let count = schedules.len();
        *snapshot = Snapshot {
            schedules,
            ticket,
            fetched_at: Some(Utc::now()),
        };
        debug!(ticket, count, kind = self.kind.as_query(), "snapshot replaced");
        Ok(RefreshOutcome::Applied { count })
    }

    /// Refresh after a successful mutation.  The mutation already happened,
    /// so a failure here is only logged.
    async fn refresh_after(&self, op: &'static str) {
        if let Err(e) = self.refresh().await {
            warn!(op, error = %e, "refresh after mutation failed; list may be stale");
        }
    }

    // ── Mutations ────────────────────────────────────────────────────────────

    pub async fn create(&self, schedule: &NewSchedule) -> Result<Option<TradeSchedule>, AdminError> {
        let _guard = self.begin_submission()?;
        let created = self.repo.create(schedule).await?;
        self.refresh_after("create").await;
        Ok(created)
    }

    /// Overwrite an existing schedule with the edit form's values.
    pub async fn edit(
        &self,
        id: &ScheduleId,
        schedule: NewSchedule,
    ) -> Result<Option<TradeSchedule>, AdminError> {
        self.ensure_not_started(id, "edit").await?;
        let _guard = self.begin_submission()?;
        let updated = self
            .repo
            .update(id, &ScheduleUpdate::replace_with(schedule))
            .await?;
        self.refresh_after("edit").await;
        Ok(updated)
    }

    /// "Start": the schedule's start time becomes `now`.
    pub async fn start(&self, id: &ScheduleId, now: DateTime<Utc>) -> Result<(), AdminError> {
        self.repo.update(id, &ScheduleUpdate::start_at(now)).await?;
        info!(%id, "▶️ Start requested");
        self.refresh_after("start").await;
        Ok(())
    }

    pub async fn stop(&self, id: &ScheduleId) -> Result<(), AdminError> {
        self.repo.update(id, &ScheduleUpdate::stop()).await?;
        info!(%id, "⏹️ Stop requested");
        self.refresh_after("stop").await;
        Ok(())
    }

    pub async fn delete(&self, id: &ScheduleId) -> Result<(), AdminError> {
        self.ensure_not_started(id, "delete").await?;
        self.repo.delete(id).await?;
        self.refresh_after("delete").await;
        Ok(())
    }

    // ── Guards ───────────────────────────────────────────────────────────────

    fn begin_submission(&self) -> Result<SubmissionGuard<'_>, AdminError> {
        if self.submitting.swap(true, Ordering::AcqRel) {
            warn!("submission rejected: previous one still in flight");
            return Err(AdminError::Busy);
        }
        Ok(SubmissionGuard(&self.submitting))
    }

    /// Edit and delete are not offered while a schedule is running.  Unknown
    /// ids are passed through; the backend has the final word.
    async fn ensure_not_started(&self, id: &ScheduleId, action: &str) -> Result<(), AdminError> {
        let snapshot = self.snapshot.read().await;
        match snapshot.find(id) {
            Some(schedule) if schedule.is_started() => Err(AdminError::NotAllowed(format!(
                "Schedule {id} is running; stop it before you {action} it."
            ))),
            _ => Ok(()),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
