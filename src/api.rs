//! # api
//!
//! **Schedule Repository Client** — the only code that speaks HTTP to the
//! schedule backend.
//!
//! ## API Contract
//!
//! | Method | Path                               | Body            | Response                  |
//! |--------|------------------------------------|-----------------|---------------------------|
//! | POST   | `/admin/login`                     | `{email, password}` | `{token}` (HTTP 200)  |
//! | GET    | `/tradeSchedulers?type=history`    | —               | `{tradeSchedules: [...]}` |
//! | GET    | `/tradeSchedulers?type=existing`   | —               | `{tradeSchedules: [...]}` |
//! | POST   | `/tradeSchedulers/new`             | `NewSchedule`   | created schedule          |
//! | PUT    | `/tradeScheduler/{id}`             | `ScheduleUpdate`| updated schedule          |
//! | DELETE | `/tradeScheduler/{id}`             | —               | —                         |
//!
//! Everything except login carries `Authorization: Bearer <token>` taken from
//! the [`SharedSession`].  Each call is a single attempt; there are no
//! retries.

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::AdminError;
use crate::models::{NewSchedule, ScheduleId, ScheduleList, ScheduleUpdate, TradeSchedule};
use crate::session::SharedSession;

// ─── Repository Seam ──────────────────────────────────────────────────────────

/// Which list endpoint to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Finished schedules (history view).
    History,
    /// Schedules that can still be started / stopped / edited.
    Existing,
}

impl ListKind {
    pub fn as_query(&self) -> &'static str {
        match self {
            ListKind::History => "history",
            ListKind::Existing => "existing",
        }
    }
}

/// Boundary to the remote schedule store.
///
/// Create and update hand back the server's copy when the response body could
/// be decoded, `None` otherwise; the mutation itself still succeeded.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn list(&self, kind: ListKind) -> Result<Vec<TradeSchedule>, AdminError>;

    async fn create(&self, schedule: &NewSchedule) -> Result<Option<TradeSchedule>, AdminError>;

    async fn update(
        &self,
        id: &ScheduleId,
        update: &ScheduleUpdate,
    ) -> Result<Option<TradeSchedule>, AdminError>;

    async fn delete(&self, id: &ScheduleId) -> Result<(), AdminError>;
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// `POST /admin/login`; on HTTP 200 the token is stored in `session`.
pub async fn login(
    client: &reqwest::Client,
    base_url: &str,
    credentials: &Credentials,
    session: &SharedSession,
) -> Result<(), AdminError> {
    let url = format!("{}/admin/login", base_url.trim_end_matches('/'));
    info!(email = %credentials.email, url = %url, "Logging in...");

    let resp = client
        .post(&url)
        .json(credentials)
        .send()
        .await
        .map_err(|e| {
            error!(error = %e, "login endpoint unreachable");
            AdminError::Network(format!("login: {e}"))
        })?;

    let status = resp.status();
    if status != StatusCode::OK {
        let body = resp.text().await.unwrap_or_default();
        debug!(%status, body = %body, "login rejected");
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST => {
                AdminError::Auth(format!("login failed: HTTP {status}"))
            }
            _ => AdminError::Network(format!("login: HTTP {status}")),
        });
    }

    let LoginResponse { token } = resp
        .json()
        .await
        .map_err(|e| AdminError::Network(format!("login response parse error: {e}")))?;

    session.write().await.activate(token)?;
    info!("✅ Logged in");
    Ok(())
}

// ─── HTTP Repository ──────────────────────────────────────────────────────────

pub struct HttpScheduleRepository {
    client: reqwest::Client,
    base_url: String,
    session: SharedSession,
}

impl HttpScheduleRepository {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, session: SharedSession) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Attaches the bearer header; fails fast when nobody is logged in.
    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, AdminError> {
        let header = self.session.read().await.authorization()?;
        Ok(builder.header(AUTHORIZATION, header))
    }

    async fn execute(&self, builder: RequestBuilder, op: &'static str) -> Result<Response, AdminError> {
        let resp = self
            .authorized(builder)
            .await?
            .send()
            .await
            .map_err(|e| {
                error!(op, error = %e, "schedule API unreachable");
                AdminError::Network(format!("{op}: {e}"))
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        // Backend detail stays in the logs.
        let body = resp.text().await.unwrap_or_default();
        debug!(op, %status, body = %body, "schedule API error body");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(op, %status, "❌ Token rejected by schedule API");
            Err(AdminError::Auth(format!("{op}: HTTP {status}")))
        } else {
            error!(op, %status, "schedule API returned HTTP error");
            Err(AdminError::Network(format!("{op}: HTTP {status}")))
        }
    }
}

#[async_trait]
impl ScheduleRepository for HttpScheduleRepository {
    async fn list(&self, kind: ListKind) -> Result<Vec<TradeSchedule>, AdminError> {
        let request = self
            .client
            .get(self.url("tradeSchedulers"))
            .query(&[("type", kind.as_query())]);

        let list: ScheduleList = self
            .execute(request, "list")
            .await?
            .json()
            .await
            .map_err(|e| {
                error!(error = %e, "schedule list parse failed");
                AdminError::Network(format!("list response parse error: {e}"))
            })?;

        debug!(kind = kind.as_query(), count = list.trade_schedules.len(), "schedules fetched");
        Ok(list.trade_schedules)
    }

    async fn create(&self, schedule: &NewSchedule) -> Result<Option<TradeSchedule>, AdminError> {
        let request = self.client.post(self.url("tradeSchedulers/new")).json(schedule);
        let resp = self.execute(request, "create").await?;

        info!(
            side      = %schedule.side,
            lot       = %schedule.trade_quantity,
            interval  = schedule.interval,
            limit     = schedule.number_of_trades,
            exchanges = ?schedule.exchanges,
            "📅 Trade schedule created"
        );
        Ok(decode_schedule(resp, "create").await)
    }

    async fn update(
        &self,
        id: &ScheduleId,
        update: &ScheduleUpdate,
    ) -> Result<Option<TradeSchedule>, AdminError> {
        let request = self
            .client
            .put(self.url(&format!("tradeScheduler/{id}")))
            .json(update);
        let resp = self.execute(request, "update").await?;

        info!(%id, status = ?update.status, start_time = ?update.start_time, "📝 Trade schedule updated");
        Ok(decode_schedule(resp, "update").await)
    }

    async fn delete(&self, id: &ScheduleId) -> Result<(), AdminError> {
        let request = self.client.delete(self.url(&format!("tradeScheduler/{id}")));
        self.execute(request, "delete").await?;

        info!(%id, "🗑️ Trade schedule deleted");
        Ok(())
    }
}

/// Mutation responses come back either bare or as `{tradeSchedule: ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScheduleEnvelope {
    Wrapped {
        #[serde(rename = "tradeSchedule")]
        trade_schedule: TradeSchedule,
    },
    Bare(TradeSchedule),
}

async fn decode_schedule(resp: Response, op: &'static str) -> Option<TradeSchedule> {
    let bytes = match resp.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(op, error = %e, "could not read mutation response body");
            return None;
        }
    };

    match serde_json::from_slice::<ScheduleEnvelope>(&bytes) {
        Ok(ScheduleEnvelope::Wrapped { trade_schedule }) | Ok(ScheduleEnvelope::Bare(trade_schedule)) => {
            Some(trade_schedule)
        }
        Err(e) => {
            warn!(op, error = %e, "unrecognised mutation response body, ignoring");
            None
        }
    }
}
