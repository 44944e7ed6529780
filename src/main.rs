//! # scheduler-admin — command-line front-end
//!
//! One-shot commands for the schedule form and row actions, plus `watch`, the
//! live list with countdown and push-driven refresh.
//!
//! ```text
//! scheduler-admin login  --email ops@example.com --password ...
//! scheduler-admin create --side Buy --lot 25 --limit 10 --minutes 1 \
//!                        --start "2026-10-18 09:00:00" --exchange Azbit --exchange Dex-Trade
//! scheduler-admin list | history | watch
//! scheduler-admin start|stop|delete <ID>
//! scheduler-admin edit <ID> --lot 30
//! scheduler-admin logout
//! ```
//!
//! Tables go to stdout, logs and notifications to stderr.

use std::collections::BTreeSet;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use scheduler_admin::{
    api::{self, Credentials, HttpScheduleRepository, ListKind},
    board::{self, LiveBoard},
    config::Config,
    error::AdminError,
    interval::IntervalFields,
    models::{Exchange, ScheduleDraft, ScheduleId},
    push::PushSubscription,
    session::{self, Session, SharedSession, TokenStore},
    sync::ScheduleListSynchronizer,
};

// ─── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "scheduler-admin", version, about = "Trade schedule admin client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and keep the token for later commands
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored token
    Logout,
    /// Print the existing schedules once
    List,
    /// Print finished schedules
    History,
    /// Live list: countdown every tick, refresh on server push (Ctrl-C to quit)
    Watch,
    /// Create a schedule
    Create(CreateArgs),
    /// Overwrite a schedule that is not running
    Edit(EditArgs),
    /// Start a schedule now
    Start { id: String },
    /// Stop a schedule
    Stop { id: String },
    /// Delete a schedule that is not running
    Delete { id: String },
}

#[derive(Debug, Args)]
struct CreateArgs {
    /// Buy or Sell
    #[arg(long, default_value = "")]
    side: String,
    /// Lot size
    #[arg(long, default_value = "0")]
    lot: String,
    /// Maximum number of trades
    #[arg(long, default_value = "0")]
    limit: String,
    /// RFC 3339, or local "YYYY-MM-DD HH:MM[:SS]"
    #[arg(long, value_parser = parse_start_time)]
    start: Option<DateTime<Utc>>,
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u64).range(0..=12))]
    hours: u64,
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u64).range(0..=59))]
    minutes: u64,
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u64).range(0..=59))]
    seconds: u64,
    /// Azbit, Coinsbit or Dex-Trade; repeat for several
    #[arg(long = "exchange", value_parser = parse_exchange)]
    exchanges: Vec<Exchange>,
}

impl CreateArgs {
    fn into_draft(self) -> ScheduleDraft {
        ScheduleDraft {
            trade_quantity: self.lot,
            side: self.side,
            number_of_trades: self.limit,
            start_time: self.start,
            interval: IntervalFields::new(self.hours, self.minutes, self.seconds),
            exchanges: self.exchanges.into_iter().collect(),
            ..ScheduleDraft::default()
        }
    }
}

/// Every field is optional; unset ones keep the schedule's current value.
#[derive(Debug, Args)]
struct EditArgs {
    id: String,
    #[arg(long)]
    side: Option<String>,
    #[arg(long)]
    lot: Option<String>,
    #[arg(long)]
    limit: Option<String>,
    #[arg(long, value_parser = parse_start_time)]
    start: Option<DateTime<Utc>>,
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=12))]
    hours: Option<u64>,
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=59))]
    minutes: Option<u64>,
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=59))]
    seconds: Option<u64>,
    /// Replaces the whole exchange selection when given
    #[arg(long = "exchange", value_parser = parse_exchange)]
    exchanges: Vec<Exchange>,
}

impl EditArgs {
    fn apply(self, mut draft: ScheduleDraft) -> ScheduleDraft {
        if let Some(side) = self.side {
            draft.side = side;
        }
        if let Some(lot) = self.lot {
            draft.trade_quantity = lot;
        }
        if let Some(limit) = self.limit {
            draft.number_of_trades = limit;
        }
        if let Some(start) = self.start {
            draft.start_time = Some(start);
        }
        draft.interval = IntervalFields::new(
            self.hours.unwrap_or(draft.interval.hours),
            self.minutes.unwrap_or(draft.interval.minutes),
            self.seconds.unwrap_or(draft.interval.seconds),
        );
        if !self.exchanges.is_empty() {
            draft.exchanges = self.exchanges.into_iter().collect::<BTreeSet<_>>();
        }
        draft
    }
}

fn parse_exchange(raw: &str) -> Result<Exchange, String> {
    raw.parse()
}

fn parse_start_time(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).single())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| format!("unrecognised start time {raw:?}"))
}

// ─── Entry Point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    // ── 1. Load .env (optional; real env vars win) ───────────────────────────
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // ── 2. Initialise structured logging (stderr, tables own stdout) ─────────
    if let Err(e) = init_tracing() {
        eprintln!("failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    // ── 3. Dispatch ──────────────────────────────────────────────────────────
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("❌ {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env()
                .add_directive("scheduler_admin=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();
    Ok(())
}

/// Shared pieces every API-facing command needs.
struct App {
    config: Config,
    client: reqwest::Client,
    session: SharedSession,
}

impl App {
    fn load() -> Result<Self, AdminError> {
        let config = Config::from_env()?;
        let client = config.http_client()?;
        let session = session::shared(Session::init(TokenStore::new(&config.storage_path))?);
        Ok(Self { config, client, session })
    }

    fn synchronizer(&self, kind: ListKind) -> Arc<ScheduleListSynchronizer<HttpScheduleRepository>> {
        let repo = HttpScheduleRepository::new(
            self.client.clone(),
            self.config.api_url.clone(),
            self.session.clone(),
        );
        Arc::new(ScheduleListSynchronizer::new(Arc::new(repo), kind))
    }
}

async fn run(command: Command) -> Result<(), AdminError> {
    let app = App::load()?;

    match command {
        Command::Login { email, password } => {
            api::login(&app.client, &app.config.api_url, &Credentials { email, password }, &app.session).await?;
            notify("Logged in");
        }

        Command::Create(args) => {
            // Rejected drafts never reach the network.
            let schedule = args.into_draft().to_new_schedule()?;
            app.synchronizer(ListKind::Existing).create(&schedule).await?;
            notify("Trade Schedule is added successfully");
        }

        Command::Logout => {
            app.session.write().await.clear()?;
            notify("Logged out");
        }

        Command::List => {
            let sync = app.synchronizer(ListKind::Existing);
            sync.refresh().await?;
            print!("{}", board::render_table(&sync.schedules().await, Utc::now()));
        }

        Command::History => {
            let sync = app.synchronizer(ListKind::History);
            sync.refresh().await?;
            print!("{}", board::render_history(&sync.schedules().await));
        }

        Command::Watch => watch(&app).await?,

        Command::Edit(args) => {
            let sync = app.synchronizer(ListKind::Existing);
            sync.refresh().await?;
            let id = ScheduleId::new(args.id.clone());
            let current = sync
                .find(&id)
                .await
                .ok_or_else(|| AdminError::NotAllowed(format!("Schedule {id} was not found.")))?;
            let schedule = args.apply(ScheduleDraft::from_schedule(&current)).to_new_schedule()?;
            sync.edit(&id, schedule).await?;
            notify("Trade Schedule is updated successfully");
        }

        Command::Start { id } => {
            let sync = app.synchronizer(ListKind::Existing);
            sync.start(&ScheduleId::new(id), Utc::now()).await?;
            notify("Trade Schedule is started");
        }

        Command::Stop { id } => {
            let sync = app.synchronizer(ListKind::Existing);
            sync.stop(&ScheduleId::new(id)).await?;
            notify("Trade Schedule is stopped");
        }

        Command::Delete { id } => {
            let sync = app.synchronizer(ListKind::Existing);
            // Load first so a running schedule is refused locally.
            sync.refresh().await?;
            sync.delete(&ScheduleId::new(id)).await?;
            notify("Trade Schedule is deleted successfully");
        }
    }

    Ok(())
}

async fn watch(app: &App) -> Result<(), AdminError> {
    let push = match PushSubscription::open(&app.config.push_url).await {
        Ok(push) => Some(push),
        Err(e) => {
            warn!(error = %e, "⚠️ Live updates unavailable, showing countdown only");
            None
        }
    };

    let board = LiveBoard::new(app.synchronizer(ListKind::Existing), app.config.tick);
    info!(tick = ?app.config.tick, "📺 Watching trade schedules");

    board
        .run(
            push,
            async {
                let _ = tokio::signal::ctrl_c().await;
            },
            |frame| {
                let mut out = std::io::stdout().lock();
                // Clear screen, cursor home.
                let _ = write!(out, "\x1B[2J\x1B[H{frame}");
                let _ = out.flush();
            },
        )
        .await
}

fn notify(message: &str) {
    eprintln!("✅ {message}");
}
