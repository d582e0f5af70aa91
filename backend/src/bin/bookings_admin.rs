//! Operator CLI for the PostgreSQL booking store.
//!
//! Applies migrations, inspects free slots and history, and moves bookings
//! through the lifecycle on behalf of staff. Results are printed as JSON.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::env;
use std::ffi::OsString;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultClock;
use municipal_bookings::config::BookingSettings;
use municipal_bookings::domain::{
    Actor, ActorId, BookingId, BookingLifecycleService, BookingState, Municipality,
};
use municipal_bookings::outbound::persistence::{
    DbPool, DieselBookingRepository, DieselHistoryRepository, PoolConfig, run_migrations,
};
use municipal_bookings::telemetry::init_tracing;
use ortho_config::OrthoConfig as _;
use serde::Serialize;
use tokio::runtime::Builder;
use tracing::info;

type Service = BookingLifecycleService<DieselBookingRepository, DieselHistoryRepository>;

/// `bookings-admin` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "bookings-admin",
    about = "Inspect and manage municipal collection bookings",
    version
)]
struct CliArgs {
    /// Database connection URL. Falls back to `BOOKINGS_DATABASE_URL`, then
    /// `DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url", global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending schema migrations.
    Migrate,
    #[command(flatten)]
    Booking(BookingCommand),
}

/// Commands served by the lifecycle service over a connection pool.
#[derive(Debug, Subcommand)]
enum BookingCommand {
    /// List free slots for a municipality on a date.
    Slots {
        #[arg(long)]
        municipality: String,
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: NaiveDate,
    },
    /// Show the transition history of a booking.
    History {
        #[arg(long = "booking-id")]
        booking_id: i64,
    },
    /// Move a booking to another state as a staff member.
    Transition {
        #[arg(long = "booking-id")]
        booking_id: i64,
        /// Target state, e.g. `assigned` or `IN_PROGRESS`.
        #[arg(long)]
        state: BookingState,
        /// Staff identity recorded in the history.
        #[arg(long)]
        actor: String,
    },
    /// Find a booking by its public token.
    Lookup {
        #[arg(long)]
        token: String,
    },
    /// List bookings, optionally filtered.
    List {
        #[arg(long, conflicts_with_all = ["district", "creator"])]
        municipality: Option<String>,
        #[arg(long, conflicts_with = "creator")]
        district: Option<String>,
        #[arg(long)]
        creator: Option<String>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to create Tokio runtime")?;
    runtime.block_on(run(args))
}

async fn run(args: CliArgs) -> Result<()> {
    let settings = BookingSettings::load_from_iter([OsString::from("bookings-admin")])
        .map_err(|err| eyre!("failed to load booking settings: {err}"))?;
    let database_url = resolve_database_url(args.database_url, settings.database_url())?;

    match args.command {
        Command::Migrate => migrate(&database_url),
        Command::Booking(command) => {
            let service = connect(database_url, &settings).await?;
            execute(&service, command).await
        }
    }
}

fn migrate(database_url: &str) -> Result<()> {
    let applied = run_migrations(database_url)?;
    info!(count = applied.len(), "migrations complete");
    print_json(&applied)
}

async fn connect(database_url: String, settings: &BookingSettings) -> Result<Service> {
    let policy = settings.policy()?;
    let pool = DbPool::new(PoolConfig::new(database_url)).await?;
    Ok(BookingLifecycleService::new(
        Arc::new(DieselBookingRepository::new(pool.clone())),
        Arc::new(DieselHistoryRepository::new(pool)),
        policy,
        Arc::new(DefaultClock),
    ))
}

async fn execute(service: &Service, command: BookingCommand) -> Result<()> {
    match command {
        BookingCommand::Slots { municipality, date } => {
            let municipality = Municipality::new(municipality)?;
            let slots = service.available_slots(&municipality, date).await?;
            let formatted: Vec<String> = slots
                .iter()
                .map(|slot| slot.format("%H:%M").to_string())
                .collect();
            print_json(&formatted)
        }
        BookingCommand::History { booking_id } => {
            print_json(&service.history(BookingId::new(booking_id)).await?)
        }
        BookingCommand::Transition {
            booking_id,
            state,
            actor,
        } => {
            let actor = Actor::staff(ActorId::new(actor)?);
            let booking = service
                .update_state(BookingId::new(booking_id), state, &actor)
                .await?;
            print_json(&booking)
        }
        BookingCommand::Lookup { token } => match service.get_by_token(&token).await? {
            Some(booking) => print_json(&booking),
            None => Err(eyre!("no booking matches token {token}")),
        },
        BookingCommand::List {
            municipality,
            district,
            creator,
        } => {
            let bookings = if let Some(name) = municipality {
                service
                    .list_by_municipality(&Municipality::new(name)?)
                    .await?
            } else if let Some(name) = district {
                service.list_by_district(&name).await?
            } else if let Some(id) = creator {
                service.list_by_creator(&ActorId::new(id)?).await?
            } else {
                service.list_all().await?
            };
            print_json(&bookings)
        }
    }
}

fn resolve_database_url(explicit: Option<String>, configured: Option<&str>) -> Result<String> {
    if let Some(value) = explicit {
        if value.trim().is_empty() {
            return Err(eyre!("--database-url must not be empty when provided"));
        }
        return Ok(value);
    }
    if let Some(value) = configured.filter(|value| !value.trim().is_empty()) {
        return Ok(value.to_owned());
    }

    let from_env = env::var("DATABASE_URL")
        .map_err(|_| eyre!("database URL missing: set --database-url or DATABASE_URL"))?;
    if from_env.trim().is_empty() {
        return Err(eyre!("DATABASE_URL must not be empty"));
    }
    Ok(from_env)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).wrap_err("failed to render JSON")?;
    println!("{rendered}");
    Ok(())
}
