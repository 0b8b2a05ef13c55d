use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lw_cli::commands::clock::ClockAction;
use lw_cli::commands::{clock, delete, history, status, watch};
use lw_cli::{Cli, Commands, Config};
use lw_core::{ManualTicker, PersistenceGateway, SessionController, SystemTimeSource};
use lw_db::SqliteStore;

type Controller = SessionController<SystemTimeSource, ManualTicker, SqliteStore>;

/// Load config, open the database and restore the controller.
fn open_controller(config_path: Option<&Path>) -> Result<Controller> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let store = SqliteStore::open(&config.database_path).context("failed to open database")?;
    let gateway = PersistenceGateway::with_keys(store, &config.history_key, &config.live_key);
    Ok(
        SessionController::restore(SystemTimeSource, ManualTicker::new(), gateway)
            .with_sample_period(config.sample_period_ms),
    )
}

/// Runs one clock action and saves the live state for the next invocation.
fn apply<W: Write>(out: &mut W, controller: &mut Controller, action: ClockAction) -> Result<()> {
    let outcome = clock::run(out, controller, action)?;
    tracing::debug!(?action, ?outcome, "clock action");
    controller.persist_live();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let mut controller = open_controller(cli.config.as_deref())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut input = std::io::stdin().lock();

    match command {
        Commands::Start => apply(&mut out, &mut controller, ClockAction::Start)?,
        Commands::Stop => apply(&mut out, &mut controller, ClockAction::Stop)?,
        Commands::Lap => apply(&mut out, &mut controller, ClockAction::Lap)?,
        Commands::Reset => apply(&mut out, &mut controller, ClockAction::Reset)?,
        Commands::EndSession => apply(&mut out, &mut controller, ClockAction::EndSession)?,
        Commands::DeleteRun { session, run, yes } => {
            delete::delete_run(&mut input, &mut out, &mut controller, session, run, *yes)?;
            controller.persist_live();
        }
        Commands::DeleteSession { session, yes } => {
            delete::delete_session(&mut input, &mut out, &mut controller, session, *yes)?;
            controller.persist_live();
        }
        Commands::Clear { yes } => {
            delete::clear(&mut input, &mut out, &mut controller, *yes)?;
            controller.persist_live();
        }
        Commands::Status { json } => status::run(&mut out, &controller, *json)?,
        Commands::History { json } => history::run(&mut out, controller.history(), *json)?,
        Commands::Watch { for_ms } => {
            watch::run(&mut out, &mut controller, *for_ms, std::thread::sleep)?;
            controller.persist_live();
        }
    }

    out.flush()?;
    Ok(())
}
