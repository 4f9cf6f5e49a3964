//! Barbot CLI entry point.
//!
//! Drives the controller and resolver from the command line: status,
//! homing, live slot tests, measured pours, menu and suggestion queries,
//! and full drink runs. The web front end talks to the same service
//! layer; this binary exists for bring-up and bench testing.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::warn;

use barbot::adapters::file_store::{FileCatalogStore, FileConfigStore};
use barbot::adapters::log_sink::LogEventSink;
use barbot::app::commands::BarCommand;
use barbot::app::ports::{CatalogStore, ConfigStore};
use barbot::app::service::BarService;
use barbot::catalog::RecipeCatalog;
use barbot::config::BarConfig;
use barbot::drivers::sim::SimDriver;
use barbot::drivers::TurretDriver;
use barbot::error::Error;
use barbot::resolver::IngredientSource;
use barbot::turret::{DispenseController, SharedTurret};

#[derive(Parser)]
#[command(name = "barbot", version, about = "Bottle-dispensing turret controller")]
struct Cli {
    /// Bottle configuration record.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Pre-merged recipe catalog.
    #[arg(long, default_value = "recipes.json")]
    recipes: PathBuf,

    /// Use the simulated driver even when real GPIO is available.
    #[arg(long)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show controller state, current slot, and any latched fault.
    Status,

    /// Home the rotation axis.
    Home,

    /// Rotate to a slot (0-11) — the live slot test.
    Rotate { slot: u8 },

    /// Pour a volume in ounces from the slot the turret is already at.
    Pour { slot: u8, volume_oz: f64 },

    /// Clear a latched fault and re-home.
    Reset,

    /// List every currently makeable drink.
    Menu,

    /// Recipes one bottle short; --all lists every near miss.
    Suggestions {
        #[arg(long)]
        all: bool,
    },

    /// Make a drink by catalog id or name.
    Make { recipe: String },

    /// Validate the configuration and report warnings.
    CheckConfig,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let store = FileConfigStore::new(&cli.config);
    let (config, warnings) = store.load().map_err(Error::from).with_context(|| {
        format!("loading configuration from {}", cli.config.display())
    })?;
    for warning in &warnings {
        warn!("config: {warning}");
    }

    if matches!(cli.command, Commands::CheckConfig) {
        println!("configuration OK ({} warnings)", warnings.len());
        for warning in &warnings {
            println!("  warning: {warning}");
        }
        return Ok(());
    }

    let catalog = match &cli.command {
        Commands::Menu | Commands::Suggestions { .. } | Commands::Make { .. } => {
            FileCatalogStore::new(&cli.recipes)
                .load()
                .map_err(Error::from)
                .with_context(|| format!("loading catalog from {}", cli.recipes.display()))?
        }
        _ => RecipeCatalog::default(),
    };

    #[cfg(feature = "rpi")]
    {
        if !cli.simulate {
            use barbot::drivers::rpi::{InputPins, RpiDriver};
            let driver = RpiDriver::new(&config.pins, InputPins::default())
                .map_err(Error::from)
                .context("claiming GPIO pins")?;
            return run(cli, config, catalog, store, driver);
        }
    }

    #[cfg(not(feature = "rpi"))]
    {
        if !cli.simulate {
            warn!("built without the rpi feature — using the simulated driver");
        }
    }
    run(cli, config, catalog, store, SimDriver::new())
}

fn run<D: TurretDriver>(
    cli: Cli,
    config: BarConfig,
    catalog: RecipeCatalog,
    store: FileConfigStore,
    driver: D,
) -> anyhow::Result<()> {
    let turret = SharedTurret::new(DispenseController::new(driver));
    let mut service = BarService::new(config, catalog, turret);
    let mut sink = LogEventSink::new();

    match cli.command {
        Commands::Status => {
            let status = service.status();
            println!("state:  {}", status.state.name());
            match status.current_slot {
                Some(slot) => println!("slot:   {slot}"),
                None => println!("slot:   unknown (not homed)"),
            }
            if let Some(reason) = status.fault {
                println!("fault:  {reason}");
            }
            println!(
                "mode:   {}",
                if service.config().safe_mode {
                    "safe (actuation suppressed)"
                } else {
                    "live"
                }
            );
        }
        Commands::Home => {
            service.handle_command(BarCommand::Home, &store, &mut sink)?;
            println!("homed at slot 0");
        }
        Commands::Rotate { slot } => {
            service.handle_command(BarCommand::RotateTo { slot }, &store, &mut sink)?;
            println!("at slot {slot}");
        }
        Commands::Pour { slot, volume_oz } => {
            service.handle_command(BarCommand::Pour { slot, volume_oz }, &store, &mut sink)?;
            println!("poured {volume_oz:.2} oz from slot {slot}");
        }
        Commands::Reset => {
            service.handle_command(BarCommand::Reset, &store, &mut sink)?;
            println!("reset complete, homed at slot 0");
        }
        Commands::Menu => {
            let outcome = service.resolve();
            for recipe in outcome.makeable() {
                let sources: Vec<String> = recipe
                    .bindings
                    .iter()
                    .map(|b| match b.source {
                        IngredientSource::Slot(index) => {
                            format!("{} (slot {index})", b.requirement)
                        }
                        IngredientSource::Pantry => format!("{} (pantry)", b.requirement),
                    })
                    .collect();
                println!("{}  [{}]  {}", recipe.id, recipe.name, sources.join(", "));
            }
            let total = outcome.recipes.len();
            let makeable = outcome.makeable().count();
            println!("-- {makeable} of {total} recipes makeable");
            if !outcome.skipped.is_empty() {
                println!("-- {} malformed recipes skipped", outcome.skipped.len());
            }
        }
        Commands::Suggestions { all } => {
            let suggestions = if all {
                service.any_missing()
            } else {
                service.one_missing()
            };
            for s in &suggestions {
                println!("{}  [{}]  missing: {}", s.id, s.name, s.missing.join(", "));
            }
            println!("-- {} suggestions", suggestions.len());
        }
        Commands::Make { recipe } => {
            service.handle_command(BarCommand::MakeDrink { recipe }, &store, &mut sink)?;
        }
        Commands::CheckConfig => unreachable!("handled before driver setup"),
    }
    Ok(())
}
