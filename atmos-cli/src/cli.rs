use std::sync::Arc;

use anyhow::{Context, anyhow};
use atmos_core::{
    Config, FileStorage, LocationOrchestrator, PlaceId, Providers, SavedPlacesStore,
    orchestrator::is_unknown_place,
};
use clap::{Parser, Subcommand};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "atmos", version, about = "Weather and air quality for any place")]
pub struct Cli {
    /// Log provider requests and store activity to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// OpenWeather API key; overrides the configured one.
    #[arg(long, env = "ATMOS_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure,

    /// Show weather and air quality for a place.
    Show {
        /// Place name or address.
        place: String,

        /// Also add the place to the saved list.
        #[arg(long)]
        save: bool,
    },

    /// Manage saved places.
    Places {
        #[command(subcommand)]
        command: PlacesCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum PlacesCommand {
    /// List saved places.
    List,

    /// Look up a place and save it.
    Add { place: String },

    /// Remove a saved place by id.
    Remove { id: String },

    /// Show weather for a saved place without geocoding it again.
    Show { id: String },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;
        tracing::debug!(has_api_key = config.api_key.is_some(), "Loaded config");
        if let Some(key) = self.api_key {
            tracing::debug!("Using API key from command line or environment");
            config.set_api_key(key);
        }

        match self.command {
            Command::Configure => configure(config),
            Command::Show { place, save } => {
                let orchestrator = orchestrator(&config)?;
                lookup(&orchestrator, &place).await?;

                if save {
                    let mut store = open_store(&config)?;
                    if orchestrator.save_current(&mut store) {
                        println!("Saved '{}'.", place.trim());
                    } else {
                        println!("'{}' is already saved.", place.trim());
                    }
                }
                Ok(())
            }
            Command::Places { command } => places(&config, command).await,
        }
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(inquire::PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;

    if key.trim().is_empty() {
        return Err(anyhow!("API key must not be empty"));
    }

    config.set_api_key(key.trim().to_string());
    config.save()?;

    println!("API key saved to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn places(config: &Config, command: PlacesCommand) -> anyhow::Result<()> {
    let mut store = open_store(config)?;

    match command {
        PlacesCommand::List => {
            print!("{}", render::places(&store.places()));
        }
        PlacesCommand::Add { place } => {
            let providers = Providers::openweather(&config.api_config()?)?;
            let coordinate = providers
                .geocoder
                .resolve(&place)
                .await
                .with_context(|| format!("Could not locate '{}'", place.trim()))?;

            if store.add(&place, coordinate) {
                println!("Saved '{}' at {}.", place.trim(), coordinate);
            } else {
                println!("'{}' is already saved.", place.trim());
            }
        }
        PlacesCommand::Remove { id } => {
            let id = parse_id(&id)?;
            if store.remove(id) {
                println!("Removed {id}.");
            } else {
                println!("No saved place with id {id}.");
            }
        }
        PlacesCommand::Show { id } => {
            let id = parse_id(&id)?;
            let mut place = store
                .get(id)
                .ok_or_else(|| anyhow!("No saved place with id {id}"))?;

            let orchestrator = orchestrator(config)?;
            let report = orchestrator.fetch_saved(&place).await?;
            print!("{}", render::report(&report));

            place.last_known_condition = Some(report.weather.current.primary_condition.clone());
            store.replace(place);
        }
    }

    Ok(())
}

async fn lookup(orchestrator: &LocationOrchestrator, place: &str) -> anyhow::Result<()> {
    match orchestrator.resolve_and_fetch(place).await {
        Ok(report) => {
            print!("{}", render::report(&report));
            Ok(())
        }
        Err(e) if is_unknown_place(&e) => {
            Err(anyhow!("No place called '{}' was found.", place.trim()))
        }
        Err(e) => {
            let hint = if e.cause().is_retryable() { " (temporary, try again)" } else { "" };
            Err(anyhow::Error::new(e).context(format!("Lookup for '{}' failed{hint}", place.trim())))
        }
    }
}

fn orchestrator(config: &Config) -> anyhow::Result<LocationOrchestrator> {
    let providers = Providers::openweather(&config.api_config()?)?;
    Ok(LocationOrchestrator::new(providers))
}

fn open_store(config: &Config) -> anyhow::Result<SavedPlacesStore> {
    let dir = config.data_dir()?;
    tracing::debug!("Opening saved places in {}", dir.display());

    let store = SavedPlacesStore::open(Arc::new(FileStorage::new(dir)));
    if store.is_memory_only() {
        tracing::warn!("Saved places could not be read; changes will not be written this run");
    }
    Ok(store)
}

fn parse_id(raw: &str) -> anyhow::Result<PlaceId> {
    raw.parse::<PlaceId>()
        .with_context(|| format!("'{raw}' is not a saved place id (see `atmos places list`)"))
}
