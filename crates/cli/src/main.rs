//! Progression CLI - administer item unlock progress.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use progression_conditions::NoResolver;
use progression_core::{PlayerId, ProgressionConfig};
use progression_progress::{PlaceholderExpansion, ProgressService, ReloadReport, UnlockFacade};
use progression_storage::JsonStorage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "progression.json";

#[derive(Parser)]
#[command(name = "progression")]
#[command(about = "Gate items behind accumulated player progress", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./progression.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory from the configuration
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and list locked items
    Check,
    /// Show a player's status for an item
    Status {
        /// Player ID
        player: String,
        /// Item ID
        item: String,
    },
    /// Record activity for a player
    Record {
        /// Player ID
        player: String,
        /// Activity kind (kills, collect, break, ...)
        kind: String,
        /// Target key (entity, material or namespaced id)
        key: String,
        /// Amount to add
        #[arg(long, default_value = "1")]
        amount: u64,
    },
    /// Unlock an item for a player, or for every stored player
    Unlock {
        /// Player ID, or `all`
        player: String,
        /// Item ID
        item: String,
    },
    /// Lock an item for a player, or for every stored player
    Lock {
        /// Player ID, or `all`
        player: String,
        /// Item ID
        item: String,
    },
    /// Reset all progress of a player, or of every stored player
    Reset {
        /// Player ID, or `all`
        player: String,
        /// Required when resetting `all`
        #[arg(long)]
        confirm: bool,
    },
    /// Resolve a prog_ placeholder for a player
    Placeholder {
        /// Player ID
        player: String,
        /// Identifier, e.g. diamond_sword_progress
        identifier: String,
    },
    /// Generate a new player ID
    NewPlayer,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::NewPlayer = cli.command {
        println!("{}", PlayerId::new());
        return Ok(());
    }

    let mut config = load_config(cli.config.as_deref()).await?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    // Open storage
    let storage = JsonStorage::new(&config.data_dir)
        .await
        .with_context(|| format!("Failed to open data directory {}", config.data_dir.display()))?;
    let (service, report) = ProgressService::from_config(&config, Arc::new(storage), Arc::new(NoResolver));
    let service = Arc::new(service);

    match cli.command {
        Commands::Check => {
            print_report(&service, &report);
        }
        Commands::Status { player, item } => {
            let player = parse_player(&player)?;
            service.player_joined(player).await?;

            let facade = UnlockFacade::new(service.clone());
            println!("{}", facade.status_message(player, &item));
            if let Some(condition) = service.condition(&item) {
                println!("  Requirement: {}", condition.description());
            }
        }
        Commands::Record { player, kind, key, amount } => {
            let player = parse_player(&player)?;
            service.player_joined(player).await?;

            let unlocked = service.record_progress(player, &kind, &key, amount);
            println!(
                "{} {}: {}",
                kind.to_lowercase(),
                key.to_lowercase(),
                service.store().get(player, &kind, &key)
            );
            for notification in unlocked {
                println!("Unlocked: {}", notification.resource_id);
            }
        }
        Commands::Unlock { player, item } if is_all(&player) => {
            service.load_stored_players().await?;
            let (key, count) = service.unlock_item_all(&item)?;
            println!("Unlocked {} for {} players ({} {})", item, count, key.kind, key.target);
        }
        Commands::Unlock { player, item } => {
            let player = parse_player(&player)?;
            service.player_joined(player).await?;

            let key = service.unlock_item(player, &item)?;
            println!("Unlocked {} for {} ({} {})", item, player, key.kind, key.target);
        }
        Commands::Lock { player, item } if is_all(&player) => {
            service.load_stored_players().await?;
            let (key, count) = service.lock_item_all(&item)?;
            println!("Locked {} for {} players ({} {})", item, count, key.kind, key.target);
        }
        Commands::Lock { player, item } => {
            let player = parse_player(&player)?;
            service.player_joined(player).await?;

            let key = service.lock_item(player, &item)?;
            println!("Locked {} for {} ({} {})", item, player, key.kind, key.target);
        }
        Commands::Reset { player, confirm } if is_all(&player) => {
            if !confirm {
                anyhow::bail!("This resets ALL progression data for ALL players; rerun with --confirm");
            }
            service.load_stored_players().await?;
            let count = service.reset_all_progress().await?;
            println!("Reset progress for {} players", count);
        }
        Commands::Reset { player, .. } => {
            let player = parse_player(&player)?;
            service.reset_progress(player).await?;
            println!("Reset progress for {}", player);
        }
        Commands::Placeholder { player, identifier } => {
            let player = parse_player(&player)?;
            service.player_joined(player).await?;

            let expansion = PlaceholderExpansion::new(service.clone());
            match expansion.resolve(player, &identifier) {
                Some(value) => println!("{}", value),
                None => println!("Unknown placeholder: {}", identifier),
            }
        }
        Commands::NewPlayer => {}
    }

    service.shutdown().await?;
    Ok(())
}

async fn load_config(path: Option<&Path>) -> Result<ProgressionConfig> {
    match path {
        Some(path) => ProgressionConfig::load(path)
            .await
            .with_context(|| format!("Failed to load {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).exists() => ProgressionConfig::load(DEFAULT_CONFIG)
            .await
            .with_context(|| format!("Failed to load {}", DEFAULT_CONFIG)),
        None => {
            tracing::info!("No configuration file, no items are locked");
            Ok(ProgressionConfig::default())
        }
    }
}

fn parse_player(s: &str) -> Result<PlayerId> {
    Ok(s.parse()?)
}

fn is_all(player: &str) -> bool {
    player.eq_ignore_ascii_case("all")
}

fn print_report(service: &ProgressService, report: &ReloadReport) {
    let registry = service.registry();

    println!("Locked items ({})", registry.len());
    for (id, entry) in registry.iter() {
        println!("  {} | {}", id, entry.condition.description());
    }

    if !report.skipped.is_empty() {
        println!("Skipped ({})", report.skipped.len());
        for (id, reason) in &report.skipped {
            println!("  {} | {}", id, reason);
        }
    }

    if !report.cycles.is_empty() {
        println!("Cyclic prerequisites ({})", report.cycles.len());
        for id in &report.cycles {
            println!("  {}", id);
        }
    }
}
