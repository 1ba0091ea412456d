//! Binary entrypoint for the Lootkeeper CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and seed the canonical world
//! - `seed [--file <seed.json>]` - (re)author the world from the canonical seed or a JSON file
//! - `show <container>` - print a container view as JSON (`char:alice`, `room:smithy`, `item:backpack_alice`)
//! - `transfer --from <c> --to <c> --item <id> --actor <id>` - move one item
//! - `buy --buyer <id> --shopkeeper <id> --item <id>` - purchase from a shop
//! - `history [--limit N]` - recent audit entries, newest first
//!
//! See the library crate docs for module-level details: `lootkeeper::`.
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use lootkeeper::config::Config;
use lootkeeper::world::{
    canonical_world_seed, ActorSession, ContainerRef, TransferCoordinator, WorldError, WorldSeed,
    WorldStore, WorldStoreBuilder,
};

#[derive(Parser)]
#[command(name = "lootkeeper")]
#[command(about = "Race-safe item transfers and purchases for an RPG world store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and seed the canonical world
    Init,
    /// Seed the world database
    Seed {
        /// JSON seed file; the canonical demo world when omitted
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Print a container as JSON
    Show {
        /// Container reference, e.g. char:alice or room:town_square
        container: String,
    },
    /// Move one item between two containers
    Transfer {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        item: String,
        /// Character performing the move
        #[arg(long)]
        actor: String,
    },
    /// Buy an item from a shopkeeper
    Buy {
        #[arg(long)]
        buyer: String,
        #[arg(long)]
        shopkeeper: String,
        #[arg(long)]
        item: String,
    },
    /// Print recent audit entries
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        info!("Initializing new Lootkeeper configuration");
        Config::create_default(&cli.config).await?;
        info!("Configuration file created at {}", cli.config);

        let config = Config::default();
        tokio::fs::create_dir_all(&config.storage.data_dir).await?;
        let store = WorldStoreBuilder::new(config.db_path())
            .with_capacity(config.capacity_policy())
            .open()?;
        info!(
            "World database ready at {} ({} rooms)",
            config.db_path(),
            store.list_room_ids()?.len()
        );
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    init_logging(&Some(config.clone()), cli.verbose);

    let store = WorldStoreBuilder::new(config.db_path())
        .without_world_seed()
        .with_capacity(config.capacity_policy())
        .open()?;

    if let Err(err) = run(cli.command, &config, store) {
        match &err {
            WorldError::Conflict { .. } | WorldError::InsufficientFunds { .. } => {
                println!("{}", err);
                std::process::exit(2);
            }
            _ => {
                error!("{}", err);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn run(command: Commands, config: &Config, store: WorldStore) -> Result<(), WorldError> {
    match command {
        // Handled before the store is opened
        Commands::Init => {}
        Commands::Seed { file } => {
            let seed = match file {
                Some(path) => {
                    info!("Loading world seed from {}", path);
                    WorldSeed::from_json_file(&path, config.shop.default_markup)?
                }
                None => canonical_world_seed(Utc::now()).with_shop_markup(config.shop.default_markup),
            };
            let dupes = seed.duplicate_item_ids();
            if !dupes.is_empty() {
                return Err(WorldError::InvalidMutation(format!(
                    "seed places items more than once: {}",
                    dupes.join(", ")
                )));
            }
            let written = store.apply_seed(&seed)?;
            info!("Seeded {} records into {}", written, config.db_path());
            println!("seeded {} records", written);
        }
        Commands::Show { container } => {
            let container: ContainerRef = container.parse()?;
            let view = store.load_container(&container)?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Commands::Transfer {
            from,
            to,
            item,
            actor,
        } => {
            let source: ContainerRef = from.parse()?;
            let destination: ContainerRef = to.parse()?;
            let coordinator = TransferCoordinator::new(Arc::new(store));
            let mut session = ActorSession::new(&actor);
            let receipt = coordinator.transfer(&source, &destination, &item, &mut session)?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        Commands::Buy {
            buyer,
            shopkeeper,
            item,
        } => {
            let coordinator = TransferCoordinator::new(Arc::new(store));
            let mut session = ActorSession::new(&buyer);
            let receipt = coordinator.buy(&buyer, &shopkeeper, &item, &mut session)?;
            if !receipt.settlement.is_settled() {
                warn!("{} has not been paid for {}", shopkeeper, item);
            }
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        Commands::History { limit } => {
            for entry in store.recent_audit(limit)? {
                println!(
                    "{} {:<10} {}",
                    entry.at.format("%Y-%m-%dT%H:%M:%SZ"),
                    entry.actor,
                    entry.summary
                );
            }
        }
    }
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity raises the configured level
    let configured = config
        .as_ref()
        .map(|cfg| cfg.log_level())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => configured.max(log::LevelFilter::Debug),
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when someone is watching it
        let is_tty = atty::is(atty::Stream::Stdout);

        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());

            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }

            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
