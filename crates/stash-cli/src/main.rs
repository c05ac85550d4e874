//! Stash CLI - a unified key/value store with TTLs, namespaces, and undo
//!
//! This is the command-line interface for Stash. Values are read and
//! printed as JSON; the durable backend is the default so values
//! survive between invocations.

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use stash_core::{BackendKind, Stash, VERSION};

mod config;

use config::CliConfig;

/// Stash - a unified key/value store with TTLs, namespaces, and undo
#[derive(Parser)]
#[command(name = "stash")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the durable store database
    #[arg(short, long, global = true, env = "STASH_DB")]
    db: Option<String>,

    /// Backend to address (local, session, memory, cookie)
    #[arg(short, long, global = true, value_name = "BACKEND")]
    backend: Option<BackendKind>,

    #[command(subcommand)]
    command: Option<Commands>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init {
        /// Path where the durable database will be created
        #[arg(value_name = "PATH")]
        path: Option<String>,
    },

    /// Store a value under a key
    Set {
        #[arg(value_name = "KEY")]
        key: String,

        /// Value, parsed as JSON (falls back to a plain string)
        #[arg(value_name = "VALUE")]
        value: String,

        /// Time-to-live in milliseconds
        #[arg(long, value_name = "MS")]
        ttl_ms: Option<i64>,
    },

    /// Print the value stored under a key
    Get {
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Delete a key
    Remove {
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// List all keys in the backend
    List,

    /// Print the number of stored entries
    Len,

    /// Delete every entry in the backend
    Clear,

    /// Delete entries whose TTL has elapsed
    ClearExpired,

    /// Delete entries under a namespace prefix
    ClearNamespaced {
        #[arg(value_name = "NAMESPACE")]
        namespace: String,
    },

    /// Swap a key with its previously stored value
    Undo {
        #[arg(value_name = "KEY")]
        key: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let Cli {
        db,
        backend,
        command,
        quiet,
    } = Cli::parse();

    match command {
        Some(Commands::Init { path }) => {
            let store_path = match path.or(db) {
                Some(value) => std::path::PathBuf::from(value),
                None => config::default_store_path()?,
            };
            let config_path = config::default_config_path()?;
            let cfg = CliConfig::new(store_path);
            config::write_config(&config_path, &cfg)?;
            if !quiet {
                println!("Wrote config to {}", config_path.display());
                println!("Durable store: {}", cfg.store.path);
            }
        }
        Some(Commands::Set { key, value, ttl_ms }) => {
            let mut stash = open_stash(db.as_deref())?;
            let parsed = parse_value(&value);
            let stored = stash.set_item(&key, &parsed, backend, ttl_ms)?;
            if !stored {
                return Err(anyhow::anyhow!("Value for \"{}\" could not be encoded", key));
            }
            if !quiet {
                println!("Set {}", key);
            }
        }
        Some(Commands::Get { key }) => {
            let mut stash = open_stash(db.as_deref())?;
            match stash.get_item(&key, backend)? {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => return Err(anyhow::anyhow!("Key \"{}\" not found", key)),
            }
        }
        Some(Commands::Remove { key }) => {
            let mut stash = open_stash(db.as_deref())?;
            stash.remove_item(&key, backend)?;
            if !quiet {
                println!("Removed {}", key);
            }
        }
        Some(Commands::List) => {
            let stash = open_stash(db.as_deref())?;
            let count = stash.len(backend)?;
            for index in 0..count {
                if let Some(key) = stash.key_at(index, backend)? {
                    println!("{}", key);
                }
            }
        }
        Some(Commands::Len) => {
            let stash = open_stash(db.as_deref())?;
            println!("{}", stash.len(backend)?);
        }
        Some(Commands::Clear) => {
            let mut stash = open_stash(db.as_deref())?;
            stash.clear(backend)?;
            if !quiet {
                println!("Cleared all entries");
            }
        }
        Some(Commands::ClearExpired) => {
            let mut stash = open_stash(db.as_deref())?;
            stash.clear_expired(backend)?;
            if !quiet {
                println!("Cleared expired entries");
            }
        }
        Some(Commands::ClearNamespaced { namespace }) => {
            let mut stash = open_stash(db.as_deref())?;
            stash.clear_namespaced(&namespace, backend)?;
            if !quiet {
                println!("Cleared namespace {}", namespace);
            }
        }
        Some(Commands::Undo { key }) => {
            let mut stash = open_stash(db.as_deref())?;
            if !stash.config().undo_enabled {
                return Err(anyhow::anyhow!(
                    "Undo is disabled (set policy.undo_enabled in the config)"
                ));
            }
            // Without a captured slot, undo would restore absence and
            // delete the key. Undo slots live only for one process, so
            // this guard also rejects undo across invocations.
            if !stash.has_undo_slot(&key, backend) {
                return Err(anyhow::anyhow!(
                    "No undo value captured for \"{}\" in this process",
                    key
                ));
            }
            match stash.undo_item(&key, backend)? {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => println!("null"),
            }
        }
        None => {
            println!("Stash v{}", VERSION);
            println!("\nRun `stash --help` for usage information.");
        }
    }

    Ok(())
}

fn open_stash(db: Option<&str>) -> anyhow::Result<Stash> {
    let config_path = config::default_config_path()?;
    let mut cfg = if config_path.exists() {
        config::read_config(&config_path)?
    } else {
        CliConfig::new(config::default_store_path()?)
    };
    if let Some(db) = db {
        cfg.store.path = db.to_string();
    }

    let store_path = std::path::PathBuf::from(&cfg.store.path);
    if let Some(parent) = store_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!("Failed to create data directory {}: {}", parent.display(), e)
            })?;
        }
    }

    Ok(Stash::new(cfg.to_stash_config())?)
}

/// Values are JSON where they parse, plain strings where they do not,
/// so `stash set k 42` stores a number and `stash set k hello` a
/// string without quoting gymnastics.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
