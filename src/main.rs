//! i3-autorename - name i3 workspaces after the applications open on them.
//!
//! Listens for window events over i3's IPC socket and renames every
//! workspace to its number followed by one icon per window. Icons are looked
//! up by window class in a small SQLite database, which can be edited with
//! the admin subcommands and reloaded at runtime with SIGUSR1.

mod config;
mod icons;
mod ipc;
mod label;
mod reconcile;
mod store;
mod tree;

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use signal_hook::consts::SIGUSR1;
use signal_hook::iterator::Signals;

use config::Config;
use icons::{IconMap, IconResolver};
use ipc::IpcConnection;
use reconcile::{Message, Reconciler};
use store::IconStore;

/// i3-autorename - Keep i3 workspace names in sync with their windows
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ~/.config/i3-autorename/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Icon database (default: ~/.config/i3-autorename/i3-autorename.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// i3 socket path (default: $I3SOCK or `i3 --get-socketpath`)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rename workspaces as windows come and go (default)
    ///
    /// Exits when i3 closes the connection, which includes an in-place
    /// `i3 restart`. Start it with `exec_always` in the i3 config so it
    /// comes back after every restart.
    Run,

    /// Map a window class straight to an icon
    Insert {
        /// Window class, matched case-insensitively
        #[arg(long)]
        class: String,
        /// Icon shown for the class
        #[arg(long)]
        icon: String,
    },

    /// Map a window class to an application type
    AddClass {
        /// Window class, matched case-insensitively
        #[arg(long)]
        class: String,
        /// Application type (e.g. "browser")
        #[arg(long = "type")]
        window_type: String,
    },

    /// Map an application type to an icon
    AddType {
        /// Application type (e.g. "browser")
        #[arg(long = "type")]
        window_type: String,
        /// Icon shown for every class of this type
        #[arg(long)]
        icon: String,
    },

    /// Print the effective class -> icon mapping
    List,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path.clone()),
        None => Config::load(),
    };
    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&config, &db_path, cli.socket),
        Commands::Insert { class, icon } => {
            let mut store = open_store(&db_path)?;
            store
                .insert_class_icon(&class, &icon)
                .context("Error inserting Class/Icon pair")?;
            println!("{} -> {}", class, icon);
            print_reload_hint();
            Ok(())
        }
        Commands::AddClass { class, window_type } => {
            let store = open_store(&db_path)?;
            store
                .insert_class_type(&class, &window_type)
                .context("Error inserting Class/Type pair")?;
            println!("{} -> type {}", class, window_type);
            print_reload_hint();
            Ok(())
        }
        Commands::AddType { window_type, icon } => {
            let store = open_store(&db_path)?;
            store
                .insert_type_icon(&window_type, &icon)
                .context("Error inserting Type/Icon pair")?;
            println!("type {} -> {}", window_type, icon);
            print_reload_hint();
            Ok(())
        }
        Commands::List => {
            let store = open_store(&db_path)?;
            let map = IconMap::from_pairs(store.all_icons().context("Error reading icons")?);
            if map.is_empty() {
                eprintln!("No icons in {:?}", store.path());
            }
            for (class, icon) in map.sorted() {
                println!("{}\t{}", class, icon);
            }
            Ok(())
        }
    }
}

fn open_store(path: &Path) -> Result<IconStore> {
    IconStore::open(path).with_context(|| format!("Could not open icon database {:?}", path))
}

fn print_reload_hint() {
    println!("Send SIGUSR1 to a running i3-autorename to apply: pkill -USR1 i3-autorename");
}

/// Connect to i3 and rename workspaces until the connection goes away
fn run(config: &Config, db_path: &Path, socket: Option<PathBuf>) -> Result<()> {
    log::info!("Starting i3-autorename");

    let store = open_store(db_path)?;
    let icons = IconResolver::load(&store).context("Could not read window icons")?;

    let socket = match socket.or_else(|| config.socket_path()) {
        Some(path) => path,
        None => ipc::socket_path().context("Could not locate the i3 IPC socket")?,
    };
    log::info!("Using i3 socket {:?}", socket);

    let commands = IpcConnection::connect(&socket)
        .with_context(|| format!("Failed to connect to i3 at {:?}", socket))?;
    let mut events = IpcConnection::connect(&socket)
        .with_context(|| format!("Failed to connect to i3 at {:?}", socket))?;
    if !events
        .subscribe(&["window"])
        .context("Could not subscribe to i3 window events")?
    {
        anyhow::bail!("i3 rejected the window event subscription");
    }

    let (tx, rx) = mpsc::channel();
    spawn_event_reader(events, tx.clone())?;
    spawn_reload_listener(tx)?;

    let mut reconciler = Reconciler::new(commands, icons, store, config.label_style());
    reconciler.run(rx).context("i3 event stream closed")?;

    log::info!("Exiting i3-autorename");
    Ok(())
}

/// Forward window events to the loop; report the error that ends the stream
fn spawn_event_reader(mut events: IpcConnection, tx: Sender<Message>) -> Result<()> {
    thread::Builder::new()
        .name("i3-events".to_string())
        .spawn(move || loop {
            match events.next_event() {
                Ok(event) => {
                    if tx.send(Message::Window(event)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Message::Disconnected(e));
                    break;
                }
            }
        })
        .context("Failed to spawn event reader")?;
    Ok(())
}

/// Turn every SIGUSR1 into a reload request
fn spawn_reload_listener(tx: Sender<Message>) -> Result<()> {
    let mut signals = Signals::new([SIGUSR1]).context("Failed to register SIGUSR1 handler")?;
    thread::Builder::new()
        .name("reload-signal".to_string())
        .spawn(move || {
            for _ in signals.forever() {
                log::info!("SIGUSR1 received, reloading icons");
                if tx.send(Message::Reload).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn signal listener")?;
    Ok(())
}
