use anyhow::Result;
use clap::Parser;
use claude_monitor::cli::{self, Cli};
use claude_monitor::poll::Poller;
use claude_monitor::profiles::ProfileStore;
use claude_monitor::{logging, monitor, paths};
use tracing::{info, warn};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = paths::log_file().and_then(|path| logging::init(&path)) {
        eprintln!("[claude-monitor] Warning: logging disabled: {:#}", e);
    }
    info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let store = ProfileStore::open_default()?;
    if let Err(e) = store.ensure_exists() {
        warn!(error = %e, "could not write default config");
    }
    let poller = Poller::system();

    match cli.command {
        None => monitor::run(store, poller),
        Some(command) => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            cli::execute(command, &store, &poller, &mut out)
        }
    }
}
