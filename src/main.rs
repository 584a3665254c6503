//! NEURO-CASIO - Entry Point
//!
//! Sets up logging, configuration, the shared kernel context and the async
//! runtime for inference calls, then runs one interactive shell session on
//! stdin until the user exits or input ends.

use clap::Parser;
use neuro_casio::core::error::Result;
use neuro_casio::core::types::PathKey;
use neuro_casio::core::KernelConfig;
use neuro_casio::fs::{FlatStore, MemoryStore};
use neuro_casio::kernel::{AccountBook, Control, KernelContext, Session};
use neuro_casio::llm::{InferenceService, IntentBridge, LlmClient};
use neuro_casio::syscall::Syscall;
use neuro_casio::ui::ConsolePresenter;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

/// NEURO-CASIO shell - type commands or plain language
#[derive(Parser, Debug)]
#[command(name = "neuro-casio")]
#[command(about = "Intent-driven shell over a path-indexed flat store")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Snapshot file for the store (overrides [store] path)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Run without an inference service
    #[arg(long)]
    offline: bool,

    /// Inference timeout in milliseconds (overrides [inference] timeout_ms)
    #[arg(long)]
    timeout_ms: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("neuro_casio=info")),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => KernelConfig::load(path)?,
        None => KernelConfig::new(),
    };
    config.apply_env();
    if let Some(path) = args.store {
        config.store.path = Some(path);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.inference.timeout_ms = timeout_ms;
    }
    config.validate()?;

    let store: Arc<dyn FlatStore> = match &config.store.path {
        Some(path) => Arc::new(MemoryStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    };
    tracing::info!(entries = store.len(), persistent = config.store.path.is_some(), "Store mounted");

    // Inference is optional - the shell grammar works without it
    let client = if args.offline {
        None
    } else {
        match LlmClient::from_config(&config.inference) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!("{} - running without natural language input", e);
                None
            }
        }
    };

    let accounts = match &config.auth.path {
        Some(path) => AccountBook::open(path)?,
        None => AccountBook::new(),
    };

    let mut kernel = KernelContext::new(store).with_accounts(accounts);
    if let Some(client) = &client {
        kernel = kernel.with_model(client.model());
    }
    let online = client.is_some();
    let bridge = client.map(|c| IntentBridge::new(c, config.inference.timeout()));

    let rt = Runtime::new()?;
    let home = PathKey::parse(&config.session.home)?;
    let mut session = Session::open(kernel, home, bridge, Box::new(ConsolePresenter::stdout()));

    print_banner(online);
    if !session.kernel().accounts.has_users() {
        println!("No accounts yet - create one with: register <user> <password>\n");
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}", session.prompt());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line?;

        if rt.block_on(session.submit(&line)) == Control::Shutdown {
            break;
        }
    }

    session.close();
    println!("NEURO-CASIO halted.");
    Ok(())
}

fn print_banner(online: bool) {
    println!("\n=== NEURO-CASIO OS ===");
    println!("Commands:");
    for (_, usage) in neuro_casio::command::COMMANDS {
        println!("  {}", usage);
    }
    if online {
        println!("  <any text>      - Natural language request (resolved by the model)");
        let names: Vec<&str> = Syscall::ALL.iter().map(|s| s.as_str()).collect();
        println!("  Known actions: {}", names.join(", "));
    } else {
        println!("  (offline - natural language input is unavailable)");
    }
    println!();
}
