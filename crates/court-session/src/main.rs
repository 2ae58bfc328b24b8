use anyhow::{Context, Result};
use clap::Parser;
use court_session::{execute, render, Command, Settings, SettingsOverrides, DEFAULT_LOG_FILTER};
use courtroom::{
    CourtEvent, CourtSession, EventBus, EventBusError, EventSubscriber, HttpMessageStore,
    MemoryMessageStore, SharedMessageStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML settings file (overrides COURTROOM_* environment variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Message store base URL
    #[arg(long)]
    store_url: Option<String>,

    /// Keep messages in memory; no store needed
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Compress every delay 60x (urgent 2 s, court 4 s)
    #[arg(long, default_value_t = false)]
    test_mode: bool,

    /// Seed for message arrivals
    #[arg(long)]
    seed: Option<u64>,

    /// Do not generate new messages
    #[arg(long, default_value_t = false)]
    no_arrivals: bool,

    /// Store request timeout in seconds
    #[arg(long)]
    request_timeout_secs: Option<u64>,
}

impl Args {
    /// Only flags the user actually passed override lower layers.
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            store_url: self.store_url.clone(),
            offline: self.offline.then_some(true),
            test_mode: self.test_mode.then_some(true),
            seed: self.seed,
            arrivals: self.no_arrivals.then_some(false),
            request_timeout_secs: self.request_timeout_secs,
        }
    }
}

fn spawn_renderer(mut events: EventSubscriber) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let ended = matches!(event, CourtEvent::SessionEnded { .. });
                    if let Some(line) = render::event(&event) {
                        println!("{line}");
                    }
                    if ended {
                        break;
                    }
                }
                Err(EventBusError::Lagged(skipped)) => {
                    warn!(skipped, "Display fell behind, some events were not shown");
                }
                Err(EventBusError::ChannelClosed) => break,
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut settings = Settings::from_env().context("Invalid COURTROOM_* environment")?;
    if let Some(path) = &args.config {
        let file = Settings::load_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        settings.merge(file);
    }
    settings.merge(args.overrides());

    let store: SharedMessageStore = if settings.offline {
        Arc::new(MemoryMessageStore::new())
    } else {
        Arc::new(
            HttpMessageStore::new(&settings.store_url, settings.request_timeout())
                .context("Failed to build store client")?,
        )
    };
    let store_label = if settings.offline {
        "memory"
    } else {
        settings.store_url.as_str()
    };
    info!(
        store = store_label,
        test_mode = settings.test_mode,
        seed = ?settings.seed,
        "Court Room starting"
    );

    let bus = EventBus::new().shared();
    let renderer = spawn_renderer(bus.subscribe());
    let session = CourtSession::start_on(store.clone(), settings.session_config(), bus)
        .context("Failed to start court session")?;
    println!("{}", court_session::commands::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let line = tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            line = lines.next_line() => line.context("Failed to read stdin")?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => match execute(&session, &store, command).await {
                Ok(output) => println!("{output}"),
                Err(e) => println!("error: {e}"),
            },
            Err(e) => println!("{e}"),
        }
    }

    let cancelled = session
        .shutdown()
        .await
        .context("Session stopped unexpectedly")?;
    info!(cancelled, "Goodbye");
    let _ = renderer.await;
    Ok(())
}
