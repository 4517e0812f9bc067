/// Patrol Agent - offline patrol scan queue and sync daemon
use clap::{Parser, Subcommand};
use patrol_agent::{device, AgentConfig};
use patrol_core::{CheckpointPayload, QueueId, QueueItem, ReachabilityProbe, ScanLogPayload};
use patrol_server_client::{HttpReachability, PatrolApiClient};
use patrol_storage::EventStore;
use patrol_sync::{
    AppLifecycle, CaptureApi, NetworkMonitor, SyncConfig, SyncEngine, SyncOutcome, SyncScheduler,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "patrol-agent")]
#[command(about = "Offline patrol checkpoint queue and sync agent", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./patrol.toml if present)
    #[arg(short, long, global = true, env = "PATROL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a scanned checkpoint
    Checkpoint {
        #[arg(long)]
        patrol: String,
        #[arg(long)]
        zone: String,
        #[arg(long)]
        checkpoint: String,
        /// NFC tag UID
        #[arg(long)]
        tag: String,
    },
    /// Record a patrol log entry
    Log {
        #[arg(long)]
        patrol: String,
        #[arg(long)]
        tag: String,
        #[arg(long)]
        zone: Option<String>,
        /// Event code, e.g. door_open
        #[arg(long)]
        event: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Show pending and dead-lettered items
    Status,
    /// Deliver pending items once
    Sync,
    /// Run the sync scheduler until Ctrl-C
    Run,
    /// Inspect or act on dead-lettered items
    DeadLetters {
        #[command(subcommand)]
        action: DeadLetterAction,
    },
}

#[derive(Subcommand)]
enum DeadLetterAction {
    /// List quarantined items
    List,
    /// Put an item back into the delivery queue
    Requeue { id: QueueId },
    /// Delete an item for good
    Purge { id: QueueId },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "patrol_agent=info,patrol_sync=info,patrol_storage=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AgentConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Checkpoint {
            patrol,
            zone,
            checkpoint,
            tag,
        } => {
            let payload = CheckpointPayload::new(patrol, zone, checkpoint, tag);
            save_checkpoint(&config, payload).await?;
        }
        Commands::Log {
            patrol,
            tag,
            zone,
            event,
            note,
        } => {
            let mut payload = ScanLogPayload::new(patrol, tag, event);
            if let Some(zone) = zone {
                payload = payload.with_zone(zone);
            }
            if let Some(note) = note {
                payload = payload.with_note(note);
            }
            save_log(&config, payload).await?;
        }
        Commands::Status => {
            show_status(&config).await?;
        }
        Commands::Sync => {
            sync_once(&config).await?;
        }
        Commands::Run => {
            run(&config).await?;
        }
        Commands::DeadLetters { action } => {
            dead_letters(&config, action).await?;
        }
    }

    Ok(())
}

async fn open_store(config: &AgentConfig) -> anyhow::Result<Arc<EventStore>> {
    let store = EventStore::open(&config.storage.database_url).await?;
    Ok(Arc::new(store))
}

async fn save_checkpoint(config: &AgentConfig, payload: CheckpointPayload) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let receipt = CaptureApi::new(store.clone()).save_checkpoint(payload).await?;

    println!("Checkpoint saved as queue item {}", receipt.queue_id);
    store.close().await;
    Ok(())
}

async fn save_log(config: &AgentConfig, payload: ScanLogPayload) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let receipt = CaptureApi::new(store.clone()).save_log(payload).await?;

    println!("Log entry saved as queue item {}", receipt.queue_id);
    store.close().await;
    Ok(())
}

async fn show_status(config: &AgentConfig) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let pending = store.list().await?;
    let dead_lettered = store.dead_letter_count().await?;

    println!("Pending: {}", store.count());
    println!("Dead-lettered: {dead_lettered}");
    for item in &pending {
        print_item(item);
    }

    store.close().await;
    Ok(())
}

/// Wire store, HTTP client, probe and scheduler together
struct SyncStack {
    store: Arc<EventStore>,
    monitor: NetworkMonitor,
    probe: Arc<HttpReachability>,
    scheduler: SyncScheduler,
}

async fn build_sync_stack(config: &AgentConfig, sync_config: SyncConfig) -> anyhow::Result<SyncStack> {
    let server = config.require_server()?;
    let store = open_store(config).await?;

    let device_id = device::resolve_device_id(&store, server.device_id.as_deref()).await?;
    let remote = Arc::new(PatrolApiClient::new(server.client_config(device_id))?);
    let probe = Arc::new(HttpReachability::new(&server.base_url, server.probe_timeout())?);

    // Seed with a fresh probe so starting up is not mistaken for a reconnect
    let monitor = NetworkMonitor::new(probe.probe().await);
    let engine = SyncEngine::new(store.clone(), remote, monitor.clone(), &sync_config);
    let scheduler = SyncScheduler::start(engine, &AppLifecycle::new(), sync_config);

    Ok(SyncStack {
        store,
        monitor,
        probe,
        scheduler,
    })
}

async fn sync_once(config: &AgentConfig) -> anyhow::Result<()> {
    let sync_config = SyncConfig {
        sync_on_start: false,
        ..config.sync.clone()
    };
    let stack = build_sync_stack(config, sync_config).await?;

    if !stack.monitor.is_online() {
        tracing::warn!(base_url = %config.server.base_url, "Server not reachable");
    }

    let outcome = stack.scheduler.sync().await;
    stack.scheduler.shutdown().await;
    stack.store.close().await;

    match outcome? {
        SyncOutcome::Completed(report) if report.offline => {
            println!("Offline: {} item(s) still pending", report.remaining);
        }
        SyncOutcome::Completed(report) => {
            println!(
                "Synced {}, failed {} ({} dead-lettered), {} remaining",
                report.synced, report.failed, report.dead_lettered, report.remaining
            );
        }
        SyncOutcome::Busy => println!("A sync is already running"),
    }

    Ok(())
}

async fn run(config: &AgentConfig) -> anyhow::Result<()> {
    let server = config.require_server()?;
    let stack = build_sync_stack(config, config.sync.clone()).await?;
    let probe = stack.monitor.spawn_probe(stack.probe.clone(), server.probe_interval());

    tracing::info!(
        base_url = %server.base_url,
        pending = stack.store.count(),
        "Patrol agent running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    probe.stop().await;
    stack.scheduler.shutdown().await;
    stack.store.close().await;
    Ok(())
}

async fn dead_letters(config: &AgentConfig, action: DeadLetterAction) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    match action {
        DeadLetterAction::List => {
            let items = store.dead_letters().await?;
            println!("Dead-lettered items: {}", items.len());
            for item in &items {
                print_item(item);
            }
        }
        DeadLetterAction::Requeue { id } => {
            store.requeue(id).await?;
            println!("Requeued item {id}");
        }
        DeadLetterAction::Purge { id } => {
            if store.purge(id).await? {
                println!("Purged item {id}");
            } else {
                println!("No item {id}");
            }
        }
    }

    store.close().await;
    Ok(())
}

fn print_item(item: &QueueItem) {
    println!(
        "  #{:<6} {:<10} {}  attempts={}{}",
        item.id,
        item.kind,
        item.created_at.format("%Y-%m-%d %H:%M:%S"),
        item.attempts,
        item.last_error
            .as_deref()
            .map(|e| format!("  last_error={e}"))
            .unwrap_or_default()
    );
}
