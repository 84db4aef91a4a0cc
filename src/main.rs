use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use docqueue::config::{Config, QueueBackend};
use docqueue::queue::{MemoryQueue, QueueStore, RedisQueue, WorkDispatcher, WorkItem, WorkValue};
use docqueue::submissions::FileResultProcessor;
use docqueue::{create_router, utils, AppState};

#[derive(Parser)]
#[command(name = "docqueue", version, about = "Work queue front end for document workers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Push one work item onto the queue
    Enqueue {
        job_id: String,
        job_type: String,
        /// Job payload as JSON (strings, numbers and nested arrays)
        payload: String,
        /// Version stamped on the job; omitted entries get v0.1
        #[arg(long = "job-version")]
        job_version: Option<String>,
    },
    /// Print the number of pending entries
    Depth,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    let _log_guard = utils::init_logger(&config.logging);
    info!("Configuration loaded: {:?}", config.server);

    let store = connect_store(&config).await?;
    let dispatcher = WorkDispatcher::new(store.clone());

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, dispatcher).await,
        Command::Enqueue { job_id, job_type, payload, job_version } => {
            let payload: serde_json::Value =
                serde_json::from_str(&payload).context("payload must be valid JSON")?;
            let mut item = WorkItem::new(job_id, job_type, WorkValue::try_from(payload)?);
            if let Some(version) = job_version {
                item = item.with_version(version);
            }
            dispatcher.enqueue(&item).await?;
            println!("enqueued {}", docqueue::queue::codec::encode(&item));
            Ok(())
        }
        Command::Depth => {
            println!("{}", store.len().await?);
            Ok(())
        }
    }
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn QueueStore>> {
    let store: Arc<dyn QueueStore> = match config.queue.backend {
        QueueBackend::Redis => Arc::new(
            RedisQueue::connect(&config.queue.redis_url, config.queue.name.clone())
                .await
                .with_context(|| format!("failed to connect to {}", config.queue.redis_url))?,
        ),
        QueueBackend::Memory => {
            info!("Using in-memory queue; entries are lost on exit");
            Arc::new(MemoryQueue::new())
        }
    };
    Ok(store)
}

async fn serve(config: Config, dispatcher: WorkDispatcher) -> anyhow::Result<()> {
    let processor = Arc::new(FileResultProcessor::new(config.storage.results_dir.clone()));
    info!(results_dir = %processor.results_dir().display(), "Result processor ready");

    let state = AppState {
        config: config.clone(),
        dispatcher,
        processor,
    };
    let app = create_router(state);

    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("HOST '{}' is not an IP address", config.server.host))?;
    let addr = SocketAddr::new(host, config.server.port);
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
