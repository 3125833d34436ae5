//! Caster Server - headless service casting broker-requested streams.
//!
//! Consumes play/stop commands from RabbitMQ, executes them against
//! Chromecasts discovered over mDNS, and publishes renderer Found/Lost
//! notifications back to the broker.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use caster_core::{
    bootstrap_services, AmqpTransport, CastingBackend, MdnsCastBackend, Publisher, TokioSpawner,
};
use clap::Parser;
use tokio::signal;

use crate::config::ServerConfig;

/// Caster Server - broker-driven casting to network renderers.
#[derive(Parser, Debug)]
#[command(name = "caster-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML or JSON).
    #[arg(short, long, value_name = "FILE", env = "CASTER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "CASTER_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Broker URL (overrides config file).
    #[arg(short = 'r', long)]
    rabbit_url: Option<String>,

    /// Number of consumer workers (overrides config file).
    #[arg(short = 'n', long)]
    consumers: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Caster Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(url) = args.rabbit_url {
        config.rabbit_url = url;
    }
    if let Some(consumers) = args.consumers {
        config.consumer_count = consumers;
    }

    log::info!(
        "Configuration: exchange={}, queue={}, routing_key={}, consumers={}",
        config.exchange_name,
        config.queue_name,
        config.routing_key,
        config.consumer_count
    );

    let core_config = config.to_core_config();
    let spawner = TokioSpawner::current();

    let backend: Arc<dyn CastingBackend> = Arc::new(
        MdnsCastBackend::new(config.player_config(), spawner.clone())
            .context("Failed to start the casting backend")?,
    );

    let transport = AmqpTransport::connect(config.amqp_settings())
        .await
        .context("Failed to connect to the broker")?;
    let publisher: Arc<dyn Publisher> = Arc::new(transport.publisher());

    let services = bootstrap_services(&core_config, backend, publisher, spawner)
        .context("Failed to bootstrap services")?;

    services
        .start_background_tasks()
        .context("Failed to start background tasks")?;

    let inbound = transport
        .consume(services.consumer_pool.prefetch_count())
        .await
        .context("Failed to start consuming")?;
    let mut consumers = services.spawn_consumers(Box::new(inbound));

    log::info!("Caster running, waiting for commands");

    // Run until a shutdown signal, a fatal transport error, or a background
    // failure that cancelled the services
    let finished = tokio::select! {
        joined = &mut consumers => Some(joined),
        () = shutdown_signal() => None,
    };
    let pool_result = match finished {
        Some(joined) => joined,
        None => {
            log::info!("Shutdown signal received, cleaning up...");
            services.cancel();
            consumers.await
        }
    };

    // Graceful shutdown: drain services while the broker is still reachable
    services.shutdown().await;
    transport.close().await;

    let pool_result = pool_result.context("Consumer pool task failed")?;
    pool_result.context("Consumer pool stopped")?;
    if let Some(failure) = services.take_failure() {
        return Err(failure).context("Background service failed");
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
