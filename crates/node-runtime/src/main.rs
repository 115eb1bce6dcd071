//! # Quantum-Chain Callback Node
//!
//! Runs the address callbacks subsystem behind its registration API.
//!
//! ```text
//! HTTP clients ──→ api (axum) ──→ CallbackStore ─────────┐
//!      │                                                  ↓
//!      └─ /submit-transaction ──→ TxListener ──→ KeyValueStore
//!                                     │
//!                                     ↓
//!                                 Dispatcher ──→ merchant endpoints
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, `QC_CONFIG` file, `QC_*` env)
//! 2. Open storage and start subsystem tasks
//! 3. Start the registration API
//! 4. Wait for Ctrl+C, then shut everything down

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use node_runtime::api::{build_router, serve, AppState};
use node_runtime::container::{NodeConfig, SubsystemContainer};

/// Environment variable holding the log filter.
const LOG_LEVEL_ENV: &str = "QC_LOG_LEVEL";

/// The main node runtime.
pub struct NodeRuntime {
    /// Subsystem container with all initialized services.
    container: SubsystemContainer,
    /// Shutdown signal sender.
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
    /// API server task.
    api_task: Option<JoinHandle<()>>,
}

impl NodeRuntime {
    /// Create a new node runtime with configuration.
    pub fn new(config: NodeConfig) -> Result<Self> {
        info!("Creating Quantum-Chain node runtime");

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let container = SubsystemContainer::new(config, shutdown_rx.clone())
            .context("Failed to initialize subsystems")?;

        Ok(Self {
            container,
            shutdown_tx,
            shutdown_rx,
            api_task: None,
        })
    }

    /// Start the registration API.
    pub async fn start(&mut self) -> Result<()> {
        info!("===========================================");
        info!("  Quantum-Chain Callback Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let config = &self.container.config;
        let addr = config.api.socket_addr();
        let router = build_router(AppState::from_container(&self.container));
        let shutdown = self.shutdown_rx.clone();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind API address {}", addr))?;

        self.api_task = Some(tokio::spawn(async move {
            if let Err(e) = serve(listener, router, shutdown).await {
                error!(error = %e, "API server error");
            }
        }));

        info!("API Address: {}", addr);
        info!("Storage: {:?} at {:?}", config.storage.backend, config.storage.data_dir);
        info!("Callback Referer: {}", config.dispatch.referer);

        Ok(())
    }

    /// Shutdown the node gracefully.
    ///
    /// ## Shutdown Sequence
    ///
    /// 1. Signal shutdown to the API server and subsystem tasks
    /// 2. Wait for the API server to drain
    /// 3. Wait for the listener and reaper to exit
    pub async fn shutdown(self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        if let Some(task) = self.api_task {
            let _ = task.await;
        }
        self.container.callbacks.join().await;

        info!("Shutdown complete");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config = NodeConfig::load().context("Failed to load configuration")?;

    // Create and start the node runtime
    let mut runtime = NodeRuntime::new(config)?;
    runtime.start().await?;

    // Keep the node running
    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    // Graceful shutdown
    runtime.shutdown().await;

    Ok(())
}
