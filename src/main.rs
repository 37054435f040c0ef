//! Agentbox - supervised tool providers for agent-submitted code.
//!
//! Hosts the Controller, Relay and hot-reload Watcher in one process; each
//! tool provider and each submission runs as its own OS process.

mod session;
mod telemetry;

use std::sync::Arc;

use agentbox_core::registry::StaticRegistry;
use agentbox_core::AppConfig;
use session::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::configure_tracing()?;

    tracing::info!("Starting Agentbox v{}", env!("CARGO_PKG_VERSION"));

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "no usable config files, falling back to defaults");
            AppConfig::default()
        }
    };

    // The registry collaborator: capability entries come resolved from the
    // configuration layer.
    let default_root = std::path::Path::new(&config.sandbox.dir).join("caps");
    let descriptors = config
        .capabilities
        .iter()
        .cloned()
        .map(|entry| entry.into_descriptor(&default_root))
        .collect::<Vec<_>>();
    let registry = Arc::new(StaticRegistry::new(descriptors));

    let session = Session::start(config, registry).await?;

    tracing::info!(
        relay_port = session.relay_port(),
        "relay ready at http://127.0.0.1:{}/call/<capability>",
        session.relay_port()
    );

    // One-shot mode: run a submission file, print the result, exit.
    if let Some(path) = std::env::args().nth(1) {
        let submission = tokio::fs::read_to_string(&path).await?;
        let result = session.execute(&submission).await;
        session.shutdown().await;

        let result = result?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    // Service mode: supervise providers until interrupted.
    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupt received, shutting down");
    session.shutdown().await;

    Ok(())
}
