use clap::Parser;
use lancer::{Config, server, telemetry};

/// Resolves on the first of Ctrl+C or SIGTERM, which stops the webhook receiver.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("Ctrl+C handler must install before serving webhooks");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler must install before serving webhooks")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = ctrl_c => "Ctrl+C",
        _ = terminate => "SIGTERM",
    };
    tracing::info!(signal = received, "Stopping webhook receiver; draining in-flight deliveries");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = lancer::config::Args::parse();

    // Load and validate configuration (YAML file, then LANCER_* and WEBHOOK_SECRET env vars)
    let config = Config::load(&args)?;

    // With --validate, stop once the configuration checks out
    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    // Initialize tracing (RUST_LOG, default info)
    telemetry::init_telemetry()?;

    tracing::debug!("{:?}", args);

    // Serve the receiver until SIGTERM or Ctrl+C
    server::serve(config, shutdown_signal()).await
}
