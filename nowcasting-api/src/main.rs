use clap::Parser;
use nowcasting_api::{Application, Config, config::Args, telemetry};
use tokio::signal;
use tracing::{info, warn};

async fn interrupted() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminated() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Cannot listen for SIGTERM: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminated() {
    std::future::pending::<()>().await;
}

/// Resolves on Ctrl+C or SIGTERM, whichever arrives first.
async fn shutdown_signal() {
    let reason = tokio::select! {
        () = interrupted() => "Ctrl+C",
        () = terminated() => "SIGTERM",
    };
    info!("Received {reason}, draining open requests");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("{} is valid.", args.config);
        return Ok(());
    }

    // The OTLP exporter and the database driver both build TLS clients
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("A rustls crypto provider was already installed"))?;

    telemetry::init_telemetry(&config.log_level, config.enable_otel_export)?;
    info!(api_prefix = %config.api_prefix, route_groups = ?config.route_groups, "Starting nowcasting API");

    Application::new(config).await?.serve(shutdown_signal()).await
}
