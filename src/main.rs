use std::path::Path;
use std::path::PathBuf;

use settingsd::config::Settings;
use settingsd::utils::file_io;
use settingsd::Error;
use settingsd::Result;
use settingsd::ServiceBuilder;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = Settings::load(None)?;

    // Initializing Logs
    let _guard = init_observability(&settings.service.log_dir)?;

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    // Build Service
    let service = ServiceBuilder::from_settings(settings, graceful_rx.clone())
        .build()?
        .ready()?;

    info!("Settings service started. Waiting for CTRL+C signal...");
    // Listen on Shutdown Signal
    tokio::spawn(async {
        if let Err(e) = graceful_shutdown(graceful_tx).await {
            error!("Failed to shutdown: {:?}", e);
        }
    });

    // Keep serving until the shutdown signal lands
    let mut shutdown = graceful_rx;
    let _ = shutdown.changed().await;
    service.set_ready(false);

    println!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    info!("Shutdown server..");
    let mut sigint = signal(SignalKind::interrupt()).map_err(Error::from)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(Error::from)?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        Error::Fatal(format!("Failed to send shutdown signal: {}", e))
    })?;

    info!("Shutdown completed");
    Ok(())
}

pub fn init_observability(log_dir: &PathBuf) -> Result<WorkerGuard> {
    let log_file = file_io::open_file_for_append(Path::new(log_dir).join("settingsd.log"))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
