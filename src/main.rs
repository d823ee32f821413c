use rabbit_listen::config;
use rabbit_listen::error::Result;
use rabbit_listen::rabbitmq::RabbitMQConsumer;
use rustls::crypto::{CryptoProvider, ring::default_provider};
use std::process::ExitCode;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    _ = CryptoProvider::install_default(default_provider());

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Logging may not be installed if config::init itself failed.
            if tracing::dispatcher::has_been_set() {
                error!("{}", e);
            } else {
                eprintln!("{}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cfg = config::init()?;
    info!(
        "Starting RabbitMQ consumer for {} (queue {:?})",
        cfg.redacted_server_url(),
        cfg.queue.queue_name
    );

    let mut consumer = RabbitMQConsumer::new(cfg);
    consumer.init().await?;

    let handle = consumer.start_consuming().await?;

    // If the broker drops the delivery stream the background task ends,
    // but we keep waiting for a signal.
    info!(" [*] Waiting for messages. To exit press CTRL+C");
    shutdown_signal().await;
    info!("Shutdown signal received. Closing consumer...");

    if let Err(e) = consumer.close().await {
        warn!("{:#}", e);
    }
    handle.abort();

    info!("Consumer stopped. Goodbye!");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
