pub mod duration;
pub mod error;
pub mod settings;

use std::env;
use std::path::PathBuf;

use dotenv::dotenv;
use tracing::{debug, info, warn};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, fmt, fmt::MakeWriter, layer::SubscriberExt};

use crate::config::error::Result;
pub use crate::config::settings::{ConsumeSettings, Configuration, QueueSettings, SendSettings};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
const DEFAULT_LOG_FILTER: &str = "info,lapin=warn";

/// Load the process environment, install logging and read the configuration.
pub fn init() -> Result<Configuration> {
    dotenv().ok();

    init_logging()?;
    info!("Starting rabbit_listen");

    let path = config_path();
    debug!("Config path resolved to {}", path.display());

    Ok(Configuration::load_or_default(path))
}

/// `CONFIG_PATH` from the environment, or `config.json` in the working directory.
pub fn config_path() -> PathBuf {
    env::var_os("CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn init_logging() -> Result<()> {
    init_logging_with(std::io::stdout)
}

/// Install the global subscriber, writing formatted events to `writer`.
pub fn init_logging_with<W>(writer: W) -> Result<()>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let log_tracer = LogTracer::init();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(writer)),
    )?;

    if let Err(e) = log_tracer {
        warn!("failure to bridge log records into tracing: {}", e);
    }

    Ok(())
}
