use std::io;

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;
use crate::types::{IntelError, Result};

static INIT: OnceCell<()> = OnceCell::new();

/// `RUST_LOG` wins over the configured level. Safe to call more than once.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let console_layer = fmt::layer()
            .with_writer(io::stderr)
            .with_target(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .try_init()
            .map_err(|e| IntelError::Config(format!("tracing init failed: {}", e)))?;

        tracing::debug!(level = %config.level, "tracing initialized");
        Ok::<(), IntelError>(())
    })?;
    Ok(())
}
