//! Adapter from the `log` crate facade.
//!
//! Once installed, `log::info!` and friends from any crate in the process are
//! written through the shared logger's current sink, formatter, level and
//! fields. Level filtering stays on the shared logger so `set_level` keeps
//! working after install.

use std::sync::Arc;

use crate::error::{LoggerError, Result};

use super::level::Level;
use super::logger::{SharedLogger, INTERNAL_TARGET};

/// `log::Log` implementation backed by a [`SharedLogger`].
#[derive(Debug, Clone)]
pub struct LogBridge {
    logger: Arc<SharedLogger>,
}

impl LogBridge {
    pub fn new(logger: Arc<SharedLogger>) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Arc<SharedLogger> {
        &self.logger
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        // the facade's own diagnostics would re-enter it
        metadata.target() != INTERNAL_TARGET
            && self.logger.is_enabled(Level::from(metadata.level()))
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.logger
            .get_logger()
            .logf(Level::from(record.level()), *record.args());
    }

    fn flush(&self) {
        self.logger.snapshot().sink.flush();
    }
}

/// Install `logger` as the process-wide `log` backend.
///
/// Fails if another `log` backend is already installed.
pub fn install(logger: Arc<SharedLogger>) -> Result<()> {
    log::set_boxed_logger(Box::new(LogBridge::new(logger)))
        .map_err(|e| LoggerError::BridgeInstall(e.to_string()))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
