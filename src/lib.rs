//! Shared Logger - process-wide structured logging facade
//!
//! This crate provides one shared logger configuration for a host process:
//! output sink, text/JSON format, minimum level and accumulated context
//! fields. Every record carries `pid` and `hostname` plus whatever context the
//! host has added.
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `logging` - Shared logger state, derived entries, formatting, sinks,
//!   request-context binding and the `log` crate bridge
//! - `config` - Logger configuration from the environment or JSON
//! - `error` - Error type for strict parsing and setup
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use shared_logger::{MemorySink, RequestContext, SharedLogger};
//!
//! let memory = MemorySink::new();
//! let logger = Arc::new(SharedLogger::with_sink(memory.clone()));
//! logger.set_formatter("json");
//! logger.add_context("service", "gateway");
//!
//! let ctx = RequestContext::new_request();
//! logger.for_context(&ctx).info("request accepted");
//!
//! let record = memory.last_json().unwrap();
//! assert_eq!(record["service"], "gateway");
//! assert!(record["request_id"].is_string());
//! ```

pub mod config;
pub mod error;
pub mod logging;

pub use config::LoggerConfig;
pub use error::{LoggerError, Result};
pub use logging::global::{
    add_context, debug, debugf, error, errorf, fatal, fatalf, for_context, get_logger,
    get_loglevel, global, info, infof, install_log_bridge, set_formatter, set_level, set_output,
    warn, warningf, with_field, with_fields,
};
pub use logging::{
    ContextCarrier, Entry, Fields, Formatter, Level, LogBridge, MemorySink, RequestContext,
    SharedLogger, Sink, REQUEST_ID_KEY,
};
