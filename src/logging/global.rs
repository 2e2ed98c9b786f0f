//! Process-wide default logger.
//!
//! Hosts that prefer an explicitly passed [`SharedLogger`] can ignore this
//! module. The free functions here all operate on one lazily created
//! instance that lives for the rest of the process.

use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use serde::Serialize;

use crate::error::Result;

use super::context::ContextCarrier;
use super::fields::Fields;
use super::logger::{Entry, SharedLogger};
use super::sink::Sink;

lazy_static! {
    static ref GLOBAL_LOGGER: Arc<SharedLogger> = Arc::new(SharedLogger::new());
}

/// The process-wide shared logger.
pub fn global() -> Arc<SharedLogger> {
    GLOBAL_LOGGER.clone()
}

/// Route the `log` crate macros through the process-wide logger.
pub fn install_log_bridge() -> Result<()> {
    super::bridge::install(global())
}

pub fn get_logger() -> Entry {
    GLOBAL_LOGGER.get_logger()
}

pub fn add_context<K: Into<String>, V: Serialize>(key: K, value: V) {
    GLOBAL_LOGGER.add_context(key, value)
}

pub fn set_formatter(name: &str) {
    GLOBAL_LOGGER.set_formatter(name)
}

pub fn set_output(sink: impl Into<Sink>) {
    GLOBAL_LOGGER.set_output(sink)
}

pub fn set_level(name: &str) {
    GLOBAL_LOGGER.set_level(name)
}

pub fn get_loglevel() -> &'static str {
    GLOBAL_LOGGER.get_loglevel()
}

pub fn with_field<K: Into<String>, V: Serialize>(key: K, value: V) -> Entry {
    GLOBAL_LOGGER.with_field(key, value)
}

pub fn with_fields(fields: Fields) -> Entry {
    GLOBAL_LOGGER.with_fields(fields)
}

pub fn for_context<C: ContextCarrier + ?Sized>(ctx: &C) -> Entry {
    GLOBAL_LOGGER.for_context(ctx)
}

pub fn debug(msg: impl fmt::Display) {
    GLOBAL_LOGGER.debug(msg)
}

pub fn info(msg: impl fmt::Display) {
    GLOBAL_LOGGER.info(msg)
}

pub fn warn(msg: impl fmt::Display) {
    GLOBAL_LOGGER.warn(msg)
}

pub fn error(msg: impl fmt::Display) {
    GLOBAL_LOGGER.error(msg)
}

pub fn fatal(msg: impl fmt::Display) -> ! {
    GLOBAL_LOGGER.fatal(msg)
}

pub fn debugf(args: fmt::Arguments<'_>) {
    GLOBAL_LOGGER.debugf(args)
}

pub fn infof(args: fmt::Arguments<'_>) {
    GLOBAL_LOGGER.infof(args)
}

pub fn warningf(args: fmt::Arguments<'_>) {
    GLOBAL_LOGGER.warningf(args)
}

pub fn errorf(args: fmt::Arguments<'_>) {
    GLOBAL_LOGGER.errorf(args)
}

pub fn fatalf(args: fmt::Arguments<'_>) -> ! {
    GLOBAL_LOGGER.fatalf(args)
}

/// Emit a formatted `debug` record.
///
/// `debugf!("Msg: {}", x)` writes through the process-wide logger;
/// `debugf!(logger: l, "Msg: {}", x)` writes through any `SharedLogger` or
/// `Entry`.
#[macro_export]
macro_rules! debugf {
    (logger: $logger:expr, $($arg:tt)+) => {
        $logger.debugf(format_args!($($arg)+))
    };
    ($($arg:tt)+) => {
        $crate::logging::global::debugf(format_args!($($arg)+))
    };
}

/// Emit a formatted `info` record. See [`debugf!`] for the call forms.
#[macro_export]
macro_rules! infof {
    (logger: $logger:expr, $($arg:tt)+) => {
        $logger.infof(format_args!($($arg)+))
    };
    ($($arg:tt)+) => {
        $crate::logging::global::infof(format_args!($($arg)+))
    };
}

/// Emit a formatted `warning` record. See [`debugf!`] for the call forms.
#[macro_export]
macro_rules! warningf {
    (logger: $logger:expr, $($arg:tt)+) => {
        $logger.warningf(format_args!($($arg)+))
    };
    ($($arg:tt)+) => {
        $crate::logging::global::warningf(format_args!($($arg)+))
    };
}

/// Emit a formatted `error` record. See [`debugf!`] for the call forms.
#[macro_export]
macro_rules! errorf {
    (logger: $logger:expr, $($arg:tt)+) => {
        $logger.errorf(format_args!($($arg)+))
    };
    ($($arg:tt)+) => {
        $crate::logging::global::errorf(format_args!($($arg)+))
    };
}

/// Emit a formatted `fatal` record and terminate the process.
#[macro_export]
macro_rules! fatalf {
    (logger: $logger:expr, $($arg:tt)+) => {
        $logger.fatalf(format_args!($($arg)+))
    };
    ($($arg:tt)+) => {
        $crate::logging::global::fatalf(format_args!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::logging::context::RequestContext;
    use crate::logging::sink::MemorySink;

    lazy_static! {
        // the global instance is process state shared by every test in this module
        static ref SERIAL: Mutex<()> = Mutex::new(());
    }

    fn capture() -> MemorySink {
        let memory = MemorySink::new();
        set_output(memory.clone());
        set_formatter("json");
        set_level("info");
        memory
    }

    #[test]
    fn test_global_round_trip() {
        let _guard = SERIAL.lock();
        let memory = capture();

        add_context("global_test", "stuff");
        info("test");

        let record = memory.last_json().unwrap();
        assert_eq!(record["msg"], "test");
        assert_eq!(record["global_test"], "stuff");
        assert!(get_logger().fields().contains_key("hostname"));
    }

    #[test]
    fn test_global_macros() {
        let _guard = SERIAL.lock();
        let memory = capture();

        set_level("debug");
        crate::errorf!("Msg: {}", "test");
        let record = memory.last_json().unwrap();
        assert_eq!(record["level"], "error");
        assert_eq!(record["msg"], "Msg: test");

        crate::debugf!("Msg: {}", "test");
        assert_eq!(memory.last_json().unwrap()["level"], "debug");

        let entry = with_field("scoped", 1);
        crate::warningf!(logger: entry, "Msg: {}", "test");
        let record = memory.last_json().unwrap();
        assert_eq!(record["level"], "warning");
        assert_eq!(record["scoped"], 1);

        set_level("info");
    }

    #[test]
    fn test_global_unknown_level() {
        let _guard = SERIAL.lock();
        capture();

        set_level("abcd");
        assert_eq!(get_loglevel(), "info");
    }

    #[test]
    fn test_global_for_context_and_with_fields() {
        let _guard = SERIAL.lock();
        let memory = capture();

        let ctx = RequestContext::background().with_request_id("abc");
        for_context(&ctx).info("test stuff");
        assert_eq!(memory.last_json().unwrap()["request_id"], "abc");

        with_fields(crate::fields! { "test" => "ok" }).info("fields");
        assert_eq!(memory.last_json().unwrap()["test"], "ok");

        info("plain");
        let record = memory.last_json().unwrap();
        assert!(record.get("request_id").is_none());
        assert!(record.get("test").is_none());
    }
}
