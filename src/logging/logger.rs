//! Shared logger state and derived entries.
//!
//! `SharedLogger` owns one immutable [`Snapshot`] of the logger configuration
//! (sink, formatter, level, fields) behind a read-write lock. Mutators build
//! the next snapshot from the current one and install it while holding the
//! write lock for the whole step, so concurrent `add_context` and `set_*`
//! calls never lose each other's updates. Emitters clone the current
//! snapshot under the read lock and format outside of it.
//!
//! `Entry` is the handle records are emitted through. It carries its own
//! snapshot and never refers back to the `SharedLogger` it came from.

use std::fmt;
use std::process;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use super::fields::{field_value, merge_fields, Fields};
use super::format::{Formatter, Record};
use super::level::Level;
use super::sink::Sink;

/// Target used for the facade's own diagnostics. The `log` bridge drops it.
pub const INTERNAL_TARGET: &str = "shared_logger";

pub const PID_KEY: &str = "pid";
pub const HOSTNAME_KEY: &str = "hostname";

type ExitHandler = Arc<dyn Fn() + Send + Sync>;

/// Handlers run by `fatal` before the process exits, in registration order.
#[derive(Clone, Default)]
pub struct ExitHandlers {
    handlers: Arc<Mutex<Vec<ExitHandler>>>,
}

impl ExitHandlers {
    fn register(&self, handler: ExitHandler) {
        self.handlers.lock().push(handler);
    }

    /// A panicking handler does not stop the remaining ones. The list is
    /// copied out first so handlers may register more handlers or log.
    pub(crate) fn run(&self) {
        let handlers: Vec<ExitHandler> = self.handlers.lock().clone();
        for handler in &handlers {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler()));
        }
    }

    fn len(&self) -> usize {
        self.handlers.lock().len()
    }
}

impl fmt::Debug for ExitHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExitHandlers")
            .field("count", &self.len())
            .finish()
    }
}

/// One consistent logger configuration.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub sink: Sink,
    pub formatter: Formatter,
    pub level: Level,
    pub fields: Fields,
    exit_handlers: ExitHandlers,
}

impl Snapshot {
    fn initial(sink: Sink) -> Self {
        Self {
            sink,
            formatter: Formatter::default(),
            level: Level::default(),
            fields: process_fields(),
            exit_handlers: ExitHandlers::default(),
        }
    }
}

/// `pid` and `hostname`, present on every record.
fn process_fields() -> Fields {
    let mut fields = Fields::new();
    fields.insert(PID_KEY.to_string(), field_value(&process::id()));
    fields.insert(HOSTNAME_KEY.to_string(), field_value(&hostname()));
    fields
}

#[cfg(unix)]
fn hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_default()
}

#[cfg(not(unix))]
fn hostname() -> String {
    std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_default()
}

/// Process-level logger configuration shared by every consumer.
///
/// Two method families exist and are deliberately named apart:
/// - `add_context`, `add_fields` and `set_*` mutate the shared defaults and
///   affect every later record from every caller
/// - `with_field`, `with_fields` and `for_context` derive a scoped [`Entry`]
///   and leave the shared defaults untouched
#[derive(Debug)]
pub struct SharedLogger {
    state: RwLock<Arc<Snapshot>>,
}

impl SharedLogger {
    /// Logger writing text records at `info` to standard output.
    pub fn new() -> Self {
        Self::with_sink(Sink::stdout())
    }

    pub fn with_sink(sink: impl Into<Sink>) -> Self {
        Self {
            state: RwLock::new(Arc::new(Snapshot::initial(sink.into()))),
        }
    }

    /// Current configuration. Never torn: every field comes from the same update.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.state.read().clone()
    }

    /// Build and install the next snapshot under one write-lock critical section.
    fn update<F>(&self, apply: F)
    where
        F: FnOnce(&mut Snapshot),
    {
        let mut current = self.state.write();
        let mut next = Snapshot::clone(&current);
        apply(&mut next);
        *current = Arc::new(next);
    }

    /// Current shared entry point.
    pub fn get_logger(&self) -> Entry {
        Entry {
            snapshot: self.snapshot(),
        }
    }

    /// Merge one field into the shared defaults. Last write wins per key.
    pub fn add_context<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Serialize,
    {
        let key = key.into();
        let value = field_value(&value);
        self.update(|s| {
            s.fields.insert(key.clone(), value);
        });
        log::debug!(target: INTERNAL_TARGET, "CONTEXT_ADDED key={}", key);
    }

    /// Merge a whole mapping into the shared defaults.
    pub fn add_fields(&self, fields: Fields) {
        let count = fields.len();
        self.update(|s| s.fields.extend(fields));
        log::debug!(target: INTERNAL_TARGET, "CONTEXT_ADDED fields={}", count);
    }

    /// `"json"` selects JSON; any other name selects text.
    pub fn set_formatter(&self, name: &str) {
        self.set_formatter_value(Formatter::from_name(name));
    }

    pub fn set_formatter_value(&self, formatter: Formatter) {
        self.update(|s| s.formatter = formatter);
        log::debug!(target: INTERNAL_TARGET, "FORMATTER_SET formatter={}", formatter);
    }

    pub fn get_formatter(&self) -> Formatter {
        self.state.read().formatter
    }

    /// Redirect later records. Already written bytes are unaffected.
    pub fn set_output(&self, sink: impl Into<Sink>) {
        let sink = sink.into();
        let name = sink.name();
        self.update(|s| s.sink = sink);
        log::debug!(target: INTERNAL_TARGET, "OUTPUT_SET sink={}", name);
    }

    /// Unrecognized names select `info`.
    pub fn set_level(&self, name: &str) {
        self.set_level_value(Level::parse_lenient(name));
    }

    pub fn set_level_value(&self, level: Level) {
        self.update(|s| s.level = level);
        log::debug!(target: INTERNAL_TARGET, "LEVEL_SET level={}", level);
    }

    pub fn get_level(&self) -> Level {
        self.state.read().level
    }

    /// Canonical name of the current minimum level.
    pub fn get_loglevel(&self) -> &'static str {
        self.get_level().as_str()
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        level >= self.get_level()
    }

    /// Copy of the shared default fields.
    pub fn fields(&self) -> Fields {
        self.state.read().fields.clone()
    }

    /// Register a handler run by `fatal` before the process exits.
    pub fn register_exit_handler<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.state.read().exit_handlers.register(Arc::new(handler));
    }

    pub fn with_field<K, V>(&self, key: K, value: V) -> Entry
    where
        K: Into<String>,
        V: Serialize,
    {
        self.get_logger().with_field(key, value)
    }

    pub fn with_fields(&self, fields: Fields) -> Entry {
        self.get_logger().with_fields(fields)
    }

    pub fn debug(&self, msg: impl fmt::Display) {
        self.get_logger().debug(msg)
    }

    pub fn info(&self, msg: impl fmt::Display) {
        self.get_logger().info(msg)
    }

    pub fn warn(&self, msg: impl fmt::Display) {
        self.get_logger().warn(msg)
    }

    pub fn warning(&self, msg: impl fmt::Display) {
        self.get_logger().warn(msg)
    }

    pub fn error(&self, msg: impl fmt::Display) {
        self.get_logger().error(msg)
    }

    pub fn fatal(&self, msg: impl fmt::Display) -> ! {
        self.get_logger().fatal(msg)
    }

    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.get_logger().debugf(args)
    }

    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.get_logger().infof(args)
    }

    pub fn warningf(&self, args: fmt::Arguments<'_>) {
        self.get_logger().warningf(args)
    }

    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.get_logger().errorf(args)
    }

    pub fn fatalf(&self, args: fmt::Arguments<'_>) -> ! {
        self.get_logger().fatalf(args)
    }
}

impl Default for SharedLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Logger handle with a fixed configuration and field set.
#[derive(Debug, Clone)]
pub struct Entry {
    snapshot: Arc<Snapshot>,
}

impl Entry {
    /// Derive an entry with one extra field. `self` is unchanged.
    pub fn with_field<K, V>(&self, key: K, value: V) -> Entry
    where
        K: Into<String>,
        V: Serialize,
    {
        let mut extra = Fields::new();
        extra.insert(key.into(), field_value(&value));
        self.with_fields(extra)
    }

    /// Derive an entry with `fields` merged over the current ones.
    pub fn with_fields(&self, fields: Fields) -> Entry {
        if fields.is_empty() {
            return self.clone();
        }
        let mut snapshot = Snapshot::clone(&self.snapshot);
        snapshot.fields = merge_fields(&self.snapshot.fields, fields);
        Entry {
            snapshot: Arc::new(snapshot),
        }
    }

    pub fn fields(&self) -> &Fields {
        &self.snapshot.fields
    }

    pub fn level(&self) -> Level {
        self.snapshot.level
    }

    pub fn formatter(&self) -> Formatter {
        self.snapshot.formatter
    }

    pub fn sink(&self) -> &Sink {
        &self.snapshot.sink
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        level >= self.snapshot.level
    }

    /// Emit a record at `level` if it passes the level threshold.
    pub fn log(&self, level: Level, msg: impl fmt::Display) {
        if self.is_enabled(level) {
            self.write(level, &msg.to_string());
        }
    }

    pub fn logf(&self, level: Level, args: fmt::Arguments<'_>) {
        if self.is_enabled(level) {
            self.write(level, &fmt::format(args));
        }
    }

    fn write(&self, level: Level, msg: &str) {
        let record = Record::new(level, msg, &self.snapshot.fields);
        let line = self.snapshot.formatter.format(&record);
        self.snapshot.sink.write_record(&line);
    }

    pub fn debug(&self, msg: impl fmt::Display) {
        self.log(Level::Debug, msg)
    }

    pub fn info(&self, msg: impl fmt::Display) {
        self.log(Level::Info, msg)
    }

    pub fn warn(&self, msg: impl fmt::Display) {
        self.log(Level::Warn, msg)
    }

    pub fn warning(&self, msg: impl fmt::Display) {
        self.log(Level::Warn, msg)
    }

    pub fn error(&self, msg: impl fmt::Display) {
        self.log(Level::Error, msg)
    }

    /// Emit at `fatal`, run exit handlers, then terminate with status 1.
    pub fn fatal(&self, msg: impl fmt::Display) -> ! {
        self.log(Level::Fatal, msg);
        self.exit()
    }

    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.logf(Level::Debug, args)
    }

    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.logf(Level::Info, args)
    }

    pub fn warningf(&self, args: fmt::Arguments<'_>) {
        self.logf(Level::Warn, args)
    }

    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.logf(Level::Error, args)
    }

    pub fn fatalf(&self, args: fmt::Arguments<'_>) -> ! {
        self.logf(Level::Fatal, args);
        self.exit()
    }

    fn prepare_exit(&self) {
        self.snapshot.sink.flush();
        self.snapshot.exit_handlers.run();
    }

    fn exit(&self) -> ! {
        self.prepare_exit();
        process::exit(1)
    }
}
