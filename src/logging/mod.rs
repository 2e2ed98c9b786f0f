//! Structured logging facade.
//!
//! One [`SharedLogger`] holds the sink, formatter, level and context fields
//! for the process. [`Entry`] handles derived from it attach scoped fields
//! without touching the shared defaults.

pub mod bridge;
pub mod context;
pub mod fields;
pub mod format;
pub mod global;
pub mod level;
pub mod logger;
pub mod sink;

pub use bridge::{install, LogBridge};
pub use context::{ContextCarrier, RequestContext, REQUEST_ID_KEY};
pub use fields::{field_value, Fields};
pub use format::{Formatter, Record};
pub use level::Level;
pub use logger::{Entry, SharedLogger, Snapshot};
pub use sink::{MemorySink, Sink};
