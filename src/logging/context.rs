//! Per-request logger derivation.
//!
//! A [`ContextCarrier`] is anything that can answer a key lookup for the
//! current request or call. `for_context` pulls the request identifier out of
//! it and attaches it to a derived [`Entry`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::fields::field_value;
use super::logger::{Entry, SharedLogger};

/// Well-known key looked up by `for_context`.
pub const REQUEST_ID_KEY: &str = "request_id";

/// Request-scoped key/value lookup.
pub trait ContextCarrier {
    fn value(&self, key: &str) -> Option<Value>;
}

impl<V: Serialize> ContextCarrier for HashMap<String, V> {
    fn value(&self, key: &str) -> Option<Value> {
        self.get(key).map(field_value)
    }
}

impl<V: Serialize> ContextCarrier for BTreeMap<String, V> {
    fn value(&self, key: &str) -> Option<Value> {
        self.get(key).map(field_value)
    }
}

impl<C: ContextCarrier + ?Sized> ContextCarrier for &C {
    fn value(&self, key: &str) -> Option<Value> {
        (**self).value(key)
    }
}

#[derive(Debug)]
struct Node {
    key: String,
    value: Value,
    parent: Option<Arc<Node>>,
}

/// Immutable, parent-linked request context.
///
/// Each `with_value` returns a child that shadows the parent's value for the
/// same key. Clones are cheap and share their ancestry.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    head: Option<Arc<Node>>,
}

impl RequestContext {
    /// Empty root context.
    pub fn background() -> Self {
        Self::default()
    }

    /// Root context carrying a freshly generated request id.
    pub fn new_request() -> Self {
        let request_id = format!("req-{}", &Uuid::new_v4().simple().to_string()[..8]);
        Self::background().with_request_id(request_id)
    }

    pub fn with_value<K, V>(&self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Serialize,
    {
        Self {
            head: Some(Arc::new(Node {
                key: key.into(),
                value: field_value(&value),
                parent: self.head.clone(),
            })),
        }
    }

    pub fn with_request_id(&self, request_id: impl Into<String>) -> Self {
        self.with_value(REQUEST_ID_KEY, request_id.into())
    }

    pub fn request_id(&self) -> Option<String> {
        self.value(REQUEST_ID_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
    }
}

impl ContextCarrier for RequestContext {
    fn value(&self, key: &str) -> Option<Value> {
        let mut node = self.head.as_deref();
        while let Some(current) = node {
            if current.key == key {
                return Some(current.value.clone());
            }
            node = current.parent.as_deref();
        }
        None
    }
}

impl Entry {
    /// Derive an entry carrying the context's request id, if it has one.
    pub fn for_context<C: ContextCarrier + ?Sized>(&self, ctx: &C) -> Entry {
        match ctx.value(REQUEST_ID_KEY) {
            Some(request_id) => self.with_field(REQUEST_ID_KEY, request_id),
            None => self.clone(),
        }
    }
}

impl SharedLogger {
    /// Derive an entry for one request. Shared state is not modified.
    pub fn for_context<C: ContextCarrier + ?Sized>(&self, ctx: &C) -> Entry {
        self.get_logger().for_context(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::sink::MemorySink;

    #[test]
    fn test_request_context_lookup_and_shadowing() {
        let root = RequestContext::background();
        assert_eq!(root.value(REQUEST_ID_KEY), None);

        let ctx = root.with_value("tenant", "acme").with_request_id("abc");
        assert_eq!(ctx.request_id().as_deref(), Some("abc"));
        assert_eq!(ctx.value("tenant"), Some(Value::from("acme")));

        let shadowed = ctx.with_request_id("def");
        assert_eq!(shadowed.request_id().as_deref(), Some("def"));
        // parent is unchanged
        assert_eq!(ctx.request_id().as_deref(), Some("abc"));
        assert_eq!(root.value("tenant"), None);
    }

    #[test]
    fn test_new_request_generates_id() {
        let a = RequestContext::new_request().request_id().unwrap();
        let b = RequestContext::new_request().request_id().unwrap();

        assert!(a.starts_with("req-"));
        assert_eq!(a.len(), 12);
        assert_ne!(a, b);
    }

    #[test]
    fn test_for_context_attaches_request_id() {
        let memory = MemorySink::new();
        let logger = SharedLogger::with_sink(memory.clone());
        logger.set_formatter("json");

        let ctx = RequestContext::background().with_request_id("abc");
        logger.for_context(&ctx).info("test stuff");

        let record = memory.last_json().unwrap();
        assert_eq!(record["request_id"], "abc");
        assert_eq!(record["msg"], "test stuff");
        assert!(!logger.fields().contains_key(REQUEST_ID_KEY));
    }

    #[test]
    fn test_for_context_without_key_matches_shared_logger() {
        let memory = MemorySink::new();
        let logger = SharedLogger::with_sink(memory.clone());
        logger.add_context("service", "gateway");

        let entry = logger.for_context(&RequestContext::background());
        assert_eq!(entry.fields(), logger.get_logger().fields());
    }

    #[test]
    fn test_map_carriers() {
        let mut headers: HashMap<String, String> = HashMap::new();
        headers.insert(REQUEST_ID_KEY.to_string(), "from-header".to_string());

        let logger = SharedLogger::with_sink(MemorySink::new());
        let entry = logger.for_context(&headers);
        assert_eq!(entry.fields()[REQUEST_ID_KEY], "from-header");

        let mut ids: BTreeMap<String, u64> = BTreeMap::new();
        ids.insert(REQUEST_ID_KEY.to_string(), 7);
        let entry = logger.get_logger().for_context(&ids);
        assert_eq!(entry.fields()[REQUEST_ID_KEY], 7);
    }
}
