//! Context fields attached to every record.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Ordered field set. Keys are unique and iteration is sorted by key.
pub type Fields = BTreeMap<String, Value>;

/// Convert any serializable value into a field value.
///
/// Serialization failures (e.g. a map with non-string keys) are recorded as
/// a string describing the failure rather than reported to the caller.
pub fn field_value<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|e| Value::String(format!("!unserializable field value: {}", e)))
}

/// Merge `extra` into `base`, with `extra` winning on duplicate keys.
pub fn merge_fields(base: &Fields, extra: Fields) -> Fields {
    let mut merged = base.clone();
    merged.extend(extra);
    merged
}

/// Build a [`Fields`] map from key/value pairs.
///
/// ```
/// use shared_logger::fields;
///
/// let f = fields! { "user" => "alice", "attempt" => 3 };
/// assert_eq!(f.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::logging::fields::Fields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::logging::fields::Fields::new();
        $(
            map.insert(
                ::std::string::ToString::to_string(&$key),
                $crate::logging::fields::field_value(&$value),
            );
        )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_field_value_types() {
        assert_eq!(field_value("stuff"), Value::String("stuff".to_string()));
        assert_eq!(field_value(&42u32), Value::from(42));
        assert_eq!(field_value(&true), Value::Bool(true));
        assert_eq!(field_value(&vec![1, 2]), serde_json::json!([1, 2]));
    }

    #[test]
    fn test_unserializable_value_becomes_string() {
        let mut map: HashMap<(u8, u8), &str> = HashMap::new();
        map.insert((1, 2), "x");

        let value = field_value(&map);
        let text = value.as_str().unwrap_or_default();
        assert!(text.starts_with("!unserializable field value"));
    }

    #[test]
    fn test_merge_last_write_wins() {
        let base = crate::fields! { "a" => 1, "b" => 2 };
        let merged = merge_fields(&base, crate::fields! { "b" => 3, "c" => 4 });

        assert_eq!(merged["a"], Value::from(1));
        assert_eq!(merged["b"], Value::from(3));
        assert_eq!(merged["c"], Value::from(4));
        // base is untouched
        assert_eq!(base["b"], Value::from(2));
    }
}
