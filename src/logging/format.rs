//! Record serialization.
//!
//! Two output modes:
//! - `Text`: one `key=value` line, `time`, `level` and `msg` first, then
//!   context fields sorted by key
//! - `Json`: one JSON object per line with `level`, `msg`, `time` and every
//!   context field as top-level keys

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::LoggerError;

use super::fields::Fields;
use super::level::Level;

pub const TIME_KEY: &str = "time";
pub const LEVEL_KEY: &str = "level";
pub const MSG_KEY: &str = "msg";

/// Prefix applied to user fields whose key collides with a reserved key.
const CLASH_PREFIX: &str = "fields.";

/// Serialization mode for emitted records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Formatter {
    #[default]
    Text,
    Json,
}

/// Accepted formatter names. Anything else resolves to `Text`.
const FORMATTER_NAMES: &[(&str, Formatter)] = &[
    ("json", Formatter::Json),
    ("text", Formatter::Text),
];

impl Formatter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Formatter::Text => "text",
            Formatter::Json => "json",
        }
    }

    /// Resolve a formatter name, falling back to `Text` for anything unrecognized.
    pub fn from_name(name: &str) -> Formatter {
        name.parse().unwrap_or(Formatter::Text)
    }

    /// Serialize one record, newline-terminated.
    pub fn format(&self, record: &Record<'_>) -> String {
        match self {
            Formatter::Text => format_text(record),
            Formatter::Json => format_json(record),
        }
    }
}

impl fmt::Display for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Formatter {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        FORMATTER_NAMES
            .iter()
            .find(|(name, _)| *name == lowered)
            .map(|(_, formatter)| *formatter)
            .ok_or_else(|| LoggerError::UnknownFormat(s.to_string()))
    }
}

impl Serialize for Formatter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Formatter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// A single log record, alive only for the duration of formatting.
#[derive(Debug)]
pub struct Record<'a> {
    pub level: Level,
    pub msg: &'a str,
    pub time: DateTime<Local>,
    pub fields: &'a Fields,
}

impl<'a> Record<'a> {
    pub fn new(level: Level, msg: &'a str, fields: &'a Fields) -> Self {
        Self {
            level,
            msg,
            time: Local::now(),
            fields,
        }
    }

    fn timestamp(&self) -> String {
        self.time.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

fn is_reserved(key: &str) -> bool {
    key == TIME_KEY || key == LEVEL_KEY || key == MSG_KEY
}

/// Key under which a user field is written.
fn output_key(key: &str) -> String {
    if is_reserved(key) {
        format!("{}{}", CLASH_PREFIX, key)
    } else {
        key.to_string()
    }
}

fn format_json(record: &Record<'_>) -> String {
    let mut obj = Map::new();

    for (key, value) in record.fields {
        obj.insert(output_key(key), value.clone());
    }
    obj.insert(TIME_KEY.to_string(), Value::String(record.timestamp()));
    obj.insert(LEVEL_KEY.to_string(), Value::String(record.level.as_str().to_string()));
    obj.insert(MSG_KEY.to_string(), Value::String(record.msg.to_string()));

    let mut line = Value::Object(obj).to_string();
    line.push('\n');
    line
}

fn format_text(record: &Record<'_>) -> String {
    let mut line = String::with_capacity(64 + record.msg.len());

    push_pair(&mut line, TIME_KEY, &record.timestamp());
    push_pair(&mut line, LEVEL_KEY, record.level.as_str());
    push_message(&mut line, record.msg);

    for (key, value) in record.fields {
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        push_pair(&mut line, &output_key(key), &rendered);
    }

    line.push('\n');
    line
}

fn push_pair(line: &mut String, key: &str, value: &str) {
    if !line.is_empty() {
        line.push(' ');
    }
    line.push_str(key);
    line.push('=');
    if needs_quoting(value) {
        line.push_str(&format!("{:?}", value));
    } else {
        line.push_str(value);
    }
}

/// The message is written verbatim apart from line breaks, which are escaped
/// so the record stays on one line.
fn push_message(line: &mut String, msg: &str) {
    line.push(' ');
    line.push_str(MSG_KEY);
    line.push('=');
    let quoted = needs_quoting(msg);
    if quoted {
        line.push('"');
    }
    for c in msg.chars() {
        match c {
            '\n' => line.push_str("\\n"),
            '\r' => line.push_str("\\r"),
            c => line.push(c),
        }
    }
    if quoted {
        line.push('"');
    }
}

/// Bare values are restricted to a conservative character set.
fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || !value.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '/' | '@' | '^' | '+' | ':')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> Fields {
        crate::fields! { "hostname" => "node-1", "pid" => 4242 }
    }

    #[test]
    fn test_formatter_from_name() {
        assert_eq!(Formatter::from_name("json"), Formatter::Json);
        assert_eq!(Formatter::from_name("JSON"), Formatter::Json);
        assert_eq!(Formatter::from_name("text"), Formatter::Text);
        assert_eq!(Formatter::from_name("logfmt"), Formatter::Text);
        assert_eq!(Formatter::from_name(""), Formatter::Text);
    }

    #[test]
    fn test_strict_formatter_parse() {
        assert_eq!("json".parse::<Formatter>(), Ok(Formatter::Json));
        assert_eq!(
            "yaml".parse::<Formatter>(),
            Err(LoggerError::UnknownFormat("yaml".to_string()))
        );
    }

    #[test]
    fn test_json_record() {
        let fields = sample_fields();
        let record = Record::new(Level::Info, "test", &fields);
        let line = Formatter::Json.format(&record);

        assert!(line.ends_with('\n'));
        let parsed: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed["msg"], "test");
        assert_eq!(parsed["level"], "info");
        assert_eq!(parsed["hostname"], "node-1");
        assert_eq!(parsed["pid"], 4242);
        assert!(parsed["time"].is_string());
    }

    #[test]
    fn test_json_reserved_key_clash() {
        let fields = crate::fields! { "msg" => "user value", "level" => 7 };
        let record = Record::new(Level::Warn, "real message", &fields);
        let parsed: Value = serde_json::from_str(&Formatter::Json.format(&record)).unwrap();

        assert_eq!(parsed["msg"], "real message");
        assert_eq!(parsed["level"], "warning");
        assert_eq!(parsed["fields.msg"], "user value");
        assert_eq!(parsed["fields.level"], 7);
    }

    #[test]
    fn test_text_record() {
        let fields = sample_fields();
        let record = Record::new(Level::Info, "Some test string", &fields);
        let line = Formatter::Text.format(&record);

        assert!(line.contains("Some test string"));
        assert!(line.contains("level=info"));
        assert!(line.contains("msg=\"Some test string\""));
        assert!(line.contains("hostname=node-1"));
        assert!(line.contains("pid=4242"));
        assert!(line.starts_with("time="));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_text_fields_sorted_after_message() {
        let fields = crate::fields! { "zeta" => 1, "alpha" => 2 };
        let record = Record::new(Level::Error, "boom", &fields);
        let line = Formatter::Text.format(&record);

        let msg_at = line.find("msg=boom").unwrap();
        let alpha_at = line.find("alpha=2").unwrap();
        let zeta_at = line.find("zeta=1").unwrap();
        assert!(msg_at < alpha_at);
        assert!(alpha_at < zeta_at);
    }

    #[test]
    fn test_text_message_written_verbatim() {
        let fields = Fields::new();
        let msg = r#"user said "hi" to C:\tmp"#;
        let line = Formatter::Text.format(&Record::new(Level::Info, msg, &fields));

        assert!(line.contains(msg));
        assert!(line.contains(r#"msg="user said "hi" to C:\tmp""#));
    }

    #[test]
    fn test_text_message_line_breaks_escaped() {
        let fields = Fields::new();
        let line = Formatter::Text.format(&Record::new(Level::Info, "first\nsecond\r", &fields));

        assert!(line.contains(r#"msg="first\nsecond\r""#));
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_formatter_serde_uses_names() {
        assert_eq!(serde_json::to_string(&Formatter::Json).unwrap(), r#""json""#);
        let parsed: Formatter = serde_json::from_str(r#""JSON""#).unwrap();
        assert_eq!(parsed, Formatter::Json);
        assert!(serde_json::from_str::<Formatter>(r#""xml""#).is_err());
    }

    #[test]
    fn test_text_quoting() {
        assert!(!needs_quoting("node-1"));
        assert!(!needs_quoting("10.0.0.1:8080"));
        assert!(needs_quoting(""));
        assert!(needs_quoting("two words"));
        assert!(needs_quoting("a=b"));
        assert!(needs_quoting("say \"hi\""));

        let fields = crate::fields! { "note" => "line\nbreak" };
        let record = Record::new(Level::Info, "m", &fields);
        let line = Formatter::Text.format(&record);
        assert!(line.contains("note=\"line\\nbreak\""));
        assert_eq!(line.matches('\n').count(), 1);
    }
}
