//! Work Entry Codec
//!
//! Turns work items into queue entries and back. An entry is compact JSON
//! text (`["job-1","ocr",["a","b"],"v1"]`). Entries pushed by hand may also
//! use a relaxed list literal with single-quoted strings, backslash escapes
//! and `True`/`False`/`None` (`['a', ['b', None]]`); both decode to the
//! same structure.

use serde::ser::{Serialize, SerializeSeq, Serializer};
use thiserror::Error;

use crate::models::Job;

/// Version stamped on jobs whose entry carries no fourth element
pub const DEFAULT_VERSION: &str = "v0.1";

/// An entry could not be turned into a work item
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed queue entry: {reason}")]
pub struct MalformedEntryError {
    pub reason: String,
}

impl MalformedEntryError {
    fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// One value inside a work item: a scalar or a nested sequence
#[derive(Debug, Clone, PartialEq)]
pub enum WorkValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Sequence(Vec<WorkValue>),
}

impl WorkValue {
    pub fn text(s: impl Into<String>) -> Self {
        WorkValue::Text(s.into())
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, WorkValue::Sequence(_))
    }

    /// Textual form of a scalar, as used for job ids and types
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            WorkValue::Null => Some("null".to_string()),
            WorkValue::Bool(b) => Some(b.to_string()),
            WorkValue::Number(n) => Some(n.to_string()),
            WorkValue::Text(s) => Some(s.clone()),
            WorkValue::Sequence(_) => None,
        }
    }
}

impl From<&str> for WorkValue {
    fn from(s: &str) -> Self {
        WorkValue::Text(s.to_string())
    }
}

impl From<String> for WorkValue {
    fn from(s: String) -> Self {
        WorkValue::Text(s)
    }
}

impl<T: Into<WorkValue>> From<Vec<T>> for WorkValue {
    fn from(items: Vec<T>) -> Self {
        WorkValue::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<serde_json::Value> for WorkValue {
    type Error = MalformedEntryError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        Ok(match value {
            Value::Null => WorkValue::Null,
            Value::Bool(b) => WorkValue::Bool(b),
            Value::Number(n) => WorkValue::Number(n),
            Value::String(s) => WorkValue::Text(s),
            Value::Array(items) => WorkValue::Sequence(
                items
                    .into_iter()
                    .map(WorkValue::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(_) => {
                return Err(MalformedEntryError::new("objects are not allowed in work items"))
            }
        })
    }
}

impl Serialize for WorkValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WorkValue::Null => serializer.serialize_unit(),
            WorkValue::Bool(b) => serializer.serialize_bool(*b),
            WorkValue::Number(n) => n.serialize(serializer),
            WorkValue::Text(s) => serializer.serialize_str(s),
            WorkValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// A unit of work as it sits in the queue: `[job_id, type, payload, version?]`
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub job_id: WorkValue,
    pub job_type: WorkValue,
    pub payload: WorkValue,
    pub version: Option<WorkValue>,
}

impl WorkItem {
    pub fn new(
        job_id: impl Into<WorkValue>,
        job_type: impl Into<WorkValue>,
        payload: impl Into<WorkValue>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            job_type: job_type.into(),
            payload: payload.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<WorkValue>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Build a work item from a decoded sequence, checking its shape
    pub fn from_sequence(items: Vec<WorkValue>) -> Result<Self, MalformedEntryError> {
        if !(3..=4).contains(&items.len()) {
            return Err(MalformedEntryError::new(format!(
                "expected 3 or 4 elements, found {}",
                items.len()
            )));
        }

        let mut items = items.into_iter();
        // length checked above
        let (Some(job_id), Some(job_type), Some(payload)) = (items.next(), items.next(), items.next())
        else {
            return Err(MalformedEntryError::new("entry is too short"));
        };
        let version = items.next();

        for (name, value) in [("job_id", &job_id), ("type", &job_type)] {
            if !value.is_scalar() || *value == WorkValue::Null {
                return Err(MalformedEntryError::new(format!("{name} must be a non-null scalar")));
            }
        }
        if let Some(v) = &version {
            if !v.is_scalar() {
                return Err(MalformedEntryError::new("version must be a scalar"));
            }
        }

        Ok(Self { job_id, job_type, payload, version })
    }

    fn to_sequence(&self) -> WorkValue {
        let mut items = vec![self.job_id.clone(), self.job_type.clone(), self.payload.clone()];
        if let Some(v) = &self.version {
            items.push(v.clone());
        }
        WorkValue::Sequence(items)
    }
}

/// Raw bytes of one queue element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedEntry(Vec<u8>);

impl EncodedEntry {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<String> for EncodedEntry {
    fn from(s: String) -> Self {
        EncodedEntry(s.into_bytes())
    }
}

impl From<&str> for EncodedEntry {
    fn from(s: &str) -> Self {
        EncodedEntry(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for EncodedEntry {
    fn from(bytes: Vec<u8>) -> Self {
        EncodedEntry(bytes)
    }
}

impl std::fmt::Display for EncodedEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Serialize a work item into a queue entry
pub fn encode(item: &WorkItem) -> EncodedEntry {
    // WorkValue serialization cannot fail: no maps, no non-string keys
    let text = serde_json::to_string(&item.to_sequence()).unwrap_or_default();
    EncodedEntry::from(text)
}

/// Parse an entry into a work item
pub fn decode(entry: &EncodedEntry) -> Result<WorkItem, MalformedEntryError> {
    match parse_value(entry)? {
        WorkValue::Sequence(items) => WorkItem::from_sequence(items),
        _ => Err(MalformedEntryError::new("entry is not a sequence")),
    }
}

/// Parse an entry into a value without checking the work item shape
pub fn parse_value(entry: &EncodedEntry) -> Result<WorkValue, MalformedEntryError> {
    let text = std::str::from_utf8(entry.as_bytes())
        .map_err(|e| MalformedEntryError::new(format!("entry is not UTF-8: {e}")))?;

    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => WorkValue::try_from(value),
        Err(json_err) => LiteralParser::new(text).parse().map_err(|literal_err| {
            MalformedEntryError::new(format!("{json_err}; as list literal: {}", literal_err.reason))
        }),
    }
}

/// Map a work item onto the client-facing job
pub fn to_job(item: &WorkItem) -> Job {
    Job {
        job_id: item.job_id.scalar_text().unwrap_or_default(),
        job_type: item.job_type.scalar_text().unwrap_or_default(),
        data: item.payload.clone(),
        version: item
            .version
            .as_ref()
            .and_then(WorkValue::scalar_text)
            .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
    }
}

/// Render a work item as the compact job JSON sent to clients
pub fn generate_json(item: &WorkItem) -> String {
    to_job(item).to_json()
}

/// Deepest sequence nesting accepted in a relaxed list literal
const MAX_DEPTH: usize = 128;

/// Parser for relaxed list literals: `['a', "b", [1, 2.5], True, None]`
struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, depth: 0 }
    }

    fn parse(mut self) -> Result<WorkValue, MalformedEntryError> {
        let value = self.value()?;
        self.skip_ws();
        if self.pos != self.src.len() {
            return Err(self.error("trailing characters"));
        }
        Ok(value)
    }

    fn error(&self, what: &str) -> MalformedEntryError {
        MalformedEntryError::new(format!("{what} at offset {}", self.pos))
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn value(&mut self) -> Result<WorkValue, MalformedEntryError> {
        self.skip_ws();
        match self.peek() {
            Some('[') => self.sequence(),
            Some(q @ ('\'' | '"')) => self.string(q).map(WorkValue::Text),
            Some(_) => self.bare(),
            None => Err(self.error("unexpected end of entry")),
        }
    }

    fn sequence(&mut self) -> Result<WorkValue, MalformedEntryError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let items = self.sequence_items();
        self.depth -= 1;
        items.map(WorkValue::Sequence)
    }

    fn sequence_items(&mut self) -> Result<Vec<WorkValue>, MalformedEntryError> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(']') {
                self.bump();
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(items),
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String, MalformedEntryError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => {
                    let c = self.escape()?;
                    out.push(c);
                }
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    /// Decode the escape following a backslash
    fn escape(&mut self) -> Result<char, MalformedEntryError> {
        match self.bump() {
            Some(c @ ('\\' | '\'' | '"')) => Ok(c),
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('a') => Ok('\u{07}'),
            Some('b') => Ok('\u{08}'),
            Some('f') => Ok('\u{0c}'),
            Some('v') => Ok('\u{0b}'),
            Some('x') => self.hex_escape(2),
            Some('u') => self.hex_escape(4),
            Some('U') => self.hex_escape(8),
            Some(c) => Err(self.error(&format!("unsupported escape '\\{c}'"))),
            None => Err(self.error("unterminated escape")),
        }
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char, MalformedEntryError> {
        let start = self.pos;
        for _ in 0..digits {
            match self.bump() {
                Some(c) if c.is_ascii_hexdigit() => {}
                _ => return Err(self.error("truncated hex escape")),
            }
        }
        let code = u32::from_str_radix(&self.src[start..self.pos], 16)
            .map_err(|_| self.error("invalid hex escape"))?;
        char::from_u32(code).ok_or_else(|| self.error("escape is not a valid character"))
    }

    fn bare(&mut self) -> Result<WorkValue, MalformedEntryError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if !c.is_whitespace() && c != ',' && c != ']') {
            self.bump();
        }
        let token = &self.src[start..self.pos];
        match token {
            "true" | "True" => Ok(WorkValue::Bool(true)),
            "false" | "False" => Ok(WorkValue::Bool(false)),
            "null" | "None" => Ok(WorkValue::Null),
            _ => serde_json::from_str::<serde_json::Number>(token)
                .map(WorkValue::Number)
                .map_err(|_| self.error(&format!("unrecognized token '{token}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(items: Vec<WorkValue>) -> WorkValue {
        WorkValue::Sequence(items)
    }

    #[test]
    fn test_generate_json_three_elements() {
        let item = WorkItem::new("a", "b", vec!["a", "b"]);
        assert_eq!(
            generate_json(&item),
            r#"{"job_id":"a","type":"b","data":["a","b"],"version":"v0.1"}"#
        );
    }

    #[test]
    fn test_roundtrip_preserves_nesting_and_version() {
        let payload = seq(vec![
            WorkValue::text("x"),
            seq(vec![WorkValue::text("y"), seq(vec![WorkValue::text("z")])]),
        ]);
        let item = WorkItem::new("job-7", "ocr", payload).with_version("v2");

        let decoded = decode(&encode(&item)).unwrap();
        assert_eq!(decoded, item);

        let job = to_job(&decoded);
        assert_eq!(job.version, "v2");
    }

    #[test]
    fn test_roundtrip_without_version_defaults() {
        let item = WorkItem::new("1", "parse", vec!["doc"]);
        let decoded = decode(&encode(&item)).unwrap();
        assert_eq!(decoded.version, None);
        assert_eq!(to_job(&decoded).version, DEFAULT_VERSION);
    }

    #[test]
    fn test_parse_relaxed_literal() {
        let entry = EncodedEntry::from("['a', ['b', 'c']]");
        let value = parse_value(&entry).unwrap();
        assert_eq!(
            value,
            seq(vec![
                WorkValue::text("a"),
                seq(vec![WorkValue::text("b"), WorkValue::text("c")]),
            ])
        );
    }

    #[test]
    fn test_decode_relaxed_literal_with_numbers() {
        let entry = EncodedEntry::from("[12, 'scan', [1, 2.5, true, null], 'v3']");
        let item = decode(&entry).unwrap();
        let job = to_job(&item);
        assert_eq!(job.job_id, "12");
        assert_eq!(job.job_type, "scan");
        assert_eq!(job.version, "v3");
    }

    #[test]
    fn test_relaxed_literal_keywords() {
        let entry = EncodedEntry::from("['1', 'ocr', ['a', True, False, None]]");
        let item = decode(&entry).unwrap();
        assert_eq!(
            item.payload,
            seq(vec![
                WorkValue::text("a"),
                WorkValue::Bool(true),
                WorkValue::Bool(false),
                WorkValue::Null,
            ])
        );
    }

    #[test]
    fn test_relaxed_literal_escapes() {
        let entry = EncodedEntry::from(r"['a\x00b', 'caf\xe9', '\u2603', '\U0001f600', 'c:\\dir', 'it\'s']");
        let value = parse_value(&entry).unwrap();
        assert_eq!(
            value,
            seq(vec![
                WorkValue::text("a\u{0}b"),
                WorkValue::text("caf\u{e9}"),
                WorkValue::text("\u{2603}"),
                WorkValue::text("\u{1f600}"),
                WorkValue::text("c:\\dir"),
                WorkValue::text("it's"),
            ])
        );
    }

    #[test]
    fn test_relaxed_literal_rejects_bad_escapes() {
        assert!(parse_value(&EncodedEntry::from(r"['a\qb']")).is_err());
        assert!(parse_value(&EncodedEntry::from(r"['a\x0']")).is_err());
        assert!(parse_value(&EncodedEntry::from(r"['\ud800']")).is_err());
    }

    #[test]
    fn test_deep_nesting_is_malformed_not_fatal() {
        let depth = 200_000;
        let text = "[".repeat(depth) + &"]".repeat(depth);
        let err = decode(&EncodedEntry::from(text)).unwrap_err();
        assert!(err.reason.contains("nesting too deep"));

        let ok = "[".repeat(MAX_DEPTH) + &"]".repeat(MAX_DEPTH);
        assert!(parse_value(&EncodedEntry::from(ok)).is_ok());
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let err = decode(&EncodedEntry::from(r#"["a", ["b", "c"]]"#)).unwrap_err();
        assert!(err.reason.contains("3 or 4"));

        assert!(decode(&EncodedEntry::from(r#"["a","b","c","d","e"]"#)).is_err());
    }

    #[test]
    fn test_decode_rejects_non_scalar_ids() {
        assert!(decode(&EncodedEntry::from(r#"[["a"], "b", "c"]"#)).is_err());
        assert!(decode(&EncodedEntry::from(r#"["a", null, "c"]"#)).is_err());
        assert!(decode(&EncodedEntry::from(r#"["a", "b", "c", ["v"]]"#)).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(&EncodedEntry::from("not a list")).is_err());
        assert!(decode(&EncodedEntry::from("{\"job_id\": 1}")).is_err());
        assert!(decode(&EncodedEntry::from(vec![0xff, 0xfe])).is_err());
        assert!(decode(&EncodedEntry::from("['a', 'b'")).is_err());
    }
}
