//! Server-sent-events stream handling
//!
//! The hosted store streams changes to a subscribed node as SSE events:
//! `put` replaces the value at a path, `patch` merges keys into it,
//! `keep-alive` is padding, and `cancel` / `auth_revoked` end the stream.
//! Event payloads are `{"path": "/...", "data": ...}` relative to the
//! subscribed node; a null value deletes the node it addresses.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{ClientError, ClientResult};

/// One parsed stream event
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub name: String,
    pub data: String,
}

/// Incremental SSE line parser
///
/// Feed raw chunks as they arrive; events are dispatched on blank lines per
/// the SSE framing rules. Comment lines (leading ':') are dropped. Chunks
/// buffer as raw bytes and decode one complete line at a time, so a UTF-8
/// sequence split across reads is reassembled before decoding.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event_name: String,
    data: String,
    has_data: bool,
}

impl SseParser {
    /// Feed a chunk of bytes, returning every event it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event_name = value.to_string(),
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            // id and retry fields are irrelevant here
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if !self.has_data && self.event_name.is_empty() {
            return None;
        }
        let event = SseEvent {
            name: if self.event_name.is_empty() {
                "message".to_string()
            } else {
                std::mem::take(&mut self.event_name)
            },
            data: std::mem::take(&mut self.data),
        };
        self.event_name.clear();
        self.has_data = false;
        Some(event)
    }
}

/// Current state of a subscribed node
#[derive(Debug, Clone, PartialEq)]
pub enum DbSnapshot {
    /// Stream opened, first full value not yet received
    Connecting,
    /// Live value of the subscribed node
    Value(Value),
    /// Stream failed or was ended by the server
    Failed(String),
}

/// Outcome of applying one stream event
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Value changed; publish a new snapshot
    Updated,
    /// Nothing to publish
    Ignored,
    /// Server ended the stream
    Ended(String),
}

#[derive(Debug, Deserialize)]
struct StreamChange {
    path: String,
    #[serde(default)]
    data: Value,
}

/// Apply one stream event to the locally mirrored value
pub fn apply_event(value: &mut Value, event: &SseEvent) -> ClientResult<EventOutcome> {
    match event.name.as_str() {
        "put" => {
            let change = parse_change(event)?;
            set_at_path(value, &change.path, change.data);
            Ok(EventOutcome::Updated)
        }
        "patch" => {
            let change = parse_change(event)?;
            merge_at_path(value, &change.path, change.data);
            Ok(EventOutcome::Updated)
        }
        "keep-alive" => Ok(EventOutcome::Ignored),
        "cancel" => Ok(EventOutcome::Ended(
            "subscription canceled by the server".to_string(),
        )),
        "auth_revoked" => Ok(EventOutcome::Ended(
            "auth credential revoked".to_string(),
        )),
        _ => Ok(EventOutcome::Ignored),
    }
}

fn parse_change(event: &SseEvent) -> ClientResult<StreamChange> {
    serde_json::from_str(&event.data).map_err(|e| {
        ClientError::Subscription(format!("bad {} payload: {e}", event.name))
    })
}

/// Replace the value at a slash-separated path; null deletes the node
fn set_at_path(root: &mut Value, path: &str, data: Value) {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    set_at_segments(root, &segments, data);
}

fn set_at_segments(node: &mut Value, segments: &[&str], data: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = data;
        return;
    };

    if rest.is_empty() && data.is_null() {
        if let Value::Object(map) = node {
            map.remove(*head);
        }
        return;
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry((*head).to_string()).or_insert(Value::Null);
        set_at_segments(child, rest, data);
        if map.get(*head).is_some_and(Value::is_null) {
            map.remove(*head);
        }
    }
}

/// Merge keys into the node at a path; a null value deletes its key
fn merge_at_path(root: &mut Value, path: &str, data: Value) {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    // Only objects merge key-wise; anything else behaves like a put
    let Value::Object(entries) = data else {
        set_at_segments(root, &segments, data);
        return;
    };

    for (key, child) in entries {
        let mut child_segments = segments.clone();
        child_segments.push(key.as_str());
        set_at_segments(root, &child_segments, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn put(path: &str, data: Value) -> SseEvent {
        SseEvent {
            name: "put".to_string(),
            data: json!({"path": path, "data": data}).to_string(),
        }
    }

    fn patch(path: &str, data: Value) -> SseEvent {
        SseEvent {
            name: "patch".to_string(),
            data: json!({"path": path, "data": data}).to_string(),
        }
    }

    #[test]
    fn test_parser_dispatches_on_blank_line() {
        let mut parser = SseParser::default();
        let events = parser.feed(b"event: put\ndata: {\"path\":\"/\",\"data\":null}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "put");
        assert_eq!(events[0].data, "{\"path\":\"/\",\"data\":null}");
    }

    #[test]
    fn test_parser_handles_split_chunks() {
        let mut parser = SseParser::default();
        assert!(parser.feed(b"event: pu").is_empty());
        assert!(parser.feed(b"t\ndata: {\"path\":\"/\",\"da").is_empty());
        let events = parser.feed(b"ta\":1}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "put");
    }

    #[test]
    fn test_parser_reassembles_split_multibyte_chars() {
        let mut parser = SseParser::default();
        // The two-byte 'á' in "Sandália" arrives split across reads
        assert!(parser
            .feed(b"event: put\ndata: {\"path\":\"/\",\"data\":{\"name\":\"Sand\xC3")
            .is_empty());
        let events = parser.feed(b"\xA1lia\"}}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"path\":\"/\",\"data\":{\"name\":\"Sandália\"}}");
    }

    #[test]
    fn test_parser_ignores_comment_lines() {
        let mut parser = SseParser::default();
        let events = parser.feed(b": keep-alive\n\nevent: put\ndata: {}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "put");
    }

    #[test]
    fn test_parser_handles_crlf() {
        let mut parser = SseParser::default();
        let events = parser.feed(b"event: keep-alive\r\ndata: null\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "keep-alive");
        assert_eq!(events[0].data, "null");
    }

    #[test]
    fn test_put_root_replaces_everything() {
        let mut value = json!({"old": true});
        let outcome = apply_event(&mut value, &put("/", json!({"a": {"name": "x"}}))).unwrap();
        assert_eq!(outcome, EventOutcome::Updated);
        assert_eq!(value, json!({"a": {"name": "x"}}));
    }

    #[test]
    fn test_put_nested_path_creates_parents() {
        let mut value = Value::Null;
        apply_event(&mut value, &put("/abc123/stock", json!(5))).unwrap();
        assert_eq!(value, json!({"abc123": {"stock": 5}}));
    }

    #[test]
    fn test_put_null_deletes_node() {
        let mut value = json!({"abc123": {"name": "x"}, "def456": {"name": "y"}});
        apply_event(&mut value, &put("/abc123", Value::Null)).unwrap();
        assert_eq!(value, json!({"def456": {"name": "y"}}));
    }

    #[test]
    fn test_put_null_on_missing_node_is_noop() {
        let mut value = json!({"def456": {"name": "y"}});
        apply_event(&mut value, &put("/missing/child", Value::Null)).unwrap();
        assert_eq!(value, json!({"def456": {"name": "y"}}));
    }

    #[test]
    fn test_patch_merges_and_null_deletes_keys() {
        let mut value = json!({"abc123": {"name": "x", "stock": 5, "brand": "Acme"}});
        apply_event(
            &mut value,
            &patch("/abc123", json!({"stock": 2, "brand": null})),
        )
        .unwrap();
        assert_eq!(value, json!({"abc123": {"name": "x", "stock": 2}}));
    }

    #[test]
    fn test_keep_alive_is_ignored() {
        let mut value = json!({"a": 1});
        let event = SseEvent {
            name: "keep-alive".to_string(),
            data: "null".to_string(),
        };
        assert_eq!(apply_event(&mut value, &event).unwrap(), EventOutcome::Ignored);
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_cancel_and_auth_revoked_end_the_stream() {
        let mut value = Value::Null;
        let cancel = SseEvent {
            name: "cancel".to_string(),
            data: "null".to_string(),
        };
        assert!(matches!(
            apply_event(&mut value, &cancel).unwrap(),
            EventOutcome::Ended(_)
        ));

        let revoked = SseEvent {
            name: "auth_revoked".to_string(),
            data: "\"credential is no longer valid\"".to_string(),
        };
        assert!(matches!(
            apply_event(&mut value, &revoked).unwrap(),
            EventOutcome::Ended(_)
        ));
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let mut value = Value::Null;
        let event = SseEvent {
            name: "put".to_string(),
            data: "not json".to_string(),
        };
        assert!(apply_event(&mut value, &event).is_err());
    }
}
