//! Hydration marker.
//!
//! Pre-rendered output carries a component's initial data as the first
//! non-text child of its root element:
//!
//! ```text
//! <div><!--s-data:{"title":"Todo","created":"2024-03-01T08:30:00.000Z"}--> ...
//! ```
//!
//! The payload is JSON. Strings shaped like `YYYY-MM-DDTHH:MM:SS.fffZ`
//! become dates (seconds precision). The marker, and a text node in front
//! of it, are removed once read. Nothing here ever writes a marker.

use chrono::{NaiveDateTime, Timelike};

use crate::dom::{renderer, DomHandle, DomKind};
use crate::error::Result;
use crate::types::Value;

const MARKER: &str = "s-data:";

/// Read and remove the marker under `el`, if there is one.
pub(crate) fn take_marker(el: DomHandle) -> Result<Option<Value>> {
    let r = renderer();

    let mut candidate = r.first_child(el);
    if let Some(node) = candidate {
        if r.kind(node) == Some(DomKind::Text) {
            candidate = r.next_sibling(node);
        }
    }
    let Some(marker) = candidate.filter(|n| r.kind(*n) == Some(DomKind::Comment)) else {
        return Ok(None);
    };
    let Some(text) = r.text(marker) else {
        return Ok(None);
    };
    let Some(payload) = text.trim_start().strip_prefix(MARKER) else {
        return Ok(None);
    };

    let data = parse_payload(payload)?;

    if let Some(previous) = r.previous_sibling(marker) {
        r.remove(previous);
    }
    r.remove(marker);
    tracing::debug!(el = el.raw(), "hydration marker consumed");
    Ok(Some(data))
}

/// Parse a marker payload, turning date-shaped strings into dates.
pub fn parse_payload(payload: &str) -> Result<Value> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(Value::object());
    }
    let json: serde_json::Value = serde_json::from_str(payload)?;
    Ok(revive_dates(Value::from(json)))
}

fn revive_dates(value: Value) -> Value {
    match value {
        Value::String(s) => match parse_date(&s) {
            Some(date) => Value::Date(date),
            None => Value::String(s),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(revive_dates).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, revive_dates(value)))
                .collect(),
        ),
        other => other,
    }
}

fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let bytes = s.as_bytes();
    let shaped = bytes.len() > 21 && bytes[19] == b'.' && s.ends_with('Z') && bytes[10] == b'T';
    if !shaped {
        return None;
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ")
        .ok()
        .and_then(|date| date.with_nanosecond(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::dom::{reset_renderer, Renderer};
    use crate::error::CoreError;

    fn date(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> Value {
        Value::Date(
            NaiveDate::from_ymd_opt(y, m, d)
                .and_then(|day| day.and_hms_opt(h, min, s))
                .unwrap(),
        )
    }

    #[test]
    fn test_parse_payload_revives_dates() {
        let payload = concat!(
            r#"{"title":"a","at":"2024-03-01T08:30:15.250Z","#,
            r#""list":["2020-01-02T03:04:05.000Z","x"]}"#,
        );
        let data = parse_payload(payload).unwrap();

        assert_eq!(data.as_object().unwrap()["title"], Value::from("a"));
        assert_eq!(data.as_object().unwrap()["at"], date(2024, 3, 1, 8, 30, 15));
        assert_eq!(
            data.as_object().unwrap()["list"],
            Value::Array(vec![date(2020, 1, 2, 3, 4, 5), Value::from("x")])
        );
    }

    #[test]
    fn test_plain_strings_stay_strings() {
        let data = parse_payload(r#"{"a":"2024-03-01","b":"2024-03-01T08:30:15Z"}"#).unwrap();
        assert_eq!(data.as_object().unwrap()["a"], Value::from("2024-03-01"));
        assert_eq!(data.as_object().unwrap()["b"], Value::from("2024-03-01T08:30:15Z"));
    }

    #[test]
    fn test_take_marker_removes_it() {
        let dom = reset_renderer();
        let root = dom.create_root("div");
        let blank = dom.create_text("\n  ");
        let marker = dom.create_comment(r#" s-data:{"n":1}"#);
        let span = dom.create_element("span");
        dom.insert_before(blank, root, None);
        dom.insert_before(marker, root, None);
        dom.insert_before(span, root, None);

        let data = take_marker(root).unwrap().unwrap();
        assert_eq!(data.as_object().unwrap()["n"], Value::from(1));
        assert_eq!(dom.children(root), vec![span]);
    }

    #[test]
    fn test_no_marker() {
        let dom = reset_renderer();
        let root = dom.create_root("div");
        let note = dom.create_comment("just a comment");
        dom.insert_before(note, root, None);

        assert!(take_marker(root).unwrap().is_none());
        assert_eq!(dom.children(root), vec![note]);
    }

    #[test]
    fn test_bad_payload_is_an_error() {
        let dom = reset_renderer();
        let root = dom.create_root("div");
        let marker = dom.create_comment("s-data:{oops");
        dom.insert_before(marker, root, None);

        assert!(matches!(take_marker(root), Err(CoreError::Hydration(_))));
    }
}
