//! Set command implementation.

use super::open_state;
use chrono::Utc;
use shelfsync_codec::{Value, ValueMap};
use shelfsync_protocol::{keys, StateKey};
use shelfsync_storage::StateStore;
use std::path::Path;
use tracing::debug;

/// Runs the set command.
///
/// Progress and position are written together with a fresh companion
/// timestamp, never earlier than the one already stored.
pub fn run(data_dir: &Path, key: &str, json: &str) -> Result<(), Box<dyn std::error::Error>> {
    let parsed: serde_json::Value =
        serde_json::from_str(json).map_err(|e| format!("Invalid JSON value: {e}"))?;
    let value = json_to_value(parsed);

    let store = open_state(data_dir)?;
    let mut stamp = Utc::now().timestamp_millis();
    if let Some(companion) = StateKey::parse(key).companion_key() {
        if let Some(previous) = store.get(&companion)?.as_ref().and_then(Value::as_integer) {
            stamp = stamp.max(previous.saturating_add(1));
        }
    }
    debug!(key, kind = value.type_name(), stamp, "setting entry");

    store.set_all(&keys::stamped_update(key, value, stamp))?;
    Ok(())
}

/// Converts JSON to a state value.
///
/// Numbers that fit an `i64` become integers; all others become floats.
pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::INFINITY)),
        },
        serde_json::Value::String(s) => Value::Text(s),
        serde_json::Value::Array(items) => {
            Value::Array(items.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(fields) => Value::Map(
            fields
                .into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect::<ValueMap>(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_nested_json() {
        let value = json_to_value(json!({
            "bookId": "b1",
            "rating": 4,
            "score": 0.75,
            "tags": ["a", null, true],
        }));
        assert_eq!(value.get("bookId"), Some(&Value::from("b1")));
        assert_eq!(value.get("rating"), Some(&Value::Integer(4)));
        assert_eq!(value.get("score"), Some(&Value::Float(0.75)));
        assert_eq!(
            value.get("tags"),
            Some(&Value::Array(vec![Value::from("a"), Value::Null, Value::Bool(true)]))
        );
    }

    #[test]
    fn large_unsigned_becomes_float() {
        let value = json_to_value(json!(u64::MAX));
        assert_eq!(value, Value::Float(u64::MAX as f64));
    }

    #[test]
    fn set_writes_entry() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), "theme", r#""dark""#).unwrap();
        assert!(run(dir.path(), "x", "{not json").is_err());

        let store = open_state(dir.path()).unwrap();
        assert_eq!(store.get("theme").unwrap(), Some(Value::from("dark")));
        assert_eq!(store.get("x").unwrap(), None);
        assert_eq!(store.get_all().unwrap().len(), 1);
    }

    #[test]
    fn set_scalar_stamps_its_companion() {
        let dir = tempfile::tempdir().unwrap();
        let before = Utc::now().timestamp_millis();
        run(dir.path(), "progress:b1", "0.4").unwrap();

        let store = open_state(dir.path()).unwrap();
        assert_eq!(store.get("progress:b1").unwrap(), Some(Value::Float(0.4)));
        let stamp = store
            .get("lastPlayedAt:b1")
            .unwrap()
            .and_then(|v| v.as_integer())
            .unwrap();
        assert!(stamp >= before);
    }

    #[test]
    fn set_scalar_never_moves_the_companion_back() {
        let dir = tempfile::tempdir().unwrap();
        let future = Utc::now().timestamp_millis() + 3_600_000;
        run(dir.path(), "lastPlayedAt:b1", &future.to_string()).unwrap();
        run(dir.path(), "position:b1", "12").unwrap();

        let store = open_state(dir.path()).unwrap();
        assert_eq!(
            store.get("lastPlayedAt:b1").unwrap(),
            Some(Value::Integer(future + 1))
        );
    }
}
