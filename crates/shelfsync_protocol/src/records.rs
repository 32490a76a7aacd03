//! Record types stored inside state entries.
//!
//! The merge engine works on raw [`Value`]s so unknown fields written by a
//! newer installation survive a merge untouched. These typed views are for
//! hosts building entries, and the free functions expose the few fields the
//! merge rules read.

use shelfsync_codec::{to_canonical_cbor, Value, ValueMap};

/// Field holding a record's intrinsic timestamp.
pub const TIMESTAMP_FIELD: &str = "timestamp";
/// Field holding a record's explicit id.
pub const ID_FIELD: &str = "id";
/// Field holding an unlock's time.
pub const UNLOCKED_AT_FIELD: &str = "unlockedAt";

/// Interprets a value as milliseconds since the epoch.
///
/// Integers are taken as-is; floats are truncated toward zero. Anything else
/// is not a timestamp.
#[allow(clippy::cast_possible_truncation)]
pub fn timestamp_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(n) => Some(*n),
        Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        _ => None,
    }
}

/// The `timestamp` field of a record, or 0 when absent or not numeric.
pub fn record_timestamp(record: &Value) -> i64 {
    record
        .get(TIMESTAMP_FIELD)
        .and_then(timestamp_millis)
        .unwrap_or(0)
}

/// Renders an `id` field; text is used verbatim and integers in decimal.
pub fn record_id(record: &Value) -> Option<String> {
    match record.get(ID_FIELD)? {
        Value::Text(id) if !id.is_empty() => Some(id.clone()),
        Value::Integer(n) => Some(n.to_string()),
        _ => None,
    }
}

/// An `id` field tagged with its type, so text `"7"` and integer `7` stay
/// distinct: `t:<text>` or `i:<decimal>`.
pub fn record_key(record: &Value) -> Option<String> {
    match record.get(ID_FIELD)? {
        Value::Text(id) if !id.is_empty() => Some(format!("t:{id}")),
        Value::Integer(n) => Some(format!("i:{n}")),
        _ => None,
    }
}

/// The key a bookmark is deduplicated by.
///
/// An explicit `id` is used when present. Otherwise the key is composed from
/// the canonical encoding of `position` and the numeric `timestamp`, which
/// together identify an immutable bookmark. Returns `None` for values that
/// are not maps.
pub fn bookmark_key(record: &Value) -> Option<String> {
    let fields = record.as_map()?;
    if let Some(id) = record_key(record) {
        return Some(format!("id:{id}"));
    }
    let position = fields.get("position").unwrap_or(&Value::Null);
    let encoded = to_canonical_cbor(position).ok()?;
    let hex: String = encoded.iter().map(|b| format!("{b:02x}")).collect();
    Some(format!("at:{hex}@{}", record_timestamp(record)))
}

fn text_field(fields: &ValueMap, name: &str) -> Option<String> {
    fields.get(name).and_then(Value::as_text).map(str::to_string)
}

/// A review of one book.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    /// Reviewed book.
    pub book_id: String,
    /// Review body.
    pub text: String,
    /// Optional star rating.
    pub rating: Option<i64>,
    /// When the review was written, in milliseconds.
    pub timestamp: i64,
}

impl ReviewRecord {
    /// Converts to the stored map shape.
    pub fn to_value(&self) -> Value {
        let mut fields = ValueMap::new();
        fields.insert("bookId".into(), Value::Text(self.book_id.clone()));
        fields.insert("text".into(), Value::Text(self.text.clone()));
        if let Some(rating) = self.rating {
            fields.insert("rating".into(), Value::Integer(rating));
        }
        fields.insert(TIMESTAMP_FIELD.into(), Value::Integer(self.timestamp));
        Value::Map(fields)
    }

    /// Reads a stored review; missing text defaults to empty.
    pub fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_map()?;
        Some(Self {
            book_id: text_field(fields, "bookId")?,
            text: text_field(fields, "text").unwrap_or_default(),
            rating: fields.get("rating").and_then(Value::as_integer),
            timestamp: record_timestamp(value),
        })
    }
}

/// A bookmark inside one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct BookmarkRecord {
    /// Explicit id, if the host assigned one.
    pub id: Option<String>,
    /// Location inside the entity (page, CFI string, seconds, ...).
    pub position: Value,
    /// User note.
    pub note: String,
    /// Creation time in milliseconds.
    pub timestamp: i64,
}

impl BookmarkRecord {
    /// Converts to the stored map shape.
    pub fn to_value(&self) -> Value {
        let mut fields = ValueMap::new();
        if let Some(id) = &self.id {
            fields.insert(ID_FIELD.into(), Value::Text(id.clone()));
        }
        fields.insert("position".into(), self.position.clone());
        fields.insert("note".into(), Value::Text(self.note.clone()));
        fields.insert(TIMESTAMP_FIELD.into(), Value::Integer(self.timestamp));
        Value::Map(fields)
    }

    /// Reads a stored bookmark.
    pub fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_map()?;
        Some(Self {
            id: record_id(value),
            position: fields.get("position").cloned().unwrap_or(Value::Null),
            note: text_field(fields, "note").unwrap_or_default(),
            timestamp: record_timestamp(value),
        })
    }
}

/// An unlocked achievement or item.
#[derive(Debug, Clone, PartialEq)]
pub struct UnlockRecord {
    /// Unique unlock id.
    pub id: String,
    /// When it was unlocked, in milliseconds.
    pub unlocked_at: i64,
    /// Any further fields, preserved as-is.
    pub extra: ValueMap,
}

impl UnlockRecord {
    /// Converts to the stored map shape.
    pub fn to_value(&self) -> Value {
        let mut fields = self.extra.clone();
        fields.insert(ID_FIELD.into(), Value::Text(self.id.clone()));
        fields.insert(UNLOCKED_AT_FIELD.into(), Value::Integer(self.unlocked_at));
        Value::Map(fields)
    }

    /// Reads a stored unlock; records without an id are rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        let mut extra = value.as_map()?.clone();
        let id = record_id(value)?;
        let unlocked_at = extra
            .get(UNLOCKED_AT_FIELD)
            .and_then(timestamp_millis)
            .unwrap_or(0);
        extra.remove(ID_FIELD);
        extra.remove(UNLOCKED_AT_FIELD);
        Some(Self {
            id,
            unlocked_at,
            extra,
        })
    }
}
