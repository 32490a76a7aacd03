//! Property-based test generators using proptest.
//!
//! Provides strategies for generating library states that are well-formed:
//! every entry has the shape its key's policy expects, and no list holds two
//! elements with the same merge key. Entity ids come from a small pool so
//! that independently generated states overlap.

use proptest::prelude::*;
use shelfsync_codec::{Value, ValueMap};
use shelfsync_protocol::records::{bookmark_key, BookmarkRecord, ReviewRecord, UnlockRecord};
use shelfsync_protocol::{keys, DeviceId};
use std::collections::HashSet;

/// Strategy for generating valid device ids.
pub fn device_id_strategy() -> impl Strategy<Value = DeviceId> {
    "[a-z][a-z0-9-]{0,15}".prop_map(|id| DeviceId::parse(id).expect("regex yields valid ids"))
}

/// Strategy for entity ids drawn from a small shared pool.
pub fn entity_id_strategy() -> impl Strategy<Value = String> {
    (0u8..4).prop_map(|n| format!("b{n}"))
}

/// Strategy for millisecond timestamps in a narrow range, so ties occur.
pub fn timestamp_strategy() -> impl Strategy<Value = i64> {
    0i64..64
}

/// Strategy for arbitrary encodable values.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        any::<f64>()
            .prop_filter("NaN is not encodable", |f| !f.is_nan())
            .prop_map(Value::Float),
        "[ -~]{0,12}".prop_map(Value::Text),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-zA-Z]{0,8}", inner, 0..6).prop_map(Value::Map),
        ]
    })
}

fn unique_texts(pattern: &'static str, max: usize) -> impl Strategy<Value = Value> {
    prop::collection::btree_set(pattern, 0..max)
        .prop_map(|set| Value::Array(set.into_iter().map(Value::Text).collect()))
}

/// Strategy for a completed-books set.
pub fn completed_books_strategy() -> impl Strategy<Value = Value> {
    unique_texts("b[0-9]", 6)
}

/// Strategy for a tag set.
pub fn tags_strategy() -> impl Strategy<Value = Value> {
    unique_texts("[a-z]{1,3}", 5)
}

/// Strategy for a review record of `book`.
pub fn review_strategy(book: String) -> impl Strategy<Value = Value> {
    ("[a-z ]{0,10}", prop::option::of(1i64..=5), timestamp_strategy()).prop_map(
        move |(text, rating, timestamp)| {
            ReviewRecord {
                book_id: book.clone(),
                text,
                rating,
                timestamp,
            }
            .to_value()
        },
    )
}

/// Strategy for a reviews map keyed by book id.
pub fn reviews_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_set(entity_id_strategy(), 0..4)
        .prop_flat_map(|books| {
            books
                .into_iter()
                .map(|book| (Just(book.clone()), review_strategy(book)))
                .collect::<Vec<_>>()
        })
        .prop_map(|pairs| Value::Map(pairs.into_iter().collect()))
}

/// Strategy for a single bookmark record.
pub fn bookmark_strategy() -> impl Strategy<Value = Value> {
    (
        prop::option::of("bm[0-9]"),
        0i64..8,
        "[a-z]{0,6}",
        timestamp_strategy(),
    )
        .prop_map(|(id, position, note, timestamp)| {
            BookmarkRecord {
                id,
                position: Value::Integer(position),
                note,
                timestamp,
            }
            .to_value()
        })
}

/// Strategy for a bookmark list without duplicate keys.
pub fn bookmarks_strategy() -> impl Strategy<Value = Value> {
    prop::collection::vec(bookmark_strategy(), 0..6).prop_map(|items| {
        let mut seen = HashSet::new();
        Value::Array(
            items
                .into_iter()
                .filter(|item| bookmark_key(item).is_some_and(|key| seen.insert(key)))
                .collect(),
        )
    })
}

/// Strategy for an unlock list without duplicate ids.
pub fn unlocks_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("u[0-9]", 0i64..1000, 0..5).prop_map(|unlocks| {
        Value::Array(
            unlocks
                .into_iter()
                .map(|(id, unlocked_at)| {
                    UnlockRecord {
                        id,
                        unlocked_at,
                        extra: ValueMap::new(),
                    }
                    .to_value()
                })
                .collect(),
        )
    })
}

/// Strategy for the entries of one entity: progress with its companion,
/// plus optional bookmarks and tags.
pub fn entity_entries_strategy() -> impl Strategy<Value = Vec<(String, Value)>> {
    (
        entity_id_strategy(),
        prop::option::of((0.0f64..=1.0, timestamp_strategy())),
        prop::option::of(bookmarks_strategy()),
        prop::option::of(tags_strategy()),
    )
        .prop_map(|(id, progress, bookmarks, tags)| {
            let mut entries = Vec::new();
            if let Some((progress, played_at)) = progress {
                entries.push((keys::progress(&id), Value::Float(progress)));
                entries.push((keys::last_played_at(&id), Value::Integer(played_at)));
            }
            if let Some(bookmarks) = bookmarks {
                entries.push((keys::bookmarks(&id), bookmarks));
            }
            if let Some(tags) = tags {
                entries.push((keys::tags(&id), tags));
            }
            entries
        })
}

/// Strategy for a complete well-formed library state.
pub fn state_strategy() -> impl Strategy<Value = ValueMap> {
    (
        prop::option::of(completed_books_strategy()),
        prop::option::of(reviews_strategy()),
        prop::option::of(unlocks_strategy()),
        prop::collection::vec(entity_entries_strategy(), 0..4),
        prop::option::of("[a-z]{1,6}"),
    )
        .prop_map(|(completed, reviews, unlocks, entities, theme)| {
            let mut state = ValueMap::new();
            if let Some(completed) = completed {
                state.insert(keys::completed_books(), completed);
            }
            if let Some(reviews) = reviews {
                state.insert(keys::reviews(), reviews);
            }
            if let Some(unlocks) = unlocks {
                state.insert(keys::unlocks(), unlocks);
            }
            for (key, value) in entities.into_iter().flatten() {
                state.insert(key, value);
            }
            if let Some(theme) = theme {
                state.insert("theme".to_string(), Value::Text(theme));
            }
            state
        })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
