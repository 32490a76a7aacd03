//! Typed classification of state keys.
//!
//! A state key encodes which merge rule applies to it. Keys are parsed once
//! into a [`StateKey`]; the merge engine dispatches on [`KeyKind::policy`]
//! and never inspects key strings itself.
//!
//! ```text
//! progress:<id>      timestamped scalar, companion lastPlayedAt:<id>
//! position:<id>      timestamped scalar, companion lastPlayedAt:<id>
//! lastPlayedAt:<id>  companion timestamp
//! reviews            keyed record map (bookId -> review)
//! bookmarks:<id>     keyed list of bookmark records
//! unlocks            list of unlock records, unique by id
//! completedBooks     flat set of ids
//! tags:<id>          flat set of tags for one entity
//! ```

use shelfsync_codec::{Value, ValueMap};
use std::fmt;

const PROGRESS: &str = "progress";
const POSITION: &str = "position";
const LAST_PLAYED_AT: &str = "lastPlayedAt";
const BOOKMARKS: &str = "bookmarks";
const TAGS: &str = "tags";
const REVIEWS: &str = "reviews";
const UNLOCKS: &str = "unlocks";
const COMPLETED_BOOKS: &str = "completedBooks";

/// Separator between a key's kind prefix and its entity id.
pub const ENTITY_SEPARATOR: char = ':';

/// What a state key stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Reading progress for one entity.
    Progress,
    /// Playback position for one entity.
    Position,
    /// When progress or position for one entity last changed.
    LastPlayedAt,
    /// All reviews, keyed by book id.
    Reviews,
    /// Bookmarks for one entity.
    Bookmarks,
    /// Unlock records.
    Unlocks,
    /// Ids of completed books.
    CompletedBooks,
    /// Tags attached to one entity.
    Tags,
    /// A key no merge rule knows about.
    Unclassified,
}

/// The merge rule family applied to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyClass {
    /// Scalar resolved by its companion timestamp; ties keep local.
    TimestampedScalar,
    /// Timestamp entry; the greater value wins, ties keep local.
    CompanionTimestamp,
    /// Map of records; per entry, the later intrinsic timestamp wins.
    KeyedRecordMap,
    /// List of immutable records, unioned by derived key.
    OrderedKeyedList,
    /// List of records unioned by `id`; duplicates keep the local copy.
    UniqueIdList,
    /// Set union.
    FlatSet,
    /// Remote value replaces local unconditionally.
    RemoteWins,
}

impl KeyKind {
    /// Returns the merge rule for this kind.
    pub fn policy(self) -> PolicyClass {
        match self {
            KeyKind::Progress | KeyKind::Position => PolicyClass::TimestampedScalar,
            KeyKind::LastPlayedAt => PolicyClass::CompanionTimestamp,
            KeyKind::Reviews => PolicyClass::KeyedRecordMap,
            KeyKind::Bookmarks => PolicyClass::OrderedKeyedList,
            KeyKind::Unlocks => PolicyClass::UniqueIdList,
            KeyKind::CompletedBooks | KeyKind::Tags => PolicyClass::FlatSet,
            KeyKind::Unclassified => PolicyClass::RemoteWins,
        }
    }

    fn from_entity_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            PROGRESS => Some(KeyKind::Progress),
            POSITION => Some(KeyKind::Position),
            LAST_PLAYED_AT => Some(KeyKind::LastPlayedAt),
            BOOKMARKS => Some(KeyKind::Bookmarks),
            TAGS => Some(KeyKind::Tags),
            _ => None,
        }
    }

    fn from_global_key(key: &str) -> Option<Self> {
        match key {
            REVIEWS => Some(KeyKind::Reviews),
            UNLOCKS => Some(KeyKind::Unlocks),
            COMPLETED_BOOKS => Some(KeyKind::CompletedBooks),
            _ => None,
        }
    }
}

/// A parsed state key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateKey<'a> {
    /// What the key stores.
    pub kind: KeyKind,
    /// Entity the key belongs to, for per-entity kinds.
    pub entity_id: Option<&'a str>,
}

impl<'a> StateKey<'a> {
    /// Classifies a raw key.
    ///
    /// Per-entity prefixes require a non-empty id after the separator; a
    /// known prefix with an empty id, or a global name with an id attached,
    /// is [`KeyKind::Unclassified`].
    pub fn parse(key: &'a str) -> Self {
        if let Some((prefix, id)) = key.split_once(ENTITY_SEPARATOR) {
            if !id.is_empty() {
                if let Some(kind) = KeyKind::from_entity_prefix(prefix) {
                    return Self {
                        kind,
                        entity_id: Some(id),
                    };
                }
            }
        } else if let Some(kind) = KeyKind::from_global_key(key) {
            return Self {
                kind,
                entity_id: None,
            };
        }

        Self {
            kind: KeyKind::Unclassified,
            entity_id: None,
        }
    }

    /// Returns the merge rule for this key.
    pub fn policy(&self) -> PolicyClass {
        self.kind.policy()
    }

    /// For timestamped scalars, the key of the companion timestamp entry.
    pub fn companion_key(&self) -> Option<String> {
        match (self.kind.policy(), self.entity_id) {
            (PolicyClass::TimestampedScalar, Some(id)) => Some(last_played_at(id)),
            _ => None,
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyKind::Progress => PROGRESS,
            KeyKind::Position => POSITION,
            KeyKind::LastPlayedAt => LAST_PLAYED_AT,
            KeyKind::Reviews => REVIEWS,
            KeyKind::Bookmarks => BOOKMARKS,
            KeyKind::Unlocks => UNLOCKS,
            KeyKind::CompletedBooks => COMPLETED_BOOKS,
            KeyKind::Tags => TAGS,
            KeyKind::Unclassified => "unclassified",
        };
        f.write_str(name)
    }
}

fn entity_key(prefix: &str, id: &str) -> String {
    format!("{prefix}{ENTITY_SEPARATOR}{id}")
}

/// Key of the reading progress for `id`.
pub fn progress(id: &str) -> String {
    entity_key(PROGRESS, id)
}

/// Key of the playback position for `id`.
pub fn position(id: &str) -> String {
    entity_key(POSITION, id)
}

/// Key of the companion timestamp for `id`.
pub fn last_played_at(id: &str) -> String {
    entity_key(LAST_PLAYED_AT, id)
}

/// Key of the bookmark list for `id`.
pub fn bookmarks(id: &str) -> String {
    entity_key(BOOKMARKS, id)
}

/// Key of the tag set for `id`.
pub fn tags(id: &str) -> String {
    entity_key(TAGS, id)
}

/// Key of the reviews map.
pub fn reviews() -> String {
    REVIEWS.to_string()
}

/// Key of the unlock list.
pub fn unlocks() -> String {
    UNLOCKS.to_string()
}

/// Key of the completed-books set.
pub fn completed_books() -> String {
    COMPLETED_BOOKS.to_string()
}

/// Entries to write for a local edit of `key`.
///
/// A timestamped scalar is returned together with its companion stamped
/// `at_millis`, so both land in the same `set_all`. Any other key is
/// returned alone.
pub fn stamped_update(key: &str, value: Value, at_millis: i64) -> ValueMap {
    let mut entries = ValueMap::new();
    if let Some(companion) = StateKey::parse(key).companion_key() {
        entries.insert(companion, Value::Integer(at_millis));
    }
    entries.insert(key.to_string(), value);
    entries
}
