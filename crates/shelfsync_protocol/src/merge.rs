//! Two-way merge of local state with a remote snapshot payload.
//!
//! The merge is a pure function of its inputs: no I/O, no clock, no locks.
//! Every key in either input is classified once through [`StateKey::parse`]
//! and resolved by the rule for its [`PolicyClass`]:
//!
//! | Policy | Rule |
//! |---|---|
//! | TimestampedScalar | side with the strictly greater companion timestamp; tie keeps local |
//! | CompanionTimestamp | greater value; tie keeps local |
//! | KeyedRecordMap | per entry, later `timestamp` field |
//! | OrderedKeyedList | union by derived bookmark key |
//! | UniqueIdList | union by `id`, local copy kept |
//! | FlatSet | set union |
//! | RemoteWins | remote value |
//!
//! A key present on one side only is adopted from that side. A value whose
//! shape does not fit its policy (a scalar where a list belongs, a list
//! element that is not a record) falls back to the remote value, so the
//! merge is total over arbitrary inputs.
//!
//! Output lists keep local elements in local order and append remote-only
//! elements in remote order, which makes `merge(s, s) == s` hold exactly.

use crate::device::DeviceId;
use crate::keys::{PolicyClass, StateKey};
use crate::records::{bookmark_key, record_key, record_timestamp, timestamp_millis};
use crate::snapshot::Snapshot;
use shelfsync_codec::{to_canonical_cbor, Value, ValueMap};
use std::collections::{BTreeSet, HashSet};
use std::hash::Hash;

/// Counts of how each key was resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// The remote snapshot came from this device and was not merged.
    pub self_echo: bool,
    /// Keys whose merged value equals the local value.
    pub kept_local: usize,
    /// Keys whose merged value was taken from the remote side by a policy rule.
    pub took_remote: usize,
    /// Keys whose merged value combines both sides.
    pub combined: usize,
    /// Keys that only existed remotely and were added.
    pub added: usize,
    /// Keys whose values did not fit their policy and took the remote value.
    pub shape_fallbacks: Vec<String>,
    /// Keys without a policy class that took the remote value.
    pub unclassified: usize,
}

impl MergeReport {
    /// Number of keys whose local value was replaced or added.
    pub fn changed(&self) -> usize {
        self.took_remote + self.combined + self.added + self.shape_fallbacks.len() + self.unclassified
    }
}

/// How a key present on both sides was resolved.
enum Resolution {
    KeepLocal,
    TakeRemote,
    Combined(Value),
    ShapeMismatch,
}

/// Merges `remote` into `local`.
///
/// Returns `local` unchanged when `remote_origin` equals `self_id`: a device
/// never merges a snapshot it authored.
pub fn merge(
    local: &ValueMap,
    remote: &ValueMap,
    self_id: &DeviceId,
    remote_origin: &DeviceId,
) -> ValueMap {
    merge_with_report(local, remote, self_id, remote_origin).0
}

/// Merges a decoded snapshot into `local`. See [`merge`].
pub fn merge_snapshot(
    local: &ValueMap,
    snapshot: &Snapshot,
    self_id: &DeviceId,
) -> (ValueMap, MergeReport) {
    merge_with_report(local, &snapshot.payload, self_id, &snapshot.origin_device_id)
}

/// Like [`merge`], also reporting how each key was resolved.
pub fn merge_with_report(
    local: &ValueMap,
    remote: &ValueMap,
    self_id: &DeviceId,
    remote_origin: &DeviceId,
) -> (ValueMap, MergeReport) {
    let mut report = MergeReport::default();

    if self_id == remote_origin {
        report.self_echo = true;
        report.kept_local = local.len();
        return (local.clone(), report);
    }

    let keys: BTreeSet<&String> = local.keys().chain(remote.keys()).collect();
    let mut merged = ValueMap::new();

    for key in keys {
        let value = match (local.get(key), remote.get(key)) {
            (Some(l), None) => {
                report.kept_local += 1;
                l.clone()
            }
            (None, Some(r)) => {
                report.added += 1;
                r.clone()
            }
            (Some(l), Some(r)) => {
                let parsed = StateKey::parse(key);
                if parsed.policy() == PolicyClass::RemoteWins {
                    report.unclassified += 1;
                    r.clone()
                } else {
                    match resolve(&parsed, l, r, local, remote) {
                        Resolution::KeepLocal => {
                            report.kept_local += 1;
                            l.clone()
                        }
                        Resolution::TakeRemote => {
                            report.took_remote += 1;
                            r.clone()
                        }
                        Resolution::Combined(v) if &v == l => {
                            report.kept_local += 1;
                            v
                        }
                        Resolution::Combined(v) => {
                            report.combined += 1;
                            v
                        }
                        Resolution::ShapeMismatch => {
                            report.shape_fallbacks.push(key.clone());
                            r.clone()
                        }
                    }
                }
            }
            (None, None) => continue,
        };
        merged.insert(key.clone(), value);
    }

    (merged, report)
}

fn resolve(
    key: &StateKey<'_>,
    l: &Value,
    r: &Value,
    local: &ValueMap,
    remote: &ValueMap,
) -> Resolution {
    match key.policy() {
        PolicyClass::TimestampedScalar => resolve_timestamped_scalar(key, l, r, local, remote),
        PolicyClass::CompanionTimestamp => resolve_companion(l, r),
        PolicyClass::KeyedRecordMap => resolve_record_map(l, r),
        PolicyClass::OrderedKeyedList => union_lists(l, r, bookmark_key),
        PolicyClass::UniqueIdList => union_lists(l, r, unlock_key),
        PolicyClass::FlatSet => union_lists(l, r, set_member_key),
        PolicyClass::RemoteWins => Resolution::TakeRemote,
    }
}

fn later_wins(local_ts: i64, remote_ts: i64) -> Resolution {
    if remote_ts > local_ts {
        Resolution::TakeRemote
    } else {
        Resolution::KeepLocal
    }
}

fn resolve_timestamped_scalar(
    key: &StateKey<'_>,
    l: &Value,
    r: &Value,
    local: &ValueMap,
    remote: &ValueMap,
) -> Resolution {
    if !l.is_scalar() || !r.is_scalar() {
        return Resolution::ShapeMismatch;
    }
    let Some(companion) = key.companion_key() else {
        return Resolution::ShapeMismatch;
    };
    let stamp = |side: &ValueMap| {
        side.get(&companion)
            .and_then(timestamp_millis)
            .unwrap_or(0)
    };
    later_wins(stamp(local), stamp(remote))
}

fn resolve_companion(l: &Value, r: &Value) -> Resolution {
    match (timestamp_millis(l), timestamp_millis(r)) {
        (Some(lt), Some(rt)) => later_wins(lt, rt),
        _ => Resolution::ShapeMismatch,
    }
}

fn resolve_record_map(l: &Value, r: &Value) -> Resolution {
    let (Some(local_records), Some(remote_records)) = (l.as_map(), r.as_map()) else {
        return Resolution::ShapeMismatch;
    };

    let mut merged = local_records.clone();
    for (id, remote_record) in remote_records {
        match local_records.get(id) {
            None => {
                merged.insert(id.clone(), remote_record.clone());
            }
            Some(local_record) => {
                if remote_record_wins(local_record, remote_record) {
                    merged.insert(id.clone(), remote_record.clone());
                }
            }
        }
    }
    Resolution::Combined(Value::Map(merged))
}

/// Later intrinsic timestamp wins. Equal timestamps with different content
/// are ordered by canonical encoding so both merge directions agree.
fn remote_record_wins(local: &Value, remote: &Value) -> bool {
    let (lt, rt) = (record_timestamp(local), record_timestamp(remote));
    if rt != lt {
        return rt > lt;
    }
    if local == remote {
        return false;
    }
    match (to_canonical_cbor(local), to_canonical_cbor(remote)) {
        (Ok(lb), Ok(rb)) => rb > lb,
        _ => false,
    }
}

fn unlock_key(record: &Value) -> Option<String> {
    record.as_map()?;
    record_key(record)
}

fn set_member_key(member: &Value) -> Option<Vec<u8>> {
    to_canonical_cbor(member).ok()
}

/// Unions two lists by a derived key, keeping the first copy of each key.
///
/// Fails with a shape mismatch if either side is not a list or any element
/// has no key.
fn union_lists<K, F>(l: &Value, r: &Value, key_of: F) -> Resolution
where
    K: Eq + Hash,
    F: Fn(&Value) -> Option<K>,
{
    let (Some(local_items), Some(remote_items)) = (l.as_array(), r.as_array()) else {
        return Resolution::ShapeMismatch;
    };

    let mut seen = HashSet::with_capacity(local_items.len() + remote_items.len());
    let mut merged = Vec::with_capacity(local_items.len() + remote_items.len());
    for item in local_items.iter().chain(remote_items) {
        let Some(key) = key_of(item) else {
            return Resolution::ShapeMismatch;
        };
        if seen.insert(key) {
            merged.push(item.clone());
        }
    }
    Resolution::Combined(Value::Array(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{BookmarkRecord, ReviewRecord};

    fn device(id: &str) -> DeviceId {
        DeviceId::parse(id).unwrap()
    }

    fn state<const N: usize>(entries: [(&str, Value); N]) -> ValueMap {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn merge_ab(local: &ValueMap, remote: &ValueMap) -> ValueMap {
        merge(local, remote, &device("a"), &device("b"))
    }

    fn review(book: &str, text: &str, ts: i64) -> Value {
        ReviewRecord {
            book_id: book.into(),
            text: text.into(),
            rating: None,
            timestamp: ts,
        }
        .to_value()
    }

    fn bookmark(id: Option<&str>, position: i64, ts: i64) -> Value {
        BookmarkRecord {
            id: id.map(str::to_string),
            position: Value::Integer(position),
            note: String::new(),
            timestamp: ts,
        }
        .to_value()
    }

    #[test]
    fn self_echo_returns_local_unchanged() {
        let local = state([("progress:b1", Value::Float(0.1))]);
        let remote = state([
            ("progress:b1", Value::Float(0.9)),
            ("lastPlayedAt:b1", Value::Integer(9999)),
        ]);

        let (merged, report) = merge_with_report(&local, &remote, &device("a"), &device("a"));
        assert_eq!(merged, local);
        assert!(report.self_echo);
        assert_eq!(report.changed(), 0);
    }

    #[test]
    fn one_sided_keys_are_adopted() {
        let local = state([("theme", Value::from("dark"))]);
        let remote = state([("completedBooks", Value::from(vec!["b9"]))]);
        let merged = merge_ab(&local, &remote);
        assert_eq!(merged.get("theme"), Some(&Value::from("dark")));
        assert_eq!(merged.get("completedBooks"), Some(&Value::from(vec!["b9"])));
    }

    #[test]
    fn completed_sets_union() {
        let local = state([("completedBooks", Value::from(vec!["A", "B"]))]);
        let remote = state([("completedBooks", Value::from(vec!["B", "C"]))]);
        let merged = merge_ab(&local, &remote);
        assert_eq!(
            merged.get("completedBooks"),
            Some(&Value::from(vec!["A", "B", "C"]))
        );
    }

    #[test]
    fn tag_sets_union() {
        let local = state([("tags:b1", Value::from(vec!["scifi"]))]);
        let remote = state([("tags:b1", Value::from(vec!["classic", "scifi"]))]);
        let merged = merge_ab(&local, &remote);
        assert_eq!(
            merged.get("tags:b1"),
            Some(&Value::from(vec!["scifi", "classic"]))
        );
    }

    fn progress_state(progress: f64, ts: i64) -> ValueMap {
        state([
            ("progress:X", Value::Float(progress)),
            ("lastPlayedAt:X", Value::Integer(ts)),
        ])
    }

    #[test]
    fn newer_remote_progress_wins() {
        let merged = merge_ab(&progress_state(0.2, 100), &progress_state(0.7, 200));
        assert_eq!(merged, progress_state(0.7, 200));
    }

    #[test]
    fn newer_local_progress_is_kept() {
        let merged = merge_ab(&progress_state(0.2, 200), &progress_state(0.7, 100));
        assert_eq!(merged, progress_state(0.2, 200));
    }

    #[test]
    fn progress_tie_keeps_local() {
        let merged = merge_ab(&progress_state(0.2, 100), &progress_state(0.7, 100));
        assert_eq!(merged, progress_state(0.2, 100));
    }

    #[test]
    fn missing_companion_counts_as_zero() {
        let local = state([("position:t1", Value::Integer(30))]);
        let remote = state([
            ("position:t1", Value::Integer(95)),
            ("lastPlayedAt:t1", Value::Integer(1)),
        ]);
        let merged = merge_ab(&local, &remote);
        assert_eq!(merged.get("position:t1"), Some(&Value::Integer(95)));
        assert_eq!(merged.get("lastPlayedAt:t1"), Some(&Value::Integer(1)));

        // Neither side stamped: tie, local kept.
        let remote = state([("position:t1", Value::Integer(95))]);
        assert_eq!(merge_ab(&local, &remote), local);
    }

    #[test]
    fn later_review_wins_and_distinct_books_are_kept() {
        let local = state([(
            "reviews",
            Value::map([("X", review("X", "ok", 10)), ("L", review("L", "mine", 5))]),
        )]);
        let remote = state([(
            "reviews",
            Value::map([("X", review("X", "better", 20)), ("R", review("R", "theirs", 1))]),
        )]);

        let merged = merge_ab(&local, &remote);
        let reviews = merged.get("reviews").unwrap();
        assert_eq!(reviews.get("X"), Some(&review("X", "better", 20)));
        assert_eq!(reviews.get("L"), Some(&review("L", "mine", 5)));
        assert_eq!(reviews.get("R"), Some(&review("R", "theirs", 1)));
    }

    #[test]
    fn older_remote_review_loses() {
        let local = state([("reviews", Value::map([("X", review("X", "new", 30))]))]);
        let remote = state([("reviews", Value::map([("X", review("X", "old", 20))]))]);
        assert_eq!(merge_ab(&local, &remote), local);
    }

    #[test]
    fn review_tie_is_order_independent() {
        let local = state([("reviews", Value::map([("X", review("X", "aaa", 10))]))]);
        let remote = state([("reviews", Value::map([("X", review("X", "zzz", 10))]))]);
        assert_eq!(merge_ab(&local, &remote), merge_ab(&remote, &local));
    }

    #[test]
    fn duplicate_bookmarks_collapse() {
        let local = state([(
            "bookmarks:b1",
            Value::Array(vec![bookmark(None, 12, 100), bookmark(Some("k"), 40, 300)]),
        )]);
        let remote = state([(
            "bookmarks:b1",
            Value::Array(vec![bookmark(None, 12, 100), bookmark(None, 77, 200)]),
        )]);

        let merged = merge_ab(&local, &remote);
        let list = merged.get("bookmarks:b1").and_then(Value::as_array).unwrap();
        assert_eq!(
            list,
            &[
                bookmark(None, 12, 100),
                bookmark(Some("k"), 40, 300),
                bookmark(None, 77, 200)
            ]
        );
    }

    #[test]
    fn unlock_duplicates_keep_local_copy() {
        let local_copy = Value::map([
            ("id", Value::from("streak-7")),
            ("unlockedAt", Value::Integer(100)),
        ]);
        let remote_copy = Value::map([
            ("id", Value::from("streak-7")),
            ("unlockedAt", Value::Integer(105)),
        ]);
        let other = Value::map([("id", Value::from("first-review"))]);

        let local = state([("unlocks", Value::Array(vec![local_copy.clone()]))]);
        let remote = state([("unlocks", Value::Array(vec![remote_copy, other.clone()]))]);

        let merged = merge_ab(&local, &remote);
        assert_eq!(
            merged.get("unlocks"),
            Some(&Value::Array(vec![local_copy, other]))
        );
    }

    #[test]
    fn text_and_integer_ids_do_not_collapse() {
        let text_unlock = Value::map([("id", Value::from("7"))]);
        let int_unlock = Value::map([("id", Value::Integer(7))]);
        let text_mark = Value::map([("id", Value::from("7")), ("note", Value::from("a"))]);
        let int_mark = Value::map([("id", Value::Integer(7)), ("note", Value::from("b"))]);

        let local = state([
            ("unlocks", Value::Array(vec![text_unlock.clone()])),
            ("bookmarks:b1", Value::Array(vec![text_mark.clone()])),
        ]);
        let remote = state([
            ("unlocks", Value::Array(vec![int_unlock.clone()])),
            ("bookmarks:b1", Value::Array(vec![int_mark.clone()])),
        ]);

        let merged = merge_ab(&local, &remote);
        assert_eq!(
            merged.get("unlocks"),
            Some(&Value::Array(vec![text_unlock, int_unlock]))
        );
        assert_eq!(
            merged.get("bookmarks:b1"),
            Some(&Value::Array(vec![text_mark, int_mark]))
        );
    }

    #[test]
    fn unclassified_keys_take_remote() {
        let local = state([("theme", Value::from("dark"))]);
        let remote = state([("theme", Value::from("light"))]);
        let (merged, report) = merge_with_report(&local, &remote, &device("a"), &device("b"));
        assert_eq!(merged.get("theme"), Some(&Value::from("light")));
        assert_eq!(report.unclassified, 1);
    }

    #[test]
    fn shape_mismatch_falls_back_to_remote() {
        let local = state([
            ("completedBooks", Value::from("b1")),
            ("unlocks", Value::Array(vec![Value::map([("name", Value::from("no id"))])])),
            ("lastPlayedAt:b1", Value::from("yesterday")),
            ("progress:b2", Value::from(vec![0.5])),
        ]);
        let remote = state([
            ("completedBooks", Value::from(vec!["b2"])),
            ("unlocks", Value::Array(vec![])),
            ("lastPlayedAt:b1", Value::Integer(5)),
            ("progress:b2", Value::Float(0.4)),
        ]);

        let (merged, report) = merge_with_report(&local, &remote, &device("a"), &device("b"));
        assert_eq!(merged, remote);
        assert_eq!(report.shape_fallbacks.len(), 4);
    }

    #[test]
    fn merge_is_idempotent_on_identical_content() {
        let s = state([
            ("completedBooks", Value::from(vec!["b1", "b2"])),
            ("progress:b1", Value::Float(0.5)),
            ("lastPlayedAt:b1", Value::Integer(1000)),
            ("reviews", Value::map([("b1", review("b1", "fine", 3))])),
            ("bookmarks:b1", Value::Array(vec![bookmark(None, 1, 2)])),
            ("theme", Value::from("dark")),
        ]);
        let (merged, report) = merge_with_report(&s, &s.clone(), &device("a"), &device("b"));
        assert_eq!(merged, s);
        assert_eq!(report.kept_local, 5);
        assert_eq!(report.unclassified, 1);
    }

    #[test]
    fn merge_snapshot_uses_origin() {
        use chrono::{TimeZone, Utc};
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let local = state([("completedBooks", Value::from(vec!["b1"]))]);
        let snapshot = Snapshot::new(
            device("b"),
            at,
            state([("completedBooks", Value::from(vec!["b2"]))]),
        );

        let (merged, _) = merge_snapshot(&local, &snapshot, &device("a"));
        assert_eq!(merged.get("completedBooks"), Some(&Value::from(vec!["b1", "b2"])));

        let (merged, report) = merge_snapshot(&local, &snapshot, &device("b"));
        assert_eq!(merged, local);
        assert!(report.self_echo);
    }
}
