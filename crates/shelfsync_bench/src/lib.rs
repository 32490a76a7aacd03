//! Shared fixtures for Shelfsync benchmarks.

#![warn(missing_docs)]

use shelfsync_codec::{Value, ValueMap};
use shelfsync_protocol::keys;
use shelfsync_protocol::records::{BookmarkRecord, ReviewRecord, UnlockRecord};

/// Builds a library state with `books` books.
///
/// Every book gets progress, a review, three bookmarks and two tags. `seed`
/// shifts timestamps and ids so two states built with different seeds
/// overlap partially, as two devices' libraries would.
pub fn library_state(books: usize, seed: i64) -> ValueMap {
    let mut state = ValueMap::new();
    let mut reviews = ValueMap::new();
    let mut completed = Vec::new();
    let mut unlocks = Vec::new();

    for i in 0..books {
        let book = format!("book-{i}");
        let ts = seed * 1000 + i as i64;

        state.insert(keys::progress(&book), Value::Float((i % 100) as f64 / 100.0));
        state.insert(keys::last_played_at(&book), Value::Integer(ts));
        state.insert(
            keys::bookmarks(&book),
            Value::Array(
                (0..3)
                    .map(|n| {
                        BookmarkRecord {
                            id: None,
                            position: Value::Integer(n * 10 + seed),
                            note: format!("note {n}"),
                            timestamp: ts + n,
                        }
                        .to_value()
                    })
                    .collect(),
            ),
        );
        state.insert(
            keys::tags(&book),
            Value::from(vec![format!("tag-{}", i % 7), format!("tag-{}", (i as i64 + seed) % 11)]),
        );
        reviews.insert(
            book.clone(),
            ReviewRecord {
                book_id: book.clone(),
                text: format!("review of {book}"),
                rating: Some((i % 5) as i64 + 1),
                timestamp: ts,
            }
            .to_value(),
        );
        if (i as i64 + seed) % 3 == 0 {
            completed.push(Value::Text(book));
        }
        if i % 10 == 0 {
            unlocks.push(
                UnlockRecord {
                    id: format!("unlock-{}", i as i64 + seed),
                    unlocked_at: ts,
                    extra: ValueMap::new(),
                }
                .to_value(),
            );
        }
    }

    state.insert(keys::reviews(), Value::Map(reviews));
    state.insert(keys::completed_books(), Value::Array(completed));
    state.insert(keys::unlocks(), Value::Array(unlocks));
    state
}
