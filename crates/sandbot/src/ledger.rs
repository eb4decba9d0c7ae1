//! Play history ("gallery") ledger.
//!
//! The device never reports per-file completion, so the ledger records what
//! was dispatched, not what finished. Entries are newest-first and replays of
//! the same file are kept as separate entries.

#![allow(missing_docs)]

use smol_str::SmolStr;
use time::macros::format_description;
use time::OffsetDateTime;

/// Extension of playlist (sequence) files.
pub const PLAYLIST_EXTENSION: &str = ".seq";

/// Ledger-unique entry identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

impl EntryId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    id: EntryId,
    file_name: SmolStr,
    played_at: OffsetDateTime,
}

impl HistoryEntry {
    #[must_use]
    pub fn id(&self) -> EntryId {
        self.id
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub fn played_at(&self) -> OffsetDateTime {
        self.played_at
    }
}

/// Append-only record of dispatched plays.
#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
    next_id: u64,
}

impl HistoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a play at the head of the ledger.
    pub fn record(&mut self, file_name: &str, played_at: OffsetDateTime) -> &HistoryEntry {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            0,
            HistoryEntry {
                id,
                file_name: file_name.into(),
                played_at,
            },
        );
        &self.entries[0]
    }

    /// Entries, newest first.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// File names in the order they were queued (oldest first).
#[must_use]
pub fn to_playlist(entries: &[HistoryEntry]) -> Vec<SmolStr> {
    entries
        .iter()
        .rev()
        .map(|entry| entry.file_name.clone())
        .collect()
}

/// Sequence-file body for a playlist.
#[must_use]
pub fn playlist_content(names: &[SmolStr]) -> String {
    names
        .iter()
        .map(SmolStr::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Append `.seq` unless the name already ends with it.
#[must_use]
pub fn playlist_file_name(name: &str) -> String {
    let name = name.trim();
    if name.ends_with(PLAYLIST_EXTENSION) {
        name.to_string()
    } else {
        format!("{name}{PLAYLIST_EXTENSION}")
    }
}

/// Timestamp used in listings, in the offset it was recorded with (UTC for
/// entries the engine records).
#[must_use]
pub fn format_timestamp(at: OffsetDateTime) -> String {
    let format = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second] [offset_hour sign:mandatory]:[offset_minute]"
    );
    at.format(&format).unwrap_or_else(|_| at.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(playlist: &[SmolStr]) -> Vec<&str> {
        playlist.iter().map(SmolStr::as_str).collect()
    }

    #[test]
    fn replays_are_distinct_entries_newest_first() {
        let mut ledger = HistoryLedger::new();
        let now = OffsetDateTime::UNIX_EPOCH;
        let first = ledger.record("a.thr", now).id();
        let second = ledger.record("a.thr", now).id();
        assert_ne!(first, second);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.entries()[0].id(), second);
        assert_eq!(ledger.entries()[1].id(), first);
        assert!(ledger.entries().iter().all(|entry| entry.file_name() == "a.thr"));
        let playlist = to_playlist(ledger.entries());
        assert_eq!(names(&playlist), vec!["a.thr", "a.thr"]);
    }

    #[test]
    fn playlist_reads_oldest_first() {
        let mut ledger = HistoryLedger::new();
        for name in ["one.thr", "two.thr", "three.thr"] {
            ledger.record(name, OffsetDateTime::UNIX_EPOCH);
        }
        let playlist = to_playlist(ledger.entries());
        assert_eq!(names(&playlist), vec!["one.thr", "two.thr", "three.thr"]);
        assert_eq!(playlist_content(&playlist), "one.thr\ntwo.thr\nthree.thr");
    }

    #[test]
    fn playlist_names_get_sequence_extension() {
        assert_eq!(playlist_file_name("evening"), "evening.seq");
        assert_eq!(playlist_file_name("evening.seq"), "evening.seq");
    }

    #[test]
    fn timestamps_carry_their_offset() {
        insta::assert_snapshot!(format_timestamp(OffsetDateTime::UNIX_EPOCH), @"1970-01-01 00:00:00 +00:00");
        insta::assert_snapshot!(
            format_timestamp(time::macros::datetime!(2024-05-01 21:30:05 +02:00)),
            @"2024-05-01 21:30:05 +02:00"
        );
    }
}
