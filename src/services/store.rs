use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::{Serialize, Serializer};

use crate::error::{Result, ViewerError};

/// A saved search term and how often it has matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchTermRecord {
    pub term: String,
    pub hits: i64,
}

/// A note attached to a snippet of some file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    pub id: i64,
    /// Seconds since the Unix epoch; serialized as RFC 3339 UTC
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: i64,
    pub file: String,
    pub snippet: String,
    pub note: String,
}

impl CommentRecord {
    pub fn created_at(&self) -> String {
        format_timestamp(self.timestamp)
    }
}

/// RFC 3339 UTC with second precision; out-of-range values fall back to the raw number
pub fn format_timestamp(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| secs.to_string())
}

fn serialize_timestamp<S: Serializer>(secs: &i64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(*secs))
}

/// SQLite-backed saved searches and comments
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open the store at `path`, creating it (and its directory) if necessary
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ViewerError::Store(format!("Could not create data directory: {}", e))
            })?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS searches (
                term TEXT PRIMARY KEY,
                hits INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                file TEXT NOT NULL,
                snippet TEXT NOT NULL,
                note TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_comments_file ON comments(file)",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Save a term with zero hits; saving an existing term changes nothing
    pub fn add_term(&self, term: &str) -> Result<bool> {
        let term = term.trim();
        if term.is_empty() {
            return Err(ViewerError::Store("Search term must not be empty".to_string()));
        }
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO searches (term, hits) VALUES (?1, 0)",
            params![term],
        )?;
        Ok(inserted > 0)
    }

    /// Saved terms in insertion order
    pub fn terms(&self) -> Result<Vec<String>> {
        Ok(self
            .search_records()?
            .into_iter()
            .map(|record| record.term)
            .collect())
    }

    pub fn search_records(&self) -> Result<Vec<SearchTermRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT term, hits FROM searches ORDER BY rowid")?;

        let records = stmt
            .query_map([], |row| {
                Ok(SearchTermRecord {
                    term: row.get(0)?,
                    hits: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Add `delta` to a term's hit count. Unknown terms are left alone.
    ///
    /// Read-modify-write without a transaction: two sessions bumping the same term
    /// at once can lose an increment.
    pub fn record_hits(&self, term: &str, delta: usize) -> Result<()> {
        if delta == 0 {
            return Ok(());
        }

        let current: Option<i64> = self
            .conn
            .query_row(
                "SELECT hits FROM searches WHERE term = ?1",
                params![term],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(hits) = current {
            self.conn.execute(
                "UPDATE searches SET hits = ?1 WHERE term = ?2",
                params![hits + delta as i64, term],
            )?;
        }

        Ok(())
    }

    /// Append a comment, returning its id
    pub fn add_comment(&self, file: &str, snippet: &str, note: &str) -> Result<i64> {
        if snippet.trim().is_empty() || note.trim().is_empty() {
            return Err(ViewerError::Store(
                "A comment needs both a snippet and a note".to_string(),
            ));
        }

        let now = Utc::now().timestamp();

        self.conn.execute(
            "INSERT INTO comments (timestamp, file, snippet, note) VALUES (?1, ?2, ?3, ?4)",
            params![now, file, snippet, note],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// All comments, oldest first
    pub fn comments(&self) -> Result<Vec<CommentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, file, snippet, note FROM comments ORDER BY timestamp, id",
        )?;

        let comments = stmt
            .query_map([], |row| {
                Ok(CommentRecord {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    file: row.get(2)?,
                    snippet: row.get(3)?,
                    note: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(comments)
    }

    /// Export comments to markdown format.
    /// Each comment is formatted as:
    /// > "snippet" (file, created_at)
    ///
    /// Note
    pub fn export_comments_markdown(&self, title: &str) -> Result<String> {
        let comments = self.comments()?;

        if comments.is_empty() {
            return Ok(format!("# Comments for {}\n\nNo comments found.\n", title));
        }

        let mut output = format!("# Comments for {}\n\n", title);

        for comment in comments {
            output.push_str(&format!(
                "> **\"{}\"** ({}, {})\n\n",
                comment.snippet,
                comment.file,
                comment.created_at()
            ));
            output.push_str(&comment.note);
            output.push_str("\n\n---\n\n");
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_term_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.add_term("Bravo").unwrap());
        assert!(!store.add_term("Bravo").unwrap());
        assert!(store.add_term("  Delta ").unwrap());
        assert_eq!(store.terms().unwrap(), vec!["Bravo", "Delta"]);
        assert!(store.add_term("   ").is_err());
    }

    #[test]
    fn test_record_hits_accumulates() {
        let store = Store::open_in_memory().unwrap();
        store.add_term("color").unwrap();
        store.record_hits("color", 2).unwrap();
        store.record_hits("color", 3).unwrap();
        store.record_hits("unknown", 4).unwrap();

        let records = store.search_records().unwrap();
        assert_eq!(
            records,
            vec![SearchTermRecord {
                term: "color".to_string(),
                hits: 5
            }]
        );
    }

    #[test]
    fn test_comments_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let id = store.add_comment("a.pdf", "Alpha Bravo", "check this").unwrap();
        let comments = store.comments().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, id);
        assert_eq!(comments[0].note, "check this");
        assert!(comments[0].timestamp > 0);
    }

    #[test]
    fn test_comment_requires_snippet_and_note() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.add_comment("a.pdf", "", "note").is_err());
        assert!(store.add_comment("a.pdf", "snippet", " ").is_err());
        assert!(store.comments().unwrap().is_empty());
    }

    #[test]
    fn test_export_comments_markdown() {
        let store = Store::open_in_memory().unwrap();
        assert!(
            store
                .export_comments_markdown("review")
                .unwrap()
                .contains("No comments found.")
        );

        store.add_comment("a.pdf", "Bravo", "first").unwrap();
        let md = store.export_comments_markdown("review").unwrap();
        assert!(md.starts_with("# Comments for review\n\n"));
        assert!(md.contains("> **\"Bravo\"** (a.pdf, "));
        assert!(md.contains("Z)\n\nfirst\n\n---"));
    }

    #[test]
    fn test_timestamps_render_as_utc() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14T22:13:20Z");

        let store = Store::open_in_memory().unwrap();
        store.add_comment("a.pdf", "Bravo", "first").unwrap();
        let json = serde_json::to_value(&store.comments().unwrap()[0]).unwrap();
        let rendered = json["timestamp"].as_str().unwrap();
        assert!(rendered.ends_with('Z'));
        assert_eq!(rendered.len(), "1970-01-01T00:00:00Z".len());
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");
        {
            let store = Store::open(&path).unwrap();
            store.add_term("Zephyr").unwrap();
        }
        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.terms().unwrap(), vec!["Zephyr"]);
    }
}
