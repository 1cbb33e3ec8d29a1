//! File-system persistence for crawl output
//!
//! Maps crawl nodes onto a directory tree that mirrors the site taxonomy:
//! `root/<Category>/<Subcategory>/page_<n>.json` for listing batches,
//! `<item_id>.html` / `<item_id>.json` for detail snapshots and fields, and
//! `category.json` at the root. Writes are last-write-wins.

use crate::extract::Record;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while persisting output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Characters never allowed in a path segment
const DISALLOWED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replaces file-system-hostile characters with `_`. Idempotent: the
/// replacement character is itself allowed.
pub fn sanitize_segment(name: &str) -> String {
    name.chars()
        .map(|c| if DISALLOWED.contains(&c) { '_' } else { c })
        .collect()
}

/// Persists records and snapshots under a fixed output root. Paths are
/// derived deterministically from node prefixes and item identities, so
/// concurrent writers never collide.
pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a node prefix, created if needed. Creating an
    /// already-existing directory is not an error.
    fn node_dir(&self, prefix: &[String]) -> OutputResult<PathBuf> {
        let mut dir = self.root.clone();
        for segment in prefix {
            dir.push(sanitize_segment(segment));
        }
        fs::create_dir_all(&dir).map_err(|source| OutputError::Write {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(dir)
    }

    /// Writes one listing batch as `page_<n>.json`.
    pub fn write_listing_page(
        &self,
        prefix: &[String],
        index: u32,
        records: &[Record],
    ) -> OutputResult<PathBuf> {
        let path = self.node_dir(prefix)?.join(format!("page_{}.json", index));
        self.write_json(&path, records)?;
        Ok(path)
    }

    /// Writes a raw detail-page snapshot as `<item_id>.html`.
    pub fn write_snapshot(
        &self,
        prefix: &[String],
        item_id: &str,
        raw: &str,
    ) -> OutputResult<PathBuf> {
        let path = self
            .node_dir(prefix)?
            .join(format!("{}.html", sanitize_segment(item_id)));
        fs::write(&path, raw).map_err(|source| OutputError::Write {
            path: path.display().to_string(),
            source,
        })?;
        Ok(path)
    }

    /// Writes extracted detail fields as `<item_id>.json` beside the
    /// snapshot.
    pub fn write_detail(
        &self,
        prefix: &[String],
        item_id: &str,
        records: &[Record],
    ) -> OutputResult<PathBuf> {
        let path = self
            .node_dir(prefix)?
            .join(format!("{}.json", sanitize_segment(item_id)));
        self.write_json(&path, records)?;
        Ok(path)
    }

    /// Writes the flat taxonomy snapshot as `category.json` at the root.
    pub fn write_taxonomy<T: Serialize>(&self, taxonomy: &T) -> OutputResult<PathBuf> {
        let path = self.node_dir(&[])?.join("category.json");
        self.write_json(&path, taxonomy)?;
        Ok(path)
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> OutputResult<()> {
        let body = serde_json::to_string_pretty(value).map_err(|source| OutputError::Json {
            path: path.display().to_string(),
            source,
        })?;
        fs::write(path, body).map_err(|source| OutputError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Record;
    use tempfile::TempDir;

    fn sample_records() -> Vec<Record> {
        let mut a = Record::new();
        a.insert("title", Some("Widget".to_string()));
        a.insert("price", None);
        let mut b = Record::new();
        b.insert("title", Some("Gadget".to_string()));
        b.insert("price", Some("$9".to_string()));
        vec![a, b]
    }

    #[test]
    fn test_sanitize_replaces_all_disallowed_characters() {
        assert_eq!(sanitize_segment(r#"a<b>c:d"e/f\g|h?i*j"#), "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn test_sanitize_category_name() {
        assert_eq!(
            sanitize_segment("Electronics & Gadgets / Sale"),
            "Electronics & Gadgets _ Sale"
        );
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "Electronics & Gadgets / Sale",
            r#"<>:"/\|?*"#,
            "already_clean-name.txt",
            "",
        ];
        for input in inputs {
            let once = sanitize_segment(input);
            assert_eq!(sanitize_segment(&once), once, "not idempotent for {:?}", input);
            assert!(!once.chars().any(|c| DISALLOWED.contains(&c)));
        }
    }

    #[test]
    fn test_write_listing_page_round_trip() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new(dir.path());
        let records = sample_records();

        let prefix = vec!["Electronics".to_string(), "Phones".to_string()];
        let path = writer.write_listing_page(&prefix, 1, &records).unwrap();

        assert_eq!(
            path,
            dir.path().join("Electronics").join("Phones").join("page_1.json")
        );

        // Parsed back, the file yields an identical record count and field set
        let body = fs::read_to_string(&path).unwrap();
        let parsed: Vec<Record> = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_prefix_segments_are_sanitized() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new(dir.path());

        let prefix = vec!["Electronics / Sale".to_string()];
        let path = writer.write_listing_page(&prefix, 1, &sample_records()).unwrap();

        assert_eq!(
            path,
            dir.path().join("Electronics _ Sale").join("page_1.json")
        );
    }

    #[test]
    fn test_write_snapshot_and_detail_share_identity() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new(dir.path());
        let prefix = vec!["Books".to_string()];

        let html_path = writer
            .write_snapshot(&prefix, "deal?42", "<html>x</html>")
            .unwrap();
        let json_path = writer.write_detail(&prefix, "deal?42", &sample_records()).unwrap();

        assert_eq!(html_path, dir.path().join("Books").join("deal_42.html"));
        assert_eq!(json_path, dir.path().join("Books").join("deal_42.json"));
        assert_eq!(fs::read_to_string(html_path).unwrap(), "<html>x</html>");
    }

    #[test]
    fn test_rewrites_are_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new(dir.path());
        let prefix = vec!["Books".to_string()];

        writer.write_snapshot(&prefix, "item", "first").unwrap();
        let path = writer.write_snapshot(&prefix, "item", "second").unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "second");
    }

    #[test]
    fn test_directory_creation_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new(dir.path());
        let prefix = vec!["A".to_string(), "B".to_string()];

        writer.write_listing_page(&prefix, 1, &sample_records()).unwrap();
        writer.write_listing_page(&prefix, 2, &sample_records()).unwrap();

        assert!(dir.path().join("A").join("B").join("page_2.json").exists());
    }

    #[test]
    fn test_write_taxonomy_lands_at_root() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new(dir.path());

        let taxonomy = vec![("Electronics", "https://example.com/c1/")];
        let path = writer.write_taxonomy(&taxonomy).unwrap();

        assert_eq!(path, dir.path().join("category.json"));
    }
}
