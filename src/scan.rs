//! Content loading.
//!
//! Walks the entries directory and turns every content file into a typed
//! [`Entry`]. A content file has a `---` delimited header (see
//! [`crate::frontmatter`]) followed by a Markdown body:
//!
//! ```text
//! entries/
//! ├── .gitkeep                 # Hidden files are skipped
//! ├── hello-world.md           # → posts/hello-world
//! └── 2023/
//!     └── new-year.md          # → posts/new-year (subdirs don't namespace)
//! ```
//!
//! ## Headers
//!
//! | Key | Required | Meaning |
//! |-----|----------|---------|
//! | `type` | yes | ActivityStreams object type, e.g. `Note` |
//! | `published` | yes | RFC 3339 instant, e.g. `2023-01-03T10:00:00Z` |
//! | `updated` | no | RFC 3339 instant |
//! | `summary` | no | Content warning |
//! | `sensitive` | no | `true` or `false` |
//! | `inReplyTo` | no | URL of the replied-to object |
//!
//! Unknown headers are ignored with a warning.
//!
//! ## Validation
//!
//! Loading is all-or-nothing. The first bad file aborts the scan:
//! - Missing or unparseable header, missing `type`/`published` → `MalformedEntry`
//! - `published`/`updated` not an RFC 3339 instant → `InvalidTimestamp`
//! - Two files with the same derived identifier → `DuplicateEntryId`

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::frontmatter;
use crate::naming;
use crate::types::Entry;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("entries directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("cannot read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot walk entries directory")]
    Walk(#[from] walkdir::Error),
    #[error("malformed entry {path}: {reason}")]
    MalformedEntry { path: PathBuf, reason: String },
    #[error(
        "invalid timestamp {value:?} for `{field}` in {path}: expected an ISO-8601 instant like 2023-01-03T10:00:00Z"
    )]
    InvalidTimestamp {
        path: PathBuf,
        field: &'static str,
        value: String,
    },
    #[error("duplicate entry id `{id}`: {first} and {second}")]
    DuplicateEntryId {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },
}

const KNOWN_HEADERS: &[&str] = &[
    "type",
    "published",
    "updated",
    "summary",
    "sensitive",
    "inReplyTo",
];

/// Load every entry under `entries_dir`.
///
/// Files are visited in file-name order so that error reporting is
/// deterministic. The returned entries are in that same walk order; callers
/// that need collection order sort with [`Entry::collection_order`].
pub fn scan(entries_dir: &Path) -> Result<Vec<Entry>, ScanError> {
    if !entries_dir.is_dir() {
        return Err(ScanError::MissingDirectory(entries_dir.to_path_buf()));
    }

    let mut seen: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut entries = Vec::new();

    let walker = WalkDir::new(entries_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

    for dir_entry in walker {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type().is_file() {
            continue;
        }
        let path = dir_entry.path();
        let entry = load_entry(path)?;
        if let Some(first) = seen.get(&entry.id) {
            return Err(ScanError::DuplicateEntryId {
                id: entry.id,
                first: first.clone(),
                second: path.to_path_buf(),
            });
        }
        debug!(id = %entry.id, path = %path.display(), "loaded entry");
        seen.insert(entry.id.clone(), path.to_path_buf());
        entries.push(entry);
    }

    Ok(entries)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Read and parse a single content file.
///
/// Also used for the featured note, which may live outside the entries
/// directory.
pub fn load_entry(path: &Path) -> Result<Entry, ScanError> {
    let text = fs::read_to_string(path).map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_entry(path, &text)
}

/// Build an [`Entry`] from already-read file contents.
pub fn parse_entry(path: &Path, text: &str) -> Result<Entry, ScanError> {
    let malformed = |reason: String| ScanError::MalformedEntry {
        path: path.to_path_buf(),
        reason,
    };

    let id = naming::entry_id(path).ok_or_else(|| {
        malformed(
            "file name must be non-empty and use only letters, digits, '.', '_' and '-'".into(),
        )
    })?;

    let header = frontmatter::parse(text).map_err(|err| malformed(err.to_string()))?;

    for (key, _) in &header.fields {
        if !KNOWN_HEADERS.contains(&key.as_str()) {
            warn!(path = %path.display(), key = %key, "ignoring unknown header");
        }
    }

    let kind = header
        .get("type")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| malformed("missing required header `type`".into()))?
        .to_string();

    let published_raw = header
        .get("published")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| malformed("missing required header `published`".into()))?;
    let published = timestamp(path, "published", published_raw)?;

    let updated = header
        .get("updated")
        .filter(|v| !v.is_empty())
        .map(|v| timestamp(path, "updated", v))
        .transpose()?;

    let sensitive = match header.get("sensitive") {
        None => false,
        Some(v) => v.parse::<bool>().map_err(|_| {
            malformed(format!("header `sensitive` must be true or false, got {v:?}"))
        })?,
    };

    let optional = |key: &str| {
        header
            .get(key)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let summary = optional("summary");
    let in_reply_to = optional("inReplyTo");

    Ok(Entry {
        id,
        kind,
        published,
        updated,
        summary,
        sensitive,
        in_reply_to,
        body: header.body,
        source: path.to_path_buf(),
    })
}

/// Parse an RFC 3339 instant and normalize it to UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn timestamp(path: &Path, field: &'static str, value: &str) -> Result<DateTime<Utc>, ScanError> {
    parse_timestamp(value).ok_or_else(|| ScanError::InvalidTimestamp {
        path: path.to_path_buf(),
        field,
        value: value.to_string(),
    })
}
