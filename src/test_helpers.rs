//! Shared test utilities for the staticpub test suite.
//!
//! Builders for configs and entries, a writer for on-disk content files,
//! and lookups into a [`SitePlan`] that panic with a clear message on miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_entry(tmp.path(), "hello.md", "2023-01-03T10:00:00Z", "Hi");
//! let entries = scan(tmp.path()).unwrap();
//!
//! let plan = plan(&test_config(), &entries).unwrap();
//! assert_eq!(json_at(&plan, "posts/hello")["content"], "<p>Hi</p>");
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::InstanceConfig;
use crate::generate::SitePlan;
use crate::scan::parse_timestamp;
use crate::types::Entry;

// =========================================================================
// Fixture builders
// =========================================================================

/// A valid config for `alice` at `https://example.com`, relative to `.`.
pub fn test_config() -> InstanceConfig {
    let mut config = InstanceConfig::default();
    config.actor.preferred_username = "alice".to_string();
    config.actor.name = "Alice".to_string();
    config.instance.domain = "https://example.com".to_string();
    config
}

/// An in-memory `Note` entry with an empty body.
pub fn entry(id: &str, published: &str) -> Entry {
    Entry {
        id: id.to_string(),
        kind: "Note".to_string(),
        published: parse_timestamp(published)
            .unwrap_or_else(|| panic!("bad test timestamp {published:?}")),
        updated: None,
        summary: None,
        sensitive: false,
        in_reply_to: None,
        body: String::new(),
        source: PathBuf::from(format!("{id}.md")),
    }
}

/// Write a minimal content file into `dir` (created if missing).
pub fn write_entry(dir: &Path, name: &str, published: &str, body: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(
        &path,
        format!("---\ntype: Note\npublished: {published}\n---\n{body}\n"),
    )
    .unwrap();
    path
}

// =========================================================================
// Plan lookups (panic with a clear message on miss)
// =========================================================================

/// Parse the planned JSON document at `path`. Panics if missing or invalid.
pub fn json_at(plan: &SitePlan, path: &str) -> serde_json::Value {
    let file = plan.get(Path::new(path)).unwrap_or_else(|| {
        let paths: Vec<String> = plan
            .files
            .iter()
            .map(|f| f.path.display().to_string())
            .collect();
        panic!("no planned file '{path}'. Available: {paths:?}")
    });
    serde_json::from_slice(&file.contents)
        .unwrap_or_else(|err| panic!("'{path}' is not JSON: {err}"))
}
