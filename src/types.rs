//! Shared types passed between the loader, the builders, and the paginator.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::path::PathBuf;

/// One content file, parsed and validated.
///
/// Entries are never mutated after loading. The `id` is part of a public
/// permanent URL and depends only on the file name.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Stable identifier derived from the file stem.
    pub id: String,
    /// ActivityStreams object type from the `type` header (e.g. `Note`).
    pub kind: String,
    pub published: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    /// Content warning shown before the body.
    pub summary: Option<String>,
    pub sensitive: bool,
    pub in_reply_to: Option<String>,
    /// Raw markup, rendered later by [`crate::markup`].
    pub body: String,
    /// File the entry was read from, for diagnostics.
    pub source: PathBuf,
}

impl Entry {
    /// Collection order: newest first, ties broken by identifier so that
    /// rebuilds are byte-identical.
    pub fn collection_order(a: &Entry, b: &Entry) -> Ordering {
        b.published
            .cmp(&a.published)
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// The generated form of an [`Entry`]: its canonical ID plus rendered content.
#[derive(Debug, Clone, PartialEq)]
pub struct Post<'a> {
    pub id: String,
    pub entry: &'a Entry,
    /// HTML fragment rendered from the entry body.
    pub content: String,
}
