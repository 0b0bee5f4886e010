//! Identifier derivation from file names.
//!
//! Every post URL embeds the identifier of its source entry, and those URLs
//! are permanent once published. The identifier is therefore a pure function
//! of the entry's file name and nothing else:
//!
//! - `hello-world.md` → `hello-world`
//! - `2023-01-03.txt` → `2023-01-03`
//! - `notes/first.md` → `first` (subdirectories do not contribute)
//! - `archive.tar.md` → `archive.tar` (only the last extension is dropped)
//!
//! Identifiers, handles, and endpoint segments all end up as path segments
//! in the output tree, so they share one definition of "path-safe".

use std::path::Path;

/// Derive an entry identifier from a content file path.
///
/// Returns `None` when the stem is empty or not path-safe; the caller
/// reports which file was rejected.
pub fn entry_id(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    is_path_safe(stem).then(|| stem.to_string())
}

/// A path-safe segment is non-empty, uses only ASCII letters, digits, `.`,
/// `_` and `-`, and does not start with `.`.
pub fn is_path_safe(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('.')
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
