//! Header/body split for content files.
//!
//! A content file starts with a header block delimited by `---` lines,
//! followed by the raw body:
//!
//! ```text
//! ---
//! type: Note
//! published: 2023-01-03T10:00:00Z
//! ---
//! Hello, *fediverse*.
//! ```
//!
//! Parsing is two-phase and knows nothing about markup: the header block
//! becomes an ordered list of `key: value` pairs (split at the first colon,
//! so values may contain colons, as timestamps and URLs do), and whatever
//! follows the closing marker is the body (leading blank lines dropped).

use thiserror::Error;

const MARKER: &str = "---";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrontMatterError {
    #[error("missing opening `---` header marker")]
    MissingOpen,
    #[error("header block is never closed by a `---` line")]
    Unclosed,
    #[error("line {line}: expected `key: value`, found {text:?}")]
    BadLine { line: usize, text: String },
    #[error("line {line}: duplicate header key `{key}`")]
    DuplicateKey { line: usize, key: String },
}

/// A parsed content file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    /// Header fields in file order.
    pub fields: Vec<(String, String)>,
    /// Everything after the closing marker, with leading blank lines removed.
    pub body: String,
}

impl FrontMatter {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn is_marker(line: &str) -> bool {
    line.trim_end() == MARKER
}

pub fn parse(text: &str) -> Result<FrontMatter, FrontMatterError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut offset = 0;
    let mut lines = text.split_inclusive('\n').enumerate();

    // Blank lines before the opening marker are tolerated.
    let mut opened = false;
    for (_, line) in lines.by_ref() {
        offset += line.len();
        if is_marker(line) {
            opened = true;
            break;
        }
        if !line.trim().is_empty() {
            break;
        }
    }
    if !opened {
        return Err(FrontMatterError::MissingOpen);
    }

    let mut fields: Vec<(String, String)> = Vec::new();
    for (idx, line) in lines {
        offset += line.len();
        if is_marker(line) {
            let body = text[offset..].trim_start_matches(['\n', '\r']).to_string();
            return Ok(FrontMatter { fields, body });
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let (key, value) = trimmed
            .split_once(':')
            .map(|(k, v)| (k.trim(), v.trim()))
            .filter(|(k, _)| !k.is_empty())
            .ok_or_else(|| FrontMatterError::BadLine {
                line: line_no,
                text: trimmed.to_string(),
            })?;
        if fields.iter().any(|(k, _)| k == key) {
            return Err(FrontMatterError::DuplicateKey {
                line: line_no,
                key: key.to_string(),
            });
        }
        fields.push((key.to_string(), value.to_string()));
    }
    Err(FrontMatterError::Unclosed)
}
