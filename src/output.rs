//! CLI output formatting.
//!
//! # Information-First Display
//!
//! The build report is an inventory of what the instance publishes. Each
//! line leads with the thing itself (account, post ID, page number) and
//! shows the file it landed in after `→`.
//!
//! ```text
//! Actor @alice@example.com → users/alice
//! Webfinger acct:alice@example.com → .well-known/webfinger
//!
//! Posts
//! 001 hello-world 2023-01-03 → posts/hello-world
//! 002 first-post 2023-01-01 → posts/first-post
//!
//! Outbox (2 posts) → outbox/index.json
//!     Page 0 → outbox/page/0
//!
//! Featured hello-world → featured/index.json
//!
//! Media
//!     avatar.png
//!
//! Generated 2 posts, 1 outbox page, 11 files in public
//! ```
//!
//! # Architecture
//!
//! [`format_build_output`] is pure and returns lines for testability;
//! [`print_build_output`] writes them to stdout.

use std::path::Path;

use crate::generate::BuildSummary;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Format the build report.
///
/// `written` is false for `--check` runs, which plan but write nothing.
pub fn format_build_output(summary: &BuildSummary, written: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let account = summary.subject.trim_start_matches("acct:");

    lines.push(format!(
        "Actor @{} \u{2192} {}",
        account,
        display_path(&summary.actor)
    ));
    lines.push(format!(
        "Webfinger {} \u{2192} .well-known/webfinger",
        summary.subject
    ));

    if !summary.posts.is_empty() {
        lines.push(String::new());
        lines.push("Posts".to_string());
        for (idx, post) in summary.posts.iter().enumerate() {
            lines.push(format!(
                "{} {} {} \u{2192} {}",
                format_index(idx + 1),
                post.id,
                post.published.format("%Y-%m-%d"),
                display_path(&post.path)
            ));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Outbox ({}) \u{2192} {}",
        plural(summary.posts.len(), "post", "posts"),
        display_path(&summary.outbox)
    ));
    for (idx, page) in summary.pages.iter().enumerate() {
        lines.push(format!(
            "{}Page {} \u{2192} {}",
            indent(1),
            idx,
            display_path(page)
        ));
    }

    if let Some(featured) = &summary.featured {
        lines.push(String::new());
        lines.push(format!("Featured {featured} \u{2192} featured/index.json"));
    }

    if !summary.media.is_empty() {
        lines.push(String::new());
        lines.push("Media".to_string());
        for path in &summary.media {
            lines.push(format!("{}{}", indent(1), display_path(path)));
        }
    }

    lines.push(String::new());
    let verb = if written { "Generated" } else { "Checked" };
    let mut footer = format!(
        "{} {}, {}, {}",
        verb,
        plural(summary.posts.len(), "post", "posts"),
        plural(summary.pages.len(), "outbox page", "outbox pages"),
        plural(summary.files, "file", "files"),
    );
    if written {
        footer.push_str(&format!(" in {}", summary.output_dir.display()));
    } else {
        footer.push_str(" (nothing written)");
    }
    lines.push(footer);

    lines
}

pub fn print_build_output(summary: &BuildSummary, written: bool) {
    for line in format_build_output(summary, written) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
