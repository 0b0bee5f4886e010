//! # staticpub
//!
//! A static generator for a single-account ActivityPub instance. One config
//! file plus a directory of Markdown entries become the JSON documents that
//! fediverse servers fetch to discover, follow-check and read an account:
//! actor, webfinger, outbox, posts, followers/following and a featured post.
//! The output is plain files that any static host can serve.
//!
//! The instance is read-only. Nothing here receives activities, delivers
//! them, or signs anything: remote servers can look the account up and read
//! its posts, and that is all.
//!
//! # Pipeline
//!
//! ```text
//! instance.toml  →  config    →  InstanceConfig
//!                    endpoints →  ResolvedEndpoints   (every URL + file path)
//! entries/       →  scan      →  [Entry]
//!                    activity + paginate  →  documents
//!                    generate  →  SitePlan            (all files, in memory)
//!                    write     →  public/
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `instance.toml` loading, `${Section:key}` substitution, defaults, validation |
//! | [`frontmatter`] | `---` delimited header parser for content files |
//! | [`scan`] | Walks the entries directory into typed [`types::Entry`] records |
//! | [`naming`] | Entry identifiers from file names; path-segment safety |
//! | [`endpoints`] | Canonical URL and output path of every document |
//! | [`markup`] | Markdown body → HTML fragment with raw HTML escaped |
//! | [`activity`] | ActivityStreams document builders (actor, note, webfinger, ...) |
//! | [`paginate`] | Outbox ordering and page chain |
//! | [`generate`] | Assembles the whole site in memory; `build` and `check` entry points |
//! | [`write`] | Writes planned files under the output root |
//! | [`output`] | CLI build report formatting |
//! | [`types`] | Shared `Entry` and `Post` types |
//!
//! # Design Decisions
//!
//! ## One Resolver For URLs And Paths
//!
//! A document's `id` and the file it is written to are computed together by
//! [`endpoints::resolve`]. Builders never format URLs themselves and the
//! planner never invents paths, so an actor can't advertise an outbox that
//! was written somewhere else.
//!
//! ## Plan, Then Write
//!
//! [`generate::plan`] renders every file before [`write`] touches the disk.
//! A malformed entry, a missing icon or two files fighting over one path
//! abort the run with the previous output intact.
//!
//! ## Deterministic Output
//!
//! Entries are walked in file-name order, posts sort newest first with ties
//! broken by identifier, and JSON is pretty-printed from structs with fixed
//! field order. Rebuilding unchanged input produces byte-identical files,
//! which keeps the output diff-friendly when it lives in a git repository.
//!
//! ## Identifiers Come From File Names
//!
//! A post's URL is `{domain}/posts/{file stem}`. Renaming a file changes a
//! public, permanent ID, so the stem is the only input; titles, dates and
//! directories don't take part.

pub mod activity;
pub mod config;
pub mod endpoints;
pub mod frontmatter;
pub mod generate;
pub mod markup;
pub mod naming;
pub mod output;
pub mod paginate;
pub mod scan;
pub mod types;
pub mod write;

#[cfg(test)]
pub(crate) mod test_helpers;
