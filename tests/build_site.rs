//! End-to-end builds: a config file and an entries directory on disk, the
//! public library API, and assertions on the written tree.

use serde_json::Value;
use staticpub::config::{ConfigError, load_config};
use staticpub::generate::{self, GenerateError};
use staticpub::scan::ScanError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CONFIG: &str = r#"
[Paths]
entries = "entries"
instanceFiles = "public"

[Actor]
preferredUsername = "alice"
name = "Alice"
summary = "Testing"

[Outbox]
paginate_by = 2

[Instance]
host = "example.com"
domain = "https://${host}"
actor_id = "${domain}/${usersEndpoint}/${Actor:preferredUsername}"
followers = 7
following = 3
"#;

struct Site {
    dir: TempDir,
}

impl Site {
    fn new() -> Self {
        Self::with_config(CONFIG)
    }

    fn with_config(config: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("instance.toml"), config).unwrap();
        fs::create_dir_all(dir.path().join("entries")).unwrap();
        Site { dir }
    }

    fn config_path(&self) -> PathBuf {
        self.dir.path().join("instance.toml")
    }

    fn entry(&self, name: &str, header: &str, body: &str) {
        fs::write(
            self.dir.path().join("entries").join(name),
            format!("---\n{header}\n---\n{body}\n"),
        )
        .unwrap();
    }

    fn note(&self, id: &str, published: &str) {
        self.entry(
            &format!("{id}.md"),
            &format!("type: Note\npublished: {published}"),
            &format!("Post {id}"),
        );
    }

    fn build(&self) -> Result<generate::BuildSummary, GenerateError> {
        let config = load_config(&self.config_path())?;
        generate::build(&config)
    }

    fn public(&self) -> PathBuf {
        self.dir.path().join("public")
    }

    fn json(&self, relative: &str) -> Value {
        let path = self.public().join(relative);
        let text = fs::read_to_string(&path)
            .unwrap_or_else(|err| panic!("cannot read {}: {err}", path.display()));
        serde_json::from_str(&text).unwrap()
    }
}

/// Map a URL under https://example.com to the file that serves it.
fn served_file(public: &Path, url: &str) -> PathBuf {
    let rest = url
        .strip_prefix("https://example.com/")
        .unwrap_or_else(|| panic!("{url} is not under the domain"));
    if rest.ends_with('/') || rest.is_empty() {
        public.join(rest).join("index.json")
    } else {
        public.join(rest)
    }
}

fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files: Vec<(PathBuf, Vec<u8>)> = walkdir::WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            (
                e.path().strip_prefix(root).unwrap().to_path_buf(),
                fs::read(e.path()).unwrap(),
            )
        })
        .collect();
    files.sort();
    files
}

// =========================================================================
// Outbox scenarios
// =========================================================================

#[test]
fn three_entries_paginate_into_two_pages() {
    let site = Site::new();
    site.note("jan1", "2023-01-01T00:00:00Z");
    site.note("jan2", "2023-01-02T00:00:00Z");
    site.note("jan3", "2023-01-03T00:00:00Z");
    site.build().unwrap();

    let outbox = site.json("outbox/index.json");
    assert_eq!(outbox["type"], "OrderedCollection");
    assert_eq!(outbox["totalItems"], 3);
    assert_eq!(outbox["first"], "https://example.com/outbox/page/0");
    assert_eq!(outbox["last"], "https://example.com/outbox/page/1");

    let page0 = site.json("outbox/page/0");
    let objects: Vec<&str> = page0["orderedItems"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["object"].as_str().unwrap())
        .collect();
    assert_eq!(
        objects,
        vec![
            "https://example.com/posts/jan3",
            "https://example.com/posts/jan2"
        ]
    );
    assert_eq!(page0["next"], "https://example.com/outbox/page/1");
    assert!(page0.get("prev").is_none());

    let page1 = site.json("outbox/page/1");
    assert_eq!(page1["orderedItems"].as_array().unwrap().len(), 1);
    assert_eq!(page1["orderedItems"][0]["object"], "https://example.com/posts/jan1");
    assert_eq!(page1["prev"], "https://example.com/outbox/page/0");
    assert!(page1.get("next").is_none());

    assert!(!site.public().join("outbox/page/2").exists());
}

#[test]
fn zero_entries_build_an_empty_outbox() {
    let site = Site::new();
    let summary = site.build().unwrap();
    assert!(summary.posts.is_empty());

    let outbox = site.json("outbox/index.json");
    assert_eq!(outbox["totalItems"], 0);
    assert!(outbox.get("first").is_none());
    assert!(outbox.get("last").is_none());
    assert!(!site.public().join("outbox/page").exists());

    // The actor and webfinger still exist.
    assert_eq!(site.json("users/alice")["id"], "https://example.com/users/alice");
    assert!(site.public().join(".well-known/webfinger").is_file());
}

// =========================================================================
// Failures leave nothing behind
// =========================================================================

#[test]
fn entry_without_published_writes_nothing() {
    let site = Site::new();
    site.note("good", "2023-01-01T00:00:00Z");
    site.entry("bad.md", "type: Note", "no date");

    let err = site.build().unwrap_err();
    assert!(matches!(
        err,
        GenerateError::Scan(ScanError::MalformedEntry { .. })
    ));
    assert!(!site.public().exists());
}

#[test]
fn bad_timestamp_is_reported_with_field() {
    let site = Site::new();
    site.entry("bad.md", "type: Note\npublished: yesterday", "x");
    let err = site.build().unwrap_err();
    match err {
        GenerateError::Scan(ScanError::InvalidTimestamp { field, value, .. }) => {
            assert_eq!(field, "published");
            assert_eq!(value, "yesterday");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!site.public().exists());
}

#[test]
fn duplicate_identifiers_are_rejected() {
    let site = Site::new();
    site.note("same", "2023-01-01T00:00:00Z");
    fs::create_dir_all(site.dir.path().join("entries/2023")).unwrap();
    fs::write(
        site.dir.path().join("entries/2023/same.md"),
        "---\ntype: Note\npublished: 2023-01-02T00:00:00Z\n---\nagain\n",
    )
    .unwrap();

    let err = site.build().unwrap_err();
    assert!(matches!(
        err,
        GenerateError::Scan(ScanError::DuplicateEntryId { ref id, .. }) if id == "same"
    ));
}

#[test]
fn zero_page_size_is_invalid_config() {
    let site = Site::with_config(&CONFIG.replace("paginate_by = 2", "paginate_by = 0"));
    let err = site.build().unwrap_err();
    assert!(matches!(
        err,
        GenerateError::Config(ConfigError::Validation(_))
    ));
}

#[test]
fn mismatched_actor_id_is_invalid_config() {
    let config = CONFIG.replace(
        "actor_id = \"${domain}/${usersEndpoint}/${Actor:preferredUsername}\"",
        "actor_id = \"https://example.com/people/alice\"",
    );
    let site = Site::with_config(&config);
    assert!(matches!(
        site.build(),
        Err(GenerateError::Config(ConfigError::Validation(_)))
    ));
}

// =========================================================================
// Cross-document consistency
// =========================================================================

#[test]
fn actor_endpoints_are_served_files() {
    let site = Site::new();
    site.note("hello", "2023-01-01T00:00:00Z");
    site.build().unwrap();

    let actor = site.json("users/alice");
    assert_eq!(actor["preferredUsername"], "alice");
    for key in ["outbox", "followers", "following"] {
        let url = actor[key].as_str().unwrap();
        let file = served_file(&site.public(), url);
        assert!(file.is_file(), "{key} → {} missing", file.display());
        let doc: Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(doc["id"], url);
    }
}

#[test]
fn webfinger_points_at_the_actor() {
    let site = Site::new();
    site.build().unwrap();

    let webfinger = site.json(".well-known/webfinger");
    let actor = site.json("users/alice");
    assert_eq!(webfinger["subject"], "acct:alice@example.com");
    let self_links: Vec<&Value> = webfinger["links"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|link| link["rel"] == "self")
        .collect();
    assert_eq!(self_links.len(), 1);
    assert_eq!(self_links[0]["href"], actor["id"]);
    assert_eq!(self_links[0]["type"], "application/activity+json");
}

#[test]
fn followers_and_following_publish_counts_only() {
    let site = Site::new();
    site.build().unwrap();
    let followers = site.json("followers/index.json");
    assert_eq!(followers["totalItems"], 7);
    assert!(followers.get("orderedItems").is_none());
    assert_eq!(site.json("following/index.json")["totalItems"], 3);
}

#[test]
fn outbox_items_resolve_to_posts() {
    let site = Site::new();
    site.note("a", "2023-01-01T00:00:00Z");
    site.note("b", "2023-01-02T00:00:00Z");
    site.note("c", "2023-01-03T00:00:00Z");
    site.build().unwrap();

    let outbox = site.json("outbox/index.json");
    let mut next = outbox["first"].as_str().map(str::to_string);
    let mut seen = Vec::new();
    while let Some(url) = next {
        let page: Value =
            serde_json::from_str(&fs::read_to_string(served_file(&site.public(), &url)).unwrap())
                .unwrap();
        for item in page["orderedItems"].as_array().unwrap() {
            let object = item["object"].as_str().unwrap();
            let note: Value = serde_json::from_str(
                &fs::read_to_string(served_file(&site.public(), object)).unwrap(),
            )
            .unwrap();
            assert_eq!(note["id"], object);
            assert_eq!(note["attributedTo"], "https://example.com/users/alice");
            seen.push(object.to_string());
        }
        next = page["next"].as_str().map(str::to_string);
    }
    assert_eq!(seen.len(), 3);
}

#[test]
fn entry_headers_reach_the_note() {
    let site = Site::new();
    site.entry(
        "cw.md",
        "type: Note\npublished: 2023-01-01T00:00:00Z\nsummary: spoilers\nsensitive: true\ninReplyTo: https://remote.example/notes/1",
        "The *ending*.",
    );
    site.build().unwrap();

    let note = site.json("posts/cw");
    assert_eq!(note["summary"], "spoilers");
    assert_eq!(note["sensitive"], true);
    assert_eq!(note["inReplyTo"], "https://remote.example/notes/1");
    assert_eq!(note["content"], "<p>The <em>ending</em>.</p>");
}

// =========================================================================
// Determinism
// =========================================================================

#[test]
fn rebuild_is_byte_identical() {
    let site = Site::new();
    for day in 1..=5 {
        site.note(&format!("d{day}"), &format!("2023-01-0{day}T00:00:00Z"));
    }
    site.note("tie", "2023-01-03T00:00:00Z");

    site.build().unwrap();
    let first = snapshot(&site.public());
    site.build().unwrap();
    let second = snapshot(&site.public());
    assert_eq!(first, second);
}

#[test]
fn check_plans_without_writing() {
    let site = Site::new();
    site.note("a", "2023-01-01T00:00:00Z");
    let config = load_config(&site.config_path()).unwrap();
    let plan = generate::check(&config).unwrap();
    assert_eq!(plan.summary.posts.len(), 1);
    assert!(!site.public().exists());
}
