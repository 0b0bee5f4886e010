//! Site planning and generation.
//!
//! Turns a validated config and the loaded entries into the complete set of
//! files that make up the instance, then hands them to [`crate::write`].
//!
//! ## Output Structure
//!
//! ```text
//! public/
//! ├── index.html                 # Landing page for humans
//! ├── users/alice                # Actor
//! ├── .well-known/webfinger      # Webfinger JRD
//! ├── outbox/
//! │   ├── index.json             # OrderedCollection
//! │   └── page/0, page/1, ...    # OrderedCollectionPage
//! ├── followers/index.json
//! ├── following/index.json
//! ├── featured/index.json        # Only with Instance.featured_note
//! ├── posts/hello-world          # One Note per entry
//! ├── avatar.png, banner.jpg     # Instance.icon / Instance.banner
//! ├── media/...                  # Copy of Paths.media
//! ├── CNAME, .nojekyll           # Only with Instance.github_instance
//! ```
//!
//! ## All or nothing
//!
//! [`plan`] renders every file into memory and checks that no two files
//! claim the same path. Only a finished [`SitePlan`] is written, so a bad
//! entry, a missing icon, or a path clash leaves the output tree as it was.
//!
//! ## HTML Generation
//!
//! The landing page is rendered with [maud](https://maud.lambda.xyz/). It
//! exists so that a browser visiting the domain sees something other than
//! a 404; fediverse software only reads the JSON documents.

use chrono::{DateTime, Utc};
use maud::{DOCTYPE, Markup, html};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::activity::{self, ActorMedia, ImageRef};
use crate::config::{ConfigError, InstanceConfig};
use crate::endpoints::{self, ResolvedEndpoints};
use crate::paginate;
use crate::scan::{self, ScanError};
use crate::types::Entry;
use crate::write::{self, PlannedFile, WriteError};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("cannot serialize {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("two generated files claim {0}")]
    PathCollision(PathBuf),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// A post as it appears in the build report.
#[derive(Debug, Clone, PartialEq)]
pub struct PostSummary {
    pub id: String,
    pub published: DateTime<Utc>,
    pub path: PathBuf,
}

/// What a build produced, for the CLI report.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    pub output_dir: PathBuf,
    pub subject: String,
    pub actor: PathBuf,
    /// Posts in collection order (newest first).
    pub posts: Vec<PostSummary>,
    pub outbox: PathBuf,
    pub pages: Vec<PathBuf>,
    /// Entry ID of the pinned post.
    pub featured: Option<String>,
    /// Copied binary files: icon, banner, media directory.
    pub media: Vec<PathBuf>,
    pub files: usize,
}

/// Every output file, rendered and ready to write.
#[derive(Debug, Clone)]
pub struct SitePlan {
    pub files: Vec<PlannedFile>,
    pub summary: BuildSummary,
}

impl SitePlan {
    pub fn get(&self, path: &Path) -> Option<&PlannedFile> {
        self.files.iter().find(|f| f.path == path)
    }
}

/// Load entries, plan the site, write it. Returns the build summary.
pub fn build(config: &InstanceConfig) -> Result<BuildSummary, GenerateError> {
    let plan = check(config)?;
    let root = config.output_dir();
    write::write_all(&root, &plan.files)?;
    info!(files = plan.files.len(), output = %root.display(), "instance written");
    Ok(plan.summary)
}

/// Load entries and plan the site without writing anything.
pub fn check(config: &InstanceConfig) -> Result<SitePlan, GenerateError> {
    let entries_dir = config.entries_dir();
    let entries = scan::scan(&entries_dir)?;
    info!(count = entries.len(), dir = %entries_dir.display(), "loaded entries");
    plan(config, &entries)
}

/// Render every output document in memory.
pub fn plan(config: &InstanceConfig, entries: &[Entry]) -> Result<SitePlan, GenerateError> {
    let endpoints = endpoints::resolve(config)?;
    let page_size = config.outbox.page_size()?;
    let mut files = Vec::new();
    let mut media_paths = Vec::new();

    // Icon and banner sit at the output root under their own file names.
    let mut media = ActorMedia::default();
    if let Some(path) = config.icon_path() {
        let (image, file) = profile_image(&endpoints, &path, "Instance.icon")?;
        media.icon = Some(image);
        media_paths.push(file.path.clone());
        files.push(file);
    }
    if let Some(path) = config.banner_path() {
        let (image, file) = profile_image(&endpoints, &path, "Instance.banner")?;
        media.banner = Some(image);
        media_paths.push(file.path.clone());
        files.push(file);
    }

    let featured = match config.featured_note_path() {
        Some(path) => Some(featured_entry(&path, entries)?),
        None => None,
    };

    // Posts
    let mut posts: Vec<_> = entries
        .iter()
        .map(|entry| activity::build_post(&endpoints, entry))
        .collect();
    paginate::sort_posts(&mut posts);
    let mut post_summaries = Vec::with_capacity(posts.len());
    for post in &posts {
        let endpoint = endpoints.post(&post.entry.id);
        let note = activity::build_note(&endpoints, post);
        files.push(json_file(endpoint.path.clone(), &note)?);
        post_summaries.push(PostSummary {
            id: post.entry.id.clone(),
            published: post.entry.published,
            path: endpoint.path,
        });
    }

    // Featured
    let featured_id = featured.as_ref().map(|f| f.entry().id.clone());
    if let Some(featured) = &featured {
        let post = activity::build_post(&endpoints, featured.entry());
        let note = activity::build_note(&endpoints, &post);
        if let Featured::Standalone(entry) = featured {
            // Not in the outbox, but its ID still has to resolve.
            files.push(json_file(endpoints.post(&entry.id).path, &note)?);
        }
        let collection = activity::build_featured(&endpoints, note);
        files.push(json_file(endpoints.featured.path.clone(), &collection)?);
    }

    // Outbox
    let outbox = paginate::paginate(&endpoints, posts, page_size);
    files.push(json_file(endpoints.outbox.path.clone(), &outbox.outbox)?);
    let mut page_paths = Vec::with_capacity(outbox.pages.len());
    for (endpoint, page) in &outbox.pages {
        files.push(json_file(endpoint.path.clone(), page)?);
        page_paths.push(endpoint.path.clone());
    }

    // Actor and discovery
    let actor = activity::build_actor(config, &endpoints, &media, featured_id.is_some());
    files.push(json_file(endpoints.actor.path.clone(), &actor)?);
    files.push(json_file(
        endpoints.webfinger.path.clone(),
        &activity::build_webfinger(&endpoints),
    )?);
    files.push(json_file(
        endpoints.followers.path.clone(),
        &activity::build_followers(config, &endpoints),
    )?);
    files.push(json_file(
        endpoints.following.path.clone(),
        &activity::build_following(config, &endpoints),
    )?);

    // Instance files
    let landing = render_landing(&config.actor.preferred_username, &endpoints);
    files.push(PlannedFile::new("index.html", landing.into_string()));
    if config.instance.github_instance {
        files.push(PlannedFile::new("CNAME", format!("{}\n", github_host(&endpoints))));
        files.push(PlannedFile::new(".nojekyll", ""));
    }

    if let Some(dir) = config.media_dir() {
        for file in copy_media_dir(&endpoints, &dir)? {
            media_paths.push(file.path.clone());
            files.push(file);
        }
    }

    check_paths(&files)?;

    info!(
        posts = post_summaries.len(),
        pages = page_paths.len(),
        files = files.len(),
        "planned instance"
    );

    let summary = BuildSummary {
        output_dir: config.output_dir(),
        subject: endpoints.subject.clone(),
        actor: endpoints.actor.path.clone(),
        posts: post_summaries,
        outbox: endpoints.outbox.path.clone(),
        pages: page_paths,
        featured: featured_id,
        media: media_paths,
        files: files.len(),
    };
    Ok(SitePlan { files, summary })
}

// ============================================================================
// Documents
// ============================================================================

/// Pretty-printed JSON with a trailing newline.
fn json_file<T: Serialize>(path: PathBuf, doc: &T) -> Result<PlannedFile, GenerateError> {
    let mut contents = serde_json::to_vec_pretty(doc).map_err(|source| GenerateError::Json {
        path: path.clone(),
        source,
    })?;
    contents.push(b'\n');
    debug!(path = %path.display(), "rendered document");
    Ok(PlannedFile { path, contents })
}

fn render_landing(handle: &str, endpoints: &ResolvedEndpoints) -> Markup {
    let account = format!("@{handle}@{}", endpoints.host);
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (account) }
                link rel="alternate" type=(activity::ACTIVITY_JSON) href=(endpoints.actor.url);
            }
            body {
                p {
                    "This is the ActivityPub instance for "
                    strong { (account) }
                    "."
                }
            }
        }
    }
}

/// GitHub Pages custom domains carry no port.
fn github_host(endpoints: &ResolvedEndpoints) -> &str {
    endpoints
        .host
        .split(':')
        .next()
        .unwrap_or(&endpoints.host)
}

// ============================================================================
// Featured note
// ============================================================================

enum Featured<'a> {
    /// The pinned file is also a regular entry.
    Existing(&'a Entry),
    /// The pinned file lives outside the entries directory.
    Standalone(Entry),
}

impl Featured<'_> {
    fn entry(&self) -> &Entry {
        match self {
            Featured::Existing(entry) => *entry,
            Featured::Standalone(entry) => entry,
        }
    }
}

fn featured_entry<'a>(path: &Path, entries: &'a [Entry]) -> Result<Featured<'a>, GenerateError> {
    let entry = scan::load_entry(path)?;
    match entries.iter().find(|e| e.id == entry.id) {
        Some(existing) if same_file(&existing.source, path) => Ok(Featured::Existing(existing)),
        Some(existing) => Err(ScanError::DuplicateEntryId {
            id: entry.id,
            first: existing.source.clone(),
            second: path.to_path_buf(),
        }
        .into()),
        None => Ok(Featured::Standalone(entry)),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

// ============================================================================
// Media
// ============================================================================

fn profile_image(
    endpoints: &ResolvedEndpoints,
    path: &Path,
    key: &str,
) -> Result<(ImageRef, PlannedFile), GenerateError> {
    if !path.is_file() {
        return Err(ConfigError::Validation(format!(
            "{key} {} is not a file",
            path.display()
        ))
        .into());
    }
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| crate::naming::is_path_safe(n))
        .ok_or_else(|| {
            ConfigError::Validation(format!(
                "{key} {} must have a plain file name (letters, digits, '.', '_', '-')",
                path.display()
            ))
        })?;
    let media_type = image_media_type(path).ok_or_else(|| {
        ConfigError::Validation(format!(
            "{key} {} is not a recognized image type",
            path.display()
        ))
    })?;
    let contents = read_bytes(path)?;
    let endpoint = endpoints.root_file(file_name);
    Ok((
        ImageRef::new(media_type, endpoint.url),
        PlannedFile::new(endpoint.path, contents),
    ))
}

/// Media type guessed from the extension; only `image/*` is accepted.
fn image_media_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.essence_str().to_string())
}

fn copy_media_dir(
    endpoints: &ResolvedEndpoints,
    dir: &Path,
) -> Result<Vec<PlannedFile>, GenerateError> {
    if !dir.is_dir() {
        return Err(ConfigError::Validation(format!(
            "Paths.media {} is not a directory",
            dir.display()
        ))
        .into());
    }
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
    for dir_entry in walker {
        let dir_entry = dir_entry.map_err(|err| GenerateError::Io {
            path: err.path().unwrap_or(dir).to_path_buf(),
            source: err.into(),
        })?;
        if !dir_entry.file_type().is_file() {
            continue;
        }
        let relative = dir_entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(dir_entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let endpoint = endpoints.media_file(&relative);
        files.push(PlannedFile::new(endpoint.path, read_bytes(dir_entry.path())?));
    }
    Ok(files)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, GenerateError> {
    fs::read(path).map_err(|source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// No two files may share a path, and no file may sit where another
/// needs a directory.
fn check_paths(files: &[PlannedFile]) -> Result<(), GenerateError> {
    let mut seen = BTreeSet::new();
    for file in files {
        if !seen.insert(file.path.as_path()) {
            return Err(GenerateError::PathCollision(file.path.clone()));
        }
    }
    for file in files {
        if let Some(ancestor) = file.path.ancestors().skip(1).find(|a| seen.contains(a)) {
            return Err(GenerateError::PathCollision(ancestor.to_path_buf()));
        }
    }
    Ok(())
}
