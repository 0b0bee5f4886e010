//! Instance configuration module.
//!
//! Handles loading, interpolating, and validating the instance config file.
//! One config file describes one actor; multi-user setups run the generator
//! once per file, each with its own output root.
//!
//! ## Configuration Options
//!
//! ```toml
//! [Paths]
//! entries = "entries"             # Directory of content files
//! instanceFiles = "public"        # Output root (served as the domain root)
//! media = "media"                 # Optional, copied to {instanceFiles}/media/
//!
//! [Actor]
//! preferredUsername = "alice"
//! name = "Alice"
//! summary = "Writing things down."
//! discoverable = true
//! manuallyApprovesFollowers = true
//! type = "Person"
//! published = "2023-02-09T00:00:00Z"
//!
//! [Outbox]
//! paginate_by = 20
//!
//! [Instance]
//! host = "social.example.com"
//! domain = "https://${host}"
//! usersEndpoint = "users"
//! actor_id = "${domain}/${usersEndpoint}/${Actor:preferredUsername}"
//! followers = 0
//! following = 0
//! featured_note = "featured.md"
//! icon = "avatar.png"
//! banner = "banner.jpg"
//! github_instance = false
//! ```
//!
//! ## Substitution
//!
//! String values may reference other keys: `${key}` for a key in the same
//! section, `${Section:key}` for any other section. `${Paths:curdir}` is
//! always available and holds the directory containing the config file.
//! Substitution runs on the raw TOML value before deserialization, so the
//! typed [`InstanceConfig`] never contains placeholders.
//!
//! Relative paths resolve against the config file's directory. Unknown keys
//! are rejected to catch typos early.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use std::fmt::Display;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::naming;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("cannot substitute {location}: {reason}")]
    Interpolation { location: String, reason: String },
    #[error("invalid config: {0}")]
    Validation(String),
}

/// The fully resolved configuration for one generation run.
///
/// Built once by [`load_config`] and passed by reference into every stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstanceConfig {
    #[serde(rename = "Paths")]
    pub paths: PathsConfig,
    #[serde(rename = "Actor")]
    pub actor: ActorConfig,
    #[serde(rename = "Outbox")]
    pub outbox: OutboxConfig,
    #[serde(rename = "Instance")]
    pub instance: InstanceSection,
}

/// Filesystem locations. Relative paths are joined onto `curdir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub entries: PathBuf,
    #[serde(rename = "instanceFiles")]
    pub instance_files: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<PathBuf>,
    /// Directory of the config file. Injected by the loader.
    pub curdir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            entries: PathBuf::from("entries"),
            instance_files: PathBuf::from("public"),
            media: None,
            curdir: PathBuf::from("."),
        }
    }
}

/// Profile fields copied into the actor document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActorConfig {
    #[serde(rename = "preferredUsername")]
    pub preferred_username: String,
    pub name: String,
    pub summary: String,
    pub discoverable: bool,
    #[serde(rename = "manuallyApprovesFollowers")]
    pub manually_approves_followers: bool,
    #[serde(rename = "type")]
    pub actor_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            preferred_username: String::new(),
            name: String::new(),
            summary: String::new(),
            discoverable: true,
            manually_approves_followers: true,
            actor_type: "Person".to_string(),
            published: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutboxConfig {
    /// Posts per outbox page. Signed so that `0` and negative values reach
    /// validation instead of failing as a type error. A quoted number is
    /// accepted too, since `${...}` substitution always yields a string.
    #[serde(deserialize_with = "integer_or_numeric_string")]
    pub paginate_by: i64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self { paginate_by: 20 }
    }
}

impl OutboxConfig {
    pub fn page_size(&self) -> Result<NonZeroUsize, ConfigError> {
        usize::try_from(self.paginate_by)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| {
                ConfigError::Validation(format!(
                    "Outbox.paginate_by must be a positive integer, got {}",
                    self.paginate_by
                ))
            })
    }
}

/// Integer fields take either a TOML integer or a string holding one.
fn integer_or_numeric_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64> + std::str::FromStr,
    <T as TryFrom<i64>>::Error: Display,
    <T as std::str::FromStr>::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(n) => T::try_from(n).map_err(|e| de::Error::custom(format!("{n}: {e}"))),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|e| de::Error::custom(format!("expected an integer, got {text:?}: {e}"))),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstanceSection {
    /// Host used in the webfinger subject. Falls back to the domain's host.
    pub host: String,
    /// Absolute base URL that the output root is served from.
    pub domain: String,
    #[serde(rename = "usersEndpoint")]
    pub users_endpoint: String,
    /// Optional explicit actor ID; must match the computed one when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// Static follower count. Not backed by any real relationship.
    #[serde(deserialize_with = "integer_or_numeric_string")]
    pub followers: u64,
    /// Static following count. Not backed by any real relationship.
    #[serde(deserialize_with = "integer_or_numeric_string")]
    pub following: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_note: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<PathBuf>,
    /// Emit `CNAME` and `.nojekyll` for GitHub Pages hosting.
    pub github_instance: bool,
}

impl Default for InstanceSection {
    fn default() -> Self {
        Self {
            host: String::new(),
            domain: String::new(),
            users_endpoint: "users".to_string(),
            actor_id: None,
            followers: 0,
            following: 0,
            featured_note: None,
            banner: None,
            icon: None,
            github_instance: false,
        }
    }
}

impl InstanceConfig {
    /// Validate config values and cross-check the computed identifiers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let handle = &self.actor.preferred_username;
        if handle.is_empty() {
            return Err(ConfigError::Validation(
                "Actor.preferredUsername must be set".into(),
            ));
        }
        if !naming::is_path_safe(handle) {
            return Err(ConfigError::Validation(format!(
                "Actor.preferredUsername {handle:?} may only contain letters, digits, '.', '_' and '-'"
            )));
        }
        if self.actor.actor_type.trim().is_empty() {
            return Err(ConfigError::Validation("Actor.type must not be empty".into()));
        }
        let host = &self.instance.host;
        if host.contains(['/', '@', ':']) || host.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "Instance.host {host:?} must be a bare host name"
            )));
        }
        self.outbox.page_size()?;
        // Domain, usersEndpoint and actor_id are checked by the resolver.
        crate::endpoints::resolve(self)?;
        Ok(())
    }

    /// Join a configured path onto the config file's directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.paths.curdir.join(path)
        }
    }

    pub fn entries_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.entries)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.instance_files)
    }

    pub fn media_dir(&self) -> Option<PathBuf> {
        self.optional_path(self.paths.media.as_deref())
    }

    pub fn featured_note_path(&self) -> Option<PathBuf> {
        self.optional_path(self.instance.featured_note.as_deref())
    }

    pub fn icon_path(&self) -> Option<PathBuf> {
        self.optional_path(self.instance.icon.as_deref())
    }

    pub fn banner_path(&self) -> Option<PathBuf> {
        self.optional_path(self.instance.banner.as_deref())
    }

    // An empty value means "not configured", so `featured_note = ""` is
    // the same as leaving the key out.
    fn optional_path(&self, path: Option<&Path>) -> Option<PathBuf> {
        path.filter(|p| !p.as_os_str().is_empty())
            .map(|p| self.resolve_path(p))
    }
}

// =============================================================================
// Config loading, substitution, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(InstanceConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Expand `${key}` and `${Section:key}` placeholders in every string value.
///
/// TOML datetimes are normalized to strings on the way so that timestamp
/// fields deserialize the same whether or not they were quoted.
pub fn interpolate(raw: toml::Value) -> Result<toml::Value, ConfigError> {
    let toml::Value::Table(root) = raw else {
        return Ok(raw);
    };
    let mut resolved = root.clone();
    for (section, body) in &root {
        let toml::Value::Table(fields) = body else {
            continue;
        };
        let mut out = fields.clone();
        for key in fields.keys() {
            let value = resolve_key(&root, section, key, &mut Vec::new())?;
            out.insert(key.clone(), value);
        }
        resolved.insert(section.clone(), toml::Value::Table(out));
    }
    Ok(toml::Value::Table(resolved))
}

fn resolve_key(
    root: &toml::Table,
    section: &str,
    key: &str,
    stack: &mut Vec<(String, String)>,
) -> Result<toml::Value, ConfigError> {
    let location = format!("{section}:{key}");
    if stack.iter().any(|(s, k)| s == section && k == key) {
        let chain: Vec<String> = stack.iter().map(|(s, k)| format!("{s}:{k}")).collect();
        return Err(ConfigError::Interpolation {
            location,
            reason: format!("reference cycle through {}", chain.join(" -> ")),
        });
    }
    let value = root
        .get(section)
        .and_then(|s| s.get(key))
        .ok_or_else(|| ConfigError::Interpolation {
            location: location.clone(),
            reason: "no such key".into(),
        })?;

    match value {
        toml::Value::String(text) if text.contains("${") => {
            stack.push((section.to_string(), key.to_string()));
            let expanded = expand(root, section, text, &location, stack)?;
            stack.pop();
            Ok(toml::Value::String(expanded))
        }
        toml::Value::Datetime(dt) => Ok(toml::Value::String(dt.to_string())),
        other => Ok(other.clone()),
    }
}

fn expand(
    root: &toml::Table,
    section: &str,
    text: &str,
    location: &str,
    stack: &mut Vec<(String, String)>,
) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| ConfigError::Interpolation {
            location: location.to_string(),
            reason: format!("unterminated placeholder in {text:?}"),
        })?;
        let reference = &after[..end];
        let (target_section, target_key) = match reference.split_once(':') {
            Some((s, k)) => (s.trim(), k.trim()),
            None => (section, reference.trim()),
        };
        let value = resolve_key(root, target_section, target_key, stack).map_err(|err| {
            match err {
                ConfigError::Interpolation { reason, .. } if reason == "no such key" => {
                    ConfigError::Interpolation {
                        location: location.to_string(),
                        reason: format!("unknown reference ${{{reference}}}"),
                    }
                }
                other => other,
            }
        })?;
        out.push_str(&scalar_to_string(&value).ok_or_else(|| {
            ConfigError::Interpolation {
                location: location.to_string(),
                reason: format!("${{{reference}}} is not a scalar value"),
            }
        })?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(dt) => Some(dt.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<InstanceConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: InstanceConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load, substitute, and validate the config file at `path`.
///
/// `Paths.curdir` is set to the file's directory before substitution, so
/// it can be referenced from other keys and anchors relative paths.
pub fn load_config(path: &Path) -> Result<InstanceConfig, ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    let content = fs::read_to_string(path).map_err(io_err)?;
    let mut raw: toml::Value = toml::from_str(&content)?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let curdir = fs::canonicalize(parent).map_err(io_err)?;
    if let toml::Value::Table(root) = &mut raw {
        let paths = root
            .entry("Paths")
            .or_insert(toml::Value::Table(toml::Table::new()));
        if let toml::Value::Table(paths) = paths {
            paths.insert(
                "curdir".to_string(),
                toml::Value::String(curdir.to_string_lossy().into_owned()),
            );
        }
    }

    // Defaults go in before substitution so `${usersEndpoint}` works even
    // when the file leaves it out.
    let merged = merge_toml(stock_defaults_value(), raw);
    resolve_config(interpolate(merged)?, None)
}

/// Returns a fully-commented stock config with every key explained.
///
/// Printed by `staticpub --print-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# StaticPub instance configuration
# ================================
# One file describes one actor. Run the generator once per file for
# multi-user setups, each with its own instanceFiles directory.
#
# String values may reference other keys:
#   ${key}           -> a key in the same section
#   ${Section:key}   -> a key in another section
#   ${Paths:curdir}  -> the directory containing this file
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Paths (relative paths resolve against this file's directory)
# ---------------------------------------------------------------------------
[Paths]
# One content file per post, each with a --- delimited header.
entries = "entries"

# Output root. Serve this directory as the root of Instance.domain.
instanceFiles = "public"

# Optional directory copied verbatim to {instanceFiles}/media/.
# media = "media"

# ---------------------------------------------------------------------------
# Actor profile
# ---------------------------------------------------------------------------
[Actor]
preferredUsername = "alice"
name = "Alice"
summary = "Writing things down, one static file at a time."
discoverable = true
manuallyApprovesFollowers = true
type = "Person"
# published = "2023-02-09T00:00:00Z"

# ---------------------------------------------------------------------------
# Outbox
# ---------------------------------------------------------------------------
[Outbox]
# Posts per outbox page. Must be at least 1.
paginate_by = 20

# ---------------------------------------------------------------------------
# Instance
# ---------------------------------------------------------------------------
[Instance]
host = "social.example.com"
domain = "https://${host}"
usersEndpoint = "users"
# Optional. When set it must match ${domain}/${usersEndpoint}/<handle>.
actor_id = "${domain}/${usersEndpoint}/${Actor:preferredUsername}"

# Decorative counts. No real federation happens behind them.
followers = 0
following = 0

# Optional entry file pinned to the featured collection.
# featured_note = "featured.md"

# Optional images, copied next to the actor document.
# icon = "avatar.png"
# banner = "banner.jpg"

# Emit CNAME and .nojekyll for GitHub Pages.
github_instance = false
"##
}
