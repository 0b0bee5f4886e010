//! ActivityStreams document builders.
//!
//! Each builder is a pure function from config, resolved endpoints, and
//! loaded entries to a serializable document. Nothing here touches the
//! filesystem; [`crate::generate`] decides where documents go.
//!
//! ## Documents
//!
//! | Builder | Document | Notes |
//! |---------|----------|-------|
//! | [`build_actor`] | `Person` | Endpoints, profile, optional icon/banner/featured |
//! | [`build_note`] | `Note` (or the entry's `type`) | One per entry |
//! | [`build_create`] | `Create` | Outbox item; references the post by ID |
//! | [`build_webfinger`] | JRD | Exactly one `self` link to the actor |
//! | [`build_followers`], [`build_following`] | `OrderedCollection` | Count only |
//! | [`build_featured`] | `OrderedCollection` | The pinned note, embedded |
//!
//! Followers and following carry `totalItems` and nothing else: the instance
//! does not federate, so there is no member list to publish. The actor has
//! no `publicKey` because no key material exists.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::config::InstanceConfig;
use crate::endpoints::ResolvedEndpoints;
use crate::markup;
use crate::types::{Entry, Post};

pub const ACTIVITYSTREAMS: &str = "https://www.w3.org/ns/activitystreams";
pub const SECURITY_V1: &str = "https://w3id.org/security/v1";
pub const PUBLIC: &str = "https://www.w3.org/ns/activitystreams#Public";

/// Media type of actor, note, and collection documents.
pub const ACTIVITY_JSON: &str = "application/activity+json";

/// A JSON-LD `@context`: either one IRI or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Context {
    Single(&'static str),
    Many(Vec<&'static str>),
}

impl Context {
    fn activitystreams() -> Self {
        Context::Single(ACTIVITYSTREAMS)
    }
}

/// Timestamps are published as `2023-01-03T10:00:00Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

// ============================================================================
// Actor
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRef {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "mediaType")]
    pub media_type: String,
    pub url: String,
}

impl ImageRef {
    pub fn new(media_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: "Image",
            media_type: media_type.into(),
            url: url.into(),
        }
    }
}

/// Images attached to the actor profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorMedia {
    pub icon: Option<ImageRef>,
    pub banner: Option<ImageRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    #[serde(rename = "@context")]
    pub context: Context,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub preferred_username: String,
    pub name: String,
    pub summary: String,
    pub url: String,
    pub inbox: String,
    pub outbox: String,
    pub following: String,
    pub followers: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<String>,
    pub manually_approves_followers: bool,
    pub discoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<ImageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

pub fn build_actor(
    config: &InstanceConfig,
    endpoints: &ResolvedEndpoints,
    media: &ActorMedia,
    has_featured: bool,
) -> Actor {
    Actor {
        context: Context::Many(vec![ACTIVITYSTREAMS, SECURITY_V1]),
        id: endpoints.actor.url.clone(),
        kind: config.actor.actor_type.clone(),
        preferred_username: config.actor.preferred_username.clone(),
        name: config.actor.name.clone(),
        summary: config.actor.summary.clone(),
        url: endpoints.domain.clone(),
        inbox: endpoints.inbox.clone(),
        outbox: endpoints.outbox.url.clone(),
        following: endpoints.following.url.clone(),
        followers: endpoints.followers.url.clone(),
        featured: has_featured.then(|| endpoints.featured.url.clone()),
        manually_approves_followers: config.actor.manually_approves_followers,
        discoverable: config.actor.discoverable,
        published: config.actor.published.as_ref().map(format_timestamp),
        icon: media.icon.clone(),
        image: media.banner.clone(),
    }
}

// ============================================================================
// Posts
// ============================================================================

/// Resolve an entry's ID and render its body.
pub fn build_post<'a>(endpoints: &ResolvedEndpoints, entry: &'a Entry) -> Post<'a> {
    Post {
        id: endpoints.post(&entry.id).url,
        entry,
        content: markup::render_markdown(&entry.body),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(rename = "@context", skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributed_to: String,
    pub published: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    pub url: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    pub content: String,
}

/// The standalone post document, written to `posts/{id}`.
pub fn build_note(endpoints: &ResolvedEndpoints, post: &Post<'_>) -> Note {
    let entry = post.entry;
    Note {
        context: Some(Context::activitystreams()),
        id: post.id.clone(),
        kind: entry.kind.clone(),
        attributed_to: endpoints.actor.url.clone(),
        published: format_timestamp(&entry.published),
        updated: entry.updated.as_ref().map(format_timestamp),
        url: post.id.clone(),
        to: vec![PUBLIC.to_string()],
        cc: vec![endpoints.followers.url.clone()],
        sensitive: entry.sensitive,
        summary: entry.summary.clone(),
        in_reply_to: entry.in_reply_to.clone(),
        content: post.content.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Create {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub actor: String,
    pub published: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    /// ID of the created post; the full note lives at that URL.
    pub object: String,
}

/// Outbox item for a post.
pub fn build_create(endpoints: &ResolvedEndpoints, post: &Post<'_>) -> Create {
    Create {
        id: endpoints.create_activity_id(&post.entry.id),
        kind: "Create",
        actor: endpoints.actor.url.clone(),
        published: format_timestamp(&post.entry.published),
        to: vec![PUBLIC.to_string()],
        cc: vec![endpoints.followers.url.clone()],
        object: post.id.clone(),
    }
}

// ============================================================================
// Webfinger
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Webfinger {
    pub subject: String,
    pub aliases: Vec<String>,
    pub links: Vec<WebfingerLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebfingerLink {
    pub rel: &'static str,
    #[serde(rename = "type")]
    pub media_type: &'static str,
    pub href: String,
}

pub fn build_webfinger(endpoints: &ResolvedEndpoints) -> Webfinger {
    Webfinger {
        subject: endpoints.subject.clone(),
        aliases: vec![endpoints.actor.url.clone()],
        links: vec![WebfingerLink {
            rel: "self",
            media_type: ACTIVITY_JSON,
            href: endpoints.actor.url.clone(),
        }],
    }
}

// ============================================================================
// Collections
// ============================================================================

/// A collection that publishes a count and no members.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountedCollection {
    #[serde(rename = "@context")]
    pub context: Context,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub total_items: u64,
}

pub fn build_followers(config: &InstanceConfig, endpoints: &ResolvedEndpoints) -> CountedCollection {
    CountedCollection {
        context: Context::activitystreams(),
        id: endpoints.followers.url.clone(),
        kind: "OrderedCollection",
        total_items: config.instance.followers,
    }
}

pub fn build_following(config: &InstanceConfig, endpoints: &ResolvedEndpoints) -> CountedCollection {
    CountedCollection {
        context: Context::activitystreams(),
        id: endpoints.following.url.clone(),
        kind: "OrderedCollection",
        total_items: config.instance.following,
    }
}

/// An unpaginated collection with inline members.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedCollection<T> {
    #[serde(rename = "@context")]
    pub context: Context,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub total_items: u64,
    pub ordered_items: Vec<T>,
}

/// The featured (pinned) collection. The note is embedded without its own
/// `@context` since the collection declares one.
pub fn build_featured(endpoints: &ResolvedEndpoints, mut note: Note) -> OrderedCollection<Note> {
    note.context = None;
    OrderedCollection {
        context: Context::activitystreams(),
        id: endpoints.featured.url.clone(),
        kind: "OrderedCollection",
        total_items: 1,
        ordered_items: vec![note],
    }
}
