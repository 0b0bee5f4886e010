//! Identifier resolution.
//!
//! Every document the generator writes is addressed twice: by the URL that
//! other servers dereference, and by the file path under the output root
//! that the static host serves for that URL. [`Endpoint`] carries both, and
//! [`resolve`] is the only place either is computed, so a document's `id`
//! can never disagree with where it was written.
//!
//! ## URL Layout
//!
//! ```text
//! {domain}/{usersEndpoint}/{handle}   users/alice            Actor
//! {domain}/inbox                      (nothing written)      Inbox address
//! {domain}/outbox/                    outbox/index.json      Outbox
//! {domain}/outbox/page/{n}            outbox/page/{n}        Outbox page
//! {domain}/followers/                 followers/index.json   Followers
//! {domain}/following/                 following/index.json   Following
//! {domain}/featured/                  featured/index.json    Featured
//! {domain}/posts/{id}                 posts/{id}             Note
//! {domain}/.well-known/webfinger      .well-known/webfinger  Webfinger
//! ```
//!
//! Collections are directory URLs: `outbox` has to be a directory because
//! its pages live beneath it, and the other collections follow suit. The
//! host must serve `index.json` as the directory index.

use std::path::PathBuf;
use url::Url;

use crate::config::{ConfigError, InstanceConfig};
use crate::naming;

/// File served for collection directory URLs.
pub const COLLECTION_INDEX: &str = "index.json";

/// A document address: public URL plus path relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub path: PathBuf,
}

/// Every identifier used across the generated documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoints {
    /// Domain without trailing slash.
    pub domain: String,
    pub actor: Endpoint,
    /// Advertised address only. Nothing is served behind it.
    pub inbox: String,
    pub outbox: Endpoint,
    pub followers: Endpoint,
    pub following: Endpoint,
    pub featured: Endpoint,
    pub webfinger: Endpoint,
    /// Public host name, with port when the domain has a non-default one.
    pub host: String,
    /// `acct:{handle}@{host}`
    pub subject: String,
}

impl ResolvedEndpoints {
    pub fn post(&self, entry_id: &str) -> Endpoint {
        Endpoint {
            url: format!("{}/posts/{entry_id}", self.domain),
            path: PathBuf::from("posts").join(entry_id),
        }
    }

    /// ID of the `Create` activity wrapping a post. Fragment IDs are never
    /// written as files; the activity only appears inside outbox pages.
    pub fn create_activity_id(&self, entry_id: &str) -> String {
        format!("{}#create", self.post(entry_id).url)
    }

    pub fn outbox_page(&self, index: usize) -> Endpoint {
        Endpoint {
            url: format!("{}/outbox/page/{index}", self.domain),
            path: PathBuf::from("outbox").join("page").join(index.to_string()),
        }
    }

    /// A file placed at the output root, such as the avatar.
    pub fn root_file(&self, file_name: &str) -> Endpoint {
        Endpoint {
            url: format!("{}/{file_name}", self.domain),
            path: PathBuf::from(file_name),
        }
    }

    /// A file under the `media/` directory. `relative` uses `/` separators.
    pub fn media_file(&self, relative: &str) -> Endpoint {
        let mut path = PathBuf::from("media");
        path.extend(relative.split('/'));
        Endpoint {
            url: format!("{}/media/{relative}", self.domain),
            path,
        }
    }
}

fn collection(domain: &str, name: &str) -> Endpoint {
    Endpoint {
        url: format!("{domain}/{name}/"),
        path: PathBuf::from(name).join(COLLECTION_INDEX),
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Validation(message)
}

/// Compute every endpoint from the config. Pure; performs no I/O.
pub fn resolve(config: &InstanceConfig) -> Result<ResolvedEndpoints, ConfigError> {
    let raw_domain = config.instance.domain.trim();
    let url = Url::parse(raw_domain).map_err(|err| {
        invalid(format!(
            "Instance.domain {raw_domain:?} is not an absolute URL: {err}"
        ))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!(
            "Instance.domain {raw_domain:?} must use http or https"
        )));
    }
    let url_host = url
        .host_str()
        .ok_or_else(|| invalid(format!("Instance.domain {raw_domain:?} has no host")))?;
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid(format!(
            "Instance.domain {raw_domain:?} must not carry a query or fragment"
        )));
    }
    let domain = raw_domain.trim_end_matches('/').to_string();

    let handle = &config.actor.preferred_username;
    if !naming::is_path_safe(handle) {
        return Err(invalid(format!(
            "Actor.preferredUsername {handle:?} is not a valid path segment"
        )));
    }

    let users_endpoint = config.instance.users_endpoint.trim_matches('/');
    let user_segments: Vec<&str> = users_endpoint.split('/').collect();
    if user_segments.iter().any(|s| !naming::is_path_safe(s)) {
        return Err(invalid(format!(
            "Instance.usersEndpoint {:?} must be one or more path-safe segments",
            config.instance.users_endpoint
        )));
    }

    let mut actor_path: PathBuf = user_segments.iter().collect();
    actor_path.push(handle);
    let actor = Endpoint {
        url: format!("{domain}/{users_endpoint}/{handle}"),
        path: actor_path,
    };

    if let Some(configured) = config
        .instance
        .actor_id
        .as_deref()
        .filter(|id| !id.is_empty())
    {
        if configured != actor.url {
            return Err(invalid(format!(
                "Instance.actor_id {configured:?} does not match the actor document URL {:?}",
                actor.url
            )));
        }
    }

    let host = if config.instance.host.is_empty() {
        match url.port() {
            Some(port) => format!("{url_host}:{port}"),
            None => url_host.to_string(),
        }
    } else {
        config.instance.host.clone()
    };

    Ok(ResolvedEndpoints {
        inbox: format!("{domain}/inbox"),
        outbox: collection(&domain, "outbox"),
        followers: collection(&domain, "followers"),
        following: collection(&domain, "following"),
        featured: collection(&domain, "featured"),
        webfinger: Endpoint {
            url: format!("{domain}/.well-known/webfinger"),
            path: PathBuf::from(".well-known").join("webfinger"),
        },
        subject: format!("acct:{handle}@{host}"),
        host,
        actor,
        domain,
    })
}
