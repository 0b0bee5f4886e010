//! Entry body rendering.
//!
//! Bodies are Markdown, rendered with `pulldown-cmark` into the HTML fragment
//! that goes into a Note's `content`. Adjustments for short-form posts:
//!
//! - Soft line breaks become `<br />`, so a line break in the file is a line
//!   break in the post.
//! - Raw HTML (blocks and inline) is emitted as escaped text. Remote servers
//!   sanitize content anyway, but the generator never publishes markup it
//!   did not produce itself.
//! - Link and image targets must be relative or use `http`, `https` or
//!   `mailto`. Anything else (`javascript:`, `data:`, ...) is replaced with
//!   an empty target.

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};
use url::{ParseError, Url};

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];

pub fn render_markdown(body: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let events = Parser::new_ext(body, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::SoftBreak => Event::HardBreak,
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_target(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_target(dest_url),
            title,
            id,
        }),
        other => other,
    });

    let mut out = String::with_capacity(body.len() * 3 / 2);
    html::push_html(&mut out, events);
    out.truncate(out.trim_end().len());
    out
}

fn safe_target(target: CowStr<'_>) -> CowStr<'_> {
    if is_safe_target(&target) {
        target
    } else {
        CowStr::Borrowed("")
    }
}

/// Relative references and the allowed absolute schemes pass.
fn is_safe_target(target: &str) -> bool {
    match Url::parse(target) {
        Ok(url) => ALLOWED_SCHEMES.contains(&url.scheme()),
        Err(ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}
