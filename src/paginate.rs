//! Outbox pagination.
//!
//! Posts are ordered newest first (ties broken by entry identifier) and cut
//! into pages of at most `page_size` items. Page 0 holds the most recent
//! posts. Pages form a doubly linked chain through `next`/`prev`, and the
//! outbox points at both ends through `first`/`last`:
//!
//! ```text
//! outbox/index.json   totalItems=3  first=page/0  last=page/1
//! outbox/page/0       [2023-01-03, 2023-01-02]   next=page/1
//! outbox/page/1       [2023-01-01]               prev=page/0
//! ```
//!
//! With no posts the outbox is an empty collection (`totalItems: 0`) with
//! no `first`/`last` and no pages at all.
//!
//! Page numbers count from the newest post, so adding a post shifts older
//! posts toward higher pages. Page URLs are stable only for unchanged input.

use serde::Serialize;
use std::num::NonZeroUsize;

use crate::activity::{self, Context, Create};
use crate::endpoints::{Endpoint, ResolvedEndpoints};
use crate::types::{Entry, Post};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outbox {
    #[serde(rename = "@context")]
    pub context: Context,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub total_items: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxPage {
    #[serde(rename = "@context")]
    pub context: Context,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub part_of: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    pub ordered_items: Vec<Create>,
}

/// The outbox document plus every page and where each page goes.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxCollection {
    pub outbox: Outbox,
    pub pages: Vec<(Endpoint, OutboxPage)>,
}

/// Sort posts into collection order.
pub fn sort_posts(posts: &mut [Post<'_>]) {
    posts.sort_by(|a, b| Entry::collection_order(a.entry, b.entry));
}

pub fn paginate(
    endpoints: &ResolvedEndpoints,
    mut posts: Vec<Post<'_>>,
    page_size: NonZeroUsize,
) -> OutboxCollection {
    sort_posts(&mut posts);

    let chunks: Vec<&[Post<'_>]> = posts.chunks(page_size.get()).collect();
    let page_count = chunks.len();

    let pages: Vec<(Endpoint, OutboxPage)> = chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| {
            let endpoint = endpoints.outbox_page(index);
            let page = OutboxPage {
                context: Context::Single(activity::ACTIVITYSTREAMS),
                id: endpoint.url.clone(),
                kind: "OrderedCollectionPage",
                part_of: endpoints.outbox.url.clone(),
                prev: index
                    .checked_sub(1)
                    .map(|prev| endpoints.outbox_page(prev).url),
                next: (index + 1 < page_count).then(|| endpoints.outbox_page(index + 1).url),
                ordered_items: chunk
                    .iter()
                    .map(|post| activity::build_create(endpoints, post))
                    .collect(),
            };
            (endpoint, page)
        })
        .collect();

    let outbox = Outbox {
        context: Context::Single(activity::ACTIVITYSTREAMS),
        id: endpoints.outbox.url.clone(),
        kind: "OrderedCollection",
        total_items: posts.len() as u64,
        first: pages.first().map(|(ep, _)| ep.url.clone()),
        last: pages.last().map(|(ep, _)| ep.url.clone()),
    };

    OutboxCollection { outbox, pages }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::build_post;
    use crate::endpoints::resolve;
    use crate::test_helpers::{entry, test_config};
    use std::collections::HashSet;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn entries(dates: &[(&str, &str)]) -> Vec<Entry> {
        dates.iter().map(|(id, ts)| entry(id, ts)).collect()
    }

    fn run(entries: &[Entry], page_size: usize) -> OutboxCollection {
        let ep = resolve(&test_config()).unwrap();
        let posts = entries.iter().map(|e| build_post(&ep, e)).collect();
        paginate(&ep, posts, size(page_size))
    }

    fn page_objects(outbox: &OutboxCollection, page: usize) -> Vec<&str> {
        outbox.pages[page]
            .1
            .ordered_items
            .iter()
            .map(|c| c.object.as_str())
            .collect()
    }

    #[test]
    fn three_entries_two_per_page() {
        let es = entries(&[
            ("jan1", "2023-01-01T00:00:00Z"),
            ("jan2", "2023-01-02T00:00:00Z"),
            ("jan3", "2023-01-03T00:00:00Z"),
        ]);
        let col = run(&es, 2);

        assert_eq!(col.outbox.total_items, 3);
        assert_eq!(col.pages.len(), 2);
        assert_eq!(
            page_objects(&col, 0),
            vec![
                "https://example.com/posts/jan3",
                "https://example.com/posts/jan2"
            ]
        );
        assert_eq!(page_objects(&col, 1), vec!["https://example.com/posts/jan1"]);

        let page0 = &col.pages[0].1;
        let page1 = &col.pages[1].1;
        assert_eq!(page0.prev, None);
        assert_eq!(page0.next.as_deref(), Some("https://example.com/outbox/page/1"));
        assert_eq!(page1.prev.as_deref(), Some("https://example.com/outbox/page/0"));
        assert_eq!(page1.next, None);

        assert_eq!(
            col.outbox.first.as_deref(),
            Some("https://example.com/outbox/page/0")
        );
        assert_eq!(
            col.outbox.last.as_deref(),
            Some("https://example.com/outbox/page/1")
        );
    }

    #[test]
    fn zero_entries_has_no_pages() {
        let col = run(&[], 2);
        assert_eq!(col.outbox.total_items, 0);
        assert!(col.pages.is_empty());
        assert_eq!(col.outbox.first, None);
        assert_eq!(col.outbox.last, None);

        let json = serde_json::to_value(&col.outbox).unwrap();
        assert!(json.get("first").is_none());
        assert!(json.get("last").is_none());
        assert_eq!(json["totalItems"], 0);
    }

    #[test]
    fn single_page_is_first_and_last() {
        let es = entries(&[("a", "2023-01-01T00:00:00Z")]);
        let col = run(&es, 20);
        assert_eq!(col.pages.len(), 1);
        assert_eq!(col.outbox.first, col.outbox.last);
        assert_eq!(col.pages[0].1.prev, None);
        assert_eq!(col.pages[0].1.next, None);
    }

    #[test]
    fn exact_multiple_fills_every_page() {
        let es: Vec<Entry> = (1..=6)
            .map(|d| entry(&format!("d{d}"), &format!("2023-01-0{d}T00:00:00Z")))
            .collect();
        let col = run(&es, 3);
        assert_eq!(col.pages.len(), 2);
        assert!(col.pages.iter().all(|(_, p)| p.ordered_items.len() == 3));
    }

    #[test]
    fn page_sizes_and_coverage() {
        let es: Vec<Entry> = (0..23)
            .map(|i| entry(&format!("p{i:02}"), &format!("2023-02-{:02}T00:00:00Z", i + 1)))
            .collect();
        let col = run(&es, 5);

        assert_eq!(col.pages.len(), 5);
        for (_, page) in &col.pages[..4] {
            assert_eq!(page.ordered_items.len(), 5);
        }
        assert_eq!(col.pages[4].1.ordered_items.len(), 3);

        let all: Vec<&str> = col
            .pages
            .iter()
            .flat_map(|(_, p)| p.ordered_items.iter().map(|c| c.object.as_str()))
            .collect();
        let unique: HashSet<&str> = all.iter().copied().collect();
        assert_eq!(all.len(), 23);
        assert_eq!(unique.len(), 23);
        assert_eq!(col.outbox.total_items, 23);
    }

    #[test]
    fn links_form_a_doubly_linked_chain() {
        let es: Vec<Entry> = (0..10)
            .map(|i| entry(&format!("p{i}"), &format!("2023-03-{:02}T00:00:00Z", i + 1)))
            .collect();
        let col = run(&es, 3);

        for window in col.pages.windows(2) {
            let (ep_k, page_k) = &window[0];
            let (ep_next, page_next) = &window[1];
            assert_eq!(page_k.next.as_deref(), Some(ep_next.url.as_str()));
            assert_eq!(page_next.prev.as_deref(), Some(ep_k.url.as_str()));
        }
        assert_eq!(col.pages[0].1.prev, None);
        assert_eq!(col.pages.last().unwrap().1.next, None);
    }

    #[test]
    fn equal_timestamps_order_by_identifier() {
        let es = entries(&[
            ("b", "2023-01-01T00:00:00Z"),
            ("c", "2023-01-01T00:00:00Z"),
            ("a", "2023-01-01T00:00:00Z"),
        ]);
        let col = run(&es, 10);
        assert_eq!(
            page_objects(&col, 0),
            vec![
                "https://example.com/posts/a",
                "https://example.com/posts/b",
                "https://example.com/posts/c"
            ]
        );
    }

    #[test]
    fn order_does_not_depend_on_input_order() {
        let mut es = entries(&[
            ("x", "2023-01-02T00:00:00Z"),
            ("y", "2023-01-01T00:00:00Z"),
            ("z", "2023-01-03T00:00:00Z"),
        ]);
        let forward = run(&es, 2);
        es.reverse();
        let backward = run(&es, 2);
        assert_eq!(forward, backward);
    }

    #[test]
    fn pages_reference_the_outbox() {
        let es = entries(&[("a", "2023-01-01T00:00:00Z")]);
        let col = run(&es, 1);
        let page = serde_json::to_value(&col.pages[0].1).unwrap();
        assert_eq!(page["partOf"], "https://example.com/outbox/");
        assert_eq!(page["type"], "OrderedCollectionPage");
        assert_eq!(page["id"], "https://example.com/outbox/page/0");
        assert!(page.get("prev").is_none());
    }
}
