//! Extraction of downloadable items from RSS documents.
//!
//! Input is parsed strictly first; documents that are not well-formed get a
//! second, recovering pass before the feed is given up on.

pub mod recover;
pub mod tree;

use crate::app::Result;
use crate::domain::FeedItem;
use tree::Element;

/// Enclosures are only considered when their MIME type has this prefix.
pub const VIDEO_TYPE_PREFIX: &str = "video/";

/// Result of extracting one feed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Usable items in document order.
    pub items: Vec<FeedItem>,
    /// Number of `item` elements in the document, usable or not.
    pub item_count: usize,
    /// Refresh hint from `channel/ttl`, in minutes.
    pub ttl: Option<u32>,
}

#[derive(Clone)]
pub struct Extractor;

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self
    }

    /// Parse `data` and collect its items. Unparseable input is logged and
    /// yields an empty extraction.
    pub fn extract(&self, data: &[u8]) -> Extraction {
        let document = match parse_document(data) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!("Unable to parse feed data ({} bytes): {}", data.len(), e);
                return Extraction::default();
            }
        };

        let elements = document.descendants();
        let ttl = find_ttl(&elements);

        let nodes: Vec<&Element> = elements
            .into_iter()
            .filter(|el| el.is_named("item"))
            .collect();
        tracing::trace!("{} items in XML", nodes.len());

        let items = nodes.iter().filter_map(|node| read_item(node)).collect();

        Extraction {
            items,
            item_count: nodes.len(),
            ttl,
        }
    }
}

fn parse_document(data: &[u8]) -> Result<Element> {
    tree::parse_strict(data).or_else(|err| {
        tracing::debug!("Strict XML parse failed ({}), retrying in recovery mode", err);
        recover::parse_lenient(data)
    })
}

/// A `ttl` directly under a `channel`; only a single, numeric match counts.
fn find_ttl(elements: &[&Element]) -> Option<u32> {
    let mut matches = elements
        .iter()
        .filter(|el| el.is_named("channel"))
        .flat_map(|channel| channel.child_elements())
        .filter(|child| child.is_named("ttl"));

    match (matches.next(), matches.next()) {
        (Some(ttl), None) => ttl.text().trim().parse().ok(),
        _ => None,
    }
}

fn read_item(node: &Element) -> Option<FeedItem> {
    let mut item = FeedItem::default();
    let mut name: Option<String> = None;

    for child in node.child_elements() {
        match child.name.as_str() {
            "title" => {
                if name.is_none() {
                    name = Some(child.text().trim().to_string());
                }
            }
            "link" => {
                let link = child.text();
                let link = link.trim();
                if !link.is_empty() {
                    item.urls.push(link.to_string());
                }
            }
            "enclosure" => {
                if let Some(url) = video_enclosure(child) {
                    item.urls.push(url.to_string());
                }
            }
            _ => {}
        }
    }

    item.name = name.unwrap_or_default();
    item.is_usable().then_some(item)
}

fn video_enclosure(enclosure: &Element) -> Option<&str> {
    let url = enclosure.attribute("url")?;
    let kind = enclosure
        .attributes
        .iter()
        .find(|(key, _)| key == "type" || key == "content")
        .map(|(_, value)| value.as_str())?;

    (kind.starts_with(VIDEO_TYPE_PREFIX) && !url.trim().is_empty()).then_some(url.trim())
}
