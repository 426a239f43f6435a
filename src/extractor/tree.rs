use crate::app::{ReelwatchError, Result};

/// Minimal element tree shared by the strict and the recovering parser.
///
/// The tree returned by either parser is rooted at an unnamed document
/// element whose children are the top-level elements of the input.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Element {
    /// Local name, without namespace prefix.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name == name
    }

    /// First attribute with the given local name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Every element below `self` in document order.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, out: &mut Vec<&'a Element>) {
        for child in self.child_elements() {
            out.push(child);
            child.collect_descendants(out);
        }
    }
}

/// Well-formedness-checking parse backed by roxmltree.
pub fn parse_strict(data: &[u8]) -> Result<Element> {
    let text = std::str::from_utf8(data)
        .map_err(|e| ReelwatchError::FeedParse(format!("input is not UTF-8: {}", e)))?;
    let text = text.trim_start_matches('\u{feff}');

    let mut options = roxmltree::ParsingOptions::default();
    options.allow_dtd = true;

    let doc = roxmltree::Document::parse_with_options(text, options)
        .map_err(|e| ReelwatchError::FeedParse(e.to_string()))?;

    let mut document = Element::default();
    document
        .children
        .push(Node::Element(convert(doc.root_element())));
    Ok(document)
}

fn convert(node: roxmltree::Node<'_, '_>) -> Element {
    let attributes = node
        .attributes()
        .map(|attr| (attr.name().to_string(), attr.value().to_string()))
        .collect();

    let children = node
        .children()
        .filter_map(|child| {
            if child.is_element() {
                Some(Node::Element(convert(child)))
            } else if child.is_text() {
                child.text().map(|t| Node::Text(t.to_string()))
            } else {
                None
            }
        })
        .collect();

    Element {
        name: node.tag_name().name().to_string(),
        attributes,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_parse_builds_tree() {
        let doc = parse_strict(br#"<rss><channel a="1"><title>T</title></channel></rss>"#).unwrap();
        let rss = doc.child_elements().next().unwrap();
        assert!(rss.is_named("rss"));
        let channel = rss.child_elements().next().unwrap();
        assert_eq!(channel.attribute("a"), Some("1"));
        assert_eq!(channel.text(), "T");
    }

    #[test]
    fn test_strict_parse_uses_local_names() {
        let doc = parse_strict(
            br#"<rss xmlns:media="http://search.yahoo.com/mrss/"><media:content url="u"/></rss>"#,
        )
        .unwrap();
        let names: Vec<&str> = doc.descendants().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["rss", "content"]);
    }

    #[test]
    fn test_strict_parse_rejects_mismatched_tags() {
        assert!(parse_strict(b"<rss><channel></rss>").is_err());
    }

    #[test]
    fn test_strict_parse_rejects_non_utf8() {
        assert!(parse_strict(b"<rss>\xff\xfe</rss>").is_err());
    }

    #[test]
    fn test_text_concatenates_cdata_and_children() {
        let doc = parse_strict(b"<a>one <b>two</b><![CDATA[ three]]></a>").unwrap();
        assert_eq!(doc.text(), "one two three");
    }
}
