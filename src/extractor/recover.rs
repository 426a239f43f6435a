use html_escape::decode_html_entities;
use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::app::{ReelwatchError, Result};
use crate::extractor::tree::{Element, Node};

/// Best-effort parse for feeds that are not well-formed XML.
///
/// End tags close the nearest open element of the same name and are
/// ignored when nothing matches. Elements still open when the input ends
/// (or becomes unreadable) are closed at that point. Text and attribute
/// values are decoded from the encoding named in the XML declaration. Fails
/// only if no element at all could be read.
pub fn parse_lenient(data: &[u8]) -> Result<Element> {
    let mut reader = Reader::from_reader(data);
    {
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.check_comments = false;
    }

    let mut document = Element::default();
    let mut open: Vec<Element> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => open.push(element_from(&start, reader.decoder())),
            Ok(Event::Empty(start)) => {
                attach(&mut document, &mut open, element_from(&start, reader.decoder()))
            }
            Ok(Event::End(end)) => {
                let name = lossy(end.local_name().as_ref());
                if let Some(depth) = open.iter().rposition(|el| el.name == name) {
                    while open.len() > depth {
                        if let Some(el) = open.pop() {
                            attach(&mut document, &mut open, el);
                        }
                    }
                }
            }
            Ok(Event::Text(text)) => {
                let raw = decode(reader.decoder(), &text);
                push_text(&mut open, decode_html_entities(&raw).into_owned());
            }
            Ok(Event::CData(cdata)) => {
                push_text(&mut open, decode(reader.decoder(), &cdata));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(
                    "Recovering parser stopped at byte {}: {}",
                    reader.buffer_position(),
                    e
                );
                break;
            }
        }
    }

    while let Some(el) = open.pop() {
        attach(&mut document, &mut open, el);
    }

    if document.children.is_empty() {
        return Err(ReelwatchError::FeedParse(
            "no XML elements found in input".into(),
        ));
    }

    Ok(document)
}

fn element_from(start: &BytesStart<'_>, decoder: Decoder) -> Element {
    let mut element = Element::new(lossy(start.local_name().as_ref()));
    for attr in start.attributes().with_checks(false).flatten() {
        let key = lossy(attr.key.local_name().as_ref());
        let raw = decode(decoder, &attr.value);
        element
            .attributes
            .push((key, decode_html_entities(&raw).into_owned()));
    }
    element
}

fn attach(document: &mut Element, open: &mut [Element], element: Element) {
    match open.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => document.children.push(Node::Element(element)),
    }
}

fn push_text(open: &mut [Element], text: String) {
    // Text outside of any element carries nothing of interest.
    if let Some(parent) = open.last_mut() {
        parent.children.push(Node::Text(text));
    }
}

/// Falls back to lossy UTF-8 for bytes invalid in the declared encoding.
fn decode(decoder: Decoder, bytes: &[u8]) -> String {
    match decoder.decode(bytes) {
        Ok(text) => text.into_owned(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(doc: &Element) -> Vec<String> {
        doc.descendants().iter().map(|e| e.name.clone()).collect()
    }

    #[test]
    fn test_recovers_mismatched_end_tags() {
        let doc = parse_lenient(b"<rss><channel><item><title>A</b></title></item></channel></rss>")
            .unwrap();
        assert_eq!(names(&doc), vec!["rss", "channel", "item", "title"]);
        assert_eq!(doc.text(), "A");
    }

    #[test]
    fn test_closes_unterminated_elements() {
        let doc = parse_lenient(b"<rss><channel><item><title>A</title><link>http://x/1").unwrap();
        assert_eq!(names(&doc), vec!["rss", "channel", "item", "title", "link"]);
        let link = doc.descendants().into_iter().find(|e| e.is_named("link")).unwrap();
        assert_eq!(link.text(), "http://x/1");
    }

    #[test]
    fn test_end_tag_closes_skipped_children() {
        let doc = parse_lenient(b"<item><title>A<link>x</item><item><title>B</title></item>").unwrap();
        let items: Vec<&Element> = doc
            .descendants()
            .into_iter()
            .filter(|e| e.is_named("item"))
            .collect();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_decodes_html_entities() {
        let doc = parse_lenient(b"<title>Caf&eacute;&nbsp;&amp; Bar</title>").unwrap();
        assert_eq!(doc.text(), "Caf\u{e9}\u{a0}& Bar");
    }

    #[test]
    fn test_declared_latin1_encoding() {
        let data = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\
                     <title lang=\"d\xe9\">Caf\xe9 cr\xe8me</title>";
        let doc = parse_lenient(data).unwrap();
        let title = doc.child_elements().next().unwrap();
        assert_eq!(title.text(), "Caf\u{e9} cr\u{e8}me");
        assert_eq!(title.attribute("lang"), Some("d\u{e9}"));
    }

    #[test]
    fn test_duplicate_attributes_keep_first() {
        let doc = parse_lenient(br#"<enclosure url="http://x/a.mp4" type="video/mp4" url="dup"/>"#)
            .unwrap();
        let enclosure = doc.child_elements().next().unwrap();
        assert_eq!(enclosure.attribute("url"), Some("http://x/a.mp4"));
        assert_eq!(enclosure.attribute("type"), Some("video/mp4"));
    }

    #[test]
    fn test_plain_text_fails() {
        assert!(parse_lenient(b"this is not xml at all").is_err());
        assert!(parse_lenient(b"").is_err());
    }
}
