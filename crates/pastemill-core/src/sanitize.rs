//! Markup sanitization.
//!
//! Parses pasted HTML leniently with quick-xml and reduces it to an
//! allow-listed element tree. Disallowed elements are dropped but their
//! children are kept (unwrapped), except for non-text containers such
//! as `script` and `style` whose whole subtree is discarded. Attributes
//! are filtered per tag, and link/image URLs must use an allowed scheme.
//!
//! The walk is total: a malformed tail stops parsing at the error point
//! and everything collected so far is kept.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// Element tags that survive sanitization.
const ALLOWED_TAGS: &[&str] = &[
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "p",
    "br",
    "hr",
    "div",
    "span",
    "strong",
    "b",
    "em",
    "i",
    "u",
    "s",
    "del",
    "blockquote",
    "pre",
    "code",
    "ul",
    "ol",
    "li",
    "table",
    "thead",
    "tbody",
    "tfoot",
    "tr",
    "th",
    "td",
    "a",
    "img",
];

/// Per-tag attribute allow list.
const ALLOWED_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href", "name", "target", "rel"]),
    ("img", &["src", "alt", "title"]),
    ("th", &["colspan", "rowspan", "align"]),
    ("td", &["colspan", "rowspan", "align"]),
    ("code", &["class"]),
    ("pre", &["class"]),
];

/// Containers whose text content is dropped along with the tag.
const NON_TEXT_TAGS: &[&str] = &["script", "style", "head", "title", "iframe", "object", "noscript"];

/// HTML void elements that never carry children.
const VOID_TAGS: &[&str] = &["br", "hr", "img"];

/// URL schemes accepted on `href`/`src`.
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// A sanitized element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct HtmlElement {
    /// Lowercased tag name; empty for the synthetic root.
    pub tag: String,
    /// Filtered attributes in document order.
    pub attrs: Vec<(String, String)>,
    /// Child content.
    pub children: Vec<HtmlNode>,
}

impl HtmlElement {
    /// Look up an attribute value by name.
    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Sanitized tree content: an element or a text run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum HtmlNode {
    Element(HtmlElement),
    Text(String),
}

/// Parse HTML into a sanitized tree rooted at a synthetic element.
pub(crate) fn sanitize_html(input: &str) -> HtmlElement {
    let mut reader = Reader::from_str(input);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    // Stack of open elements; `kept` marks allow-listed tags. Closing a
    // kept element attaches it to its parent, closing a dropped element
    // splices its children into the parent.
    let mut stack: Vec<(HtmlElement, bool)> = vec![(HtmlElement::default(), true)];

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let tag = decode_tag(&reader, &start);
                if NON_TEXT_TAGS.contains(&tag.as_str()) {
                    // Skip the whole subtree; on failure stop leniently
                    if reader.read_to_end(start.name()).is_err() {
                        break;
                    }
                    continue;
                }
                if VOID_TAGS.contains(&tag.as_str()) {
                    push_void(&mut stack, &reader, &start, &tag);
                    continue;
                }
                let kept = ALLOWED_TAGS.contains(&tag.as_str());
                let element = HtmlElement {
                    attrs: filter_attributes(&reader, &start, &tag),
                    tag,
                    children: Vec::new(),
                };
                stack.push((element, kept));
            }
            Ok(Event::Empty(start)) => {
                let tag = decode_tag(&reader, &start);
                if NON_TEXT_TAGS.contains(&tag.as_str()) {
                    continue;
                }
                push_void(&mut stack, &reader, &start, &tag);
            }
            Ok(Event::End(end)) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).to_lowercase();
                close_element(&mut stack, &name);
            }
            Ok(Event::Text(text)) => {
                if let Ok(decoded) = reader.decoder().decode(&text) {
                    append_text(&mut stack, &decoded);
                }
            }
            Ok(Event::GeneralRef(entity)) => {
                if let Ok(decoded) = reader.decoder().decode(&entity) {
                    append_text(&mut stack, &decode_entity(&decoded));
                }
            }
            Ok(Event::CData(data)) => {
                append_text(&mut stack, &String::from_utf8_lossy(&data));
            }
            Ok(Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_)) => {}
            // Malformed input ends the walk; keep what we have
            Ok(Event::Eof) | Err(_) => break,
        }
    }

    // Implicitly close anything left open
    while stack.len() > 1 {
        let (element, kept) = stack.pop().expect("stack underflow");
        attach(&mut stack, element, kept);
    }
    stack.pop().expect("missing sanitize root").0
}

/// Decode and lowercase an element name.
fn decode_tag(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> String {
    reader
        .decoder()
        .decode(start.name().as_ref())
        .map(|name| name.to_lowercase())
        .unwrap_or_default()
}

/// Keep only allow-listed attributes with valid URL schemes.
fn filter_attributes(reader: &Reader<&[u8]>, start: &BytesStart<'_>, tag: &str) -> Vec<(String, String)> {
    let Some((_, allowed)) = ALLOWED_ATTRIBUTES.iter().find(|(t, _)| *t == tag) else {
        return Vec::new();
    };

    let mut attrs = Vec::new();
    for attr in start.attributes().with_checks(false).filter_map(Result::ok) {
        let Ok(key) = reader.decoder().decode(attr.key.as_ref()) else {
            continue;
        };
        let key = key.to_lowercase();
        if !allowed.contains(&key.as_str()) {
            continue;
        }
        let value = decode_entities(&String::from_utf8_lossy(&attr.value));
        if matches!(key.as_str(), "href" | "src") && !is_allowed_url(&value) {
            continue;
        }
        attrs.push((key, value));
    }
    attrs
}

/// Append a void element (`br`, `hr`, `img`) to the open element.
fn push_void(stack: &mut Vec<(HtmlElement, bool)>, reader: &Reader<&[u8]>, start: &BytesStart<'_>, tag: &str) {
    if !ALLOWED_TAGS.contains(&tag) {
        return;
    }
    let element = HtmlElement {
        attrs: filter_attributes(reader, start, tag),
        tag: tag.to_owned(),
        children: Vec::new(),
    };
    if let Some((parent, _)) = stack.last_mut() {
        parent.children.push(HtmlNode::Element(element));
    }
}

/// Close the innermost element with the given name.
///
/// Elements left open above it are closed implicitly; an end tag with no
/// matching open element is ignored.
fn close_element(stack: &mut Vec<(HtmlElement, bool)>, name: &str) {
    let Some(position) = stack.iter().skip(1).rposition(|(el, _)| el.tag == name) else {
        return;
    };
    while stack.len() > position + 1 {
        let (element, kept) = stack.pop().expect("stack underflow");
        attach(stack, element, kept);
    }
}

/// Attach a closed element to its parent, unwrapping dropped tags.
fn attach(stack: &mut [(HtmlElement, bool)], element: HtmlElement, kept: bool) {
    let Some((parent, _)) = stack.last_mut() else {
        return;
    };
    if kept {
        parent.children.push(HtmlNode::Element(element));
    } else {
        parent.children.extend(element.children);
    }
}

/// Append text to the innermost open element.
fn append_text(stack: &mut [(HtmlElement, bool)], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some((parent, _)) = stack.last_mut() {
        if let Some(HtmlNode::Text(existing)) = parent.children.last_mut() {
            existing.push_str(text);
        } else {
            parent.children.push(HtmlNode::Text(text.to_owned()));
        }
    }
}

/// Check a URL against the scheme allow list.
///
/// Scheme-less (relative) URLs pass; protocol-relative URLs do not.
fn is_allowed_url(url: &str) -> bool {
    let trimmed = url.trim();
    if trimmed.starts_with("//") {
        return false;
    }
    match trimmed.split_once(':') {
        Some((scheme, _)) => {
            // A colon after a path separator is not a scheme delimiter
            if scheme.contains('/') || scheme.contains('#') || scheme.contains('?') {
                return true;
            }
            ALLOWED_SCHEMES.contains(&scheme.to_lowercase().as_str())
        }
        None => true,
    }
}

/// Decode a single entity reference body (`amp`, `#160`, `#x2019`, …).
fn decode_entity(entity: &str) -> String {
    match entity {
        "amp" => "&".to_owned(),
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "quot" => "\"".to_owned(),
        "apos" => "'".to_owned(),
        "nbsp" => "\u{a0}".to_owned(),
        "mdash" => "\u{2014}".to_owned(),
        "ndash" => "\u{2013}".to_owned(),
        "laquo" => "\u{ab}".to_owned(),
        "raquo" => "\u{bb}".to_owned(),
        "hellip" => "\u{2026}".to_owned(),
        _ => {
            if let Some(code) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                if let Some(ch) = u32::from_str_radix(code, 16).ok().and_then(char::from_u32) {
                    return ch.to_string();
                }
            } else if let Some(code) = entity.strip_prefix('#') {
                if let Some(ch) = code.parse::<u32>().ok().and_then(char::from_u32) {
                    return ch.to_string();
                }
            }
            format!("&{entity};")
        }
    }
}

/// Decode `&…;` references embedded in attribute values.
fn decode_entities(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find('&') {
        output.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        if let Some(end) = after.find(';') {
            let body = &after[..end];
            if !body.is_empty() && body.len() <= 8 && !body.contains('&') {
                output.push_str(&decode_entity(body));
                rest = &after[end + 1..];
                continue;
            }
        }
        output.push('&');
        rest = after;
    }
    output.push_str(rest);
    output
}
