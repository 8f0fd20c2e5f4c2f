//! Owned element tree for a serialized page snapshot.
//!
//! The dashboard page is captured as markup (`outerHTML` of the page or the
//! table) and parsed leniently: unmatched end tags are ignored, void elements
//! never take children, and `&nbsp;` is read as a space. Inline `style`
//! declarations stand in for computed style.
//!
//! A bare `<` in text (`pressure < 5 bar`) is not valid markup. Browsers
//! serialize it as `&lt;`; when one does turn up it is logged and kept as
//! text up to the next end tag.

use std::borrow::Cow;

use maint_core::ReportError;
use quick_xml::Reader;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use tracing::warn;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `data-*` lookup by dataset key: `employeeId` reads `data-employee-id`.
    pub fn data(&self, key: &str) -> Option<&str> {
        self.attr(&dataset_attribute(key))
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Value of an inline style declaration. Later declarations win and
    /// `!important` is dropped.
    pub fn style(&self, property: &str) -> Option<String> {
        let style = self.attr("style")?;
        style
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .filter(|(prop, _)| prop.trim().eq_ignore_ascii_case(property))
            .map(|(_, value)| {
                value
                    .trim()
                    .trim_end_matches("!important")
                    .trim()
                    .to_string()
            })
            .last()
    }

    /// True when the inline style says `display: none`.
    pub fn is_display_none(&self) -> bool {
        self.style("display")
            .is_some_and(|display| display.eq_ignore_ascii_case("none"))
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// All descendant elements in document order, excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children().rev().collect(),
        }
    }

    pub fn find(&self, mut pred: impl FnMut(&Element) -> bool) -> Option<&Element> {
        self.descendants().find(|el| pred(el))
    }

    pub fn find_all(&self, mut pred: impl FnMut(&Element) -> bool) -> Vec<&Element> {
        self.descendants().filter(|el| pred(el)).collect()
    }

    pub fn find_tag(&self, tag: &str) -> Option<&Element> {
        self.find(|el| el.name == tag)
    }

    pub fn find_all_tag(&self, tag: &str) -> Vec<&Element> {
        self.find_all(|el| el.name == tag)
    }

    pub fn find_all_class(&self, class: &str) -> Vec<&Element> {
        self.find_all(|el| el.has_class(class))
    }

    pub fn find_id(&self, id: &str) -> Option<&Element> {
        self.find(|el| el.id() == Some(id))
    }

    /// Concatenated text of all descendant text nodes, untrimmed.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }
}

/// Pre-order iterator over descendant elements.
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let el = self.stack.pop()?;
        self.stack.extend(el.children().rev());
        Some(el)
    }
}

fn dataset_attribute(key: &str) -> String {
    let mut attr = String::from("data-");
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            attr.push('-');
            attr.push(c.to_ascii_lowercase());
        } else {
            attr.push(c);
        }
    }
    attr
}

/// A parsed snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn element_by_id(&self, id: &str) -> Option<&Element> {
        if self.root.id() == Some(id) {
            return Some(&self.root);
        }
        self.root.find_id(id)
    }

    pub fn parse(markup: &str) -> Result<Self, ReportError> {
        let mut reader = Reader::from_str(markup);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.allow_dangling_amp = true;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let mut stack = vec![Element::new("#document")];
        loop {
            let event = reader.read_event().map_err(|e| {
                ReportError::Markup(format!("at byte {}: {e}", reader.buffer_position()))
            })?;
            match event {
                Event::Start(start) if !is_tag_name(start.name().as_ref()) => {
                    warn!(
                        "Unescaped '<' in text near byte {}",
                        reader.buffer_position()
                    );
                    recover_stray_lt(&mut stack, &String::from_utf8_lossy(&start));
                }
                Event::Start(start) => {
                    let el = element_from_start(&start)?;
                    if VOID_ELEMENTS.contains(&el.name.as_str()) {
                        append_child(&mut stack, Node::Element(el));
                    } else {
                        stack.push(el);
                    }
                }
                Event::End(end) => {
                    close_element(&mut stack, &String::from_utf8_lossy(end.name().as_ref()));
                }
                Event::Text(text) => {
                    let text = text.xml_content().map_err(markup_error)?;
                    append_text(&mut stack, &text);
                }
                Event::CData(data) => {
                    let text = data.xml_content().map_err(markup_error)?;
                    append_text(&mut stack, &text);
                }
                Event::GeneralRef(reference) => {
                    let text = resolve_reference(&reference)?;
                    append_text(&mut stack, &text);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        while stack.len() > 1 {
            close_top(&mut stack);
        }
        let root = stack.pop().unwrap_or_default();
        Ok(Self { root })
    }
}

fn markup_error(e: impl std::fmt::Display) -> ReportError {
    ReportError::Markup(e.to_string())
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, ReportError> {
    let mut el = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.html_attributes() {
        let attr = attr.map_err(markup_error)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        // HTML named entities in attribute values are kept verbatim.
        let value = attr
            .unescape_value()
            .map(Cow::into_owned)
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string());
        el.set_attr(&key, value);
    }
    Ok(el)
}

fn resolve_reference(reference: &BytesRef<'_>) -> Result<String, ReportError> {
    let raw = reference.xml_content().map_err(markup_error)?;
    if let Some(number) = raw.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => number.parse::<u32>(),
        };
        return Ok(code
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| format!("&{raw};")));
    }
    if let Some(entity) = resolve_xml_entity(&raw) {
        return Ok(entity.to_string());
    }
    Ok(match raw.as_ref() {
        "nbsp" => " ".to_string(),
        "ndash" => "\u{2013}".to_string(),
        "mdash" => "\u{2014}".to_string(),
        "hellip" => "\u{2026}".to_string(),
        _ => format!("&{raw};"),
    })
}

fn append_child(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn append_text(stack: &mut [Element], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(parent) = stack.last_mut() {
        match parent.children.last_mut() {
            Some(Node::Text(existing)) => existing.push_str(text),
            _ => parent.children.push(Node::Text(text.to_string())),
        }
    }
}

fn is_tag_name(name: &[u8]) -> bool {
    name.first().is_some_and(u8::is_ascii_alphabetic)
}

/// Closes everything opened since the matching start tag. End tags with no
/// open match, and end tags of void elements, are ignored.
fn close_element(stack: &mut Vec<Element>, name: &str) {
    let name = name.trim().to_ascii_lowercase();
    if VOID_ELEMENTS.contains(&name.as_str()) {
        return;
    }
    match stack.iter().rposition(|el| el.name == name) {
        Some(pos) if pos > 0 => {
            while stack.len() > pos {
                close_top(stack);
            }
        }
        _ => {}
    }
}

/// `raw` is what the tokenizer read as a tag body after a bare `<`, e.g.
/// ` 5 bar</td` for `< 5 bar</td>`.
fn recover_stray_lt(stack: &mut Vec<Element>, raw: &str) {
    match raw.split_once("</") {
        Some((text, end_name)) => {
            append_text(stack, &format!("<{text}"));
            close_element(stack, end_name);
        }
        None => append_text(stack, &format!("<{raw}>")),
    }
}

fn close_top(stack: &mut Vec<Element>) {
    if let Some(el) = stack.pop() {
        append_child(stack, Node::Element(el));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_table() {
        let doc = Document::parse(
            r#"<table id="reports"><tbody><tr><td data-field="code"><a href="/c/1">EQ1</a></td></tr></tbody></table>"#,
        )
        .unwrap();
        let table = doc.element_by_id("reports").unwrap();
        assert_eq!(table.name(), "table");
        let td = table.find_tag("td").unwrap();
        assert_eq!(td.data("field"), Some("code"));
        assert_eq!(td.find_tag("a").unwrap().text_content(), "EQ1");
    }

    #[test]
    fn test_parse_void_elements_and_unclosed_tags() {
        let doc = Document::parse("<div><p>one<br>two<img src=x.png></p><p>three</div>").unwrap();
        let div = doc.root().find_tag("div").unwrap();
        assert_eq!(div.text_content(), "onetwothree");
        assert_eq!(div.find_all_tag("p").len(), 2);
        assert!(div.find_tag("br").unwrap().children().next().is_none());
    }

    #[test]
    fn test_parse_entities() {
        let doc = Document::parse("<td>A&amp;B&nbsp;C &#65;&#x42; &copy;</td>").unwrap();
        let td = doc.root().find_tag("td").unwrap();
        assert_eq!(td.text_content(), "A&B C AB &copy;");
    }

    #[test]
    fn test_parse_valueless_attribute() {
        let doc = Document::parse("<table><th hidden>Secret</th></table>").unwrap();
        let th = doc.root().find_tag("th").unwrap();
        assert!(th.attr("hidden").is_some());
    }

    #[test]
    fn test_parse_ignores_stray_end_tag() {
        let doc = Document::parse("<div>a</span>b</div>").unwrap();
        assert_eq!(doc.root().find_tag("div").unwrap().text_content(), "ab");
    }

    #[test]
    fn test_parse_keeps_bare_less_than_in_text() {
        let doc = Document::parse(
            "<table><tr><td>pressure < 5 bar</td><td>ok</td></tr></table>",
        )
        .unwrap();
        let cells = doc.root().find_all_tag("td");
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].text_content(), "pressure < 5 bar");
        assert_eq!(cells[1].text_content(), "ok");
    }

    #[test]
    fn test_dataset_lookup() {
        let el = Element::new("td")
            .with_attr("data-employee-id", "E123")
            .with_attr("data-area-code", "A1");
        assert_eq!(el.data("employeeId"), Some("E123"));
        assert_eq!(el.data("areaCode"), Some("A1"));
        assert_eq!(el.data("equipmentCode"), None);
    }

    #[test]
    fn test_inline_style_lookup() {
        let el = Element::new("th").with_attr("style", "width: 40px; DISPLAY : None !important;");
        assert_eq!(el.style("width").as_deref(), Some("40px"));
        assert!(el.is_display_none());
        assert!(el.style("min-width").is_none());

        let el = Element::new("tr").with_attr("style", "display:none; display: table-row");
        assert!(!el.is_display_none());
    }

    #[test]
    fn test_has_class() {
        let el = Element::new("span").with_attr("class", "badge bg-primary");
        assert!(el.has_class("badge"));
        assert!(!el.has_class("bg"));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let el = Element::new("tr")
            .with_child(Element::new("td").with_child(Element::new("span")))
            .with_child(Element::new("td"));
        let names: Vec<&str> = el.descendants().map(Element::name).collect();
        assert_eq!(names, vec!["td", "span", "td"]);

        let last = el.children().next_back().unwrap();
        assert!(last.children().next().is_none());
    }
}
