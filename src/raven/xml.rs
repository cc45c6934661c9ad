//! # XML Document Decoder
//!
//! Turns one accumulated fragment into a small element tree. RAVEn documents
//! are a single root element whose children carry text values, so the tree
//! keeps element names, trimmed text and child order and nothing else
//! (attributes are ignored).

use crate::error::RavenError;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// A decoded XML element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        XmlElement {
            name: name.into(),
            ..Default::default()
        }
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Text of the first child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// Flattens the children into `name=text` pairs for log output.
    pub fn summary(&self) -> String {
        let fields: Vec<String> = self
            .children
            .iter()
            .map(|c| format!("{}={}", c.name, c.text))
            .collect();
        format!("{} {{ {} }}", self.name, fields.join(", "))
    }
}

/// A decoded document: exactly one root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub root: XmlElement,
}

impl XmlDocument {
    /// Returns the root element if it is named `key`.
    pub fn top(&self, key: &str) -> Option<&XmlElement> {
        (self.root.name == key).then_some(&self.root)
    }

    pub fn root_name(&self) -> &str {
        &self.root.name
    }
}

/// Decodes a complete document string.
///
/// Errors carry the input so the caller can log what was received.
pub fn decode(input: &str) -> Result<XmlDocument, RavenError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            RavenError::decode(
                format!("XML error at position {}: {e}", reader.error_position()),
                input,
            )
        })?;

        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(RavenError::decode("multiple root elements", input));
                }
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.push(XmlElement::new(name));
            }
            Event::Empty(start) => {
                if root.is_some() {
                    return Err(RavenError::decode("multiple root elements", input));
                }
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                attach(&mut stack, &mut root, XmlElement::new(name));
            }
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                let element = stack
                    .pop()
                    .ok_or_else(|| RavenError::decode(format!("unexpected </{name}>"), input))?;
                if element.name != name {
                    return Err(RavenError::decode(
                        format!("expected </{}>, found </{name}>", element.name),
                        input,
                    ));
                }
                attach(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| RavenError::decode(format!("bad text: {e}"), input))?;
                match stack.last_mut() {
                    Some(current) => current.text.push_str(text.trim()),
                    None if text.trim().is_empty() => {}
                    None => return Err(RavenError::decode("text outside root element", input)),
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(RavenError::decode(format!("unclosed <{}>", open.name), input));
    }

    root.map(|root| XmlDocument { root })
        .ok_or_else(|| RavenError::decode("empty document", input))
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_nested_document() {
        let doc = decode(
            "<InstantaneousDemand>\r\n  <TimeStamp>0x1c8f4a3b</TimeStamp>\r\n  <Demand>0x0004f4</Demand>\r\n</InstantaneousDemand>\r\n",
        )
        .unwrap();
        assert_eq!(doc.root_name(), "InstantaneousDemand");
        assert_eq!(doc.root.child_text("Demand"), Some("0x0004f4"));
        assert_eq!(doc.root.child_text("TimeStamp"), Some("0x1c8f4a3b"));
        assert!(doc.top("InstantaneousDemand").is_some());
        assert!(doc.top("ConnectionStatus").is_none());
    }

    #[test]
    fn test_decode_empty_child() {
        let doc = decode("<A><B/><C>x</C></A>").unwrap();
        assert_eq!(doc.root.child_text("B"), Some(""));
        assert_eq!(doc.root.child_text("C"), Some("x"));
    }

    #[test]
    fn test_decode_keeps_first_duplicate() {
        let doc = decode("<A><B>1</B><B>2</B></A>").unwrap();
        assert_eq!(doc.root.child_text("B"), Some("1"));
        assert_eq!(doc.root.children.len(), 2);
    }

    #[test]
    fn test_decode_mismatched_end() {
        let err = decode("<A><B>1</C></A>").unwrap_err();
        assert!(matches!(err, RavenError::DecodeError { .. }));
    }

    #[test]
    fn test_decode_unclosed_root() {
        let err = decode("<A>\r\n<B>1</B>\r\n").unwrap_err();
        match err {
            RavenError::DecodeError { raw, .. } => assert_eq!(raw, "<A>\r\n<B>1</B>\r\n"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_decode_empty_input() {
        assert!(decode("").is_err());
        assert!(decode("\r\n").is_err());
    }

    #[test]
    fn test_decode_multiple_roots() {
        assert!(decode("<A></A><B></B>").is_err());
    }

    #[test]
    fn test_summary() {
        let doc = decode("<TimeCluster><UTCTime>0x1</UTCTime></TimeCluster>").unwrap();
        assert_eq!(doc.root.summary(), "TimeCluster { UTCTime=0x1 }");
    }
}
