use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::element::Element;
use crate::error::TreeError;

/// Parse an SVD (or any single-root XML) file into a mutable [`Element`] tree.
///
/// Interior comments and processing instructions are discarded; the schema
/// normaliser would strip them from sorted elements anyway and nothing in the
/// patch language can address them.
pub fn parse_file(path: &Path) -> Result<Element, TreeError> {
    let bytes = std::fs::read(path).map_err(|source| TreeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let el = parse_bytes(&bytes, path)?;
    tracing::debug!(?path, tag = %el.tag, "parsed");
    Ok(el)
}

pub fn parse_str(xml: &str, path: &Path) -> Result<Element, TreeError> {
    parse_bytes(xml.as_bytes(), path)
}

fn parse_bytes(bytes: &[u8], path: &Path) -> Result<Element, TreeError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(tag)) => {
                let mut el = Element::new(decode(tag.name().as_ref()));
                for attr in tag.attributes().flatten() {
                    let key = decode(attr.key.as_ref());
                    let value = attr
                        .unescape_value()
                        .map(|v| v.into_owned())
                        .unwrap_or_default();
                    el.set_attr(key, value);
                }
                stack.push(el);
            }
            Ok(Event::Empty(tag)) => {
                let mut el = Element::new(decode(tag.name().as_ref()));
                for attr in tag.attributes().flatten() {
                    let key = decode(attr.key.as_ref());
                    let value = attr
                        .unescape_value()
                        .map(|v| v.into_owned())
                        .unwrap_or_default();
                    el.set_attr(key, value);
                }
                push_finished(&mut stack, &mut root, el);
            }
            Ok(Event::Text(text)) => {
                let decoded = text
                    .unescape()
                    .map(|v| v.into_owned())
                    .unwrap_or_default();
                let trimmed = decoded.trim();
                if !trimmed.is_empty() {
                    if let Some(top) = stack.last_mut() {
                        top.text = Some(trimmed.to_string());
                    }
                }
            }
            Ok(Event::End(_)) => {
                let el = stack.pop().ok_or_else(|| TreeError::Xml {
                    path: path.to_path_buf(),
                    source: quick_xml::Error::TextNotFound,
                })?;
                push_finished(&mut stack, &mut root, el);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(source) => {
                return Err(TreeError::Xml {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
        buf.clear();
    }

    root.ok_or_else(|| TreeError::EmptyDocument {
        path: path.to_path_buf(),
    })
}

fn push_finished(stack: &mut Vec<Element>, root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(el);
        }
        None => {
            *root = Some(el);
        }
    }
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
