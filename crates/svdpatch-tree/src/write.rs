use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;

use crate::element::Element;
use crate::error::TreeError;

/// Serialize an [`Element`] tree to a pretty-printed XML file, with the
/// standard `<?xml version="1.0" encoding="UTF-8"?>` declaration.
pub fn write_file(root: &Element, path: &Path) -> Result<(), TreeError> {
    let xml = to_string(root).map_err(|source| TreeError::Xml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, xml).map_err(|source| TreeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn to_string(root: &Element) -> Result<String, quick_xml::Error> {
    let mut buf = Vec::new();
    {
        let mut writer = Writer::new_with_indent(&mut buf, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_element(&mut writer, root)?;
    }
    Ok(String::from_utf8(buf).expect("xml writer emits valid utf-8"))
}

fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    el: &Element,
) -> Result<(), quick_xml::Error> {
    if el.children.is_empty() {
        match &el.text {
            Some(text) => {
                let mut start = BytesStart::new(el.tag.as_str());
                for (k, v) in &el.attributes {
                    start.push_attribute((k.as_str(), v.as_str()));
                }
                writer.write_event(Event::Start(start))?;
                writer.write_event(Event::Text(BytesText::new(text)))?;
                writer.write_event(Event::End(BytesEnd::new(el.tag.as_str())))?;
            }
            None => {
                let mut start = BytesStart::new(el.tag.as_str());
                for (k, v) in &el.attributes {
                    start.push_attribute((k.as_str(), v.as_str()));
                }
                writer.write_event(Event::Empty(start))?;
            }
        }
    } else {
        let mut start = BytesStart::new(el.tag.as_str());
        for (k, v) in &el.attributes {
            start.push_attribute((k.as_str(), v.as_str()));
        }
        writer.write_event(Event::Start(start))?;
        for child in &el.children {
            write_element(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(el.tag.as_str())))?;
    }
    Ok(())
}
