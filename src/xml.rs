//! XML codec for the aggregation API.
//!
//! Documents are mapped onto `serde_json::Value` trees:
//! - attributes become `@name` keys, mixed text becomes `#text`
//! - a leaf element becomes a string, or `null` when empty
//! - a repeated child name becomes an array in document order
//!
//! A child that appears once is never wrapped in an array, so callers that
//! expect a list must normalize (see `client::envelope`).

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

use crate::errors::{FinicityError, Result};

const TEXT_KEY: &str = "#text";

struct Frame {
    name: String,
    attrs: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let name = utf8(start.name().as_ref())?;
        let mut attrs = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| FinicityError::decode(e.to_string()))?;
            let key = utf8(attr.key.as_ref())?;
            let value = attr
                .unescape_value()
                .map_err(|e| FinicityError::decode(e.to_string()))?;
            attrs.insert(format!("@{}", key), Value::String(value.into_owned()));
        }
        Ok(Self {
            name,
            attrs,
            children: Map::new(),
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        if self.attrs.is_empty() && self.children.is_empty() {
            let value = if self.text.is_empty() {
                Value::Null
            } else {
                Value::String(self.text)
            };
            return (self.name, value);
        }

        let mut map = self.attrs;
        for (key, child) in self.children {
            map.insert(key, child);
        }
        if !self.text.is_empty() {
            map.insert(TEXT_KEY.to_string(), Value::String(self.text));
        }
        (self.name, Value::Object(map))
    }
}

fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| FinicityError::decode(format!("invalid utf-8 in element name: {}", e)))
}

/// Insert a child, turning the slot into an array on the second occurrence.
fn attach(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            children.insert(name, value);
        }
    }
}

/// Parse an XML document into a value keyed by its root element name.
pub fn decode(input: &str) -> Result<Value> {
    let mut reader = Reader::from_str(input);
    reader.trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root = Map::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| FinicityError::decode(format!("malformed XML: {}", e)))?;
        match event {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = Frame::open(&start)?.close();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.children, name, value),
                    None => attach(&mut root, name, value),
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| FinicityError::decode(e.to_string()))?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| FinicityError::decode("unbalanced closing tag"))?;
                let (name, value) = frame.close();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.children, name, value),
                    None => attach(&mut root, name, value),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(FinicityError::decode("unexpected end of document"));
    }
    if root.is_empty() {
        return Err(FinicityError::decode("empty document"));
    }
    Ok(Value::Object(root))
}

/// Serialize a value tree into an XML fragment (no declaration).
///
/// The top-level value must be an object; each of its keys becomes a root
/// element.
pub fn encode(value: &Value) -> Result<String> {
    let map = value
        .as_object()
        .ok_or_else(|| FinicityError::Encode("XML body must be an object".into()))?;

    let mut writer = Writer::new(Vec::new());
    for (name, child) in map {
        write_element(&mut writer, name, child)?;
    }
    String::from_utf8(writer.into_inner()).map_err(|e| FinicityError::Encode(e.to_string()))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| FinicityError::Encode(e.to_string()))
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<()> {
    match value {
        Value::Array(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }
        }
        Value::Object(map) => {
            let mut start = BytesStart::new(name);
            for (key, attr) in map.iter().filter(|(k, _)| k.starts_with('@')) {
                let text = scalar_text(attr).ok_or_else(|| {
                    FinicityError::Encode(format!("attribute {} must be a scalar", key))
                })?;
                start.push_attribute((&key[1..], text.as_str()));
            }
            emit(writer, Event::Start(start))?;
            for (key, child) in map {
                if key == TEXT_KEY {
                    if let Some(text) = scalar_text(child) {
                        emit(writer, Event::Text(BytesText::new(&text)))?;
                    }
                } else if !key.starts_with('@') {
                    write_element(writer, key, child)?;
                }
            }
            emit(writer, Event::End(BytesEnd::new(name)))?;
        }
        Value::Null => {
            emit(writer, Event::Start(BytesStart::new(name)))?;
            emit(writer, Event::End(BytesEnd::new(name)))?;
        }
        scalar => {
            let text = scalar_text(scalar).unwrap_or_default();
            emit(writer, Event::Start(BytesStart::new(name)))?;
            emit(writer, Event::Text(BytesText::new(&text)))?;
            emit(writer, Event::End(BytesEnd::new(name)))?;
        }
    }
    Ok(())
}
