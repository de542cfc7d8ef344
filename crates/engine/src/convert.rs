// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result normalization: the conversion step of the retry driver

use nr_core::{ConversionMethod, ResultMap};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};

/// Text form of a value: strings verbatim, everything else as JSON.
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Apply the service's conversion method to the `result` key.
///
/// A conversion failure replaces the whole map with a structured error that
/// keeps the original under `text_response`.
pub(crate) fn convert_result(method: ConversionMethod, results: ResultMap) -> ResultMap {
    if method == ConversionMethod::None || !results.contains_key("result") {
        return results;
    }
    let result = results.get("result").cloned().unwrap_or(Value::Null);
    let converted = match method {
        ConversionMethod::Text => Ok(Value::String(value_to_text(&result))),
        ConversionMethod::Json => match &result {
            Value::String(text) => {
                serde_json::from_str::<Value>(text).map_err(|e| e.to_string())
            }
            _ => Err("JSON conversion requires a text result".to_string()),
        },
        ConversionMethod::Xml => match &result {
            Value::String(text) => xml_to_value(text),
            _ => Err("XML conversion requires a text result".to_string()),
        },
        ConversionMethod::None => Ok(result),
    };
    match converted {
        Ok(value) => {
            let mut out = results;
            out.insert("result".to_string(), value);
            out
        }
        Err(exception) => {
            let mut out = ResultMap::new();
            out.insert("success".to_string(), Value::Bool(false));
            out.insert("text_response".to_string(), Value::Object(results));
            out.insert(
                "error".to_string(),
                Value::String(format!("Conversion to {method} failed")),
            );
            out.insert("exception".to_string(), Value::String(exception));
            out
        }
    }
}

#[derive(Default)]
struct XmlNode {
    map: Map<String, Value>,
    text: String,
}

impl XmlNode {
    fn into_value(self) -> Value {
        if self.map.is_empty() {
            Value::String(self.text)
        } else {
            let mut map = self.map;
            if !self.text.is_empty() {
                map.insert("#text".to_string(), Value::String(self.text));
            }
            Value::Object(map)
        }
    }

    /// Children are always collected into lists, so repeated tags and
    /// singletons have the same shape.
    fn push_child(&mut self, tag: String, value: Value) {
        match self.map.entry(tag).or_insert_with(|| Value::Array(Vec::new())) {
            Value::Array(items) => items.push(value),
            other => *other = Value::Array(vec![value]),
        }
    }
}

fn utf8(bytes: &[u8]) -> Result<String, String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string())
}

fn node_from_start(e: &quick_xml::events::BytesStart<'_>) -> Result<(String, XmlNode), String> {
    let tag = utf8(e.name().as_ref())?;
    let mut node = XmlNode::default();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = format!("@{}", utf8(attr.key.as_ref())?);
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        node.map.insert(key, Value::String(value.into_owned()));
    }
    Ok((tag, node))
}

/// Parse XML into a map, every element forced into a list (so repeated and
/// single children look alike). Attributes get an `@` prefix, mixed text
/// lands under `#text`.
pub(crate) fn xml_to_value(text: &str) -> Result<Value, String> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);
    let mut stack: Vec<(String, XmlNode)> = vec![(String::new(), XmlNode::default())];
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                stack.push(node_from_start(&e)?);
            }
            Ok(Event::Empty(e)) => {
                let (tag, node) = node_from_start(&e)?;
                if let Some((_, parent)) = stack.last_mut() {
                    parent.push_child(tag, node.into_value());
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                if let Some((_, node)) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some((_, node)) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let (tag, node) = match stack.pop() {
                    Some(top) => top,
                    None => return Err("unbalanced closing tag".to_string()),
                };
                match stack.last_mut() {
                    Some((_, parent)) => parent.push_child(tag, node.into_value()),
                    None => return Err("unbalanced closing tag".to_string()),
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(e.to_string()),
        }
    }
    if stack.len() != 1 {
        return Err("unclosed element".to_string());
    }
    match stack.pop() {
        Some((_, root)) if !root.map.is_empty() => Ok(Value::Object(root.map)),
        _ => Err("document has no root element".to_string()),
    }
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;
