//! Minimal XML element tree for NETCONF replies.

use crate::parsers::ParseError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// XML 元素，名稱已去除 namespace prefix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

fn local_name(raw: &[u8]) -> String {
    let name = String::from_utf8_lossy(raw);
    match name.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => name.into_owned(),
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlNode, ParseError> {
    let mut node = XmlNode {
        name: local_name(start.name().as_ref()),
        ..XmlNode::default()
    };

    for attr in start.attributes() {
        let attr = attr.map_err(|e| ParseError::Xml(e.to_string()))?;
        let key = local_name(attr.key.as_ref());
        if key == "xmlns" || attr.key.as_ref().starts_with(b"xmlns:") {
            continue;
        }
        let value = attr
            .unescape_value()
            .map_err(|e| ParseError::Xml(e.to_string()))?;
        node.attributes.insert(key, value.into_owned());
    }

    Ok(node)
}

impl XmlNode {
    /// 解析 XML 文件並回傳根元素
    pub fn parse(xml: &str) -> Result<XmlNode, ParseError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => stack.push(element_from(&e)?),
                Ok(Event::Empty(e)) => {
                    let node = element_from(&e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => root = Some(node),
                    }
                }
                Ok(Event::End(_)) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| ParseError::Xml("unbalanced closing tag".to_string()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => root = Some(node),
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(current) = stack.last_mut() {
                        let text = e.unescape().map_err(|e| ParseError::Xml(e.to_string()))?;
                        current.text.push_str(text.trim());
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(String::from_utf8_lossy(&e.into_inner()).trim());
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(ParseError::Xml(format!(
                        "error at position {}: {}",
                        reader.error_position(),
                        e
                    )))
                }
            }
        }

        if !stack.is_empty() {
            return Err(ParseError::Xml(format!(
                "unclosed element <{}>",
                stack.last().map(|n| n.name.as_str()).unwrap_or_default()
            )));
        }

        root.ok_or_else(|| ParseError::Xml("document has no root element".to_string()))
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// 以 `a/b/c` 路徑尋找第一個符合的子孫元素
    pub fn find(&self, path: &str) -> Option<&XmlNode> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// 以路徑尋找所有符合的元素，中間層可有多個
    pub fn find_all(&self, path: &str) -> Vec<&XmlNode> {
        let mut current: Vec<&XmlNode> = vec![self];
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|node| node.children.iter().filter(move |c| c.name == segment))
                .collect();
        }
        current
    }

    /// 路徑上元素的文字，空白視為不存在
    pub fn text_at(&self, path: &str) -> Option<&str> {
        self.find(path)
            .map(|node| node.text.as_str())
            .filter(|text| !text.is_empty())
    }

    /// 轉為 JSON：重複的子元素變成陣列，屬性以 `@` 為前綴
    pub fn to_json(&self) -> Value {
        if self.children.is_empty() && self.attributes.is_empty() {
            return Value::String(self.text.clone());
        }

        let mut map = Map::new();
        for (key, value) in &self.attributes {
            map.insert(format!("@{}", key), Value::String(value.clone()));
        }
        if !self.text.is_empty() {
            map.insert("#text".to_string(), Value::String(self.text.clone()));
        }
        for child in &self.children {
            let value = child.to_json();
            match map.get_mut(&child.name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(child.name.clone(), value);
                }
            }
        }
        Value::Object(map)
    }
}
