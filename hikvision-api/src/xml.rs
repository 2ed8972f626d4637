//! XML documents fetched from the device and field access on them
//!
//! Firmware generations disagree on namespaces: some declare a default
//! `xmlns` on the root, some prefix elements, some use none at all. Documents
//! are therefore normalized when parsed. In the default [`NamespaceMode::Strip`]
//! every namespace is dropped and fields are looked up by local name only, so
//! one field path works against every variant. [`NamespaceMode::Qualified`]
//! keeps namespaces and only matches elements declared in the dialect's
//! namespace URI (or carrying an explicit prefix), for firmware where bare
//! local names are ambiguous.
//!
//! A field path must resolve to exactly one element. Zero matches is
//! [`ApiError::FieldNotFound`], several is [`ApiError::FieldNotUnique`].

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use xmltree::{Element, EmitterConfig, Namespace, XMLNode};

use crate::{ApiError, Result};

/// How element names are matched against field paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceMode {
    /// Drop all namespace information and match on local names
    #[default]
    Strip,
    /// Match only elements in the dialect's namespace URI
    Qualified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    prefix: Option<String>,
    local: String,
}

/// Dotted locator for an element, e.g. `enabled` or `MotionDetectionLayout.sensitivityLevel`
///
/// The first segment matches the root or any descendant; each following
/// segment matches a direct child of the previous one. A segment may carry a
/// namespace prefix (`xs:enabled`), which is only honored for qualified
/// documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self> {
        let segments = path
            .split('.')
            .map(|raw| {
                let raw = raw.trim();
                let (prefix, local) = match raw.split_once(':') {
                    Some((prefix, local)) => (Some(prefix.to_string()), local),
                    None => (None, raw),
                };
                if local.is_empty() || prefix.as_deref() == Some("") {
                    return Err(ApiError::ParseError(format!("Invalid field path: '{}'", path)));
                }
                Ok(Segment {
                    prefix,
                    local: local.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { segments })
    }
}

impl FromStr for FieldPath {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            if let Some(prefix) = &segment.prefix {
                write!(f, "{}:", prefix)?;
            }
            f.write_str(&segment.local)?;
        }
        Ok(())
    }
}

/// A parsed XML body, held only for the duration of one operation
#[derive(Debug, Clone)]
pub struct XmlDocument {
    root: Element,
    /// Namespace URI elements must carry to match; `None` when stripped
    qualifier: Option<String>,
    /// Namespace of the root as received, re-emitted on serialization
    root_namespace: Option<RootNamespace>,
}

/// Root namespace binding, either default (`xmlns=`) or prefixed (`xmlns:xs=`)
#[derive(Debug, Clone)]
struct RootNamespace {
    prefix: Option<String>,
    uri: String,
}

impl XmlDocument {
    /// Parse `text` and strip every namespace from it
    pub fn parse(text: &str) -> Result<Self> {
        let mut root = parse_element(text)?;
        let root_namespace = root_namespace(&root);
        strip_namespaces(&mut root);

        Ok(Self {
            root,
            qualifier: None,
            root_namespace,
        })
    }

    /// Parse `text` keeping namespaces; fields must live in `namespace_uri`
    pub fn parse_qualified(text: &str, namespace_uri: &str) -> Result<Self> {
        let root = parse_element(text)?;
        Ok(Self {
            root,
            qualifier: Some(namespace_uri.to_string()),
            root_namespace: None,
        })
    }

    /// Parse according to `mode`, using `namespace_uri` for qualified lookups
    pub fn parse_with(text: &str, mode: NamespaceMode, namespace_uri: &str) -> Result<Self> {
        match mode {
            NamespaceMode::Strip => Self::parse(text),
            NamespaceMode::Qualified => Self::parse_qualified(text, namespace_uri),
        }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Local name of the root element
    pub fn root_name(&self) -> &str {
        &self.root.name
    }

    /// Number of elements matching `path`
    pub fn count(&self, path: &str) -> Result<usize> {
        let path = FieldPath::parse(path)?;
        Ok(self.matches(&path).len())
    }

    /// The unique element matching `path`
    pub fn find(&self, path: &str) -> Result<&Element> {
        let path = FieldPath::parse(path)?;
        let trail = self.unique(&path)?;

        let mut element = &self.root;
        for &index in &trail {
            element = match element.children.get(index) {
                Some(XMLNode::Element(child)) => child,
                _ => return Err(ApiError::FieldNotFound(path.to_string())),
            };
        }
        Ok(element)
    }

    fn find_mut(&mut self, path: &str) -> Result<&mut Element> {
        let path = FieldPath::parse(path)?;
        let trail = self.unique(&path)?;

        let mut element = &mut self.root;
        for &index in &trail {
            element = match element.children.get_mut(index) {
                Some(XMLNode::Element(child)) => child,
                _ => return Err(ApiError::FieldNotFound(path.to_string())),
            };
        }
        Ok(element)
    }

    /// Trimmed text of the unique element matching `path`
    pub fn get_text(&self, path: &str) -> Result<String> {
        let element = self.find(path)?;
        Ok(element
            .get_text()
            .map(|text| text.trim().to_string())
            .unwrap_or_default())
    }

    /// Replace the text of the unique element matching `path`
    pub fn set_text(&mut self, path: &str, value: &str) -> Result<&mut Self> {
        let element = self.find_mut(path)?;
        element
            .children
            .retain(|node| !matches!(node, XMLNode::Text(_) | XMLNode::CData(_)));
        element.children.push(XMLNode::Text(value.to_string()));
        Ok(self)
    }

    /// Read a `true`/`false` field
    pub fn get_bool(&self, path: &str) -> Result<bool> {
        let text = self.get_text(path)?;
        match text.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(ApiError::ParseError(format!(
                "Field '{}' is not a boolean: '{}'",
                path, other
            ))),
        }
    }

    pub fn set_bool(&mut self, path: &str, value: bool) -> Result<&mut Self> {
        self.set_text(path, if value { "true" } else { "false" })
    }

    /// Read a decimal integer field
    pub fn get_int(&self, path: &str) -> Result<i64> {
        let text = self.get_text(path)?;
        text.parse::<i64>().map_err(|_| {
            ApiError::ParseError(format!("Field '{}' is not an integer: '{}'", path, text))
        })
    }

    pub fn set_int(&mut self, path: &str, value: i64) -> Result<&mut Self> {
        self.set_text(path, &value.to_string())
    }

    /// Serialize back to a UTF-8 XML document
    pub fn to_xml(&self) -> Result<String> {
        let mut root = self.root.clone();
        if let Some(ns) = &self.root_namespace {
            let mut namespaces = Namespace::empty();
            match &ns.prefix {
                Some(prefix) => {
                    namespaces.put(prefix.as_str(), ns.uri.as_str());
                    apply_prefix(&mut root, prefix, &ns.uri);
                }
                None => {
                    namespaces.put("", ns.uri.as_str());
                    root.namespace = Some(ns.uri.clone());
                }
            }
            root.namespaces = Some(namespaces);
        }

        let config = EmitterConfig::new()
            .perform_indent(false)
            .write_document_declaration(true);

        let mut buffer = Vec::new();
        root.write_with_config(&mut buffer, config)
            .map_err(|e| ApiError::ParseError(format!("Failed to serialize XML: {}", e)))?;

        String::from_utf8(buffer)
            .map_err(|e| ApiError::ParseError(format!("Serialized XML is not UTF-8: {}", e)))
    }

    fn unique(&self, path: &FieldPath) -> Result<Vec<usize>> {
        let mut matches = self.matches(path);
        match matches.len() {
            0 => Err(ApiError::FieldNotFound(path.to_string())),
            1 => Ok(matches.remove(0)),
            count => Err(ApiError::FieldNotUnique {
                field: path.to_string(),
                count,
            }),
        }
    }

    /// Child-index trails from the root to every element matching `path`
    fn matches(&self, path: &FieldPath) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        let mut trail = Vec::new();
        self.search(&self.root, &path.segments, &mut trail, &mut out);
        out
    }

    fn search(
        &self,
        element: &Element,
        segments: &[Segment],
        trail: &mut Vec<usize>,
        out: &mut Vec<Vec<usize>>,
    ) {
        if self.segment_matches(&segments[0], element) {
            self.follow(element, &segments[1..], trail, out);
        }
        for (index, child) in child_elements(element) {
            trail.push(index);
            self.search(child, segments, trail, out);
            trail.pop();
        }
    }

    fn follow(
        &self,
        element: &Element,
        rest: &[Segment],
        trail: &mut Vec<usize>,
        out: &mut Vec<Vec<usize>>,
    ) {
        let Some((segment, rest)) = rest.split_first() else {
            out.push(trail.clone());
            return;
        };
        for (index, child) in child_elements(element) {
            if self.segment_matches(segment, child) {
                trail.push(index);
                self.follow(child, rest, trail, out);
                trail.pop();
            }
        }
    }

    fn segment_matches(&self, segment: &Segment, element: &Element) -> bool {
        if element.name != segment.local {
            return false;
        }
        match (&self.qualifier, &segment.prefix) {
            (None, _) => true,
            (Some(_), Some(prefix)) => element.prefix.as_deref() == Some(prefix.as_str()),
            (Some(uri), None) => element.namespace.as_deref() == Some(uri.as_str()),
        }
    }
}

fn parse_element(text: &str) -> Result<Element> {
    Element::parse(text.as_bytes())
        .map_err(|e| ApiError::ParseError(format!("Invalid XML document: {}", e)))
}

fn root_namespace(root: &Element) -> Option<RootNamespace> {
    let uri = root.namespace.clone().filter(|ns| !ns.is_empty())?;
    Some(RootNamespace {
        prefix: root.prefix.clone(),
        uri,
    })
}

/// Put every element of a stripped tree back under `prefix`
fn apply_prefix(element: &mut Element, prefix: &str, uri: &str) {
    element.prefix = Some(prefix.to_string());
    element.namespace = Some(uri.to_string());
    for node in element.children.iter_mut() {
        if let XMLNode::Element(child) = node {
            apply_prefix(child, prefix, uri);
        }
    }
}

fn strip_namespaces(element: &mut Element) {
    element.prefix = None;
    element.namespace = None;
    element.namespaces = None;
    for node in element.children.iter_mut() {
        if let XMLNode::Element(child) = node {
            strip_namespaces(child);
        }
    }
}

fn child_elements(element: &Element) -> impl Iterator<Item = (usize, &Element)> {
    element
        .children
        .iter()
        .enumerate()
        .filter_map(|(index, node)| match node {
            XMLNode::Element(child) => Some((index, child)),
            _ => None,
        })
}
