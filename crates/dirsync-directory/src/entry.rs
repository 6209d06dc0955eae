//! Entry, modification and DN types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Search scope relative to the search base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Only the base entry itself.
    Base,
    /// Immediate children of the base.
    OneLevel,
    /// The base and everything below it.
    Subtree,
}

/// A directory entry: a DN and its multi-valued attributes.
///
/// Attribute names are matched case-insensitively, as LDAP does; the stored
/// key keeps whatever case it was first written with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub dn: String,
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl Entry {
    /// Create an entry with no attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder: set an attribute to the given values. Empty value lists are dropped.
    pub fn with<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(name, values.into_iter().map(Into::into).collect());
        self
    }

    fn key_for(&self, name: &str) -> Option<&String> {
        self.attributes
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
    }

    /// Values of an attribute, or an empty slice when absent.
    pub fn values(&self, name: &str) -> &[String] {
        self.key_for(name)
            .and_then(|k| self.attributes.get(k))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First value of an attribute.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    /// Whether the attribute is present with at least one value.
    pub fn has(&self, name: &str) -> bool {
        !self.values(name).is_empty()
    }

    /// Whether the attribute holds `value` (case-insensitive).
    pub fn has_value(&self, name: &str, value: &str) -> bool {
        self.values(name).iter().any(|v| values_match(v, value))
    }

    /// Replace an attribute's values. An empty list removes the attribute.
    pub fn set(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        let key = self.key_for(&name).cloned().unwrap_or(name);
        if values.is_empty() {
            self.attributes.remove(&key);
        } else {
            self.attributes.insert(key, values);
        }
    }

    /// Remove an attribute entirely, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        let key = self.key_for(name).cloned()?;
        self.attributes.remove(&key)
    }

    /// Keep only the named attributes. An empty projection keeps everything.
    pub fn project(mut self, attrs: &[&str]) -> Self {
        if !attrs.is_empty() {
            self.attributes
                .retain(|k, _| attrs.iter().any(|a| a.eq_ignore_ascii_case(k)));
        }
        self
    }
}

/// One change in a modify request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Modification {
    /// Add values to an attribute.
    Add { attribute: String, values: Vec<String> },
    /// Replace all values; an empty list deletes the attribute.
    Replace { attribute: String, values: Vec<String> },
    /// Delete the listed values, or the whole attribute when the list is empty.
    Delete { attribute: String, values: Vec<String> },
}

impl Modification {
    pub fn add(attribute: impl Into<String>, values: Vec<String>) -> Self {
        Modification::Add {
            attribute: attribute.into(),
            values,
        }
    }

    pub fn replace(attribute: impl Into<String>, values: Vec<String>) -> Self {
        Modification::Replace {
            attribute: attribute.into(),
            values,
        }
    }

    pub fn delete(attribute: impl Into<String>) -> Self {
        Modification::Delete {
            attribute: attribute.into(),
            values: Vec::new(),
        }
    }

    /// Attribute this modification touches.
    pub fn attribute(&self) -> &str {
        match self {
            Modification::Add { attribute, .. }
            | Modification::Replace { attribute, .. }
            | Modification::Delete { attribute, .. } => attribute,
        }
    }
}

/// Escape special characters in a DN attribute value per RFC 4514.
pub fn escape_dn_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut result = String::with_capacity(value.len() * 2);

    for (i, ch) in chars.iter().copied().enumerate() {
        let is_first = i == 0;
        let is_last = i + 1 == chars.len();

        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(ch);
            }
            '\0' => result.push_str("\\00"),
            ' ' if is_first || is_last => result.push_str("\\20"),
            '#' if is_first => result.push_str("\\23"),
            _ => result.push(ch),
        }
    }

    result
}

/// Build `attr=value,parent` with the value escaped.
pub fn child_dn(attr: &str, value: &str, parent: &str) -> String {
    format!("{}={},{}", attr, escape_dn_value(value), parent)
}

/// Split a DN into its RDN components, honouring backslash escapes.
fn split_rdns(dn: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, ch) in dn.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            ',' => {
                parts.push(&dn[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < dn.len() || !parts.is_empty() {
        parts.push(&dn[start..]);
    }
    parts
}

/// Canonical form for DN comparison: lowercase, no whitespace around separators.
pub fn normalize_dn(dn: &str) -> String {
    split_rdns(dn.trim())
        .into_iter()
        .map(|rdn| match rdn.split_once('=') {
            Some((attr, value)) => format!(
                "{}={}",
                attr.trim().to_ascii_lowercase(),
                value.trim().to_lowercase()
            ),
            None => rdn.trim().to_lowercase(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Whether two DNs name the same entry.
pub fn dn_eq(a: &str, b: &str) -> bool {
    normalize_dn(a) == normalize_dn(b)
}

/// DN of the parent entry, or `None` for a single-RDN DN.
pub fn parent_dn(dn: &str) -> Option<String> {
    let rdns = split_rdns(dn.trim());
    if rdns.len() < 2 {
        return None;
    }
    Some(rdns[1..].join(","))
}

/// Unescaped value of the leftmost RDN (`cn=a\,b,ou=x` gives `a,b`).
pub fn rdn_value(dn: &str) -> Option<String> {
    let first = split_rdns(dn.trim()).into_iter().next()?;
    let (_, value) = first.split_once('=')?;
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let hex: String = chars.clone().take(2).collect();
        if hex.len() == 2 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                out.push(byte as char);
                chars.next();
                chars.next();
                continue;
            }
        }
        if let Some(next) = chars.next() {
            out.push(next);
        }
    }
    Some(out)
}

/// Attribute value comparison: DN-shaped values compare as DNs, others case-insensitively.
pub fn values_match(a: &str, b: &str) -> bool {
    if a.contains('=') && b.contains('=') {
        dn_eq(a, b)
    } else {
        a.to_lowercase() == b.to_lowercase()
    }
}
