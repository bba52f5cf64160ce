use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Error returned when a resource name or name pattern cannot be parsed.
///
/// # Examples
///
/// ```
/// use streamx_common::name::ObjectName;
///
/// let err = "no-domain-separator".parse::<ObjectName>().unwrap_err();
/// assert!(err.to_string().contains("no-domain-separator"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed object name '{name}': {reason}")]
pub struct MalformedName {
    pub name: String,
    pub reason: String,
}

impl MalformedName {
    fn new(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

fn has_wildcard(s: &str) -> bool {
    s.contains('*') || s.contains('?')
}

/// Splits `domain:key=value,...` into its domain and key properties.
///
/// With `allow_list_wildcard`, a bare `*` entry is accepted in the property
/// list and reported through the returned flag.
fn split_name(
    raw: &str,
    allow_list_wildcard: bool,
) -> Result<(String, Vec<(String, String)>, bool), MalformedName> {
    let (domain, props) = raw
        .split_once(':')
        .ok_or_else(|| MalformedName::new(raw, "missing ':' domain separator"))?;

    let mut properties = Vec::new();
    let mut list_wildcard = false;

    for entry in props.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            if props.trim().is_empty() {
                break;
            }
            return Err(MalformedName::new(raw, "empty key property"));
        }
        if entry == "*" {
            if !allow_list_wildcard {
                return Err(MalformedName::new(raw, "wildcard not allowed in a resource name"));
            }
            list_wildcard = true;
            continue;
        }
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| MalformedName::new(raw, format!("key property '{entry}' has no '='")))?;
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            return Err(MalformedName::new(raw, "empty property key"));
        }
        if value.is_empty() {
            return Err(MalformedName::new(raw, format!("empty value for key '{key}'")));
        }
        if properties.iter().any(|(k, _): &(String, String)| k == key) {
            return Err(MalformedName::new(raw, format!("duplicate key '{key}'")));
        }
        properties.push((key.to_string(), value.to_string()));
    }

    Ok((domain.trim().to_string(), properties, list_wildcard))
}

/// Structured, hierarchical name of one managed resource, e.g.
/// `svc:type=Cache,name=users`.
///
/// Equality, ordering and hashing use the canonical form, in which the key
/// properties are sorted by key.
///
/// # Examples
///
/// ```
/// use streamx_common::name::ObjectName;
///
/// let a: ObjectName = "svc:name=X,type=Cache".parse().unwrap();
/// let b: ObjectName = "svc:type=Cache,name=X".parse().unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.canonical(), "svc:name=X,type=Cache");
/// assert_eq!(a.key_property("type"), Some("Cache"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectName {
    domain: String,
    properties: BTreeMap<String, String>,
    canonical: String,
}

impl ObjectName {
    pub fn new(raw: &str) -> Result<Self, MalformedName> {
        let (domain, props, _) = split_name(raw, false)?;
        if domain.is_empty() {
            return Err(MalformedName::new(raw, "empty domain"));
        }
        if has_wildcard(&domain) {
            return Err(MalformedName::new(raw, "wildcard not allowed in a resource name"));
        }
        if props.is_empty() {
            return Err(MalformedName::new(raw, "at least one key property is required"));
        }
        if let Some((k, _)) = props.iter().find(|(_, v)| has_wildcard(v)) {
            return Err(MalformedName::new(
                raw,
                format!("wildcard value for key '{k}' not allowed in a resource name"),
            ));
        }

        let properties: BTreeMap<String, String> = props.into_iter().collect();
        let canonical = format!(
            "{}:{}",
            domain,
            properties
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(",")
        );
        Ok(Self {
            domain,
            properties,
            canonical,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn key_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn key_properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl PartialEq for ObjectName {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for ObjectName {}

impl Hash for ObjectName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl PartialOrd for ObjectName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObjectName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl FromStr for ObjectName {
    type Err = MalformedName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ObjectName {
    type Error = MalformedName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ObjectName> for String {
    fn from(name: ObjectName) -> Self {
        name.canonical
    }
}

/// Pattern over [`ObjectName`]s.
///
/// The domain and property values may use `*` and `?` wildcards. A `*` entry
/// in the property list lets a name carry key properties beyond the ones the
/// pattern lists. Without it, the key sets must be equal.
///
/// # Examples
///
/// ```
/// use streamx_common::name::{ObjectName, ObjectNamePattern};
///
/// let pattern: ObjectNamePattern = "svc:*".parse().unwrap();
/// let name: ObjectName = "svc:name=X".parse().unwrap();
/// assert!(pattern.matches(&name));
///
/// let typed: ObjectNamePattern = "os:type=Disk,*".parse().unwrap();
/// assert!(typed.matches(&"os:type=Disk,name=/".parse().unwrap()));
/// assert!(!typed.matches(&"os:type=Cpu".parse().unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectNamePattern {
    raw: String,
    domain: String,
    properties: Vec<(String, String)>,
    list_wildcard: bool,
}

impl ObjectNamePattern {
    pub fn new(raw: &str) -> Result<Self, MalformedName> {
        let (domain, properties, list_wildcard) = split_name(raw, true)?;
        if properties.is_empty() && !list_wildcard {
            return Err(MalformedName::new(raw, "pattern must list key properties or '*'"));
        }
        let domain = if domain.is_empty() {
            "*".to_string()
        } else {
            domain
        };
        Ok(Self {
            raw: raw.trim().to_string(),
            domain,
            properties,
            list_wildcard,
        })
    }

    /// Matches everything, equivalent to `*:*`.
    pub fn all() -> Self {
        Self {
            raw: "*:*".to_string(),
            domain: "*".to_string(),
            properties: Vec::new(),
            list_wildcard: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_pattern(&self) -> bool {
        self.list_wildcard
            || has_wildcard(&self.domain)
            || self.properties.iter().any(|(_, v)| has_wildcard(v))
    }

    pub fn matches(&self, name: &ObjectName) -> bool {
        if !segment_matches(&self.domain, name.domain()) {
            return false;
        }
        if !self.list_wildcard && self.properties.len() != name.key_properties().len() {
            return false;
        }
        self.properties.iter().all(|(key, value)| {
            name.key_property(key)
                .is_some_and(|actual| segment_matches(value, actual))
        })
    }

    /// Splits a semicolon separated filter list into patterns. Blank entries
    /// are skipped.
    ///
    /// ```
    /// use streamx_common::name::ObjectNamePattern;
    ///
    /// let list = ObjectNamePattern::parse_list("svc:* ; os:type=Cpu;;").unwrap();
    /// assert_eq!(list.len(), 2);
    /// assert!(ObjectNamePattern::parse_list("").unwrap().is_empty());
    /// ```
    pub fn parse_list(filter: &str) -> Result<Vec<Self>, MalformedName> {
        filter
            .split(';')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(Self::new)
            .collect()
    }
}

fn segment_matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if !has_wildcard(pattern) {
        return pattern == value;
    }
    glob_match::glob_match(pattern, value)
}

impl fmt::Display for ObjectNamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ObjectNamePattern {
    type Err = MalformedName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
