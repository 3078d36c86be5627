use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::OnceLock;

use regex::Regex;

use super::node::Node;
use super::relation::Relation;
use super::tags::Tags;
use super::way::Way;
use crate::errors::{Error, Result};

pub type OsmId = i64;

static NEXT_NEGATIVE_ID: AtomicI64 = AtomicI64::new(-1);
static NEXT_DATABASE_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a fresh negative id. Negative ids mark objects the server has
/// not assigned an id to yet; no two calls in a process return the same one.
pub fn next_negative_id() -> OsmId {
    NEXT_NEGATIVE_ID.fetch_sub(1, Ordering::Relaxed)
}

/// Parse an object id given as text.
pub fn parse_id(value: &str) -> Result<OsmId> {
    value
        .parse()
        .map_err(|_| Error::invalid(format!("id must be an integer, got {value:?}")))
}

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(Z|[+-]\d{2}:\d{2})$")
            .expect("timestamp pattern compiles")
    })
}

pub fn check_timestamp(value: &str) -> Result<()> {
    if timestamp_pattern().is_match(value) {
        Ok(())
    } else {
        Err(Error::invalid(format!("timestamp must be an ISO 8601 date-time, got {value:?}")))
    }
}

/// Handle identifying a [`Database`](crate::data::Database). Objects keep it
/// as a non-owning reference to the database they were added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatabaseId(u64);

impl DatabaseId {
    pub(crate) fn next() -> Self {
        DatabaseId(NEXT_DATABASE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        }
    }
}

impl FromStr for ElementKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "node" => Ok(ElementKind::Node),
            "way" => Ok(ElementKind::Way),
            "relation" => Ok(ElementKind::Relation),
            _ => Err(Error::invalid(format!(
                "type must be 'node', 'way', or 'relation', got {s:?}"
            ))),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes shared by nodes, ways and relations.
#[derive(Debug)]
pub struct ObjectBase {
    id: OsmId,
    user: Option<String>,
    uid: i64,
    timestamp: Option<String>,
    version: u32,
    visible: Option<bool>,
    tags: Tags,
    pub(crate) db: Option<DatabaseId>,
}

impl ObjectBase {
    /// `None` allocates a fresh negative id.
    pub fn new(id: Option<OsmId>) -> Self {
        ObjectBase {
            id: id.unwrap_or_else(next_negative_id),
            user: None,
            uid: -1,
            timestamp: None,
            version: 1,
            visible: None,
            tags: Tags::new(),
            db: None,
        }
    }

    /// Attribute names and values in serialization order. `visible` takes the
    /// place of `uid` when it is set; unset values are left out.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        let mut attributes = vec![("id", self.id.to_string()), ("version", self.version.to_string())];
        match self.visible {
            Some(visible) => attributes.push(("visible", visible.to_string())),
            None => attributes.push(("uid", self.uid.to_string())),
        }
        if let Some(user) = &self.user {
            attributes.push(("user", user.clone()));
        }
        if let Some(timestamp) = &self.timestamp {
            attributes.push(("timestamp", timestamp.clone()));
        }
        attributes
    }

    pub(crate) fn describe(
        &self,
        f: &mut fmt::Formatter<'_>,
        name: &str,
        coordinates: Option<(&str, &str)>,
    ) -> fmt::Result {
        write!(
            f,
            "#<{name} id=\"{}\" user=\"{}\" timestamp=\"{}\"",
            self.id,
            self.user.as_deref().unwrap_or_default(),
            self.timestamp.as_deref().unwrap_or_default(),
        )?;
        if let Some((lon, lat)) = coordinates {
            write!(f, " lon=\"{lon}\" lat=\"{lat}\"")?;
        }
        if let Some(visible) = self.visible {
            write!(f, " visible=\"{visible}\"")?;
        }
        f.write_str(">")
    }
}

// A copy is a new object that is not part of any database.
impl Clone for ObjectBase {
    fn clone(&self) -> Self {
        ObjectBase {
            id: self.id,
            user: self.user.clone(),
            uid: self.uid,
            timestamp: self.timestamp.clone(),
            version: self.version,
            visible: self.visible,
            tags: self.tags.clone(),
            db: None,
        }
    }
}

impl PartialEq for ObjectBase {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.user == other.user
            && self.uid == other.uid
            && self.timestamp == other.timestamp
            && self.version == other.version
            && self.visible == other.visible
            && self.tags == other.tags
    }
}

/// Common interface of [`Node`], [`Way`] and [`Relation`].
pub trait OsmObject {
    fn kind(&self) -> ElementKind;
    fn base(&self) -> &ObjectBase;
    fn base_mut(&mut self) -> &mut ObjectBase;

    /// Type specific attributes appended after the common ones.
    fn extra_attributes(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn id(&self) -> OsmId {
        self.base().id
    }

    /// Ids are fixed at construction; this always fails.
    fn set_id(&mut self, _id: OsmId) -> Result<()> {
        Err(Error::Unsupported(format!(
            "can't change id of {} {}",
            self.kind(),
            self.id()
        )))
    }

    fn user(&self) -> Option<&str> {
        self.base().user.as_deref()
    }

    fn set_user(&mut self, user: Option<String>) {
        self.base_mut().user = user;
    }

    fn uid(&self) -> i64 {
        self.base().uid
    }

    fn set_uid(&mut self, uid: i64) {
        self.base_mut().uid = uid;
    }

    fn timestamp(&self) -> Option<&str> {
        self.base().timestamp.as_deref()
    }

    fn set_timestamp(&mut self, timestamp: Option<&str>) -> Result<()> {
        if let Some(value) = timestamp {
            check_timestamp(value)?;
        }
        self.base_mut().timestamp = timestamp.map(str::to_owned);
        Ok(())
    }

    fn version(&self) -> u32 {
        self.base().version
    }

    fn set_version(&mut self, version: u32) -> Result<()> {
        if version == 0 {
            return Err(Error::invalid("version must be a positive integer"));
        }
        self.base_mut().version = version;
        Ok(())
    }

    fn visible(&self) -> Option<bool> {
        self.base().visible
    }

    fn set_visible(&mut self, visible: Option<bool>) {
        self.base_mut().visible = visible;
    }

    fn tags(&self) -> &Tags {
        &self.base().tags
    }

    fn tags_mut(&mut self) -> &mut Tags {
        &mut self.base_mut().tags
    }

    fn tag(&self, key: &str) -> Option<&str> {
        self.tags().get(key)
    }

    fn tag_is_true(&self, key: &str) -> bool {
        self.tags().is_true(key)
    }

    fn set_tag(&mut self, key: &str, value: &str) {
        self.tags_mut().set(key, value);
    }

    fn add_tags(&mut self, tags: &Tags) {
        self.tags_mut().merge(tags);
    }

    fn is_tagged(&self) -> bool {
        !self.tags().is_empty()
    }

    /// The database currently holding this object, if any.
    fn db(&self) -> Option<DatabaseId> {
        self.base().db
    }

    fn attributes(&self) -> Vec<(&'static str, String)> {
        let mut attributes = self.base().attributes();
        attributes.extend(self.extra_attributes());
        attributes
    }
}

/// Any of the three addressable OSM object kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        self.as_object().kind()
    }

    pub fn id(&self) -> OsmId {
        self.as_object().id()
    }

    pub fn as_object(&self) -> &dyn OsmObject {
        match self {
            Element::Node(node) => node,
            Element::Way(way) => way,
            Element::Relation(relation) => relation,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Element::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_way(&self) -> Option<&Way> {
        match self {
            Element::Way(way) => Some(way),
            _ => None,
        }
    }

    pub fn as_relation(&self) -> Option<&Relation> {
        match self {
            Element::Relation(relation) => Some(relation),
            _ => None,
        }
    }
}

impl From<Node> for Element {
    fn from(value: Node) -> Self {
        Element::Node(value)
    }
}

impl From<Way> for Element {
    fn from(value: Way) -> Self {
        Element::Way(value)
    }
}

impl From<Relation> for Element {
    fn from(value: Relation) -> Self {
        Element::Relation(value)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Node(node) => write!(f, "{node}"),
            Element::Way(way) => write!(f, "{way}"),
            Element::Relation(relation) => write!(f, "{relation}"),
        }
    }
}
