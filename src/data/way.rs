use std::fmt;

use super::node::Node;
use super::osm::{parse_id, ElementKind, ObjectBase, OsmId, OsmObject};
use super::tags::Tags;
use super::Database;
use crate::errors::{Error, Result};

/// OpenStreetMap way. Only node ids are stored, never the nodes themselves;
/// use [`Way::node_objects`] to look them up in a database.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    base: ObjectBase,
    nodes: Vec<OsmId>,
}

/// Content accepted by [`Way::add`].
#[derive(Debug, Clone)]
pub enum WayItem<'a> {
    NodeId(OsmId),
    NodeIdText(&'a str),
    Node(&'a Node),
    Tags(Tags),
    List(Vec<WayItem<'a>>),
}

impl From<OsmId> for WayItem<'_> {
    fn from(value: OsmId) -> Self {
        WayItem::NodeId(value)
    }
}

impl<'a> From<&'a str> for WayItem<'a> {
    fn from(value: &'a str) -> Self {
        WayItem::NodeIdText(value)
    }
}

impl<'a> From<&'a Node> for WayItem<'a> {
    fn from(value: &'a Node) -> Self {
        WayItem::Node(value)
    }
}

impl From<Tags> for WayItem<'_> {
    fn from(value: Tags) -> Self {
        WayItem::Tags(value)
    }
}

impl<'a, T: Into<WayItem<'a>>> From<Vec<T>> for WayItem<'a> {
    fn from(value: Vec<T>) -> Self {
        WayItem::List(value.into_iter().map(Into::into).collect())
    }
}

impl Way {
    pub fn new() -> Self {
        Way {
            base: ObjectBase::new(None),
            nodes: Vec::new(),
        }
    }

    pub fn with_id(id: OsmId) -> Self {
        Way {
            base: ObjectBase::new(Some(id)),
            nodes: Vec::new(),
        }
    }

    pub fn nodes(&self) -> &[OsmId] {
        &self.nodes
    }

    pub fn push_node(&mut self, id: OsmId) {
        self.nodes.push(id);
    }

    /// Add node ids or tags. A node contributes only its id; lists are added
    /// item by item. On error, items before the failing one stay added.
    pub fn add<'a>(&mut self, item: impl Into<WayItem<'a>>) -> Result<&mut Self> {
        match item.into() {
            WayItem::NodeId(id) => self.nodes.push(id),
            WayItem::NodeIdText(text) => self.nodes.push(parse_id(text)?),
            WayItem::Node(node) => self.nodes.push(node.id()),
            WayItem::Tags(tags) => self.add_tags(&tags),
            WayItem::List(items) => {
                for item in items {
                    self.add(item)?;
                }
            }
        }
        Ok(self)
    }

    /// A way is closed when it has at least two node references and the first
    /// equals the last.
    pub fn is_closed(&self) -> bool {
        match (self.nodes.first(), self.nodes.last()) {
            (Some(first), Some(last)) if self.nodes.len() >= 2 => first == last,
            _ => false,
        }
    }

    /// The nodes of this way, in order, looked up in the database holding it.
    pub fn node_objects<'d>(&self, db: &'d Database) -> Result<Vec<&'d Node>> {
        if self.db() != Some(db.id()) {
            return Err(Error::NoDatabase(format!(
                "can't get node objects if way {} is not in this database",
                self.id()
            )));
        }
        self.nodes
            .iter()
            .map(|&id| {
                db.get_node(id).ok_or(Error::NotFound {
                    kind: ElementKind::Node,
                    id,
                })
            })
            .collect()
    }
}

impl Default for Way {
    fn default() -> Self {
        Way::new()
    }
}

impl OsmObject for Way {
    fn kind(&self) -> ElementKind {
        ElementKind::Way
    }

    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }
}

impl fmt::Display for Way {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.base.describe(f, "Way", None)
    }
}
