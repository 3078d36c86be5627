use std::collections::HashMap;

use log::debug;

use self::node::Node;
use self::osm::{DatabaseId, Element, ElementKind, OsmId, OsmObject};
use self::relation::Relation;
use self::tags::Tags;
use self::way::Way;
use crate::errors::{Error, Result};

pub mod changeset;
pub mod member;
pub mod node;
pub mod osm;
pub mod osmchange;
pub mod relation;
pub mod tags;
pub mod way;

pub const DEFAULT_API_VERSION: &str = "0.6";

/// In-memory store of nodes, ways and relations, indexed by id.
///
/// The database owns what is added to it. Each stored object carries the
/// database's [`DatabaseId`] so it can resolve its references later; objects
/// leaving the database (replaced, removed, drained) have that handle cleared.
#[derive(Debug)]
pub struct Database {
    id: DatabaseId,
    pub version: String,
    nodes: HashMap<OsmId, Node>,
    ways: HashMap<OsmId, Way>,
    relations: HashMap<OsmId, Relation>,
}

fn detach<T: OsmObject>(mut object: T) -> T {
    object.base_mut().db = None;
    object
}

impl Database {
    pub fn new() -> Self {
        Database::with_version(DEFAULT_API_VERSION)
    }

    pub fn with_version(version: impl Into<String>) -> Self {
        Database {
            id: DatabaseId::next(),
            version: version.into(),
            nodes: HashMap::new(),
            ways: HashMap::new(),
            relations: HashMap::new(),
        }
    }

    pub fn id(&self) -> DatabaseId {
        self.id
    }

    pub fn nodes(&self) -> &HashMap<OsmId, Node> {
        &self.nodes
    }

    pub fn ways(&self) -> &HashMap<OsmId, Way> {
        &self.ways
    }

    pub fn relations(&self) -> &HashMap<OsmId, Relation> {
        &self.relations
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.ways.is_empty() && self.relations.is_empty()
    }

    /// Insert a node, returning the node previously stored under the same id
    /// with its database handle cleared.
    pub fn add_node(&mut self, mut node: Node) -> Option<Node> {
        node.base_mut().db = Some(self.id);
        let previous = self.nodes.insert(node.id(), node).map(detach);
        if let Some(old) = &previous {
            debug!(id = old.id(); "Replaced node");
        }
        previous
    }

    pub fn add_way(&mut self, mut way: Way) -> Option<Way> {
        way.base_mut().db = Some(self.id);
        let previous = self.ways.insert(way.id(), way).map(detach);
        if let Some(old) = &previous {
            debug!(id = old.id(); "Replaced way");
        }
        previous
    }

    pub fn add_relation(&mut self, mut relation: Relation) -> Option<Relation> {
        relation.base_mut().db = Some(self.id);
        let previous = self.relations.insert(relation.id(), relation).map(detach);
        if let Some(old) = &previous {
            debug!(id = old.id(); "Replaced relation");
        }
        previous
    }

    /// Insert any element according to its kind.
    pub fn add(&mut self, element: impl Into<Element>) -> Option<Element> {
        match element.into() {
            Element::Node(node) => self.add_node(node).map(Element::Node),
            Element::Way(way) => self.add_way(way).map(Element::Way),
            Element::Relation(relation) => self.add_relation(relation).map(Element::Relation),
        }
    }

    pub fn get_node(&self, id: OsmId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_way(&self, id: OsmId) -> Option<&Way> {
        self.ways.get(&id)
    }

    pub fn get_relation(&self, id: OsmId) -> Option<&Relation> {
        self.relations.get(&id)
    }

    /// Edit the tags of a stored object in place. Stored objects are otherwise
    /// only replaced through the `add_*` methods, which keep ids and owner
    /// handles consistent.
    pub fn modify_tags<F>(&mut self, kind: ElementKind, id: OsmId, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Tags),
    {
        let tags = match kind {
            ElementKind::Node => self.nodes.get_mut(&id).map(Node::tags_mut),
            ElementKind::Way => self.ways.get_mut(&id).map(Way::tags_mut),
            ElementKind::Relation => self.relations.get_mut(&id).map(Relation::tags_mut),
        };
        let tags = tags.ok_or(Error::NotFound { kind, id })?;
        edit(tags);
        Ok(())
    }

    pub fn remove_node(&mut self, id: OsmId) -> Option<Node> {
        self.nodes.remove(&id).map(detach)
    }

    pub fn remove_way(&mut self, id: OsmId) -> Option<Way> {
        self.ways.remove(&id).map(detach)
    }

    pub fn remove_relation(&mut self, id: OsmId) -> Option<Relation> {
        self.relations.remove(&id).map(detach)
    }

    /// Empty the database, handing back every object it held with its
    /// database handle cleared. Nodes come first, then ways, then relations.
    pub fn drain(&mut self) -> Vec<Element> {
        let mut elements = Vec::with_capacity(self.nodes.len() + self.ways.len() + self.relations.len());
        elements.extend(self.nodes.drain().map(|(_, node)| Element::Node(detach(node))));
        elements.extend(self.ways.drain().map(|(_, way)| Element::Way(detach(way))));
        elements.extend(
            self.relations
                .drain()
                .map(|(_, relation)| Element::Relation(detach(relation))),
        );
        elements
    }

    pub fn clear(&mut self) {
        let dropped = self.drain().len();
        debug!(objects = dropped; "Cleared database");
    }
}

impl Default for Database {
    fn default() -> Self {
        Database::new()
    }
}

impl<E: Into<Element>> Extend<E> for Database {
    fn extend<T: IntoIterator<Item = E>>(&mut self, iter: T) {
        for element in iter {
            self.add(element);
        }
    }
}
