//! Streaming access to OSM XML documents.
//!
//! A [`Parser`] reads the document once, front to back, and reports every
//! completed node, way and relation to a [`Callbacks`] implementation. The
//! callbacks decide what is kept in the attached [`Database`](crate::data::Database)
//! and what [`Parser::parse`] returns:
//!
//! ```no_run
//! use osmlib::data::Database;
//! use osmlib::stream::{ObjectList, Parser, ParserOptions};
//!
//! let mut db = Database::new();
//! let options = ParserOptions::new()
//!     .filename("map.osm")
//!     .db(&mut db)
//!     .callbacks(ObjectList::default());
//! let objects = Parser::new(options)?.parse()?;
//! # Ok::<(), osmlib::errors::Error>(())
//! ```

use std::collections::HashMap;

use log::debug;

use crate::data::member::Member;
use crate::data::node::Node;
use crate::data::osm::{Element, OsmObject};
use crate::data::osmchange::{Action, ActionKind, Change};
use crate::data::relation::Relation;
use crate::data::way::Way;
use crate::errors::Result;

pub mod parser;

pub use parser::{Parser, ParserOptions};

/// Attribute names and values of an XML element.
pub type Attributes = HashMap<String, String>;

/// Hooks called by [`Parser`] while it reads a document.
///
/// `node`, `way` and `relation` are called once the element and all of its
/// children have been read. Returning `true` keeps the object: it is added to
/// the database, if one is attached. The defaults keep everything.
pub trait Callbacks {
    type Output;

    fn start_document(&mut self) {}

    fn end_document(&mut self) {}

    fn node(&mut self, _node: &Node) -> bool {
        true
    }

    fn way(&mut self, _way: &Way) -> bool {
        true
    }

    fn relation(&mut self, _relation: &Relation) -> bool {
        true
    }

    /// Called before a tag is added to the object being read; `false` drops it.
    fn tag(&mut self, _object: &dyn OsmObject, _key: &str, _value: &str) -> bool {
        true
    }

    /// Called before a member is added to the relation being read; `false`
    /// drops it.
    fn member(&mut self, _relation: &Relation, _member: &Member) -> bool {
        true
    }

    /// Elements the parser does not interpret itself.
    fn start_element(&mut self, _name: &str, _attributes: &Attributes) -> Result<()> {
        Ok(())
    }

    fn end_element(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    /// Whatever [`Parser::parse`] should return.
    fn result(self) -> Self::Output
    where
        Self: Sized;
}

/// Keeps every object and returns nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl Callbacks for AcceptAll {
    type Output = ();

    fn result(self) -> Self::Output {}
}

/// Collects a copy of every object in document order.
#[derive(Debug, Default, Clone)]
pub struct ObjectList {
    objects: Vec<Element>,
}

impl Callbacks for ObjectList {
    type Output = Vec<Element>;

    fn start_document(&mut self) {
        self.objects.clear();
    }

    fn node(&mut self, node: &Node) -> bool {
        self.objects.push(Element::Node(node.clone()));
        true
    }

    fn way(&mut self, way: &Way) -> bool {
        self.objects.push(Element::Way(way.clone()));
        true
    }

    fn relation(&mut self, relation: &Relation) -> bool {
        self.objects.push(Element::Relation(relation.clone()));
        true
    }

    fn result(self) -> Self::Output {
        self.objects
    }
}

/// Reads osmChange documents into a [`Change`]. Objects outside of a
/// `create`, `modify` or `delete` block are dropped.
#[derive(Debug, Default, Clone)]
pub struct ChangeCallbacks {
    change: Change,
    action: Option<Action>,
}

impl ChangeCallbacks {
    fn collect(&mut self, element: Element) {
        match self.action.as_mut() {
            Some(action) => action.push(element),
            None => debug!(id = element.id(); "Dropping object outside of an action"),
        }
    }
}

impl Callbacks for ChangeCallbacks {
    type Output = Change;

    fn start_document(&mut self) {
        self.change = Change::new();
        self.action = None;
    }

    fn node(&mut self, node: &Node) -> bool {
        self.collect(Element::Node(node.clone()));
        true
    }

    fn way(&mut self, way: &Way) -> bool {
        self.collect(Element::Way(way.clone()));
        true
    }

    fn relation(&mut self, relation: &Relation) -> bool {
        self.collect(Element::Relation(relation.clone()));
        true
    }

    fn start_element(&mut self, name: &str, _attributes: &Attributes) -> Result<()> {
        if let Ok(kind) = name.parse::<ActionKind>() {
            if let Some(pending) = self.action.replace(Action::new(kind)) {
                debug!(action = pending.kind.as_str(); "Closing action left open by a new one");
                self.change.push(pending);
            }
        }
        Ok(())
    }

    fn end_element(&mut self, name: &str) -> Result<()> {
        if name.parse::<ActionKind>().is_ok() {
            if let Some(action) = self.action.take() {
                self.change.push(action);
            }
        }
        Ok(())
    }

    fn result(self) -> Self::Output {
        self.change
    }
}
