use std::fmt;

use super::member::Member;
use super::node::Node;
use super::osm::{ElementKind, ObjectBase, OsmId, OsmObject};
use super::tags::Tags;
use super::way::Way;
use super::Database;
use crate::errors::{Error, Result};

/// OpenStreetMap relation.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    base: ObjectBase,
    members: Vec<Member>,
}

/// Content accepted by [`Relation::add`].
#[derive(Debug, Clone)]
pub enum RelationItem {
    Member(Member),
    Tags(Tags),
    List(Vec<RelationItem>),
}

impl From<Member> for RelationItem {
    fn from(value: Member) -> Self {
        RelationItem::Member(value)
    }
}

impl From<Tags> for RelationItem {
    fn from(value: Tags) -> Self {
        RelationItem::Tags(value)
    }
}

impl<T: Into<RelationItem>> From<Vec<T>> for RelationItem {
    fn from(value: Vec<T>) -> Self {
        RelationItem::List(value.into_iter().map(Into::into).collect())
    }
}

/// A resolved relation member.
#[derive(Debug, Clone, Copy)]
pub enum MemberObject<'d> {
    Node(&'d Node),
    Way(&'d Way),
    Relation(&'d Relation),
}

impl MemberObject<'_> {
    pub fn as_object(&self) -> &dyn OsmObject {
        match self {
            MemberObject::Node(node) => *node,
            MemberObject::Way(way) => *way,
            MemberObject::Relation(relation) => *relation,
        }
    }
}

impl Relation {
    pub fn new() -> Self {
        Relation {
            base: ObjectBase::new(None),
            members: Vec::new(),
        }
    }

    pub fn with_id(id: OsmId) -> Self {
        Relation {
            base: ObjectBase::new(Some(id)),
            members: Vec::new(),
        }
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut Vec<Member> {
        &mut self.members
    }

    /// Add members or tags; lists are added item by item.
    pub fn add(&mut self, item: impl Into<RelationItem>) -> &mut Self {
        match item.into() {
            RelationItem::Member(member) => self.members.push(member),
            RelationItem::Tags(tags) => self.add_tags(&tags),
            RelationItem::List(items) => {
                for item in items {
                    self.add(item);
                }
            }
        }
        self
    }

    /// First member referencing the given object.
    pub fn member(&self, kind: ElementKind, reference: OsmId) -> Option<&Member> {
        self.members
            .iter()
            .find(|member| member.kind() == kind && member.reference() == reference)
    }

    /// Look up every member in the database holding this relation.
    pub fn member_objects<'d>(&self, db: &'d Database) -> Result<Vec<MemberObject<'d>>> {
        if self.db() != Some(db.id()) {
            return Err(Error::NoDatabase(format!(
                "can't get member objects if relation {} is not in this database",
                self.id()
            )));
        }
        self.members
            .iter()
            .map(|member| {
                let id = member.reference();
                let found = match member.kind() {
                    ElementKind::Node => db.get_node(id).map(MemberObject::Node),
                    ElementKind::Way => db.get_way(id).map(MemberObject::Way),
                    ElementKind::Relation => db.get_relation(id).map(MemberObject::Relation),
                };
                found.ok_or(Error::NotFound {
                    kind: member.kind(),
                    id,
                })
            })
            .collect()
    }
}

impl Default for Relation {
    fn default() -> Self {
        Relation::new()
    }
}

impl OsmObject for Relation {
    fn kind(&self) -> ElementKind {
        ElementKind::Relation
    }

    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.base.describe(f, "Relation", None)
    }
}
