use std::fmt;
use std::str::FromStr;

use super::osm::Element;
use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Create,
    Modify,
    Delete,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Modify => "modify",
            ActionKind::Delete => "delete",
        }
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(ActionKind::Create),
            "modify" => Ok(ActionKind::Modify),
            "delete" => Ok(ActionKind::Delete),
            _ => Err(Error::invalid(format!(
                "action must be 'create', 'modify', or 'delete', got {s:?}"
            ))),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `create`, `modify` or `delete` block of an osmChange document.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: ActionKind,
    pub objects: Vec<Element>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Action {
            kind,
            objects: Vec::new(),
        }
    }

    pub fn push(&mut self, object: impl Into<Element>) {
        self.objects.push(object.into());
    }
}

/// The actions of an osmChange document, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Change {
    pub actions: Vec<Action>,
}

impl Change {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Every object of every action.
    pub fn objects(&self) -> impl Iterator<Item = &Element> {
        self.actions.iter().flat_map(|action| action.objects.iter())
    }
}
