use std::fmt;

use super::osm::{ElementKind, OsmId};
use crate::errors::{Error, Result};

/// A typed reference from a relation to another object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    kind: ElementKind,
    reference: OsmId,
    pub role: String,
}

impl Member {
    /// Build a member from its textual form as found in OSM XML. `kind` must
    /// be `node`, `way` or `relation`; `reference` must consist of digits only.
    pub fn new(kind: &str, reference: &str, role: impl Into<String>) -> Result<Self> {
        let kind: ElementKind = kind.parse()?;
        if reference.is_empty() || !reference.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid(format!(
                "member ref must be a non-negative integer, got {reference:?}"
            )));
        }
        let reference: OsmId = reference
            .parse()
            .map_err(|_| Error::invalid(format!("member ref {reference} is out of range")))?;
        Ok(Member {
            kind,
            reference,
            role: role.into(),
        })
    }

    pub fn from_parts(kind: ElementKind, reference: OsmId, role: impl Into<String>) -> Result<Self> {
        if reference < 0 {
            return Err(Error::invalid(format!(
                "member ref must be a non-negative integer, got {reference}"
            )));
        }
        Ok(Member {
            kind,
            reference,
            role: role.into(),
        })
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn reference(&self) -> OsmId {
        self.reference
    }

    pub fn role(&self) -> &str {
        &self.role
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.reference, self.role)
    }
}
