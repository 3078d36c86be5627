use std::{io, str::Utf8Error};

use quick_xml::events::attributes::AttrError;
use thiserror::Error;

use crate::data::osm::{ElementKind, OsmId};

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or contradictory input to a constructor or operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not permitted on this object.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The document declares an OSM XML version other than 0.5 or 0.6.
    #[error("unsupported OSM file version {found:?}, only 0.5 and 0.6 are understood")]
    Version { found: Option<String> },

    /// A lookup needed the object to be part of a database.
    #[error("no database: {0}")]
    NoDatabase(String),

    /// A referenced object is not present in the database.
    #[error("not in database: {kind} {id}")]
    NotFound { kind: ElementKind, id: OsmId },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Attr(#[from] AttrError),

    #[error(transparent)]
    Utf8(#[from] Utf8Error),

    #[error("could not read config: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
