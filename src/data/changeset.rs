use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::osm::{parse_id, OsmId};
use super::tags::Tags;
use crate::errors::{Error, Result};
use crate::stream::parser::{read_attributes, required};

/// An OpenStreetMap changeset as reported by the API.
#[derive(Debug, Clone, PartialEq)]
pub struct Changeset {
    pub id: OsmId,
    pub user: Option<String>,
    pub uid: i64,
    pub created_at: Option<String>,
    pub closed_at: Option<String>,
    pub open: bool,
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
    pub tags: Tags,
}

fn float_attribute(attributes: &HashMap<String, String>, name: &str) -> Result<f64> {
    match attributes.get(name) {
        None => Ok(0.0),
        Some(value) => value
            .parse()
            .map_err(|_| Error::invalid(format!("changeset {name} must be a number, got {value:?}"))),
    }
}

impl Changeset {
    fn from_attributes(attributes: HashMap<String, String>) -> Result<Self> {
        let id = match attributes.get("id") {
            Some(value) => parse_id(value)?,
            None => return Err(Error::invalid("changeset without id")),
        };
        let uid = match attributes.get("uid") {
            Some(value) => value
                .parse()
                .map_err(|_| Error::invalid(format!("changeset uid must be an integer, got {value:?}")))?,
            None => -1,
        };
        Ok(Changeset {
            id,
            user: attributes.get("user").cloned(),
            uid,
            created_at: attributes.get("created_at").cloned(),
            closed_at: attributes.get("closed_at").cloned(),
            open: attributes.get("open").map(String::as_str) == Some("true"),
            min_lat: float_attribute(&attributes, "min_lat")?,
            min_lon: float_attribute(&attributes, "min_lon")?,
            max_lat: float_attribute(&attributes, "max_lat")?,
            max_lon: float_attribute(&attributes, "max_lon")?,
            tags: Tags::new(),
        })
    }

    /// Read the first `changeset` element of an API response.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut changeset: Option<Changeset> = None;
        loop {
            match reader.read_event()? {
                Event::Eof => break,
                Event::Start(e) => {
                    Self::handle_start(&mut changeset, &e)?;
                }
                Event::Empty(e) => {
                    if Self::handle_start(&mut changeset, &e)? {
                        break;
                    }
                }
                Event::End(e) if e.name().as_ref() == b"changeset" => break,
                _ => (),
            }
        }
        changeset.ok_or_else(|| Error::invalid("no changeset element in document"))
    }

    /// Returns true when `e` opened the changeset.
    fn handle_start(changeset: &mut Option<Changeset>, e: &BytesStart) -> Result<bool> {
        match e.name().as_ref() {
            b"changeset" if changeset.is_none() => {
                *changeset = Some(Changeset::from_attributes(read_attributes(e)?)?);
                Ok(true)
            }
            b"tag" => {
                if let Some(current) = changeset.as_mut() {
                    let attributes = read_attributes(e)?;
                    let key = required(&attributes, "tag", "k")?;
                    let value = required(&attributes, "tag", "v")?;
                    current.tags.set(key, value);
                }
                Ok(false)
            }
            _ => Ok(false),
        }
    }
}
