use std::fmt;

use super::osm::{ElementKind, ObjectBase, OsmId, OsmObject};
use crate::errors::{Error, Result};

/// OpenStreetMap node.
///
/// Coordinates are kept in the textual form they were given in, so a value
/// read from a file is written back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    base: ObjectBase,
    lon: Option<String>,
    lat: Option<String>,
}

fn check_coordinate(name: &str, value: String) -> Result<String> {
    match value.trim().parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(value),
        _ => Err(Error::invalid(format!("{name} must be a decimal number, got {value:?}"))),
    }
}

impl Node {
    /// A node with a freshly allocated negative id.
    pub fn new() -> Self {
        Node {
            base: ObjectBase::new(None),
            lon: None,
            lat: None,
        }
    }

    pub fn with_id(id: OsmId) -> Self {
        Node {
            base: ObjectBase::new(Some(id)),
            lon: None,
            lat: None,
        }
    }

    pub fn at(id: OsmId, lon: impl ToString, lat: impl ToString) -> Result<Self> {
        let mut node = Node::with_id(id);
        node.set_lon(lon)?;
        node.set_lat(lat)?;
        Ok(node)
    }

    pub fn lon(&self) -> Option<&str> {
        self.lon.as_deref()
    }

    pub fn lat(&self) -> Option<&str> {
        self.lat.as_deref()
    }

    /// Accepts anything whose text form is a decimal number. The range is
    /// not checked here, see [`Node::in_world`].
    pub fn set_lon(&mut self, lon: impl ToString) -> Result<()> {
        self.lon = Some(check_coordinate("lon", lon.to_string())?);
        Ok(())
    }

    pub fn set_lat(&mut self, lat: impl ToString) -> Result<()> {
        self.lat = Some(check_coordinate("lat", lat.to_string())?);
        Ok(())
    }

    /// `(lon, lat)` as numbers, when both are set.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lon = self.lon.as_deref()?.trim().parse().ok()?;
        let lat = self.lat.as_deref()?.trim().parse().ok()?;
        Some((lon, lat))
    }

    pub fn in_world(&self) -> bool {
        match self.coordinates() {
            Some((lon, lat)) => (-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat),
            None => false,
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Node::new()
    }
}

impl OsmObject for Node {
    fn kind(&self) -> ElementKind {
        ElementKind::Node
    }

    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn extra_attributes(&self) -> Vec<(&'static str, String)> {
        let mut attributes = Vec::new();
        if let Some(lon) = &self.lon {
            attributes.push(("lon", lon.clone()));
        }
        if let Some(lat) = &self.lat {
            attributes.push(("lat", lat.clone()));
        }
        attributes
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lon = self.lon.as_deref().unwrap_or_default();
        let lat = self.lat.as_deref().unwrap_or_default();
        self.base.describe(f, "Node", Some((lon, lat)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tags::Tags;
    use rstest::{fixture, rstest};

    #[fixture]
    fn node() -> Node {
        let mut node = Node::at(17, 8.5, 47.5).unwrap();
        node.set_user(Some("somebody".to_owned()));
        node.set_timestamp(Some("2007-02-20T10:29:49+00:00")).unwrap();
        node.set_uid(5);
        node.set_version(3).unwrap();
        node
    }

    #[rstest]
    fn create(node: Node) {
        assert_eq!(node.id(), 17);
        assert_eq!(node.user(), Some("somebody"));
        assert_eq!(node.timestamp(), Some("2007-02-20T10:29:49+00:00"));
        assert!(node.tags().is_empty());
        assert_eq!(node.tag("foo"), None);
        assert_eq!(
            node.to_string(),
            r#"#<Node id="17" user="somebody" timestamp="2007-02-20T10:29:49+00:00" lon="8.5" lat="47.5">"#
        );
        assert_eq!(
            node.attributes(),
            vec![
                ("id", "17".to_owned()),
                ("version", "3".to_owned()),
                ("uid", "5".to_owned()),
                ("user", "somebody".to_owned()),
                ("timestamp", "2007-02-20T10:29:49+00:00".to_owned()),
                ("lon", "8.5".to_owned()),
                ("lat", "47.5".to_owned()),
            ]
        );
    }

    #[rstest]
    #[case(Some(true), r#" visible="true">"#)]
    #[case(Some(false), r#" visible="false">"#)]
    #[case(None, r#" lat="47.5">"#)]
    fn display_reports_visibility(mut node: Node, #[case] visible: Option<bool>, #[case] suffix: &str) {
        node.set_visible(visible);
        assert_eq!(node.visible(), visible);
        assert!(node.to_string().ends_with(suffix));
    }

    #[rstest]
    fn visible_replaces_uid_in_attributes(mut node: Node) {
        node.set_visible(Some(true));
        let names: Vec<&str> = node.attributes().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["id", "version", "visible", "user", "timestamp", "lon", "lat"]);
    }

    #[rstest]
    fn ids_are_allocated_when_absent() {
        let node1 = Node::new();
        let node2 = Node::new();
        assert!(node1.id() < 0);
        assert!(node2.id() < 0);
        assert_ne!(node1.id(), node2.id());
        assert_eq!(Node::with_id(4).id(), 4);
        assert_eq!(Node::with_id(-3).id(), -3);
    }

    #[rstest]
    fn id_cannot_change() {
        let mut node = Node::new();
        assert!(matches!(node.set_id(1), Err(Error::Unsupported(_))));
    }

    #[rstest]
    fn set_user() {
        let mut node = Node::new();
        assert_eq!(node.user(), None);
        node.set_user(Some("me".to_owned()));
        assert_eq!(node.user(), Some("me"));
    }

    #[rstest]
    fn set_timestamp() {
        let mut node = Node::new();
        assert_eq!(node.timestamp(), None);
        assert!(matches!(node.set_timestamp(Some("xxx")), Err(Error::InvalidArgument(_))));
        assert_eq!(node.timestamp(), None);
        node.set_timestamp(Some("2007-06-17T16:02:34+01:00")).unwrap();
        assert_eq!(node.timestamp(), Some("2007-06-17T16:02:34+01:00"));
    }

    #[rstest]
    fn version_must_be_positive() {
        let mut node = Node::new();
        assert_eq!(node.version(), 1);
        assert!(node.set_version(0).is_err());
        assert_eq!(node.version(), 1);
    }

    #[rstest]
    fn tags() {
        let mut node = Node::new();
        assert!(!node.is_tagged());

        node.set_tag("tourism", "hotel");
        assert!(node.is_tagged());
        assert_eq!(node.tag("tourism"), Some("hotel"));

        node.add_tags(&Tags::from([("amenity", "fuel"), ("name", "ESSO")]));
        assert_eq!(node.tag("name"), Some("ESSO"));
        assert_eq!(node.tags().len(), 3);
    }

    #[rstest]
    fn tag_boolean() {
        let mut node = Node::new();
        node.add_tags(&Tags::from([
            ("true1", "true"),
            ("true2", "yes"),
            ("true3", "1"),
            ("false1", "x"),
            ("false2", "0"),
        ]));
        assert!(node.tag_is_true("true1"));
        assert!(node.tag_is_true("true2"));
        assert!(node.tag_is_true("true3"));
        assert!(!node.tag_is_true("false1"));
        assert!(!node.tag_is_true("false2"));
    }

    #[rstest]
    fn coordinates_keep_their_text() {
        let mut node = Node::with_id(123);
        assert_eq!(node.lat(), None);
        node.set_lat("123.45").unwrap();
        assert_eq!(node.lat(), Some("123.45"));
        node.set_lat(123.45).unwrap();
        assert_eq!(node.lat(), Some("123.45"));
        node.set_lon("-8.1").unwrap();
        assert_eq!(node.coordinates(), Some((-8.1, 123.45)));
    }

    #[rstest]
    #[case("abc")]
    #[case("")]
    #[case("NaN")]
    fn coordinates_must_be_numeric(#[case] value: &str) {
        let mut node = Node::with_id(123);
        assert!(matches!(node.set_lon(value), Err(Error::InvalidArgument(_))));
        assert!(matches!(node.set_lat(value), Err(Error::InvalidArgument(_))));
        assert_eq!(node.lon(), None);
    }

    #[rstest]
    #[case(8.5, 47.5, true)]
    #[case(-180.0, -90.0, true)]
    #[case(181.0, 0.0, false)]
    #[case(0.0, 123.45, false)]
    fn in_world(#[case] lon: f64, #[case] lat: f64, #[case] expected: bool) {
        assert_eq!(Node::at(1, lon, lat).unwrap().in_world(), expected);
    }

    #[rstest]
    fn clone_is_detached_but_equal(node: Node) {
        let copy = node.clone();
        assert_eq!(copy, node);
        assert_eq!(copy.db(), None);
    }
}
