use std::fs;
use std::io::{BufRead, BufReader};
use std::mem;
use std::path::{Path, PathBuf};
use std::str;

use log::{debug, error, info};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use xz::bufread::XzDecoder;

use super::{AcceptAll, Attributes, Callbacks};
use crate::data::member::Member;
use crate::data::node::Node;
use crate::data::osm::{parse_id, OsmId, OsmObject};
use crate::data::relation::Relation;
use crate::data::way::Way;
use crate::data::Database;
use crate::errors::{Error, Result};

/// OSM XML versions the parser understands.
pub const SUPPORTED_VERSIONS: [&str; 2] = ["0.5", "0.6"];

/// Where the document comes from, how it is stored, and who gets told.
///
/// Exactly one of [`filename`](Self::filename) and [`string`](Self::string)
/// must be given; [`Parser::new`] rejects anything else. Without explicit
/// callbacks every object is kept.
pub struct ParserOptions<'a, C> {
    filename: Option<PathBuf>,
    string: Option<String>,
    db: Option<&'a mut Database>,
    callbacks: C,
}

impl ParserOptions<'static, AcceptAll> {
    pub fn new() -> Self {
        ParserOptions {
            filename: None,
            string: None,
            db: None,
            callbacks: AcceptAll,
        }
    }
}

impl Default for ParserOptions<'static, AcceptAll> {
    fn default() -> Self {
        ParserOptions::new()
    }
}

impl<'a, C: Callbacks> ParserOptions<'a, C> {
    /// Read from a file. Files ending in `.xz` are decompressed on the fly.
    pub fn filename(mut self, path: impl Into<PathBuf>) -> Self {
        self.filename = Some(path.into());
        self
    }

    pub fn string(mut self, xml: impl Into<String>) -> Self {
        self.string = Some(xml.into());
        self
    }

    pub fn db<'b>(self, db: &'b mut Database) -> ParserOptions<'b, C> {
        ParserOptions {
            filename: self.filename,
            string: self.string,
            db: Some(db),
            callbacks: self.callbacks,
        }
    }

    pub fn callbacks<D: Callbacks>(self, callbacks: D) -> ParserOptions<'a, D> {
        ParserOptions {
            filename: self.filename,
            string: self.string,
            db: self.db,
            callbacks,
        }
    }
}

enum Source {
    File(PathBuf),
    Text(String),
}

impl Source {
    fn label(&self) -> String {
        match self {
            Source::File(path) => path.display().to_string(),
            Source::Text(_) => "<string>".to_owned(),
        }
    }

    fn is_xz(path: &Path) -> bool {
        path.extension().is_some_and(|extension| extension == "xz")
    }

    fn create_osm_reader(&self) -> Result<Reader<Box<dyn BufRead + '_>>> {
        let input: Box<dyn BufRead + '_> = match self {
            Source::Text(xml) => Box::new(xml.as_bytes()),
            Source::File(path) => {
                let file_reader = BufReader::new(fs::File::open(path)?);
                if Self::is_xz(path) {
                    Box::new(BufReader::new(XzDecoder::new(file_reader)))
                } else {
                    Box::new(file_reader)
                }
            }
        };
        let mut reader = Reader::from_reader(input);
        reader.trim_text(true);
        Ok(reader)
    }
}

/// The object whose start tag has been read but not yet its end tag.
#[derive(Debug, Default)]
enum ParserState {
    #[default]
    Idle,
    Node(Node),
    Way(Way),
    Relation(Relation),
}

#[derive(Debug, Default)]
struct Counts {
    seen: usize,
    kept: usize,
}

/// Single pass OSM XML parser.
pub struct Parser<'a, C: Callbacks = AcceptAll> {
    source: Source,
    db: Option<&'a mut Database>,
    callbacks: C,
    state: ParserState,
    counts: Counts,
}

pub(crate) fn read_attributes(e: &BytesStart) -> Result<Attributes> {
    let mut attributes = Attributes::new();
    for attribute_res in e.attributes() {
        let attribute = attribute_res?;
        let key = str::from_utf8(attribute.key.as_ref())?.to_owned();
        let value = attribute.unescape_value()?.into_owned();
        attributes.insert(key, value);
    }
    Ok(attributes)
}

pub(crate) fn required<'v>(attributes: &'v Attributes, element: &str, name: &str) -> Result<&'v str> {
    attributes
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| Error::invalid(format!("{element} element without {name} attribute")))
}

fn read_id(attributes: &Attributes) -> Result<Option<OsmId>> {
    attributes.get("id").map(|id| parse_id(id)).transpose()
}

/// Fill in the attributes shared by nodes, ways and relations.
fn read_common(object: &mut dyn OsmObject, attributes: &Attributes) -> Result<()> {
    if let Some(user) = attributes.get("user") {
        object.set_user(Some(user.clone()));
    }
    object.set_timestamp(attributes.get("timestamp").map(String::as_str))?;
    if let Some(uid) = attributes.get("uid") {
        let uid = uid
            .parse()
            .map_err(|_| Error::invalid(format!("uid must be an integer, got {uid:?}")))?;
        object.set_uid(uid);
    }
    if let Some(version) = attributes.get("version") {
        let version = version
            .parse()
            .map_err(|_| Error::invalid(format!("version must be a positive integer, got {version:?}")))?;
        object.set_version(version)?;
    }
    match attributes.get("visible").map(String::as_str) {
        None => (),
        Some("true") => object.set_visible(Some(true)),
        Some("false") => object.set_visible(Some(false)),
        Some(other) => {
            return Err(Error::invalid(format!("visible must be true or false, got {other:?}")));
        }
    }
    Ok(())
}

impl<'a, C: Callbacks> Parser<'a, C> {
    pub fn new(options: ParserOptions<'a, C>) -> Result<Self> {
        let source = match (options.filename, options.string) {
            (Some(path), None) => Source::File(path),
            (None, Some(xml)) => Source::Text(xml),
            _ => return Err(Error::invalid("need either a filename or a string to parse, not both")),
        };
        Ok(Parser {
            source,
            db: options.db,
            callbacks: options.callbacks,
            state: ParserState::Idle,
            counts: Counts::default(),
        })
    }

    /// Read the whole document and return the callbacks' result.
    ///
    /// On error the object being read is discarded; objects completed before
    /// the error stay in the database.
    pub fn parse(mut self) -> Result<C::Output> {
        let source = mem::replace(&mut self.source, Source::Text(String::new()));
        let label = source.label();
        info!(source = label.as_str(); "Starting parse");

        match self.run(&source) {
            Ok(()) => {
                info!(
                    source = label.as_str(),
                    objects = self.counts.seen,
                    kept = self.counts.kept;
                    "Parse finished"
                );
                Ok(self.callbacks.result())
            }
            Err(err) => {
                let message = err.to_string();
                error!(source = label.as_str(), err = message.as_str(); "Parse failed with error");
                Err(err)
            }
        }
    }

    fn run(&mut self, source: &Source) -> Result<()> {
        let mut reader = source.create_osm_reader()?;
        let mut buf = Vec::new();

        self.callbacks.start_document();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Eof => break,
                Event::Start(e) => self.start_element(&e)?,
                Event::Empty(e) => {
                    self.start_element(&e)?;
                    self.end_element(e.name().as_ref())?;
                }
                Event::End(e) => self.end_element(e.name().as_ref())?,
                // Declarations, comments, text and the like carry no OSM data.
                _ => (),
            }
            buf.clear();
        }
        self.callbacks.end_document();
        Ok(())
    }

    fn start_element(&mut self, e: &BytesStart) -> Result<()> {
        match e.name().as_ref() {
            b"osm" => self.start_osm(e),
            b"node" => self.start_node(e),
            b"way" => self.start_way(e),
            b"relation" => self.start_relation(e),
            b"tag" => self.tag(e),
            b"nd" => self.nd(e),
            b"member" => self.member(e),
            name => {
                let name = str::from_utf8(name)?;
                self.callbacks.start_element(name, &read_attributes(e)?)
            }
        }
    }

    fn end_element(&mut self, name: &[u8]) -> Result<()> {
        match name {
            b"node" | b"way" | b"relation" => {
                self.finish(name);
                Ok(())
            }
            b"osm" | b"tag" | b"nd" | b"member" => Ok(()),
            name => self.callbacks.end_element(str::from_utf8(name)?),
        }
    }

    fn start_osm(&mut self, e: &BytesStart) -> Result<()> {
        let attributes = read_attributes(e)?;
        let version = attributes.get("version");
        match version {
            Some(version) if SUPPORTED_VERSIONS.contains(&version.as_str()) => {
                if let Some(db) = self.db.as_deref_mut() {
                    db.version = version.clone();
                }
                self.state = ParserState::Idle;
                Ok(())
            }
            _ => Err(Error::Version {
                found: version.cloned(),
            }),
        }
    }

    fn open(&mut self, state: ParserState) {
        if !matches!(self.state, ParserState::Idle) {
            debug!("Discarding unfinished object, a new one started before it was closed");
        }
        self.state = state;
    }

    fn start_node(&mut self, e: &BytesStart) -> Result<()> {
        let attributes = read_attributes(e)?;
        let mut node = match read_id(&attributes)? {
            Some(id) => Node::with_id(id),
            None => Node::new(),
        };
        read_common(&mut node, &attributes)?;
        if let Some(lon) = attributes.get("lon") {
            node.set_lon(lon)?;
        }
        if let Some(lat) = attributes.get("lat") {
            node.set_lat(lat)?;
        }
        self.open(ParserState::Node(node));
        Ok(())
    }

    fn start_way(&mut self, e: &BytesStart) -> Result<()> {
        let attributes = read_attributes(e)?;
        let mut way = match read_id(&attributes)? {
            Some(id) => Way::with_id(id),
            None => Way::new(),
        };
        read_common(&mut way, &attributes)?;
        self.open(ParserState::Way(way));
        Ok(())
    }

    fn start_relation(&mut self, e: &BytesStart) -> Result<()> {
        let attributes = read_attributes(e)?;
        let mut relation = match read_id(&attributes)? {
            Some(id) => Relation::with_id(id),
            None => Relation::new(),
        };
        read_common(&mut relation, &attributes)?;
        self.open(ParserState::Relation(relation));
        Ok(())
    }

    fn tag(&mut self, e: &BytesStart) -> Result<()> {
        let object: &mut dyn OsmObject = match &mut self.state {
            ParserState::Idle => {
                debug!("Ignoring tag element outside of an object");
                return Ok(());
            }
            ParserState::Node(node) => node,
            ParserState::Way(way) => way,
            ParserState::Relation(relation) => relation,
        };
        let attributes = read_attributes(e)?;
        let key = required(&attributes, "tag", "k")?;
        let value = required(&attributes, "tag", "v")?;
        if self.callbacks.tag(&*object, key, value) {
            object.set_tag(key, value);
        }
        Ok(())
    }

    fn nd(&mut self, e: &BytesStart) -> Result<()> {
        let ParserState::Way(way) = &mut self.state else {
            debug!("Ignoring nd element outside of a way");
            return Ok(());
        };
        let attributes = read_attributes(e)?;
        way.push_node(parse_id(required(&attributes, "nd", "ref")?)?);
        Ok(())
    }

    fn member(&mut self, e: &BytesStart) -> Result<()> {
        let ParserState::Relation(relation) = &mut self.state else {
            debug!("Ignoring member element outside of a relation");
            return Ok(());
        };
        let attributes = read_attributes(e)?;
        let member = Member::new(
            attributes.get("type").map(String::as_str).unwrap_or_default(),
            attributes.get("ref").map(String::as_str).unwrap_or_default(),
            attributes.get("role").cloned().unwrap_or_default(),
        )?;
        if self.callbacks.member(relation, &member) {
            relation.members_mut().push(member);
        }
        Ok(())
    }

    /// Hand the completed object to the callbacks and store it if they keep it.
    fn finish(&mut self, name: &[u8]) {
        let state = mem::take(&mut self.state);
        let db = self.db.as_deref_mut();
        let kept = match (name, state) {
            (b"node", ParserState::Node(node)) => {
                let keep = self.callbacks.node(&node);
                if let (true, Some(db)) = (keep, db) {
                    db.add_node(node);
                }
                keep
            }
            (b"way", ParserState::Way(way)) => {
                let keep = self.callbacks.way(&way);
                if let (true, Some(db)) = (keep, db) {
                    db.add_way(way);
                }
                keep
            }
            (b"relation", ParserState::Relation(relation)) => {
                let keep = self.callbacks.relation(&relation);
                if let (true, Some(db)) = (keep, db) {
                    db.add_relation(relation);
                }
                keep
            }
            (_, ParserState::Idle) => return,
            (_, state) => {
                debug!("Ignoring end tag that does not close the current object");
                self.state = state;
                return;
            }
        };
        self.counts.seen += 1;
        if kept {
            self.counts.kept += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::osm::Element;
    use crate::stream::ObjectList;
    use rstest::rstest;

    const MINIMAL: &str = r#"<osm version="0.6"><node id="1" lat="48.1" lon="8.1" user="u"><tag k="created_by" v="JOSM"/></node></osm>"#;

    #[rstest]
    fn needs_exactly_one_input() {
        assert!(matches!(
            Parser::new(ParserOptions::new()),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            Parser::new(ParserOptions::new().filename("foo").string("bar")),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl Callbacks for Recorder {
        type Output = Vec<String>;

        fn start_document(&mut self) {
            self.events.push("start".to_owned());
        }

        fn end_document(&mut self) {
            self.events.push("end".to_owned());
        }

        fn node(&mut self, node: &Node) -> bool {
            self.events.push(format!("node {}", node.id()));
            true
        }

        fn way(&mut self, way: &Way) -> bool {
            self.events.push(format!("way {}", way.id()));
            true
        }

        fn result(self) -> Self::Output {
            self.events
        }
    }

    #[rstest]
    fn document_hooks_bracket_the_objects() {
        let events = Parser::new(ParserOptions::new().string(MINIMAL).callbacks(Recorder::default()))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(events, vec!["start", "node 1", "end"]);

        let xml = r#"<osm version="0.6"><node id="2"/><way id="3"/></osm>"#;
        let events = Parser::new(ParserOptions::new().string(xml).callbacks(Recorder::default()))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(events, vec!["start", "node 2", "way 3", "end"]);
    }

    #[rstest]
    fn minimal_document() {
        let objects = Parser::new(ParserOptions::new().string(MINIMAL).callbacks(ObjectList::default()))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(objects.len(), 1);
        let Element::Node(node) = &objects[0] else {
            panic!("expected a node, got {:?}", objects[0]);
        };
        assert_eq!(node.id(), 1);
        assert_eq!(node.lat(), Some("48.1"));
        assert_eq!(node.lon(), Some("8.1"));
        assert_eq!(node.user(), Some("u"));
        assert_eq!(node.tags().len(), 1);
        assert_eq!(node.tag("created_by"), Some("JOSM"));
    }

    #[rstest]
    #[case(r#"<osm version="0.4"><node id="1"/></osm>"#, Some("0.4"))]
    #[case(r#"<osm><node id="1"/></osm>"#, None)]
    fn rejects_unknown_versions(#[case] xml: &str, #[case] found: Option<&str>) {
        let mut db = Database::new();
        let result = Parser::new(ParserOptions::new().string(xml).db(&mut db))
            .unwrap()
            .parse();
        match result {
            Err(Error::Version { found: reported }) => assert_eq!(reported.as_deref(), found),
            other => panic!("expected a version error, got {other:?}"),
        }
        assert!(db.is_empty());
    }

    #[rstest]
    fn records_version_in_database() {
        let mut db = Database::new();
        Parser::new(ParserOptions::new().string(r#"<osm version="0.5"/>"#).db(&mut db))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(db.version, "0.5");
    }

    #[rstest]
    fn reads_common_attributes() {
        let xml = r#"<osm version="0.6">
            <way id="5" user="a" uid="12" version="3" visible="false" timestamp="2007-04-09T22:16:39+01:00">
              <nd ref="1"/><nd ref="2"/><nd ref="1"/>
            </way>
          </osm>"#;
        let mut db = Database::new();
        Parser::new(ParserOptions::new().string(xml).db(&mut db))
            .unwrap()
            .parse()
            .unwrap();
        let way = db.get_way(5).unwrap();
        assert_eq!(way.user(), Some("a"));
        assert_eq!(way.uid(), 12);
        assert_eq!(way.version(), 3);
        assert_eq!(way.visible(), Some(false));
        assert_eq!(way.timestamp(), Some("2007-04-09T22:16:39+01:00"));
        assert_eq!(way.nodes(), &[1, 2, 1]);
        assert!(way.is_closed());
    }

    #[rstest]
    #[case(r#"<osm version="0.6"><node id="x"/></osm>"#)]
    #[case(r#"<osm version="0.6"><node id="1" timestamp="yesterday"/></osm>"#)]
    #[case(r#"<osm version="0.6"><node id="1" lat="north"/></osm>"#)]
    #[case(r#"<osm version="0.6"><node id="1" visible="maybe"/></osm>"#)]
    #[case(r#"<osm version="0.6"><way id="1"><nd/></way></osm>"#)]
    #[case(r#"<osm version="0.6"><relation id="1"><member type="area" ref="1"/></relation></osm>"#)]
    fn rejects_bad_content(#[case] xml: &str) {
        let result = Parser::new(ParserOptions::new().string(xml)).unwrap().parse();
        assert!(matches!(result, Err(Error::InvalidArgument(_))), "{result:?}");
    }

    #[rstest]
    fn malformed_xml_aborts_but_keeps_finished_objects() {
        let xml = r#"<osm version="0.6"><node id="1"/><way id="2"><nd ref="1"/></node></osm>"#;
        let mut db = Database::new();
        let result = Parser::new(ParserOptions::new().string(xml).db(&mut db))
            .unwrap()
            .parse();
        assert!(matches!(result, Err(Error::Xml(_))));
        assert!(db.get_node(1).is_some());
        assert!(db.get_way(2).is_none());
    }

    #[rstest]
    fn ignores_unknown_elements_and_stray_children() {
        let xml = r#"<osm version="0.6">
            <bounds minlat="1" minlon="1" maxlat="2" maxlon="2"/>
            <tag k="loose" v="tag"/>
            <nd ref="4"/>
            <node id="1"><nd ref="3"/><member type="way" ref="1"/><extra/></node>
          </osm>"#;
        let mut db = Database::new();
        Parser::new(ParserOptions::new().string(xml).db(&mut db))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(db.nodes().len(), 1);
        assert!(!db.get_node(1).unwrap().is_tagged());
    }

    struct Filter {
        seen: Vec<OsmId>,
    }

    impl Callbacks for Filter {
        type Output = Vec<OsmId>;

        fn node(&mut self, node: &Node) -> bool {
            self.seen.push(node.id());
            node.tag("amenity") == Some("pharmacy")
        }

        fn way(&mut self, _way: &Way) -> bool {
            false
        }

        fn tag(&mut self, _object: &dyn OsmObject, key: &str, _value: &str) -> bool {
            key != "fixme"
        }

        fn member(&mut self, _relation: &Relation, member: &Member) -> bool {
            member.role() != "label"
        }

        fn result(self) -> Self::Output {
            self.seen
        }
    }

    #[rstest]
    fn callbacks_decide_what_is_kept() {
        let xml = r#"<osm version="0.6">
            <node id="1"><tag k="amenity" v="pharmacy"/><tag k="fixme" v="check"/></node>
            <node id="2"><tag k="amenity" v="bank"/></node>
            <way id="3"><nd ref="1"/></way>
            <relation id="4">
              <member type="node" ref="1" role="label"/>
              <member type="way" ref="3" role="outer"/>
            </relation>
          </osm>"#;
        let mut db = Database::new();
        let seen = Parser::new(
            ParserOptions::new()
                .string(xml)
                .db(&mut db)
                .callbacks(Filter { seen: Vec::new() }),
        )
        .unwrap()
        .parse()
        .unwrap();

        assert_eq!(seen, vec![1, 2]);
        assert_eq!(db.nodes().len(), 1);
        let pharmacy = db.get_node(1).unwrap();
        assert_eq!(pharmacy.tag("fixme"), None);
        assert!(db.ways().is_empty());
        let relation = db.get_relation(4).unwrap();
        assert_eq!(relation.members().len(), 1);
        assert_eq!(relation.members()[0].role(), "outer");
    }

    #[rstest]
    fn negative_ids_and_missing_ids() {
        let xml = r#"<osm version="0.5"><node id="-2" lat="48.9614113" lon="8.3046066"/><node/></osm>"#;
        let objects = Parser::new(ParserOptions::new().string(xml).callbacks(ObjectList::default()))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(objects[0].id(), -2);
        assert!(objects[1].id() < 0);
    }

    #[rstest]
    fn unescapes_attribute_values() {
        let xml = r#"<osm version="0.6"><node id="1"><tag k="name" v="Fish &amp; Chips"/></node></osm>"#;
        let mut db = Database::new();
        Parser::new(ParserOptions::new().string(xml).db(&mut db))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(db.get_node(1).unwrap().tag("name"), Some("Fish & Chips"));
    }
}
