use std::env;
use std::fs::File;
use std::io;

use log::{info, warn};
use serde::Deserialize;
use structured_logger::json::new_writer;
use structured_logger::Builder;

use osmlib::data::node::Node;
use osmlib::data::osm::OsmObject;
use osmlib::data::relation::Relation;
use osmlib::data::way::Way;
use osmlib::data::Database;
use osmlib::errors::Result;
use osmlib::stream::{Callbacks, Parser, ParserOptions};

const DEFAULT_CONFIG_PATH: &str = "config/summary.json";

#[derive(Deserialize)]
pub struct SummaryConfig {
    pub data_path: String,
    #[serde(default)]
    pub keep_tags: Vec<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn load_config(path: &str) -> Result<SummaryConfig> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

fn setup_logging(level: &str) {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

/// Keeps objects carrying at least one of the configured tag keys, or
/// everything when no keys are configured.
struct TagFilter {
    keep_tags: Vec<String>,
    seen: usize,
}

impl TagFilter {
    fn keep(&mut self, object: &dyn OsmObject) -> bool {
        self.seen += 1;
        self.keep_tags.is_empty() || self.keep_tags.iter().any(|key| object.tags().contains_key(key))
    }
}

impl Callbacks for TagFilter {
    type Output = usize;

    fn node(&mut self, node: &Node) -> bool {
        self.keep(node)
    }

    fn way(&mut self, way: &Way) -> bool {
        self.keep(way)
    }

    fn relation(&mut self, relation: &Relation) -> bool {
        self.keep(relation)
    }

    fn result(self) -> Self::Output {
        self.seen
    }
}

fn summarize(db: &Database, seen: usize) {
    let outside_world = db.nodes().values().filter(|node| !node.in_world()).count();
    let closed_ways = db.ways().values().filter(|way| way.is_closed()).count();
    let incomplete_ways = db
        .ways()
        .values()
        .filter(|way| way.node_objects(db).is_err())
        .count();
    let incomplete_relations = db
        .relations()
        .values()
        .filter(|relation| relation.member_objects(db).is_err())
        .count();

    info!(
        version = db.version.as_str(),
        seen = seen,
        nodes = db.nodes().len(),
        ways = db.ways().len(),
        relations = db.relations().len(),
        closed_ways = closed_ways;
        "Database summary"
    );
    if outside_world > 0 {
        warn!(nodes = outside_world; "Nodes without coordinates or outside the world");
    }
    if incomplete_ways > 0 || incomplete_relations > 0 {
        warn!(
            ways = incomplete_ways,
            relations = incomplete_relations;
            "Objects referencing data missing from the file"
        );
    }
}

fn main() -> Result<()> {
    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    let config = load_config(&config_path)?;
    setup_logging(&config.log_level);

    let mut db = Database::new();
    let filter = TagFilter {
        keep_tags: config.keep_tags,
        seen: 0,
    };
    let options = ParserOptions::new()
        .filename(&config.data_path)
        .db(&mut db)
        .callbacks(filter);
    let seen = Parser::new(options)?.parse()?;

    summarize(&db, seen);
    Ok(())
}
