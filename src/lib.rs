//! OpenStreetMap objects, an in-memory object database and a streaming
//! reader for OSM XML documents.

pub mod data;
pub mod errors;
pub mod stream;
