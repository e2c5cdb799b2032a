//! RWTF: a self-describing, columnar binary container format for
//! time-series track records, and the codec core that reads and writes it.

mod bitmap;
mod codecs;
mod constants;
mod crc;
mod crypto;
mod field_codec;
mod header;
pub mod metadata;
pub mod result;
pub mod schema;
pub mod section;
pub mod track;
mod utils;
mod varint;
pub mod value;

pub use metadata::{MetadataEntry, TrackType};
pub use result::{Error, Result};
pub use schema::{FieldType, Schema, SchemaField};
pub use section::{Section, SectionEncoding};
pub use track::{write_track, TrackReader};
pub use value::{Row, Value};
