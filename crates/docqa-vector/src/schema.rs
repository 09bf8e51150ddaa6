use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub const CHUNKS_TABLE: &str = "chunks";
pub const META_TABLE: &str = "meta";

/// Bumped whenever the on-disk layout changes.
pub const FORMAT_VERSION: u32 = 1;

pub const META_DIMENSION: &str = "dimension";
pub const META_EMBEDDER_ID: &str = "embedder_id";
pub const META_ENTRIES: &str = "entries";
pub const META_FORMAT_VERSION: &str = "format_version";

/// One row per index entry. `position` keeps insertion order across a round trip.
pub fn build_chunks_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("position", DataType::Int64, false),
        Field::new("document_id", DataType::Utf8, false),
        Field::new("sequence_index", DataType::Int64, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("char_start", DataType::Int64, false),
        Field::new("char_end", DataType::Int64, false),
        Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}

pub fn build_meta_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("key", DataType::Utf8, false),
        Field::new("value", DataType::Utf8, false),
        Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
    ]))
}
