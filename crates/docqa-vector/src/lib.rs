//! Exact cosine-similarity vector index over document chunks, persisted with LanceDB.

pub mod error;
pub mod persist;
pub mod schema;
pub mod store;

pub use error::StoreError;
pub use store::{cosine_similarity, IndexEntry, StoreState, VectorStore};
