//! LanceDB persistence for [`VectorStore`].
//!
//! An index is a directory holding a LanceDB database with a `chunks` table
//! (one row per entry) and a `meta` key/value table carrying the fingerprint:
//! dimensionality, embedder id, entry count and format version. `persist`
//! writes a staging directory next to the target and renames it into place,
//! so a reader never sees a half-written index.

use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, Int64Array, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use tracing::{debug, info};

use docqa_core::types::Chunk;

use crate::error::StoreError;
use crate::schema::{
    build_chunks_schema, build_meta_schema, CHUNKS_TABLE, FORMAT_VERSION, META_DIMENSION, META_EMBEDDER_ID, META_ENTRIES,
    META_FORMAT_VERSION, META_TABLE,
};
use crate::store::{IndexEntry, VectorStore};

type BoxError = Box<dyn std::error::Error>;

impl VectorStore {
    /// Write the full index to `path`, replacing whatever was there. The store is `Ready` afterwards.
    pub async fn persist(&mut self, path: &Path) -> Result<(), StoreError> {
        ensure_replaceable(path)?;
        let staging = staging_dir(path);
        let fail = |e: &dyn Display| persist_failed(path, e);

        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| fail(&e))?;
        }
        fs::create_dir_all(&staging).map_err(|e| fail(&e))?;

        let conn = connect(&staging.to_string_lossy()).execute().await.map_err(|e| fail(&e))?;
        write_meta(&conn, self).await.map_err(|e| fail(&e))?;
        if let Some(dim) = self.dimension().filter(|_| !self.is_empty()) {
            write_chunks(&conn, self.entries(), dim).await.map_err(|e| fail(&e))?;
        }
        drop(conn);

        if path.exists() {
            fs::remove_dir_all(path).map_err(|e| fail(&e))?;
        }
        fs::rename(&staging, path).map_err(|e| fail(&e))?;
        self.mark_ready();
        info!(path = %path.display(), entries = self.len(), "persisted index");
        Ok(())
    }

    /// Read an index written by [`VectorStore::persist`]. The store is `Ready`.
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.is_dir() {
            return Err(StoreError::IndexNotFound { path: path.to_path_buf() });
        }
        let conn = connect(&path.to_string_lossy()).execute().await.map_err(|e| corrupt(path, e))?;
        let names = conn.table_names().execute().await.map_err(|e| corrupt(path, e))?;
        if !names.iter().any(|n| n == META_TABLE) {
            return Err(StoreError::IndexNotFound { path: path.to_path_buf() });
        }

        let meta = read_meta(&conn).await.map_err(|e| corrupt(path, e))?;
        let version: u32 = parse_meta(path, &meta, META_FORMAT_VERSION)?;
        if version > FORMAT_VERSION {
            return Err(corrupt(path, format!("unsupported format version {version}")));
        }
        let dimension: usize = parse_meta(path, &meta, META_DIMENSION)?;
        let expected_entries: usize = parse_meta(path, &meta, META_ENTRIES)?;
        let embedder_id = meta.get(META_EMBEDDER_ID).filter(|v| !v.is_empty()).cloned();

        let entries = if expected_entries == 0 {
            Vec::new()
        } else {
            if !names.iter().any(|n| n == CHUNKS_TABLE) {
                return Err(corrupt(path, "chunks table missing"));
            }
            read_chunks(&conn, path, dimension, expected_entries).await?
        };
        if entries.len() != expected_entries {
            return Err(corrupt(path, format!("expected {expected_entries} entries, found {}", entries.len())));
        }

        info!(path = %path.display(), entries = entries.len(), dimension, "loaded index");
        let dimension = (dimension > 0).then_some(dimension);
        Ok(Self::from_loaded(entries, dimension, embedder_id))
    }

    /// Like [`VectorStore::load`], but a missing index yields a fresh `NotCreated` store.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        match Self::load(path).await {
            Err(StoreError::IndexNotFound { .. }) => {
                debug!(path = %path.display(), "no index yet");
                Ok(Self::new())
            }
            other => other,
        }
    }
}

fn staging_dir(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "index".to_string());
    path.with_file_name(format!(".{name}.staging"))
}

/// Only a missing path, an empty directory or a previous index may be replaced.
fn ensure_replaceable(path: &Path) -> Result<(), StoreError> {
    if path.file_name().is_none() {
        return Err(persist_failed(path, &"index path must end in a directory name"));
    }
    if !path.exists() {
        return Ok(());
    }
    if !path.is_dir() {
        return Err(persist_failed(path, &"index path is not a directory"));
    }
    if path.join(format!("{META_TABLE}.lance")).is_dir() {
        return Ok(());
    }
    let mut contents = fs::read_dir(path).map_err(|e| persist_failed(path, &e))?;
    if contents.next().is_some() {
        return Err(persist_failed(path, &"refusing to replace a directory that does not hold an index"));
    }
    Ok(())
}

fn persist_failed(path: &Path, e: &dyn Display) -> StoreError {
    StoreError::Persist { path: path.to_path_buf(), message: e.to_string() }
}

fn corrupt(path: &Path, e: impl Display) -> StoreError {
    StoreError::CorruptIndex { path: path.to_path_buf(), message: e.to_string() }
}

fn parse_meta<T: std::str::FromStr>(path: &Path, meta: &HashMap<String, String>, key: &str) -> Result<T, StoreError> {
    meta.get(key)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| corrupt(path, format!("meta key '{key}' missing or invalid")))
}

async fn write_meta(conn: &Connection, store: &VectorStore) -> Result<(), BoxError> {
    let pairs = [
        (META_FORMAT_VERSION, FORMAT_VERSION.to_string()),
        (META_DIMENSION, store.dimension().unwrap_or(0).to_string()),
        (META_ENTRIES, store.len().to_string()),
        (META_EMBEDDER_ID, store.embedder_id().unwrap_or_default().to_string()),
    ];
    let now = Utc::now().timestamp_millis();
    let schema = build_meta_schema();
    let rb = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(pairs.iter().map(|(k, _)| (*k).to_string()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(pairs.iter().map(|(_, v)| v.clone()).collect::<Vec<_>>())),
            Arc::new(TimestampMillisecondArray::from(vec![now; pairs.len()])),
        ],
    )?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), schema));
    conn.create_table(META_TABLE, reader).execute().await?;
    Ok(())
}

async fn read_meta(conn: &Connection) -> Result<HashMap<String, String>, BoxError> {
    let t = conn.open_table(META_TABLE).execute().await?;
    let mut stream = t.query().limit(64).execute().await?;
    let mut out = HashMap::new();
    while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
        let keys = batch.column_by_name("key").and_then(|c| c.as_any().downcast_ref::<StringArray>());
        let vals = batch.column_by_name("value").and_then(|c| c.as_any().downcast_ref::<StringArray>());
        let (Some(keys), Some(vals)) = (keys, vals) else { continue };
        for i in 0..batch.num_rows() {
            out.insert(keys.value(i).to_string(), vals.value(i).to_string());
        }
    }
    Ok(out)
}

async fn write_chunks(conn: &Connection, entries: &[IndexEntry], dim: usize) -> Result<(), BoxError> {
    let dim = dim as i32;
    let schema = build_chunks_schema(dim);
    let mut positions = Vec::with_capacity(entries.len());
    let mut doc_ids = Vec::with_capacity(entries.len());
    let mut seqs = Vec::with_capacity(entries.len());
    let mut texts = Vec::with_capacity(entries.len());
    let mut starts = Vec::with_capacity(entries.len());
    let mut ends = Vec::with_capacity(entries.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(entries.len());
    for (i, e) in entries.iter().enumerate() {
        positions.push(i as i64);
        doc_ids.push(e.chunk.document_id.clone());
        seqs.push(e.chunk.sequence_index as i64);
        texts.push(e.chunk.text.clone());
        starts.push(e.chunk.char_range.start as i64);
        ends.push(e.chunk.char_range.end as i64);
        vectors.push(Some(e.vector.iter().map(|&x| Some(x)).collect()));
    }
    let rb = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(positions)),
            Arc::new(StringArray::from(doc_ids)),
            Arc::new(Int64Array::from(seqs)),
            Arc::new(StringArray::from(texts)),
            Arc::new(Int64Array::from(starts)),
            Arc::new(Int64Array::from(ends)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors.into_iter(), dim)),
        ],
    )?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), schema));
    conn.create_table(CHUNKS_TABLE, reader).execute().await?;
    debug!(rows = entries.len(), dim, "wrote chunks table");
    Ok(())
}

async fn read_chunks(conn: &Connection, path: &Path, dimension: usize, expected: usize) -> Result<Vec<IndexEntry>, StoreError> {
    let t = conn.open_table(CHUNKS_TABLE).execute().await.map_err(|e| corrupt(path, e))?;
    let mut stream = t.query().limit(expected).execute().await.map_err(|e| corrupt(path, e))?;
    let mut rows: Vec<(i64, IndexEntry)> = Vec::with_capacity(expected);
    while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await.map_err(|e| corrupt(path, e))? {
        let int_col = |name: &str| {
            batch
                .column_by_name(name)
                .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
                .ok_or_else(|| corrupt(path, format!("chunks.{name} column missing")))
        };
        let str_col = |name: &str| {
            batch
                .column_by_name(name)
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| corrupt(path, format!("chunks.{name} column missing")))
        };
        let position = int_col("position")?;
        let seq = int_col("sequence_index")?;
        let start = int_col("char_start")?;
        let end = int_col("char_end")?;
        let doc_id = str_col("document_id")?;
        let text = str_col("text")?;
        let vec_col = batch
            .column_by_name("vector")
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
            .ok_or_else(|| corrupt(path, "chunks.vector column missing"))?;
        if vec_col.value_length() as usize != dimension {
            return Err(corrupt(
                path,
                format!("vector width {} does not match stored dimension {dimension}", vec_col.value_length()),
            ));
        }
        for i in 0..batch.num_rows() {
            let vector = vec_col.value(i).as_primitive::<Float32Type>().values().iter().copied().collect::<Vec<f32>>();
            let chunk = Chunk {
                document_id: doc_id.value(i).to_string(),
                sequence_index: seq.value(i) as usize,
                text: text.value(i).to_string(),
                char_range: start.value(i) as usize..end.value(i) as usize,
            };
            rows.push((position.value(i), IndexEntry { chunk, vector }));
        }
    }
    rows.sort_by_key(|(pos, _)| *pos);
    Ok(rows.into_iter().map(|(_, e)| e).collect())
}
