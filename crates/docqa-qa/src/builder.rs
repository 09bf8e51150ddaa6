//! Index build: embed ingested documents in parallel, insert them into the
//! store on the calling thread, stamp the embedder id and persist.

use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info};

use docqa_core::data_processor::IngestedDocument;
use docqa_core::traits::EmbeddingProvider;
use docqa_vector::VectorStore;

use crate::error::BuildError;

pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder }
    }

    /// Embed and insert every chunk of `documents`, in document order.
    ///
    /// `on_document` runs after each document is inserted. Returns the number
    /// of entries inserted. The store is left `Building`.
    pub fn build<F>(&self, documents: &[IngestedDocument], store: &mut VectorStore, on_document: F) -> Result<usize, BuildError>
    where
        F: Fn(&IngestedDocument),
    {
        let embedded: Vec<Vec<Vec<f32>>> = documents
            .par_iter()
            .map(|doc| self.embed_document(doc))
            .collect::<Result<_, _>>()?;

        let mut inserted = 0usize;
        for (doc, vectors) in documents.iter().zip(embedded) {
            let batch: Vec<_> = doc.chunks.iter().cloned().zip(vectors).collect();
            inserted += store.insert_batch(batch)?;
            on_document(doc);
        }
        store.set_embedder_id(self.embedder.embedder_id());
        info!(documents = documents.len(), entries = inserted, embedder = self.embedder.embedder_id(), "index built");
        Ok(inserted)
    }

    /// [`IndexBuilder::build`] followed by persisting the store to `path`.
    pub async fn build_and_persist<F>(
        &self,
        documents: &[IngestedDocument],
        store: &mut VectorStore,
        path: &Path,
        on_document: F,
    ) -> Result<usize, BuildError>
    where
        F: Fn(&IngestedDocument),
    {
        let inserted = self.build(documents, store, on_document)?;
        store.persist(path).await?;
        Ok(inserted)
    }

    fn embed_document(&self, doc: &IngestedDocument) -> Result<Vec<Vec<f32>>, BuildError> {
        let texts: Vec<String> = doc.chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .map_err(|source| BuildError::Embedding { document_id: doc.document_id.clone(), source })?;
        if vectors.len() != texts.len() {
            return Err(BuildError::EmbeddingCount {
                document_id: doc.document_id.clone(),
                expected: texts.len(),
                actual: vectors.len(),
            });
        }
        debug!(doc = %doc.document_id, chunks = texts.len(), "embedded document");
        Ok(vectors)
    }
}
