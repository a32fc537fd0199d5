//! Retrieval orchestrator.
//!
//! [`Pipeline`] composes the chunker, document registry, embedding provider,
//! vector index, and answer generator. It owns no data of its own: every
//! collaborator is an injected `Arc<dyn …>` handle, so the same pipeline can
//! be driven by the CLI, the HTTP server, or tests with fake providers.
//!
//! # Ingestion
//!
//! ```text
//! text ──► chunk ──► register ──(duplicate)──► return existing id
//!                        │
//!                       new ──► embed ──► index.add ──► index.persist
//!                                 └──────(failure)──────► compensate
//! ```
//!
//! # Query
//!
//! ```text
//! question ──► embed ──► index.search(k, scope) ──► answer generator
//!                              │
//!                         no passages ──► "No relevant information found."
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::answer::{AnswerGenerator, NO_RELEVANT_INFORMATION};
use crate::chunk::{chunk_text, ChunkingParams};
use crate::embedding::{embed_query, embed_texts, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::models::{
    Answer, DocumentRecord, IndexedVector, IngestOutcome, Passage, ScoredPassage,
};
use crate::registry::DocumentRegistry;
use crate::tokenizer::TokenCounter;

/// Aggregate counts over the registry and the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub documents: usize,
    pub passages: usize,
    /// Stored vectors per document id.
    pub vectors_per_document: BTreeMap<String, usize>,
}

/// Stateless coordinator over injected collaborators.
#[derive(Clone)]
pub struct Pipeline {
    registry: Arc<dyn DocumentRegistry>,
    index: Arc<dyn VectorIndex>,
    counter: Arc<dyn TokenCounter>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn AnswerGenerator>,
    chunking: ChunkingParams,
    /// Held from an index mutation through its persist, so a rollback to
    /// the committed state never discards another writer's rows.
    index_writes: Arc<tokio::sync::Mutex<()>>,
}

impl Pipeline {
    /// Wire a pipeline. Fails with [`RagError::InvalidConfig`] if the
    /// chunking parameters are invalid or the embedding dimensionality does
    /// not match the index.
    pub fn new(
        registry: Arc<dyn DocumentRegistry>,
        index: Arc<dyn VectorIndex>,
        counter: Arc<dyn TokenCounter>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn AnswerGenerator>,
        chunking: ChunkingParams,
    ) -> Result<Self> {
        chunking.validate()?;
        if embedder.dims() != index.dimension() {
            return Err(RagError::InvalidConfig(format!(
                "embedding model '{}' produces {} dims but the index holds {}",
                embedder.model_name(),
                embedder.dims(),
                index.dimension()
            )));
        }
        Ok(Self {
            registry,
            index,
            counter,
            embedder,
            generator,
            chunking,
            index_writes: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    pub fn chunking(&self) -> &ChunkingParams {
        &self.chunking
    }

    pub fn token_counter(&self) -> &dyn TokenCounter {
        self.counter.as_ref()
    }

    /// Ingest extracted document text.
    ///
    /// Duplicate content returns the existing id with `is_new = false` and
    /// makes no embedding calls. On failure after a new registration, the
    /// document's index entries and registry row are removed before the
    /// error is returned. Embedding runs outside the index write lock.
    pub async fn ingest(&self, filename: &str, raw_text: &str) -> Result<IngestOutcome> {
        let chunks = chunk_text(raw_text, &self.chunking, self.counter.as_ref())?;
        if chunks.is_empty() {
            return Err(RagError::EmptyDocument(filename.to_string()));
        }

        let registration = self
            .registry
            .register(filename, raw_text, chunks.len())
            .await?;

        if !registration.is_new {
            let chunk_count = self
                .registry
                .get(&registration.doc_id)
                .await?
                .map(|r| r.chunk_count)
                .unwrap_or(chunks.len());
            tracing::info!(doc_id = %registration.doc_id, filename, "duplicate content, skipping");
            return Ok(IngestOutcome {
                doc_id: registration.doc_id,
                is_new: false,
                chunk_count,
            });
        }

        let doc_id = registration.doc_id;
        let chunk_count = chunks.len();
        if let Err(e) = self.index_chunks(&doc_id, chunks).await {
            tracing::warn!(doc_id = %doc_id, error = %e, "ingest failed, rolling back");
            self.compensate(&doc_id).await;
            return Err(e);
        }

        tracing::info!(doc_id = %doc_id, filename, chunks = chunk_count, "document ingested");
        Ok(IngestOutcome {
            doc_id,
            is_new: true,
            chunk_count,
        })
    }

    /// Ingest per-page text, joining pages with a newline.
    pub async fn ingest_pages(&self, filename: &str, pages: &[String]) -> Result<IngestOutcome> {
        self.ingest(filename, &pages.join("\n")).await
    }

    async fn index_chunks(&self, doc_id: &str, chunks: Vec<String>) -> Result<()> {
        let vectors = embed_texts(self.embedder.as_ref(), &chunks).await?;
        let rows = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(ordinal, (text, vector))| IndexedVector {
                vector,
                passage: Passage {
                    text,
                    source_doc_id: doc_id.to_string(),
                    ordinal,
                },
            })
            .collect();
        let _writes = self.index_writes.lock().await;
        self.index.add(rows).await?;
        self.commit_index().await
    }

    /// Persist the index. If the write fails, the in-memory index is
    /// reloaded from the last committed state before the error is returned.
    /// Callers hold `index_writes`.
    async fn commit_index(&self) -> Result<()> {
        if let Err(e) = self.index.persist().await {
            tracing::error!(error = %e, "index persist failed, reloading committed state");
            if let Err(reload) = self.index.restore().await {
                tracing::error!(error = %reload, "index reload failed");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Best-effort undo of a partially ingested document.
    async fn compensate(&self, doc_id: &str) {
        {
            let _writes = self.index_writes.lock().await;
            match self.index.remove(doc_id).await {
                Ok(0) => {}
                Ok(removed) => {
                    tracing::info!(doc_id, removed, "rollback: index entries removed");
                    if let Err(e) = self.commit_index().await {
                        tracing::error!(doc_id, error = %e, "rollback: index persist failed");
                    }
                }
                Err(e) => tracing::error!(doc_id, error = %e, "rollback: index removal failed"),
            }
        }
        match self.registry.delete(doc_id).await {
            Ok(_) => tracing::info!(doc_id, "rollback: registry row deleted"),
            Err(e) => tracing::error!(doc_id, error = %e, "rollback: registry delete failed"),
        }
    }

    /// Nearest passages for `question`, closest first.
    ///
    /// An unknown `scope` is [`RagError::NotFound`]. An empty index returns
    /// no passages without calling the embedding provider.
    pub async fn retrieve(
        &self,
        question: &str,
        scope: Option<&str>,
        k: usize,
    ) -> Result<Vec<ScoredPassage>> {
        if k == 0 {
            return Err(RagError::InvalidConfig("k must be > 0".to_string()));
        }
        if question.trim().is_empty() {
            return Err(RagError::InvalidConfig(
                "question must not be empty".to_string(),
            ));
        }
        if let Some(doc_id) = scope {
            if self.registry.get(doc_id).await?.is_none() {
                return Err(RagError::NotFound(doc_id.to_string()));
            }
        }
        if self.index.is_empty().await? {
            return Ok(Vec::new());
        }

        let query = embed_query(self.embedder.as_ref(), question).await?;
        self.index.search(&query, k, scope).await
    }

    /// Retrieve context and generate an answer.
    pub async fn answer_query(
        &self,
        question: &str,
        scope: Option<&str>,
        k: usize,
    ) -> Result<Answer> {
        let sources = self.retrieve(question, scope, k).await?;
        if sources.is_empty() {
            tracing::info!(scope = ?scope, "no passages retrieved");
            return Ok(Answer {
                answer: NO_RELEVANT_INFORMATION.to_string(),
                sources,
            });
        }

        let passages: Vec<Passage> = sources.iter().map(|s| s.passage.clone()).collect();
        let answer = self.generator.generate(question, &passages).await?;
        tracing::debug!(
            model = self.generator.model_name(),
            passages = passages.len(),
            "answer generated"
        );
        Ok(Answer { answer, sources })
    }

    /// All registered documents, most recent first.
    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        self.registry.list().await
    }

    /// Delete a document and every passage it owns.
    ///
    /// Returns `false` if no such document was registered. The index is
    /// committed before the registry row goes; if persisting fails, both
    /// keep the document. A registry failure after the commit leaves a row
    /// without passages, which a repeated delete removes.
    pub async fn delete_document(&self, doc_id: &str) -> Result<bool> {
        let removed = {
            let _writes = self.index_writes.lock().await;
            let removed = self.index.remove(doc_id).await?;
            if removed > 0 {
                self.commit_index().await?;
            }
            removed
        };
        let deleted = self.registry.delete(doc_id).await?;
        if deleted {
            tracing::info!(doc_id, passages = removed, "document deleted");
        }
        Ok(deleted)
    }

    /// Remove every document and passage.
    pub async fn clear_all(&self) -> Result<()> {
        {
            let _writes = self.index_writes.lock().await;
            self.index.clear().await?;
            self.commit_index().await?;
        }
        self.registry.clear().await?;
        tracing::info!("all documents cleared");
        Ok(())
    }

    pub async fn stats(&self) -> Result<PipelineStats> {
        let documents = self.registry.list().await?.len();
        let vectors_per_document = self.index.document_counts().await?;
        Ok(PipelineStats {
            documents,
            passages: self.index.len().await?,
            vectors_per_document,
        })
    }
}
