//! Nearest-neighbor vector index.
//!
//! The [`VectorIndex`] trait is the single storage capability for embedded
//! passages. Exactly one implementation is chosen when the application is
//! wired; nothing branches on the runtime shape of an index.
//!
//! # Contract
//!
//! - [`add`](VectorIndex::add) appends; every vector must match
//!   [`dimension`](VectorIndex::dimension) or the whole call is rejected.
//! - [`search`](VectorIndex::search) returns at most `k` hits ordered by
//!   increasing distance. Equal distances keep insertion order. A scope
//!   filter restricts candidates to one document before ranking.
//! - [`remove`](VectorIndex::remove) deletes every vector of a document.
//! - [`persist`](VectorIndex::persist) / [`restore`](VectorIndex::restore)
//!   round-trip vectors bit-for-bit together with their passages.

pub mod flat;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::{cosine_similarity, squared_l2};
use crate::error::{RagError, Result};
use crate::models::{IndexedVector, ScoredPassage};

/// Distance function used to rank candidates. Lower is closer for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Squared Euclidean distance.
    #[default]
    L2,
    /// `1 - cosine similarity`.
    Cosine,
}

impl Metric {
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::L2 => squared_l2(a, b),
            Metric::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }

    pub(crate) fn tag(&self) -> u8 {
        match self {
            Metric::L2 => 0,
            Metric::Cosine => 1,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Metric::L2),
            1 => Some(Metric::Cosine),
            _ => None,
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "l2" => Ok(Metric::L2),
            "cosine" => Ok(Metric::Cosine),
            other => Err(RagError::InvalidConfig(format!(
                "unknown metric '{}'. Must be l2 or cosine.",
                other
            ))),
        }
    }
}

/// Abstract vector store for embedded passages.
///
/// Mutations are serialized by the implementation; concurrent searches are
/// allowed only against a consistent snapshot.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Fixed vector length accepted by this index.
    fn dimension(&self) -> usize;

    /// Distance function used by [`search`](VectorIndex::search).
    fn metric(&self) -> Metric;

    /// Number of stored vectors.
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Append vectors. Rejects the whole batch on any dimension mismatch.
    async fn add(&self, vectors: Vec<IndexedVector>) -> Result<()>;

    /// Up to `k` nearest passages, closest first.
    async fn search(
        &self,
        query: &[f32],
        k: usize,
        scope: Option<&str>,
    ) -> Result<Vec<ScoredPassage>>;

    /// Remove every vector of `doc_id`. Returns how many were removed.
    async fn remove(&self, doc_id: &str) -> Result<usize>;

    /// Remove everything.
    async fn clear(&self) -> Result<()>;

    /// Stored vector count per document id.
    async fn document_counts(&self) -> Result<BTreeMap<String, usize>>;

    /// Write the full index to durable storage.
    async fn persist(&self) -> Result<()>;

    /// Replace the in-memory state with the last persisted state.
    async fn restore(&self) -> Result<()>;
}
