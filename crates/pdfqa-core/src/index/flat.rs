//! Exact brute-force [`VectorIndex`] with file persistence.
//!
//! Every search scans all stored vectors. Rows live in a `Vec` behind
//! `std::sync::RwLock`; position in the `Vec` is insertion order and is
//! used to break distance ties.
//!
//! # On-disk layout
//!
//! - `index.bin`: a fixed header followed by `count * dimension`
//!   little-endian `f32` values.
//! - `passages-<sha256>.json`: the passage list, element `i` belonging to
//!   row `i`. The file is named after the digest of its own bytes.
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | magic `PQFI` |
//! | 4 | 4 | format version (u32 LE) |
//! | 8 | 1 | metric tag |
//! | 9 | 4 | dimension (u32 LE) |
//! | 13 | 8 | vector count (u64 LE) |
//! | 21 | 32 | SHA-256 of the passage file |
//!
//! The rename of `index.bin` is the single commit point. A persist writes the
//! new passage file first, then `index.bin`, and only then deletes passage
//! files no header refers to. A failure at any step leaves the previous
//! `index.bin` pointing at its own, still present, passage file.
//!
//! File I/O runs on tokio's blocking pool.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{RagError, Result};
use crate::models::{IndexedVector, Passage, ScoredPassage};

use super::{Metric, VectorIndex};

pub const INDEX_FILE: &str = "index.bin";

const PASSAGES_PREFIX: &str = "passages-";
const PASSAGES_SUFFIX: &str = ".json";

const MAGIC: &[u8; 4] = b"PQFI";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 1 + 4 + 8 + 32;

/// Exact nearest-neighbor index persisted under a directory.
pub struct FlatIndex {
    dimension: usize,
    metric: Metric,
    dir: PathBuf,
    rows: RwLock<Vec<IndexedVector>>,
    /// Serializes writers of the on-disk artifacts.
    persist_lock: tokio::sync::Mutex<()>,
}

impl FlatIndex {
    /// Create an empty index. Nothing is read from `dir` until
    /// [`restore`](VectorIndex::restore) is called.
    pub fn new(dimension: usize, metric: Metric, dir: impl Into<PathBuf>) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::InvalidConfig(
                "index dimension must be > 0".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            metric,
            dir: dir.into(),
            rows: RwLock::new(Vec::new()),
            persist_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Create an index and load whatever is persisted in `dir`.
    pub async fn open(dimension: usize, metric: Metric, dir: impl Into<PathBuf>) -> Result<Self> {
        let index = Self::new(dimension, metric, dir)?;
        index.restore().await?;
        Ok(index)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<IndexedVector>>> {
        self.rows
            .read()
            .map_err(|e| RagError::Storage(format!("index lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<IndexedVector>>> {
        self.rows
            .write()
            .map_err(|e| RagError::Storage(format!("index lock poisoned: {}", e)))
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }

    fn encode(&self, rows: &[IndexedVector]) -> Result<(Vec<u8>, Vec<u8>)> {
        let passages: Vec<&Passage> = rows.iter().map(|r| &r.passage).collect();
        let passages_json = serde_json::to_vec(&passages)?;
        let digest = Sha256::digest(&passages_json);

        let mut bin = Vec::with_capacity(HEADER_LEN + rows.len() * self.dimension * 4);
        bin.extend_from_slice(MAGIC);
        bin.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bin.push(self.metric.tag());
        bin.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bin.extend_from_slice(&(rows.len() as u64).to_le_bytes());
        bin.extend_from_slice(&digest);
        for row in rows {
            bin.extend_from_slice(&crate::embedding::vec_to_blob(&row.vector));
        }
        Ok((bin, passages_json))
    }

    fn decode(&self, bin: &[u8], passages_json: &[u8]) -> Result<Vec<IndexedVector>> {
        let corrupt = |what: &str| RagError::Storage(format!("corrupt index: {}", what));

        if bin.len() < HEADER_LEN {
            return Err(corrupt("truncated header"));
        }
        let (header, body) = bin.split_at(HEADER_LEN);
        if &header[0..4] != MAGIC {
            return Err(corrupt("bad magic"));
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != FORMAT_VERSION {
            return Err(corrupt(&format!("unsupported format version {}", version)));
        }
        match Metric::from_tag(header[8]) {
            Some(m) if m == self.metric => {}
            Some(m) => {
                return Err(corrupt(&format!(
                    "built with metric {:?}, configured {:?}",
                    m, self.metric
                )))
            }
            None => return Err(corrupt("unknown metric tag")),
        }
        let dimension = u32::from_le_bytes([header[9], header[10], header[11], header[12]]) as usize;
        if dimension != self.dimension {
            return Err(corrupt(&format!(
                "dimension {} does not match configured {}",
                dimension, self.dimension
            )));
        }
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&header[13..21]);
        let count = u64::from_le_bytes(count_bytes) as usize;
        if &header[21..53] != Sha256::digest(passages_json).as_slice() {
            return Err(corrupt("passage file does not match index header"));
        }
        if body.len() != count * dimension * 4 {
            return Err(corrupt("vector data length does not match header"));
        }

        let passages: Vec<Passage> = serde_json::from_slice(passages_json)?;
        if passages.len() != count {
            return Err(corrupt("passage count does not match vector count"));
        }

        Ok(body
            .chunks_exact(dimension * 4)
            .zip(passages)
            .map(|(row, passage)| IndexedVector {
                vector: crate::embedding::blob_to_vec(row),
                passage,
            })
            .collect())
    }
}

/// Name of the passage file whose SHA-256 is `digest`.
pub fn passages_file_name(digest: &[u8]) -> String {
    format!("{}{}{}", PASSAGES_PREFIX, hex::encode(digest), PASSAGES_SUFFIX)
}

/// Digest recorded in an `index.bin` header, after checking length and magic.
fn header_digest(bin: &[u8]) -> Result<&[u8]> {
    if bin.len() < HEADER_LEN || &bin[0..4] != MAGIC {
        return Err(RagError::Storage(
            "corrupt index: bad or truncated header".to_string(),
        ));
    }
    Ok(&bin[21..53])
}

/// Write `bytes` to a temporary sibling, flush it, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Write both artifacts. Nothing is committed until `index.bin` is renamed.
fn commit_artifacts(dir: &Path, bin: &[u8], passages_json: &[u8]) -> Result<()> {
    fs::create_dir_all(dir)?;
    let passages_name = passages_file_name(&Sha256::digest(passages_json));
    write_atomic(&dir.join(&passages_name), passages_json)?;
    write_atomic(&dir.join(INDEX_FILE), bin)?;
    remove_stale_passages(dir, &passages_name);
    Ok(())
}

/// Delete passage files other than `keep`. Leftovers are harmless, so
/// failures are only logged.
fn remove_stale_passages(dir: &Path, keep: &str) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot list index dir");
            return;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name != keep && name.starts_with(PASSAGES_PREFIX) && name.ends_with(PASSAGES_SUFFIX) {
            if let Err(e) = fs::remove_file(entry.path()) {
                tracing::warn!(file = name, error = %e, "cannot remove stale passage file");
            }
        }
    }
}

/// Read `index.bin` and the passage file its header names. `None` when
/// nothing was ever committed.
fn load_artifacts(dir: &Path) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
    let index_path = dir.join(INDEX_FILE);
    if !index_path.exists() {
        return Ok(None);
    }
    let bin = fs::read(&index_path)?;
    let passages_path = dir.join(passages_file_name(header_digest(&bin)?));
    if !passages_path.exists() {
        return Err(RagError::Storage(format!(
            "corrupt index: {} is missing",
            passages_path.display()
        )));
    }
    let passages_json = fs::read(&passages_path)?;
    Ok(Some((bin, passages_json)))
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RagError::Storage(format!("index I/O task failed: {}", e)))?
}

#[async_trait]
impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    async fn add(&self, vectors: Vec<IndexedVector>) -> Result<()> {
        for v in &vectors {
            self.check_dimension(v.vector.len())?;
        }
        let added = vectors.len();
        let mut rows = self.write()?;
        rows.extend(vectors);
        tracing::debug!(added, total = rows.len(), "index add");
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        k: usize,
        scope: Option<&str>,
    ) -> Result<Vec<ScoredPassage>> {
        if k == 0 {
            return Err(RagError::InvalidConfig("k must be > 0".to_string()));
        }
        self.check_dimension(query.len())?;

        let rows = self.read()?;
        let mut hits: Vec<(usize, f32)> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| scope.map_or(true, |id| r.passage.source_doc_id == id))
            .map(|(i, r)| (i, self.metric.distance(query, &r.vector)))
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        hits.truncate(k);

        Ok(hits
            .into_iter()
            .map(|(i, score)| ScoredPassage {
                passage: rows[i].passage.clone(),
                score,
            })
            .collect())
    }

    async fn remove(&self, doc_id: &str) -> Result<usize> {
        let mut rows = self.write()?;
        let before = rows.len();
        rows.retain(|r| r.passage.source_doc_id != doc_id);
        let removed = before - rows.len();
        tracing::debug!(doc_id, removed, "index remove");
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }

    async fn document_counts(&self) -> Result<BTreeMap<String, usize>> {
        let rows = self.read()?;
        let mut counts = BTreeMap::new();
        for r in rows.iter() {
            *counts.entry(r.passage.source_doc_id.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn persist(&self) -> Result<()> {
        let _guard = self.persist_lock.lock().await;

        let (bin, passages_json, count) = {
            let rows = self.read()?;
            let (bin, passages_json) = self.encode(&rows)?;
            (bin, passages_json, rows.len())
        };

        let dir = self.dir.clone();
        run_blocking(move || commit_artifacts(&dir, &bin, &passages_json)).await?;

        tracing::info!(dir = %self.dir.display(), vectors = count, "index persisted");
        Ok(())
    }

    async fn restore(&self) -> Result<()> {
        let _guard = self.persist_lock.lock().await;
        let dir = self.dir.clone();
        let restored = match run_blocking(move || load_artifacts(&dir)).await? {
            Some((bin, passages_json)) => self.decode(&bin, &passages_json)?,
            None => Vec::new(),
        };

        let count = restored.len();
        *self.write()? = restored;
        tracing::info!(dir = %self.dir.display(), vectors = count, "index restored");
        Ok(())
    }
}
