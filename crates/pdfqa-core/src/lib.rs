//! # pdfqa core
//!
//! Retrieval-augmented question answering over uploaded documents: token
//! counting, chunking, a content-addressed document registry, an exact
//! vector index with file persistence, and the orchestrator that ties them
//! to an embedding provider and an answer generator.
//!
//! This crate has no HTTP client or database driver. Those live in the
//! `pdfqa` app crate, which implements the provider and registry traits
//! defined here. The flat index expects to run inside a tokio runtime: its
//! file I/O goes through `spawn_blocking`.

pub mod answer;
pub mod chunk;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod tokenizer;

pub use error::{RagError, Result};
