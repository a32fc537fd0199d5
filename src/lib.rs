//! # pdfqa
//!
//! Ask natural-language questions about uploaded PDF documents.
//!
//! PDFs are converted to text, split into token-budgeted passages, embedded,
//! and stored in an exact vector index on disk. A question is embedded the
//! same way, the nearest passages are retrieved (optionally from one
//! document only), and a chat model answers from those passages.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────────────┐   ┌────────────┐
//! │  PDF     │──▶│ Pipeline (pdfqa-core)     │──▶│ SQLite     │
//! │ extract  │   │ chunk → register → embed  │   │ documents  │
//! └──────────┘   │        → index            │   ├────────────┤
//!                └─────────────┬─────────────┘   │ index.bin  │
//!                              │                 │ passages   │
//!                  ┌───────────┴──────┐          └────────────┘
//!                  ▼                  ▼
//!             ┌─────────┐        ┌─────────┐
//!             │   CLI   │        │  HTTP   │
//!             │ (pdfqa) │        │ (axum)  │
//!             └─────────┘        └─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pdfqa init                          # create database and index directory
//! pdfqa upload ./papers               # ingest every PDF under ./papers
//! pdfqa ask "What is the main result?" --show-sources
//! pdfqa serve                         # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`app`] | Wiring of registry, index, providers into a pipeline |
//! | [`sqlite_registry`] | SQLite document registry |
//! | [`embedding`] | OpenAI / Ollama embedding providers |
//! | [`answer`] | OpenAI / Ollama chat providers |
//! | [`extract`] | PDF text extraction |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod answer;
pub mod app;
pub mod ask;
pub mod config;
pub mod db;
pub mod documents;
pub mod embedding;
pub mod extract;
pub mod http;
pub mod migrate;
pub mod preview;
pub mod server;
pub mod sqlite_registry;
pub mod upload;
