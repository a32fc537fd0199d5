//! Application wiring.
//!
//! [`App::open`] builds every collaborator once from the configuration and
//! injects them into a [`Pipeline`]. Commands and the HTTP server only ever
//! talk to the pipeline.

use std::sync::Arc;

use anyhow::{Context, Result};

use pdfqa_core::index::flat::FlatIndex;
use pdfqa_core::pipeline::Pipeline;
use pdfqa_core::tokenizer::TiktokenCounter;

use crate::config::Config;
use crate::sqlite_registry::SqliteRegistry;
use crate::{answer, db, embedding, migrate};

pub struct App {
    pub config: Config,
    pub pipeline: Pipeline,
}

impl App {
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(&config.db.path).await?;
        migrate::run_migrations(&pool).await?;
        let registry = Arc::new(SqliteRegistry::new(pool));

        let index = FlatIndex::open(
            config.embedding.dimension(),
            config.index.metric,
            config.index.dir.clone(),
        )
        .await
        .with_context(|| format!("Failed to load index from {}", config.index.dir.display()))?;

        let counter = TiktokenCounter::new(&config.chunking.encoding)?;
        let embedder = embedding::create_provider(&config.embedding)?;
        let generator = answer::create_generator(&config.answer)?;

        let pipeline = Pipeline::new(
            registry,
            Arc::new(index),
            Arc::new(counter),
            embedder,
            generator,
            config.chunking.params(),
        )?;

        tracing::debug!(
            db = %config.db.path.display(),
            index = %config.index.dir.display(),
            embedding = %config.embedding.provider,
            answer = %config.answer.provider,
            "app opened"
        );

        Ok(Self {
            config: config.clone(),
            pipeline,
        })
    }
}

/// Create the database schema and the index directory.
pub async fn init(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;
    migrate::run_migrations(&pool).await?;
    pool.close().await;

    std::fs::create_dir_all(&config.index.dir)
        .with_context(|| format!("Failed to create {}", config.index.dir.display()))?;
    Ok(())
}
