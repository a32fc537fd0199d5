//! `pdfqa upload`: extract and ingest PDF files.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use walkdir::WalkDir;

use crate::app::App;
use crate::config::Config;
use crate::extract::extract_pdf_file;

/// Expand `paths` into PDF files. Directories are walked recursively;
/// explicit file arguments are kept whatever their extension.
pub fn collect_pdfs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| is_pdf(p))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

pub async fn run_upload(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let files = collect_pdfs(paths);
    if files.is_empty() {
        bail!("No PDF files found");
    }

    let app = App::open(config).await?;
    let mut failed = 0usize;

    for file in &files {
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.display().to_string());

        let result = match extract_pdf_file(file).await {
            Ok(pages) => app.pipeline.ingest_pages(&filename, &pages).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(outcome) if outcome.is_new => {
                println!(
                    "added      {}  {} ({} chunks)",
                    outcome.doc_id,
                    file.display(),
                    outcome.chunk_count
                );
            }
            Ok(outcome) => {
                println!(
                    "duplicate  {}  {} (already indexed)",
                    outcome.doc_id,
                    file.display()
                );
            }
            Err(e) => {
                failed += 1;
                eprintln!("failed     {}: {}", file.display(), e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} file(s) failed to upload", failed, files.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_pdfs_walks_directories() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(tmp.path().join("top.pdf"), b"x").unwrap();
        std::fs::write(nested.join("deep.PDF"), b"x").unwrap();
        std::fs::write(nested.join("notes.txt"), b"x").unwrap();

        let found = collect_pdfs(&[tmp.path().to_path_buf()]);
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"top.pdf".to_string()));
        assert!(names.contains(&"deep.PDF".to_string()));
    }

    #[test]
    fn test_collect_pdfs_keeps_explicit_files() {
        let explicit = PathBuf::from("scan.bin");
        assert_eq!(collect_pdfs(&[explicit.clone()]), vec![explicit]);
    }
}
