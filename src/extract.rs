//! PDF text extraction.
//!
//! Extraction runs before hashing, so the document identity is a function
//! of the text `pdf-extract` produces for a file.

use std::path::Path;

use pdfqa_core::RagError;

/// `%PDF` file signature.
const PDF_MAGIC: &[u8] = b"%PDF";

/// Extract the text of each page. Pages with no text are dropped.
pub fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, RagError> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(RagError::Extraction("not a PDF file".to_string()));
    }
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| RagError::Extraction(e.to_string()))?;
    Ok(pages
        .into_iter()
        .filter(|page| !page.trim().is_empty())
        .collect())
}

/// Run [`extract_pdf_pages`] on a blocking thread.
///
/// `pdf-extract` is CPU bound and can panic on malformed input; both are
/// contained here and a panic is reported as an extraction error.
pub async fn extract_pdf_pages_blocking(bytes: Vec<u8>) -> Result<Vec<String>, RagError> {
    tokio::task::spawn_blocking(move || extract_pdf_pages(&bytes))
        .await
        .map_err(|e| RagError::Extraction(format!("PDF parser crashed: {}", e)))?
}

/// Read and extract a PDF from disk.
pub async fn extract_pdf_file(path: &Path) -> Result<Vec<String>, RagError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| RagError::Extraction(format!("{}: {}", path.display(), e)))?;
    extract_pdf_pages_blocking(bytes).await
}
