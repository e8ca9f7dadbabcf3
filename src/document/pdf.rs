use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::Document;

/// Splits a PDF into one [`Document`] per page.
pub struct PdfLoader;

impl PdfLoader {
    pub fn load(path: &Path) -> Result<Vec<Document>> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read PDF {}", path.display()))?;
        Self::load_bytes(&bytes, &path.display().to_string())
    }

    pub fn load_bytes(bytes: &[u8], source: &str) -> Result<Vec<Document>> {
        let pdf = lopdf::Document::load_mem(bytes)
            .with_context(|| format!("Failed to parse PDF {}", source))?;
        Ok(Self::split_pages(&pdf, source))
    }

    fn split_pages(pdf: &lopdf::Document, source: &str) -> Vec<Document> {
        let pages = pdf.get_pages();
        tracing::debug!("{}: {} pages", source, pages.len());

        let texts = pages.keys().map(|&number| {
            let text = pdf.extract_text(&[number]).unwrap_or_else(|e| {
                tracing::warn!("Could not extract text from page {} of {}: {}", number, source, e);
                String::new()
            });
            (number, text)
        });

        into_documents(source, texts)
    }
}

/// Page numbers arrive one-based; documents carry the zero-based index.
/// Blank pages are dropped.
fn into_documents(source: &str, pages: impl IntoIterator<Item = (u32, String)>) -> Vec<Document> {
    pages
        .into_iter()
        .filter_map(|(number, text)| {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let index = number.saturating_sub(1);
            Some(
                Document::new(format!("page-{}", index), text)
                    .with_metadata("page", index.to_string())
                    .with_metadata("source", source),
            )
        })
        .collect()
}
