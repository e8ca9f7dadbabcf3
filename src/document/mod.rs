// ============================================
// PROMPTLY - Document Loading
// ============================================

mod pdf;

pub use pdf::PdfLoader;

use std::collections::HashMap;

/// A unit of text to index, one per PDF page
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: HashMap<String, String>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Zero-based page index, when the document came from a paged source
    pub fn page(&self) -> Option<usize> {
        self.metadata.get("page").and_then(|p| p.parse().ok())
    }
}
