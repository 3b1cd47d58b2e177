use crate::error::IngestError;
use lopdf::Document;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    /// Returns one entry per page in page order. Pages without a text layer
    /// come back with empty text rather than an error.
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = match document.extract_text(&[page_no]) {
                Ok(text) => text,
                Err(error) => {
                    warn!(path = %path.display(), page = page_no, %error, "page has no readable text");
                    String::new()
                }
            };

            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        Ok(pages)
    }
}

/// Concatenated text of every page. An empty string means the PDF parsed
/// but carries no text layer.
pub fn extract_text(path: &Path) -> Result<String, IngestError> {
    extract_text_with(&LopdfExtractor, path)
}

pub fn extract_text_with(extractor: &dyn PdfExtractor, path: &Path) -> Result<String, IngestError> {
    let pages = extractor.extract_pages(path)?;
    Ok(pages.into_iter().map(|page| page.text).collect::<String>())
}
