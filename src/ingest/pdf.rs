use anyhow::{Context, Result};

/// In-process text extraction: file bytes in, one string per page out.
pub trait TextExtractor: Send + Sync {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>> {
        if bytes.is_empty() {
            anyhow::bail!("uploaded file is empty");
        }
        // Readers tolerate junk before the header as long as it appears early.
        let head = &bytes[..bytes.len().min(1024)];
        if !head.windows(4).any(|w| w == b"%PDF") {
            anyhow::bail!("file does not contain a PDF header");
        }

        pdf_extract::extract_text_from_mem_by_pages(bytes)
            .context("failed to extract text from PDF")
    }
}

/// Page texts joined in document order, each page terminated by a newline.
pub fn join_pages(pages: &[String]) -> String {
    let mut text = String::with_capacity(pages.iter().map(|p| p.len() + 1).sum());
    for page in pages {
        text.push_str(page);
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_newline_terminated_in_order() {
        let pages = vec!["first page".to_string(), "second page".to_string()];
        assert_eq!(join_pages(&pages), "first page\nsecond page\n");
    }

    #[test]
    fn no_pages_yield_empty_text() {
        assert_eq!(join_pages(&[]), "");
    }

    #[test]
    fn rejects_empty_and_non_pdf_input() {
        let err = PdfExtractor.extract_pages(b"").unwrap_err();
        assert!(err.to_string().contains("empty"));

        let err = PdfExtractor.extract_pages(b"hello, not a pdf").unwrap_err();
        assert!(err.to_string().contains("PDF header"));
    }
}
