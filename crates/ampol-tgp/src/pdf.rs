#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("Failed to extract PDF text: {0}")]
    Extract(#[from] pdf_extract::OutputError),
    #[error("PDF has no pages")]
    Empty,
}

pub fn first_page_text(bytes: &[u8]) -> Result<String, PdfError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)?;
    log::debug!("Extracted text from {} PDF page(s)", pages.len());
    pages.into_iter().next().ok_or(PdfError::Empty)
}
