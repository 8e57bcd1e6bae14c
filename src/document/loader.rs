//! Document loaders turning files into passages.

use std::any::Any;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use super::types::Passage;

/// Files above this size are rejected before parsing: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Errors raised while reading or parsing a document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("file too large: {0} bytes")]
    FileTooLarge(u64),

    #[error("PDF error: {0}")]
    Pdf(String),
}

/// Loads a file into one or more passages.
///
/// Loaders leave passage metadata at its default; the indexer assigns the
/// source.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Vec<Passage>, LoadError>;

    /// Lower-case extensions, without the dot, this loader accepts.
    fn supported_extensions(&self) -> &[&str];
}

fn check_size(path: &Path, max_size: u64) -> Result<(), LoadError> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > max_size {
        return Err(LoadError::FileTooLarge(meta.len()));
    }
    Ok(())
}

/// Name of the worker thread PDF extraction runs on.
pub const PDF_EXTRACT_THREAD: &str = "pdf-extract";

/// Extracts the text layer of a PDF as a single passage.
///
/// Extraction runs on a worker thread; a panic inside `pdf-extract` (it
/// panics on some structurally valid files, e.g. pages without resources)
/// is reported as [`LoadError::Pdf`].
pub struct PdfLoader {
    pub max_file_size: u64,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> Result<Vec<Passage>, LoadError> {
        check_size(path, self.max_file_size)?;

        let owned = path.to_path_buf();
        let worker = std::thread::Builder::new()
            .name(PDF_EXTRACT_THREAD.to_string())
            .spawn(move || pdf_extract::extract_text(&owned).map_err(|e| e.to_string()))?;
        let text = match worker.join() {
            Ok(extracted) => extracted.map_err(LoadError::Pdf)?,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                warn!(path = %path.display(), %reason, "PDF extraction panicked");
                return Err(LoadError::Pdf(format!("unreadable PDF: {reason}")));
            }
        };
        debug!(path = %path.display(), chars = text.chars().count(), "extracted PDF text");

        Ok(vec![Passage::new(text)])
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "extraction panicked".to_string())
}

/// Reads plain-text and Markdown files verbatim.
pub struct TextLoader {
    pub max_file_size: u64,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for TextLoader {
    fn load(&self, path: &Path) -> Result<Vec<Passage>, LoadError> {
        check_size(path, self.max_file_size)?;
        let text = std::fs::read_to_string(path)?;
        Ok(vec![Passage::new(text)])
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt", "md", "markdown"]
    }
}

/// Dispatches to the first registered loader accepting the file extension.
pub struct FileLoader {
    loaders: Vec<Box<dyn DocumentLoader>>,
}

impl FileLoader {
    pub fn new(loaders: Vec<Box<dyn DocumentLoader>>) -> Self {
        Self { loaders }
    }

    fn loader_for(&self, path: &Path) -> Result<&dyn DocumentLoader, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        self.loaders
            .iter()
            .find(|loader| loader.supported_extensions().contains(&ext.as_str()))
            .map(|loader| &**loader)
            .ok_or_else(|| {
                if ext.is_empty() {
                    LoadError::UnsupportedFormat(path.display().to_string())
                } else {
                    LoadError::UnsupportedFormat(format!(".{ext}"))
                }
            })
    }
}

impl Default for FileLoader {
    fn default() -> Self {
        Self::new(vec![
            Box::new(PdfLoader::default()),
            Box::new(TextLoader::default()),
        ])
    }
}

impl DocumentLoader for FileLoader {
    fn load(&self, path: &Path) -> Result<Vec<Passage>, LoadError> {
        self.loader_for(path)?.load(path)
    }

    fn supported_extensions(&self) -> &[&str] {
        &[]
    }
}

/// Builds small single-page PDFs for tests.
#[cfg(test)]
pub(crate) mod fixtures {
    /// A page showing `text` in Helvetica.
    pub fn text_pdf(text: &str) -> Vec<u8> {
        single_page_pdf(
            Some("<< /Font << /F1 5 0 R >> >>"),
            &format!("BT /F1 24 Tf 72 720 Td ({text}) Tj ET"),
            &["<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>"],
        )
    }

    /// A page whose content uses a font it never declares.
    pub fn pdf_without_resources() -> Vec<u8> {
        single_page_pdf(None, "BT /F1 24 Tf 72 720 Td (Hello World) Tj ET", &[])
    }

    /// A page whose composite font has no descendant font.
    pub fn pdf_with_broken_font() -> Vec<u8> {
        single_page_pdf(
            Some("<< /Font << /F1 5 0 R >> >>"),
            "BT /F1 24 Tf 72 720 Td <0001> Tj ET",
            &["<< /Type /Font /Subtype /Type0 /BaseFont /Broken /Encoding /Identity-H >>"],
        )
    }

    /// Objects 1-4 are catalog, page tree, page and content stream; `extra`
    /// objects are numbered from 5.
    fn single_page_pdf(resources: Option<&str>, content: &str, extra: &[&str]) -> Vec<u8> {
        let resources = resources
            .map(|r| format!(" /Resources {r}"))
            .unwrap_or_default();
        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R{resources} >>"
            ),
            format!(
                "<< /Length {} >>\nstream\n{content}\nendstream",
                content.len()
            ),
        ];
        objects.extend(extra.iter().map(|o| o.to_string()));

        let mut pdf = String::from("%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.push_str(&format!("{} 0 obj\n{body}\nendobj\n", i + 1));
        }

        let xref_at = pdf.len();
        pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
        for offset in offsets {
            pdf.push_str(&format!("{offset:010} 00000 n \n"));
        }
        pdf.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        ));
        pdf.into_bytes()
    }
}
