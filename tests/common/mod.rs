//! Offline stand-ins for the document loader and the Ollama models.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use pdfrag::document::{DocumentLoader, LoadError, Passage};
use pdfrag::ollama::{Embedder, LanguageModel, OllamaError};

const DIMENSIONS: usize = 64;

/// Hashes lower-cased words into a fixed number of buckets.
pub struct BagOfWordsEmbedder;

impl Embedder for BagOfWordsEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, OllamaError> {
        let mut vector = vec![0.0; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
        {
            let bucket = word
                .bytes()
                .fold(0usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
            vector[bucket % DIMENSIONS] += 1.0;
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        "bag-of-words"
    }
}

/// Answers with the context it was given, so tests can see what was
/// retrieved.
#[derive(Default)]
pub struct EchoModel {
    pub prompts: Mutex<Vec<String>>,
}

impl EchoModel {
    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl LanguageModel for EchoModel {
    fn generate(&self, prompt: &str) -> Result<String, OllamaError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let context = prompt
            .split_once("make up an answer.\n\n")
            .and_then(|(_, rest)| rest.rsplit_once("\n\nQuestion:"))
            .map(|(context, _)| context.to_string())
            .unwrap_or_default();
        Ok(context)
    }
}

/// Serves fixed text per filename instead of parsing files.
pub struct CannedLoader {
    texts: HashMap<String, String>,
}

impl CannedLoader {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            texts: entries
                .iter()
                .map(|(name, text)| (name.to_string(), text.to_string()))
                .collect(),
        }
    }
}

impl DocumentLoader for CannedLoader {
    fn load(&self, path: &Path) -> Result<Vec<Passage>, LoadError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.texts
            .get(&name)
            .map(|text| vec![Passage::new(text.clone())])
            .ok_or_else(|| {
                LoadError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no canned text for {name}"),
                ))
            })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }
}

/// A one-page PDF whose content stream uses a font the page never declares.
pub fn pdf_without_resources() -> Vec<u8> {
    let content = "BT /F1 24 Tf 72 720 Td (Hello World) Tj ET";
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R >>".to_string(),
        format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
    ];

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::new();
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
