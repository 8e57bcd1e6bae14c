//! Types returned by the answerer.

/// A generated answer and the documents it was drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    /// Text produced by the language model, possibly empty.
    answer: String,
    /// Source filenames of the retrieved chunks, first-seen order, no
    /// duplicates.
    sources: Vec<String>,
}

impl AnswerRecord {
    pub fn new(answer: String, sources: Vec<String>) -> Self {
        Self { answer, sources }
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Returns true if the model produced any non-whitespace text.
    pub fn has_answer(&self) -> bool {
        !self.answer.trim().is_empty()
    }

    pub fn into_parts(self) -> (String, Vec<String>) {
        (self.answer, self.sources)
    }
}
