//! Retrieval-augmented question answering over one stored collection.
//!
//! The question is embedded, the closest chunks are pulled from the
//! collection, and all of them are placed into a single prompt for the
//! language model. Sources are reported from the retrieved chunks, never
//! from the model output.

mod qa;
mod types;

pub use qa::{Answerer, PROMPT_TEMPLATE, build_prompt, collect_sources};
pub use types::AnswerRecord;
