//! Per-user session state shared by the interactive surfaces.

use std::path::Path;

use tracing::warn;

use crate::answerer::{AnswerRecord, Answerer};
use crate::error::Error;
use crate::indexer::Indexer;
use crate::store::CollectionRef;

/// Holds the collection produced by the last successful "process documents"
/// action, so later questions are asked against it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Session {
    current: Option<CollectionRef>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The collection questions are currently answered from, if any.
    pub fn current(&self) -> Option<&CollectionRef> {
        self.current.as_ref()
    }

    /// Indexes `paths` and makes the new collection current.
    ///
    /// On failure the previous collection, if any, stays current.
    pub fn process<P: AsRef<Path>>(
        &mut self,
        indexer: &Indexer,
        paths: &[P],
    ) -> Result<&CollectionRef, Error> {
        let collection = indexer.build_index(paths)?;
        Ok(&*self.current.insert(collection))
    }

    /// Asks `question` against the current collection.
    ///
    /// Fails with [`Error::NoActiveCollection`] without calling the answerer
    /// when nothing has been processed yet.
    pub fn ask(
        &self,
        answerer: &Answerer,
        question: &str,
        k: usize,
    ) -> Result<AnswerRecord, Error> {
        let Some(collection) = &self.current else {
            warn!("question asked before any documents were processed");
            return Err(Error::NoActiveCollection);
        };
        answerer.answer(question, collection, k)
    }

    /// Forgets the current collection. Stored data is not touched.
    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::tempdir;

    use super::*;
    use crate::ollama::{Embedder, LanguageModel, OllamaError};

    struct ConstantEmbedder;

    impl Embedder for ConstantEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, OllamaError> {
            Ok(vec![1.0, 1.0])
        }

        fn model_name(&self) -> &str {
            "constant"
        }
    }

    #[derive(Default)]
    struct CountingModel {
        calls: AtomicUsize,
    }

    impl LanguageModel for CountingModel {
        fn generate(&self, _prompt: &str) -> Result<String, OllamaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("answer".to_string())
        }
    }

    fn write(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("Contents of {name}.")).unwrap();
        path
    }

    #[test]
    fn ask_before_process_warns_without_answering() {
        let model = Arc::new(CountingModel::default());
        let answerer = Answerer::new(Arc::new(ConstantEmbedder), model.clone());
        let session = Session::new();

        let result = session.ask(&answerer, "What is the capital of France?", 4);
        assert!(matches!(result, Err(Error::NoActiveCollection)));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn process_sets_current_collection() {
        let dir = tempdir().unwrap();
        let doc = write(dir.path(), "A.txt");
        let indexer = Indexer::new(Arc::new(ConstantEmbedder), dir.path().join("store.db"));
        let mut session = Session::new();

        let collection = session.process(&indexer, &[doc]).unwrap().clone();
        assert_eq!(session.current(), Some(&collection));

        let model = Arc::new(CountingModel::default());
        let answerer = Answerer::new(Arc::new(ConstantEmbedder), model.clone());
        let record = session.ask(&answerer, "Anything?", 4).unwrap();
        assert_eq!(record.sources(), ["A.txt".to_string()]);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_process_keeps_previous_collection() {
        let dir = tempdir().unwrap();
        let doc = write(dir.path(), "A.txt");
        let indexer = Indexer::new(Arc::new(ConstantEmbedder), dir.path().join("store.db"));
        let mut session = Session::new();

        let first = session.process(&indexer, &[doc]).unwrap().clone();
        let result = session.process::<PathBuf>(&indexer, &[]);

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(session.current(), Some(&first));
    }

    #[test]
    fn processing_again_replaces_current_collection() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "A.txt");
        let b = write(dir.path(), "B.txt");
        let indexer = Indexer::new(Arc::new(ConstantEmbedder), dir.path().join("store.db"));
        let mut session = Session::new();

        let first = session.process(&indexer, &[a]).unwrap().clone();
        let second = session.process(&indexer, &[b]).unwrap().clone();

        assert_ne!(first.collection_id, second.collection_id);
        assert_eq!(session.current(), Some(&second));

        session.clear();
        assert!(session.current().is_none());
    }

    #[test]
    fn empty_question_with_collection_is_invalid_input() {
        let dir = tempdir().unwrap();
        let doc = write(dir.path(), "A.txt");
        let indexer = Indexer::new(Arc::new(ConstantEmbedder), dir.path().join("store.db"));
        let mut session = Session::new();
        session.process(&indexer, &[doc]).unwrap();

        let answerer = Answerer::new(
            Arc::new(ConstantEmbedder),
            Arc::new(CountingModel::default()),
        );
        assert!(matches!(
            session.ask(&answerer, "", 4),
            Err(Error::InvalidInput(_))
        ));
    }
}
