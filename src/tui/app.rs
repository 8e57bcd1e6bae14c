use crate::answerer::{AnswerRecord, Answerer};
use crate::error::Error;
use crate::indexer::Indexer;
use crate::session::Session;
use crate::utils::parse_paths;

/// Application state for the TUI.
///
/// Holds the two input buffers, the last answer, the status line and the
/// session that remembers the current collection.
#[derive(Debug, Clone)]
pub struct App {
    /// Comma-separated document paths; quoted entries may contain commas
    documents_input: String,
    question_input: String,
    focus: Focus,
    status: Option<Status>,
    answer: Option<AnswerRecord>,
    /// Question the current answer belongs to
    answered_question: Option<String>,
    answer_scroll: u16,
    session: Session,
}

/// Panel focus state for keyboard navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Document paths input; Enter processes the documents
    DocumentsInput,
    /// Question input; Enter asks the question
    QuestionInput,
    /// Answer panel; j/k scroll
    AnswerView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// One-line message shown under the panels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub level: StatusLevel,
    pub message: String,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Creates a new App with empty inputs and no active collection.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfrag::tui::{App, Focus};
    ///
    /// let app = App::new();
    /// assert_eq!(app.focus(), Focus::DocumentsInput);
    /// assert!(app.session().current().is_none());
    /// ```
    pub fn new() -> Self {
        Self {
            documents_input: String::new(),
            question_input: String::new(),
            focus: Focus::DocumentsInput,
            status: None,
            answer: None,
            answered_question: None,
            answer_scroll: 0,
            session: Session::new(),
        }
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn documents_input(&self) -> &str {
        &self.documents_input
    }

    pub fn question_input(&self) -> &str {
        &self.question_input
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn answer(&self) -> Option<&AnswerRecord> {
        self.answer.as_ref()
    }

    pub fn answered_question(&self) -> Option<&str> {
        self.answered_question.as_deref()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn answer_scroll(&self) -> u16 {
        self.answer_scroll
    }

    /// Cycles focus to the next panel in Tab order.
    ///
    /// Order: `DocumentsInput` -> `QuestionInput` -> `AnswerView` -> `DocumentsInput`
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfrag::tui::{App, Focus};
    ///
    /// let mut app = App::new();
    /// app.next_focus();
    /// assert_eq!(app.focus(), Focus::QuestionInput);
    ///
    /// app.next_focus();
    /// assert_eq!(app.focus(), Focus::AnswerView);
    ///
    /// app.next_focus();
    /// assert_eq!(app.focus(), Focus::DocumentsInput);
    /// ```
    pub fn next_focus(&mut self) {
        self.focus = match self.focus {
            Focus::DocumentsInput => Focus::QuestionInput,
            Focus::QuestionInput => Focus::AnswerView,
            Focus::AnswerView => Focus::DocumentsInput,
        };
    }

    /// Cycles focus to the previous panel in reverse Tab order.
    pub fn prev_focus(&mut self) {
        self.focus = match self.focus {
            Focus::DocumentsInput => Focus::AnswerView,
            Focus::QuestionInput => Focus::DocumentsInput,
            Focus::AnswerView => Focus::QuestionInput,
        };
    }

    /// Appends a character to the focused input. Ignored in the answer view.
    pub fn push_char(&mut self, c: char) {
        match self.focus {
            Focus::DocumentsInput => self.documents_input.push(c),
            Focus::QuestionInput => self.question_input.push(c),
            Focus::AnswerView => {}
        }
    }

    /// Removes the last character of the focused input.
    pub fn pop_char(&mut self) {
        match self.focus {
            Focus::DocumentsInput => {
                self.documents_input.pop();
            }
            Focus::QuestionInput => {
                self.question_input.pop();
            }
            Focus::AnswerView => {}
        }
    }

    pub fn set_status(&mut self, level: StatusLevel, message: impl Into<String>) {
        self.status = Some(Status {
            level,
            message: message.into(),
        });
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    pub fn scroll_answer_down(&mut self, amount: u16) {
        self.answer_scroll = self.answer_scroll.saturating_add(amount);
    }

    pub fn scroll_answer_up(&mut self, amount: u16) {
        self.answer_scroll = self.answer_scroll.saturating_sub(amount);
    }

    /// Runs "process documents" on the paths typed into the documents input.
    ///
    /// Success makes the new collection current and reports it in the status
    /// line; failure leaves the previous collection in place and shows the
    /// error.
    pub fn process_documents(&mut self, indexer: &Indexer) {
        let paths = parse_paths(&self.documents_input);
        let result = self
            .session
            .process(indexer, &paths)
            .map(|collection| collection.collection_id.clone());
        match result {
            Ok(collection_id) => {
                let message = format!(
                    "Processed {} document(s) into collection {collection_id}",
                    paths.len()
                );
                self.set_status(StatusLevel::Info, message);
            }
            Err(e) => self.report(&e),
        }
    }

    /// Runs "ask" with the question input against the current collection.
    pub fn ask_question(&mut self, answerer: &Answerer, k: usize) {
        match self.session.ask(answerer, &self.question_input, k) {
            Ok(record) => {
                self.answered_question = Some(self.question_input.trim().to_string());
                self.answer = Some(record);
                self.answer_scroll = 0;
                self.clear_status();
            }
            Err(e) => self.report(&e),
        }
    }

    fn report(&mut self, error: &Error) {
        let level = if error.is_user_error() {
            StatusLevel::Warning
        } else {
            StatusLevel::Error
        };
        let message = match error {
            Error::NoActiveCollection => "Please process documents first.".to_string(),
            other => other.to_string(),
        };
        self.set_status(level, message);
    }
}
