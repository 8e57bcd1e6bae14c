//! UI rendering functions for the TUI.
//!
//! Stacks the documents input, question input, answer panel, status line
//! and shortcut bar vertically.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::app::{App, Focus, StatusLevel};
use crate::answerer::AnswerRecord;

/// Shown in place of a source list when retrieval returned nothing.
pub const NO_SOURCES: &str = "No sources returned.";

/// Main rendering function for the TUI.
pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Documents input
            Constraint::Length(3), // Question input
            Constraint::Min(0),    // Answer
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Shortcut bar
        ])
        .split(frame.area());

    let documents_title = match app.session().current() {
        Some(collection) => format!(
            "Documents (comma-separated) - active: {}",
            collection.collection_id
        ),
        None => "Documents (comma-separated)".to_string(),
    };

    render_input(
        frame,
        &documents_title,
        app.documents_input(),
        app.focus() == Focus::DocumentsInput,
        chunks[0],
    );
    render_input(
        frame,
        "Question",
        app.question_input(),
        app.focus() == Focus::QuestionInput,
        chunks[1],
    );
    render_answer(frame, app, chunks[2]);
    render_status(frame, app, chunks[3]);
    render_shortcut_bar(frame, app, chunks[4]);
}

fn border_style(is_focused: bool) -> Style {
    if is_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn render_input(frame: &mut Frame, title: &str, value: &str, is_focused: bool, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .border_style(border_style(is_focused));

    let mut content = value.to_string();
    if is_focused {
        content.push('█');
    }

    frame.render_widget(Paragraph::new(content).block(block), area);
}

/// Lines of the answer panel: the question, the answer and its sources.
pub fn answer_text(question: Option<&str>, record: &AnswerRecord) -> Text<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut text = Text::default();

    if let Some(question) = question {
        text.lines.push(Line::from(vec![
            Span::styled("Q: ", bold),
            Span::raw(question.to_string()),
        ]));
        text.lines.push(Line::from(""));
    }

    if record.has_answer() {
        for line in record.answer().lines() {
            text.lines.push(Line::from(line.to_string()));
        }
    } else {
        text.lines.push(Line::from(Span::styled(
            "(empty answer)",
            Style::default().fg(Color::DarkGray),
        )));
    }

    text.lines.push(Line::from(""));
    text.lines.push(Line::from(Span::styled("Sources:", bold)));
    if record.sources().is_empty() {
        text.lines.push(Line::from(NO_SOURCES));
    } else {
        for source in record.sources() {
            text.lines.push(Line::from(vec![
                Span::raw("  - "),
                Span::styled(source.clone(), Style::default().fg(Color::Cyan)),
            ]));
        }
    }

    text
}

fn render_answer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Answer")
        .border_style(border_style(app.focus() == Focus::AnswerView));

    let content = match app.answer() {
        Some(record) => answer_text(app.answered_question(), record),
        None => Text::from("Process documents, then ask a question."),
    };

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.answer_scroll(), 0));

    frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let Some(status) = app.status() else {
        return;
    };

    let style = match status.level {
        StatusLevel::Info => Style::default().fg(Color::Green),
        StatusLevel::Warning => Style::default().fg(Color::Yellow),
        StatusLevel::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    };

    frame.render_widget(
        Paragraph::new(Span::styled(status.message.clone(), style)),
        area,
    );
}

/// Shows keyboard shortcuts; the Enter action depends on focus.
fn render_shortcut_bar(frame: &mut Frame, app: &App, area: Rect) {
    let key_style = Style::default().fg(Color::Cyan);
    let sep_style = Style::default().fg(Color::DarkGray);

    let mut spans = vec![
        Span::styled("Ctrl+C", key_style),
        Span::raw(": quit"),
        Span::styled(" | ", sep_style),
        Span::styled("Tab", key_style),
        Span::raw(": next panel"),
        Span::styled(" | ", sep_style),
        Span::styled("Esc", key_style),
        Span::raw(": clear status"),
    ];

    let (key, action) = match app.focus() {
        Focus::DocumentsInput => ("Enter", ": process documents"),
        Focus::QuestionInput => ("Enter", ": ask"),
        Focus::AnswerView => ("j/k", ": scroll"),
    };
    spans.push(Span::styled(" | ", sep_style));
    spans.push(Span::styled(key, key_style));
    spans.push(Span::raw(action));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
