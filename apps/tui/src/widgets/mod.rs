//! Reusable TUI widgets.

use llmo_shared::{LlmoError, Severity};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// What the status bar is currently reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusKind {
    Info,
    Busy,
    Warning,
    Error,
}

/// One line of feedback for the bottom bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    pub(crate) fn info(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            message: message.into(),
        }
    }

    pub(crate) fn busy(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Busy,
            message: message.into(),
        }
    }

    pub(crate) fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Warning,
            message: message.into(),
        }
    }

    /// Input problems read as warnings; everything else as an error.
    pub(crate) fn from_error(err: &LlmoError) -> Self {
        let kind = match err.severity() {
            Severity::Warning => StatusKind::Warning,
            Severity::Error | Severity::Fatal => StatusKind::Error,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Bottom status bar.
pub(crate) fn status_bar(status: &Status) -> Paragraph<'_> {
    let (label, style) = match status.kind {
        StatusKind::Info => ("", Style::default().bg(Color::DarkGray).fg(Color::White)),
        StatusKind::Busy => ("⠿ ", Style::default().bg(Color::Blue).fg(Color::White)),
        StatusKind::Warning => ("warning: ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        StatusKind::Error => (
            "error: ",
            Style::default()
                .bg(Color::Red)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    };
    Paragraph::new(format!(" {label}{}", status.message)).style(style)
}

/// Bordered block whose border reflects focus and edit mode.
pub(crate) fn field_block(title: &str, focused: bool, editing: bool) -> Block<'_> {
    let style = if focused && editing {
        Style::default().fg(Color::Yellow)
    } else if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(style)
}

/// Dimmed, centered hint line.
pub(crate) fn hint(text: &str) -> Paragraph<'_> {
    Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_rejection_shows_reason_as_error() {
        let err = LlmoError::http(
            429,
            r#"{"error":{"code":429,"message":"Resource has been exhausted (e.g. check quota)."}}"#,
        );
        let status = Status::from_error(&err);
        assert_eq!(status.kind, StatusKind::Error);
        assert!(status.message.contains("Resource has been exhausted"));
        assert!(status.message.contains("HTTP 429"));
    }

    #[test]
    fn input_errors_read_as_warnings() {
        let status = Status::from_error(&LlmoError::invalid_input("add a keyword"));
        assert_eq!(status.kind, StatusKind::Warning);
    }
}
