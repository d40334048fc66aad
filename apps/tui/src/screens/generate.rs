//! "Generate" screen: keywords, optional fields, length, and title candidates.

use crossterm::event::{KeyCode, KeyModifiers};
use llmo_core::{Action, OptionalField, SessionState};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, Paragraph, Wrap};

use crate::widgets::{field_block, hint};

/// Which input field is focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Keyword,
    Summary,
    Style,
    Length,
    Titles,
}

impl Field {
    fn next(self) -> Self {
        match self {
            Self::Keyword => Self::Summary,
            Self::Summary => Self::Style,
            Self::Style => Self::Length,
            Self::Length => Self::Titles,
            Self::Titles => Self::Keyword,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Keyword => Self::Titles,
            Self::Summary => Self::Keyword,
            Self::Style => Self::Summary,
            Self::Length => Self::Style,
            Self::Titles => Self::Length,
        }
    }
}

pub(crate) struct GenerateScreen {
    keyword: String,
    summary: String,
    style: String,
    length: String,
    focused: Field,
    editing: bool,
    /// Highlighted keyword chip, for removal.
    keyword_cursor: usize,
    /// Highlighted title candidate.
    title_cursor: usize,
    /// Local input problem for the status bar, taken by the app.
    warning: Option<String>,
}

impl GenerateScreen {
    pub(crate) fn new(state: &SessionState) -> Self {
        Self {
            keyword: String::new(),
            summary: String::new(),
            style: String::new(),
            length: state.target_length().to_string(),
            focused: Field::Keyword,
            editing: false,
            keyword_cursor: 0,
            title_cursor: 0,
            warning: None,
        }
    }

    pub(crate) fn take_warning(&mut self) -> Option<String> {
        self.warning.take()
    }

    #[cfg(test)]
    pub(crate) fn length_buffer(&self) -> &str {
        &self.length
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    /// Re-align cursors and buffers after the session changed.
    pub(crate) fn sync(&mut self, state: &SessionState) {
        let keywords = state.keywords().len();
        self.keyword_cursor = self.keyword_cursor.min(keywords.saturating_sub(1));
        let titles = state.titles().len();
        self.title_cursor = self.title_cursor.min(titles.saturating_sub(1));
        if !(self.editing && self.focused == Field::Length) {
            self.length = state.target_length().to_string();
        }
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, state: &SessionState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(4), // Keywords
                Constraint::Length(3), // Summary
                Constraint::Length(3), // Style
                Constraint::Length(3), // Length
                Constraint::Min(3),    // Titles
                Constraint::Length(1), // Hint
            ])
            .split(area);

        // Keywords: chips on the first line, input on the second
        let chips: Vec<Span> = state
            .keywords()
            .iter()
            .enumerate()
            .flat_map(|(i, kw)| {
                let highlighted =
                    self.focused == Field::Keyword && !self.editing && i == self.keyword_cursor;
                let style = if highlighted {
                    Style::default().fg(Color::Black).bg(Color::Cyan)
                } else {
                    Style::default().fg(Color::Cyan)
                };
                [Span::styled(format!("[{kw}]"), style), Span::raw(" ")]
            })
            .collect();
        let keyword_text = vec![
            Line::from(chips),
            Line::from(format!("+ {}", self.keyword)),
        ];
        let keywords = Paragraph::new(keyword_text).block(field_block(
            " Keywords ",
            self.focused == Field::Keyword,
            self.editing,
        ));
        f.render_widget(keywords, chunks[0]);

        let summary = Paragraph::new(self.summary.as_str()).block(field_block(
            " Summary (optional) ",
            self.focused == Field::Summary,
            self.editing,
        ));
        f.render_widget(summary, chunks[1]);

        let style = Paragraph::new(self.style.as_str()).block(field_block(
            " Style (optional) ",
            self.focused == Field::Style,
            self.editing,
        ));
        f.render_widget(style, chunks[2]);

        let length = Paragraph::new(format!("{} characters", self.length)).block(field_block(
            " Target length ",
            self.focused == Field::Length,
            self.editing,
        ));
        f.render_widget(length, chunks[3]);

        let title_block = field_block(" Title candidates ", self.focused == Field::Titles, false);
        if state.titles().is_empty() {
            let empty = Paragraph::new("No titles yet. Add keywords and press 'g'.")
                .wrap(Wrap { trim: false })
                .block(title_block);
            f.render_widget(empty, chunks[4]);
        } else {
            let items: Vec<ListItem> = state
                .titles()
                .iter()
                .enumerate()
                .map(|(i, title)| {
                    let chosen = state.selected_title() == Some(title.as_str());
                    let mark = if chosen { "●" } else { "○" };
                    let prefix = if self.focused == Field::Titles && i == self.title_cursor {
                        "▸ "
                    } else {
                        "  "
                    };
                    let style = if chosen {
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    };
                    ListItem::new(format!("{prefix}{mark} {}. {title}", i + 1)).style(style)
                })
                .collect();
            f.render_widget(List::new(items).block(title_block), chunks[4]);
        }

        let text = if self.editing {
            "Type to edit · Enter to confirm · Esc to stop editing"
        } else {
            "Enter edit/select · ↑/↓ move · ←/→ + x remove keyword · g titles · a article"
        };
        f.render_widget(hint(text), chunks[5]);
    }

    pub(crate) fn handle_key(
        &mut self,
        code: KeyCode,
        _modifiers: KeyModifiers,
        state: &SessionState,
    ) -> Option<Action> {
        if self.editing {
            return self.handle_edit_key(code, state);
        }

        match code {
            KeyCode::Enter => match self.focused {
                Field::Titles => state
                    .titles()
                    .get(self.title_cursor)
                    .map(|t| Action::SelectTitle(t.clone())),
                _ => {
                    self.editing = true;
                    None
                }
            },
            KeyCode::Up if self.focused == Field::Titles && self.title_cursor > 0 => {
                self.title_cursor -= 1;
                None
            }
            KeyCode::Down
                if self.focused == Field::Titles && self.title_cursor + 1 < state.titles().len() =>
            {
                self.title_cursor += 1;
                None
            }
            KeyCode::Up => {
                self.focused = self.focused.prev();
                None
            }
            KeyCode::Down => {
                self.focused = self.focused.next();
                None
            }
            KeyCode::Left if self.focused == Field::Keyword => {
                self.keyword_cursor = self.keyword_cursor.saturating_sub(1);
                None
            }
            KeyCode::Right if self.focused == Field::Keyword => {
                if self.keyword_cursor + 1 < state.keywords().len() {
                    self.keyword_cursor += 1;
                }
                None
            }
            KeyCode::Char('x') | KeyCode::Delete if self.focused == Field::Keyword => {
                Some(Action::RemoveKeyword(self.keyword_cursor))
            }
            KeyCode::Char('g') => Some(Action::GenerateTitles),
            KeyCode::Char('a') => Some(Action::GenerateArticle),
            _ => None,
        }
    }

    fn handle_edit_key(&mut self, code: KeyCode, state: &SessionState) -> Option<Action> {
        match code {
            KeyCode::Esc | KeyCode::Enter => {
                self.editing = false;
                self.commit(state)
            }
            KeyCode::Backspace => {
                if let Some(field) = self.current_field_mut() {
                    field.pop();
                }
                None
            }
            KeyCode::Char(c) if self.focused == Field::Length && !c.is_ascii_digit() => None,
            KeyCode::Char(c) => {
                if let Some(field) = self.current_field_mut() {
                    field.push(c);
                }
                None
            }
            _ => None,
        }
    }

    /// Turn the just-edited buffer into an action.
    fn commit(&mut self, state: &SessionState) -> Option<Action> {
        match self.focused {
            Field::Keyword => {
                let keyword = std::mem::take(&mut self.keyword);
                (!keyword.trim().is_empty()).then_some(Action::AddKeyword(keyword))
            }
            Field::Summary => Some(Action::SetOptionalField(
                OptionalField::Summary,
                self.summary.clone(),
            )),
            Field::Style => Some(Action::SetOptionalField(
                OptionalField::Style,
                self.style.clone(),
            )),
            Field::Length => match self.length.parse() {
                Ok(length) => Some(Action::SetTargetLength(length)),
                Err(_) => {
                    self.warning = Some(format!(
                        "target length must be a whole number from 1 to {}",
                        u32::MAX
                    ));
                    self.length = state.target_length().to_string();
                    None
                }
            },
            Field::Titles => None,
        }
    }

    fn current_field_mut(&mut self) -> Option<&mut String> {
        match self.focused {
            Field::Keyword => Some(&mut self.keyword),
            Field::Summary => Some(&mut self.summary),
            Field::Style => Some(&mut self.style),
            Field::Length => Some(&mut self.length),
            Field::Titles => None,
        }
    }
}
