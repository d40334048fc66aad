//! "Edit" screen: article editor, rewrite instruction, grounding trigger.

use crossterm::event::{KeyCode, KeyModifiers};
use llmo_core::{Action, SessionState};
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Wrap};

use crate::widgets::{field_block, hint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Article,
    Instruction,
}

pub(crate) struct EditScreen {
    /// Editable copy of the article text.
    buffer: String,
    /// Article version the buffer was loaded from.
    loaded_version: Option<u32>,
    instruction: String,
    focused: Field,
    editing: bool,
    scroll: u16,
}

impl EditScreen {
    pub(crate) fn new() -> Self {
        Self {
            buffer: String::new(),
            loaded_version: None,
            instruction: String::new(),
            focused: Field::Article,
            editing: false,
            scroll: 0,
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    /// Reload the buffer when a newer article version arrives.
    pub(crate) fn sync(&mut self, state: &SessionState) {
        let Some(article) = state.article() else {
            return;
        };
        if self.loaded_version != Some(article.version) {
            self.buffer = article.text.clone();
            self.loaded_version = Some(article.version);
            self.scroll = 0;
            if self.focused == Field::Article {
                self.editing = false;
            }
        }
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, state: &SessionState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Min(5),    // Article
                Constraint::Length(3), // Instruction
                Constraint::Length(1), // Hint
            ])
            .split(area);

        let title = match (state.selected_title(), state.article()) {
            (_, None) => " Article ".to_string(),
            (Some(t), Some(a)) => format!(" {t} (v{}) ", a.version),
            (None, Some(a)) => format!(" Article (v{}) ", a.version),
        };

        let body = if state.article().is_none() && self.buffer.is_empty() {
            "No article yet. Pick a title on the Generate tab and press 'a'.".to_string()
        } else if self.editing && self.focused == Field::Article {
            format!("{}▏", self.buffer)
        } else {
            self.buffer.clone()
        };
        let article = Paragraph::new(body)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .block(field_block(&title, self.focused == Field::Article, self.editing));
        f.render_widget(article, chunks[0]);

        let instruction = Paragraph::new(self.instruction.as_str()).block(field_block(
            " Rewrite instruction ",
            self.focused == Field::Instruction,
            self.editing,
        ));
        f.render_widget(instruction, chunks[1]);

        let text = match (self.editing, self.focused) {
            (true, Field::Article) => "Type to edit · Enter newline · Esc to save edits",
            (true, Field::Instruction) => "Type instruction · Enter to rewrite · Esc to cancel",
            (false, _) => "Enter edit · ↑/↓ fields · PgUp/PgDn scroll · f fact check",
        };
        f.render_widget(hint(text), chunks[2]);
    }

    pub(crate) fn handle_key(
        &mut self,
        code: KeyCode,
        _modifiers: KeyModifiers,
        state: &SessionState,
    ) -> Option<Action> {
        if self.editing {
            return match self.focused {
                Field::Article => self.handle_article_key(code, state),
                Field::Instruction => self.handle_instruction_key(code),
            };
        }

        match code {
            KeyCode::Enter => {
                self.editing = true;
                None
            }
            KeyCode::Up | KeyCode::Down => {
                self.focused = match self.focused {
                    Field::Article => Field::Instruction,
                    Field::Instruction => Field::Article,
                };
                None
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(5);
                None
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_add(5);
                None
            }
            KeyCode::Char('f') => Some(Action::ApplyGrounding),
            _ => None,
        }
    }

    fn handle_article_key(&mut self, code: KeyCode, state: &SessionState) -> Option<Action> {
        match code {
            KeyCode::Esc => {
                self.editing = false;
                let changed = state.article().is_some_and(|a| a.text != self.buffer);
                changed.then(|| Action::EditArticle(self.buffer.clone()))
            }
            KeyCode::Enter => {
                self.buffer.push('\n');
                None
            }
            KeyCode::Backspace => {
                self.buffer.pop();
                None
            }
            KeyCode::Char(c) => {
                self.buffer.push(c);
                None
            }
            _ => None,
        }
    }

    fn handle_instruction_key(&mut self, code: KeyCode) -> Option<Action> {
        match code {
            KeyCode::Esc => {
                self.editing = false;
                None
            }
            KeyCode::Enter => {
                self.editing = false;
                Some(Action::ApplyRewrite(self.instruction.clone()))
            }
            KeyCode::Backspace => {
                self.instruction.pop();
                None
            }
            KeyCode::Char(c) => {
                self.instruction.push(c);
                None
            }
            _ => None,
        }
    }
}
