//! "Session" screen: raw JSON view of the current session state.

use crossterm::event::{KeyCode, KeyModifiers};
use llmo_core::{Action, SessionState};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::widgets::hint;

pub(crate) struct SessionScreen {
    scroll: u16,
}

impl SessionScreen {
    pub(crate) fn new() -> Self {
        Self { scroll: 0 }
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, state: &SessionState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        let json = serde_json::to_string_pretty(state)
            .unwrap_or_else(|e| format!("failed to serialize session: {e}"));
        let body = Paragraph::new(json).scroll((self.scroll, 0)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Session {} ", state.id())),
        );
        f.render_widget(body, chunks[0]);
        f.render_widget(hint("↑/↓ scroll · PgUp/PgDn page"), chunks[1]);
    }

    pub(crate) fn handle_key(
        &mut self,
        code: KeyCode,
        _modifiers: KeyModifiers,
        _state: &SessionState,
    ) -> Option<Action> {
        match code {
            KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(10),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
            _ => {}
        }
        None
    }
}
