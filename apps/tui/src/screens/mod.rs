//! TUI screen definitions.
//!
//! Each screen corresponds to a tab. Screens own only their input buffers
//! and cursors; session data is passed in for drawing, and key handling
//! returns the [`Action`] (if any) the app should dispatch.

mod edit;
mod fact_check;
mod generate;
mod session;

use std::fmt;

use crossterm::event::{KeyCode, KeyModifiers};
use llmo_core::{Action, SessionState};
use ratatui::prelude::*;

/// Screen identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScreenId {
    Generate,
    Edit,
    FactCheck,
    Session,
}

impl ScreenId {
    pub(crate) const ALL: [ScreenId; 4] = [
        Self::Generate,
        Self::Edit,
        Self::FactCheck,
        Self::Session,
    ];
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate => write!(f, "Generate"),
            Self::Edit => write!(f, "Edit"),
            Self::FactCheck => write!(f, "Fact Check"),
            Self::Session => write!(f, "Session"),
        }
    }
}

/// State for every screen.
pub(crate) struct Screens {
    generate: generate::GenerateScreen,
    edit: edit::EditScreen,
    fact_check: fact_check::FactCheckScreen,
    session: session::SessionScreen,
}

impl Screens {
    pub(crate) fn new(state: &SessionState) -> Self {
        Self {
            generate: generate::GenerateScreen::new(state),
            edit: edit::EditScreen::new(),
            fact_check: fact_check::FactCheckScreen::new(),
            session: session::SessionScreen::new(),
        }
    }

    /// Whether the given screen has an active text input field.
    pub(crate) fn is_editing(&self, id: ScreenId) -> bool {
        match id {
            ScreenId::Generate => self.generate.is_editing(),
            ScreenId::Edit => self.edit.is_editing(),
            ScreenId::FactCheck | ScreenId::Session => false,
        }
    }

    /// Input warning raised by a screen without dispatching anything.
    pub(crate) fn take_warning(&mut self) -> Option<String> {
        self.generate.take_warning()
    }

    #[cfg(test)]
    pub(crate) fn length_buffer(&self) -> &str {
        self.generate.length_buffer()
    }

    /// Let screens refresh buffers from the session after a dispatch.
    pub(crate) fn sync(&mut self, state: &SessionState, grounded: bool) {
        self.generate.sync(state);
        self.edit.sync(state);
        if grounded {
            self.fact_check.sync(state);
        }
    }

    pub(crate) fn draw(&self, id: ScreenId, f: &mut Frame, area: Rect, state: &SessionState) {
        match id {
            ScreenId::Generate => self.generate.draw(f, area, state),
            ScreenId::Edit => self.edit.draw(f, area, state),
            ScreenId::FactCheck => self.fact_check.draw(f, area, state),
            ScreenId::Session => self.session.draw(f, area, state),
        }
    }

    pub(crate) fn handle_key(
        &mut self,
        id: ScreenId,
        code: KeyCode,
        modifiers: KeyModifiers,
        state: &SessionState,
    ) -> Option<Action> {
        match id {
            ScreenId::Generate => self.generate.handle_key(code, modifiers, state),
            ScreenId::Edit => self.edit.handle_key(code, modifiers, state),
            ScreenId::FactCheck => self.fact_check.handle_key(code, modifiers, state),
            ScreenId::Session => self.session.handle_key(code, modifiers, state),
        }
    }
}
