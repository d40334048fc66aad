//! Core TUI application state and event loop.

use std::io;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use llmo_core::{Action, Assistant, SessionState};
use llmo_provider::GeminiClient;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::screens::{ScreenId, Screens};
use crate::widgets::{Status, status_bar};

/// Application state.
pub(crate) struct App {
    /// Currently active screen tab.
    pub active_tab: usize,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Feedback shown in the bottom bar.
    pub status: Status,
    /// Whether help overlay is visible.
    pub show_help: bool,
    screens: Screens,
    session: SessionState,
    assistant: Assistant<GeminiClient>,
    runtime: Runtime,
}

impl App {
    pub(crate) fn new(assistant: Assistant<GeminiClient>, session: SessionState) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            active_tab: 0,
            should_quit: false,
            status: Status::info("Ready · press ? for help"),
            show_help: false,
            screens: Screens::new(&session),
            session,
            assistant,
            runtime,
        })
    }

    fn current_screen(&self) -> ScreenId {
        ScreenId::ALL[self.active_tab]
    }

    fn is_editing(&self) -> bool {
        self.screens.is_editing(self.current_screen())
    }

    fn switch_to(&mut self, idx: usize) {
        self.active_tab = idx % ScreenId::ALL.len();
        self.status = Status::info(self.current_screen().to_string());
    }

    /// Run one action to completion and fold the result into the app.
    ///
    /// Blocks until the provider answers; the caller draws a busy status first.
    fn apply(&mut self, action: Action) {
        let name = action.name();
        let grounded = matches!(action, Action::ApplyGrounding);

        let result = self
            .runtime
            .block_on(self.assistant.dispatch(&self.session, action));

        match result {
            Ok(next) => {
                self.session = next;
                self.screens.sync(&self.session, grounded);
                self.status = self.success_status(name);
                info!(action = name, "action applied");
            }
            Err(err) => {
                warn!(action = name, error = %err, "action failed");
                self.screens.sync(&self.session, false);
                self.status = Status::from_error(&err);
            }
        }
    }

    fn success_status(&self, action: &str) -> Status {
        let s = &self.session;
        match action {
            "generate_titles" => Status::info(format!(
                "{} title candidates · select one with Enter",
                s.titles().len()
            )),
            "select_title" => Status::info(format!(
                "Selected: {} · press 'a' to write the article",
                s.selected_title().unwrap_or_default()
            )),
            "generate_article" | "apply_rewrite" | "edit_article" => match s.article() {
                Some(a) => Status::info(format!(
                    "Article v{} ({} chars)",
                    a.version,
                    a.text.chars().count()
                )),
                None => Status::info("Done"),
            },
            "apply_grounding" => match s.grounding() {
                Some(r) if !r.reconciliation.warnings().is_empty() => Status::warning(format!(
                    "Fact check done with {} citation warning(s) · see Fact Check tab",
                    r.reconciliation.warnings().len()
                )),
                Some(r) if !r.reconciliation.has_evidence() => {
                    Status::warning("Fact check returned no evidence")
                }
                Some(r) => Status::info(format!(
                    "Fact check done · {} cited segment(s)",
                    r.reconciliation.segments().len()
                )),
                None => Status::info("Done"),
            },
            "remove_keyword" => Status::info(format!("{} keyword(s)", s.keywords().len())),
            _ => Status::info("Updated"),
        }
    }
}

fn busy_message(action: &Action) -> &'static str {
    match action {
        Action::GenerateTitles => "Generating title candidates...",
        Action::GenerateArticle => "Writing article...",
        Action::ApplyRewrite(_) => "Rewriting article...",
        Action::ApplyGrounding => "Fact checking with Google Search...",
        _ => "Working...",
    }
}

/// Entry point: sets up terminal, runs event loop, restores terminal.
pub(crate) fn run(app: App) -> Result<()> {
    // Setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    loop {
        terminal.draw(|f| draw(f, &app))?;

        // Poll for events with 100ms timeout for responsive UI
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(action) = handle_key(&mut app, key.code, key.modifiers) {
                        if action.calls_provider() {
                            app.status = Status::busy(busy_message(&action));
                            terminal.draw(|f| draw(f, &app))?;
                        }
                        app.apply(action);
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
    // Global keybindings (always active)
    match code {
        KeyCode::Char('q') | KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            return None;
        }
        KeyCode::Char('q') if !app.is_editing() => {
            app.should_quit = true;
            return None;
        }
        KeyCode::Char('?') if !app.is_editing() => {
            app.show_help = !app.show_help;
            return None;
        }
        KeyCode::Esc if app.show_help => {
            app.show_help = false;
            return None;
        }
        // Tab navigation with number keys
        KeyCode::Char(c @ '1'..='4') if !app.is_editing() => {
            app.switch_to((c as usize) - ('1' as usize));
            return None;
        }
        KeyCode::Tab if !app.is_editing() => {
            app.switch_to(app.active_tab + 1);
            return None;
        }
        KeyCode::BackTab if !app.is_editing() => {
            app.switch_to(app.active_tab + ScreenId::ALL.len() - 1);
            return None;
        }
        _ => {}
    }

    // If help is showing, consume any key to dismiss
    if app.show_help {
        app.show_help = false;
        return None;
    }

    // Delegate to current screen
    let id = app.current_screen();
    let action = app.screens.handle_key(id, code, modifiers, &app.session);
    if let Some(warning) = app.screens.take_warning() {
        app.status = Status::warning(warning);
    }
    action
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(1),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    // Tab bar
    let tab_titles: Vec<Line> = ScreenId::ALL
        .iter()
        .enumerate()
        .map(|(i, s)| Line::from(format!("{} {s}", i + 1)))
        .collect();

    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(" LLMO Writer "))
        .select(app.active_tab)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .divider(" │ ");

    f.render_widget(tabs, chunks[0]);

    // Content area, delegated to the screen
    app.screens
        .draw(app.current_screen(), f, chunks[1], &app.session);

    // Status bar
    f.render_widget(status_bar(&app.status), chunks[2]);

    // Help overlay
    if app.show_help {
        draw_help_overlay(f);
    }
}

fn draw_help_overlay(f: &mut Frame) {
    let area = centered_rect(60, 70, f.area());

    let help_text = vec![
        Line::from("Keybindings").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::from("  1-4          Switch to screen"),
        Line::from("  Tab/S-Tab    Next/previous screen"),
        Line::from("  ?            Toggle this help"),
        Line::from("  q / Ctrl-C   Quit"),
        Line::from(""),
        Line::from("Generate:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  Enter        Edit field / select title"),
        Line::from("  ↑/↓          Move between fields and titles"),
        Line::from("  ←/→, x       Pick and remove a keyword"),
        Line::from("  g / a        Generate titles / article"),
        Line::from(""),
        Line::from("Edit & Fact Check:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  Enter        Edit article or rewrite instruction"),
        Line::from("  Esc          Save article edits"),
        Line::from("  f            Fact check with Google Search"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help · press any key to close ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));

    // Clear background
    f.render_widget(ratatui::widgets::Clear, area);
    f.render_widget(help, area);
}

/// Create a centered rectangle with percentage width and height.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
