//! "Fact Check" screen: search queries, sources, and segment citations.

use crossterm::event::{KeyCode, KeyModifiers};
use llmo_core::citation::Reconciliation;
use llmo_core::session::GroundingReport;
use llmo_core::{Action, SessionState};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::widgets::hint;

pub(crate) struct FactCheckScreen {
    scroll: u16,
}

impl FactCheckScreen {
    pub(crate) fn new() -> Self {
        Self { scroll: 0 }
    }

    pub(crate) fn sync(&mut self, _state: &SessionState) {
        self.scroll = 0;
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, state: &SessionState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        let Some(report) = state.grounding() else {
            let empty = Paragraph::new(
                "No fact check yet.\n\nPress 'f' here or on the Edit tab to back the \
                 article with Google Search results.",
            )
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Fact Check "));
            f.render_widget(empty, chunks[0]);
            f.render_widget(hint("f fact check"), chunks[1]);
            return;
        };

        let stale = state
            .article()
            .is_some_and(|a| a.version != report.article_version);
        let title = if stale {
            format!(" Fact Check (v{}, article has changed since) ", report.article_version)
        } else {
            format!(" Fact Check (v{}) ", report.article_version)
        };

        let body = Paragraph::new(report_lines(report))
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(body, chunks[0]);
        f.render_widget(hint("↑/↓ scroll · f run again"), chunks[1]);
    }

    pub(crate) fn handle_key(
        &mut self,
        code: KeyCode,
        _modifiers: KeyModifiers,
        _state: &SessionState,
    ) -> Option<Action> {
        match code {
            KeyCode::Up => {
                self.scroll = self.scroll.saturating_sub(1);
                None
            }
            KeyCode::Down => {
                self.scroll = self.scroll.saturating_add(1);
                None
            }
            KeyCode::Char('f') => Some(Action::ApplyGrounding),
            _ => None,
        }
    }
}

fn heading(text: &str) -> Line<'static> {
    Line::from(text.to_string()).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
}

fn report_lines(report: &GroundingReport) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let dim = Style::default().fg(Color::DarkGray);

    lines.push(heading("Search queries"));
    if report.response.search_queries.is_empty() {
        lines.push(Line::from("  (none)").style(dim));
    }
    for query in &report.response.search_queries {
        lines.push(Line::from(format!("  • {query}")));
    }
    lines.push(Line::from(""));

    lines.push(heading("Sources"));
    if report.response.source_chunks.is_empty() {
        lines.push(Line::from("  (none)").style(dim));
    }
    for (i, chunk) in report.response.source_chunks.iter().enumerate() {
        let title = chunk.title.as_deref().unwrap_or(llmo_core::citation::UNKNOWN_TITLE);
        let uri = chunk.uri.as_deref().unwrap_or(llmo_core::citation::UNKNOWN_URI);
        lines.push(Line::from(vec![
            Span::styled(format!("  [{i}] "), dim),
            Span::raw(title.to_string()),
            Span::styled(format!("  {uri}"), dim),
        ]));
    }
    lines.push(Line::from(""));

    lines.push(heading("Citations"));
    match &report.reconciliation {
        Reconciliation::NoEvidence => {
            lines.push(
                Line::from("  No grounding evidence was returned for this article.").style(dim),
            );
        }
        Reconciliation::Cited { segments, warnings } => {
            for segment in segments {
                lines.push(Line::from(format!("  “{}”", segment.segment_text.trim())));
                if segment.sources.is_empty() {
                    lines.push(Line::from("     (no sources)").style(dim));
                }
                for source in &segment.sources {
                    lines.push(Line::from(vec![
                        Span::styled("     → ", Style::default().fg(Color::Green)),
                        Span::raw(source.title.clone()),
                        Span::styled(format!("  {}", source.uri), dim),
                    ]));
                }
                lines.push(Line::from(""));
            }
            if !warnings.is_empty() {
                lines.push(heading("Warnings"));
                for w in warnings {
                    lines.push(
                        Line::from(format!("  ! {w}")).style(Style::default().fg(Color::Yellow)),
                    );
                }
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmo_core::reconcile;
    use llmo_shared::{GroundingResponse, GroundingSupport, SourceChunk};

    fn text(lines: &[Line]) -> String {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn report_lists_queries_sources_and_warnings() {
        let response = GroundingResponse {
            generated_text: "本文".into(),
            search_queries: vec!["東京 観光".into()],
            source_chunks: vec![SourceChunk {
                title: Some("jnto.go.jp".into()),
                uri: None,
            }],
            supports: vec![GroundingSupport {
                text_segment: "本文".into(),
                chunk_indices: vec![0, 2],
            }],
        };
        let report = GroundingReport {
            article_version: 2,
            reconciliation: reconcile(&response),
            response,
        };

        let rendered = text(&report_lines(&report));
        assert!(rendered.contains("• 東京 観光"));
        assert!(rendered.contains("[0] jnto.go.jp  #"));
        assert!(rendered.contains("→ jnto.go.jp"));
        assert!(rendered.contains("citation index 2 is out of range"));
    }

    #[test]
    fn no_evidence_is_explained() {
        let report = GroundingReport {
            article_version: 1,
            response: GroundingResponse::default(),
            reconciliation: Reconciliation::NoEvidence,
        };
        let rendered = text(&report_lines(&report));
        assert!(rendered.contains("No grounding evidence"));
        assert!(rendered.contains("(none)"));
    }
}
