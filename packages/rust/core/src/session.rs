//! Interactive session state.
//!
//! One [`SessionState`] value holds everything a writing session has produced
//! so far. It lives only as long as the front end's loop; nothing is saved.
//! All mutators are synchronous and either apply fully or return an error
//! without touching the state.

use serde::Serialize;

use llmo_shared::{Article, GroundingResponse, KeywordSet, LlmoError, Result, SessionId};

use crate::citation::Reconciliation;

/// Default target article length in characters.
pub const DEFAULT_TARGET_LENGTH: u32 = 400;

/// Free-text fields that feed optional prompt sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalField {
    Summary,
    Style,
}

impl std::fmt::Display for OptionalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Summary => write!(f, "summary"),
            Self::Style => write!(f, "style"),
        }
    }
}

/// The latest grounding pass and its reconciled citations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroundingReport {
    /// Article version produced by this grounding pass.
    pub article_version: u32,
    pub response: GroundingResponse,
    pub reconciliation: Reconciliation,
}

/// Everything one writing session has produced so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    id: SessionId,
    keywords: KeywordSet,
    titles: Vec<String>,
    selected_title: Option<String>,
    article: Option<Article>,
    summary: String,
    style: String,
    target_length: u32,
    grounding: Option<GroundingReport>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_LENGTH)
    }
}

impl SessionState {
    /// Empty session with the given default article length.
    pub fn new(target_length: u32) -> Self {
        Self {
            id: SessionId::new(),
            keywords: KeywordSet::new(),
            titles: Vec::new(),
            selected_title: None,
            article: None,
            summary: String::new(),
            style: String::new(),
            target_length: target_length.max(1),
            grounding: None,
        }
    }

    // --- accessors --------------------------------------------------------

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn selected_title(&self) -> Option<&str> {
        self.selected_title.as_deref()
    }

    pub fn article(&self) -> Option<&Article> {
        self.article.as_ref()
    }

    /// Summary text, or `None` when blank.
    pub fn summary(&self) -> Option<&str> {
        Some(self.summary.as_str()).filter(|s| !s.is_empty())
    }

    /// Style text, or `None` when blank.
    pub fn style(&self) -> Option<&str> {
        Some(self.style.as_str()).filter(|s| !s.is_empty())
    }

    pub fn target_length(&self) -> u32 {
        self.target_length
    }

    pub fn grounding(&self) -> Option<&GroundingReport> {
        self.grounding.as_ref()
    }

    // --- mutators ---------------------------------------------------------

    pub fn add_keyword(&mut self, keyword: &str) -> Result<()> {
        self.keywords.add(keyword)
    }

    /// Remove the keyword at `index`. No-op when only one keyword is left.
    pub fn remove_keyword(&mut self, index: usize) -> bool {
        self.keywords.remove(index)
    }

    /// Replace the candidate list. A selection no longer in the list is cleared.
    pub fn set_titles(&mut self, titles: Vec<String>) {
        if let Some(selected) = &self.selected_title {
            if !titles.contains(selected) {
                self.selected_title = None;
            }
        }
        self.titles = titles;
    }

    pub fn select_title(&mut self, title: &str) -> Result<()> {
        if !self.titles.iter().any(|t| t == title) {
            return Err(LlmoError::InvalidSelection {
                title: title.to_string(),
            });
        }
        self.selected_title = Some(title.to_string());
        Ok(())
    }

    /// Replace the article text, bumping the version. Returns the new version.
    pub fn set_article(&mut self, text: impl Into<String>) -> u32 {
        let next = match &self.article {
            Some(current) => current.replaced(text),
            None => Article::new(text),
        };
        let version = next.version;
        self.article = Some(next);
        version
    }

    /// Set the summary or style field. Whitespace-only input clears it.
    pub fn append_optional_field(&mut self, field: OptionalField, value: &str) {
        let value = value.trim().to_string();
        match field {
            OptionalField::Summary => self.summary = value,
            OptionalField::Style => self.style = value,
        }
    }

    pub fn set_target_length(&mut self, length: u32) -> Result<()> {
        if length == 0 {
            return Err(LlmoError::invalid_input("target length must be greater than 0"));
        }
        self.target_length = length;
        Ok(())
    }

    pub fn record_grounding(&mut self, report: GroundingReport) {
        self.grounding = Some(report);
    }
}
