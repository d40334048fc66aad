//! Core domain types for an LLMO writing session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LlmoError, Result};

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one interactive session in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new time-sortable session identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// KeywordSet
// ---------------------------------------------------------------------------

/// Ordered keywords fed into the title prompt. Duplicates are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordSet(Vec<String>);

impl KeywordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a keyword. Blank input is rejected; stored trimmed.
    pub fn add(&mut self, keyword: &str) -> Result<()> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(LlmoError::invalid_input("keyword must not be empty"));
        }
        self.0.push(keyword.to_string());
        Ok(())
    }

    /// Remove the keyword at `index`.
    ///
    /// Never removes the last remaining keyword. Returns whether anything was removed.
    pub fn remove(&mut self, index: usize) -> bool {
        if self.0.len() <= 1 || index >= self.0.len() {
            return false;
        }
        self.0.remove(index);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Keywords joined for prompt text.
    pub fn joined(&self, separator: &str) -> String {
        self.0.join(separator)
    }
}

impl TryFrom<Vec<String>> for KeywordSet {
    type Error = LlmoError;

    fn try_from(keywords: Vec<String>) -> Result<Self> {
        let mut set = Self::new();
        for keyword in &keywords {
            set.add(keyword)?;
        }
        Ok(set)
    }
}

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// The current article. Each replacement bumps `version`; older text is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub text: String,
    pub version: u32,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// First version of a freshly generated article.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            version: 1,
            updated_at: Utc::now(),
        }
    }

    /// Produce the next version with `text` fully replacing the current text.
    pub fn replaced(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            version: self.version + 1,
            updated_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Grounding
// ---------------------------------------------------------------------------

/// One web source retrieved by the search tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceChunk {
    pub title: Option<String>,
    pub uri: Option<String>,
}

/// A generated text segment and the indices of the chunks backing it.
///
/// Indices come straight from the provider and may be out of range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSupport {
    pub text_segment: String,
    pub chunk_indices: Vec<i64>,
}

/// Search-grounded generation result, normalized at the provider boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingResponse {
    pub generated_text: String,
    pub search_queries: Vec<String>,
    pub source_chunks: Vec<SourceChunk>,
    pub supports: Vec<GroundingSupport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn keyword_set_rejects_blank() {
        let mut set = KeywordSet::new();
        assert!(set.add("   ").is_err());
        assert!(set.is_empty());

        set.add("  東京の魅力 ").unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["東京の魅力"]);
    }

    #[test]
    fn keyword_set_keeps_duplicates_and_order() {
        let set = KeywordSet::try_from(vec!["b".to_string(), "a".into(), "b".into()]).unwrap();
        assert_eq!(set.joined(", "), "b, a, b");
    }

    #[test]
    fn keyword_set_remove_floor_at_one() {
        let mut set = KeywordSet::try_from(vec!["a".to_string(), "b".into()]).unwrap();
        assert!(set.remove(0));
        assert!(!set.remove(0));
        assert_eq!(set.len(), 1);
        assert_eq!(set.joined(""), "b");
    }

    #[test]
    fn keyword_set_remove_out_of_bounds_is_noop() {
        let mut set = KeywordSet::try_from(vec!["a".to_string(), "b".into()]).unwrap();
        assert!(!set.remove(7));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn article_replacement_bumps_version() {
        let first = Article::new("one");
        let second = first.replaced("two");
        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
        assert_eq!(second.text, "two");
    }

    #[test]
    fn grounding_response_serializes() {
        let resp = GroundingResponse {
            generated_text: "text".into(),
            source_chunks: vec![SourceChunk {
                title: Some("example.com".into()),
                uri: None,
            }],
            ..Default::default()
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""generated_text":"text""#));
        assert!(json.contains(r#""uri":null"#));
    }
}
