//! Grounding citation reconciliation.
//!
//! Maps each grounding support's chunk indices back onto the source list,
//! producing (segment, sources) pairs for the fact-check view. An index that
//! points outside the chunk list drops only that one source and is reported
//! as a warning; the rest of the reconciliation continues.

use std::fmt::Write as _;

use serde::Serialize;
use tracing::warn;

use llmo_shared::{GroundingResponse, SourceChunk};

/// Title shown for a chunk that carries none.
pub const UNKNOWN_TITLE: &str = "unknown";

/// URI shown for a chunk that carries none.
pub const UNKNOWN_URI: &str = "#";

/// A resolved source backing a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitedSource {
    pub title: String,
    pub uri: String,
}

impl From<&SourceChunk> for CitedSource {
    fn from(chunk: &SourceChunk) -> Self {
        Self {
            title: chunk.title.clone().unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            uri: chunk.uri.clone().unwrap_or_else(|| UNKNOWN_URI.to_string()),
        }
    }
}

/// A generated segment with the sources that support it, in index order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitedSegment {
    pub segment_text: String,
    pub sources: Vec<CitedSource>,
}

/// A citation index that does not address any source chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error(
    "support #{support}: citation index {index} is out of range for {chunk_count} source chunk(s)"
)]
pub struct IndexOutOfRange {
    /// Position of the offending support in `supports`.
    pub support: usize,
    pub index: i64,
    pub chunk_count: usize,
}

/// Outcome of reconciling a grounding response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reconciliation {
    /// The response carried no supports. Not an error.
    NoEvidence,
    /// One entry per support, in response order.
    Cited {
        segments: Vec<CitedSegment>,
        warnings: Vec<IndexOutOfRange>,
    },
}

impl Reconciliation {
    pub fn has_evidence(&self) -> bool {
        matches!(self, Self::Cited { .. })
    }

    pub fn segments(&self) -> &[CitedSegment] {
        match self {
            Self::NoEvidence => &[],
            Self::Cited { segments, .. } => segments,
        }
    }

    pub fn warnings(&self) -> &[IndexOutOfRange] {
        match self {
            Self::NoEvidence => &[],
            Self::Cited { warnings, .. } => warnings,
        }
    }
}

/// Resolve every support's chunk indices against the source list.
pub fn reconcile(response: &GroundingResponse) -> Reconciliation {
    if response.supports.is_empty() {
        return Reconciliation::NoEvidence;
    }

    let chunk_count = response.source_chunks.len();
    let mut warnings = Vec::new();

    let segments: Vec<CitedSegment> = response
        .supports
        .iter()
        .enumerate()
        .map(|(support, s)| {
            let sources = s
                .chunk_indices
                .iter()
                .filter_map(|&index| {
                    let chunk = usize::try_from(index)
                        .ok()
                        .and_then(|i| response.source_chunks.get(i));
                    if chunk.is_none() {
                        let w = IndexOutOfRange {
                            support,
                            index,
                            chunk_count,
                        };
                        warn!("{w}");
                        warnings.push(w);
                    }
                    chunk.map(CitedSource::from)
                })
                .collect();

            CitedSegment {
                segment_text: s.text_segment.clone(),
                sources,
            }
        })
        .collect();

    Reconciliation::Cited { segments, warnings }
}

/// Render a reconciliation as a Markdown fact-check report.
pub fn render_markdown(reconciliation: &Reconciliation) -> String {
    let mut out = String::new();

    match reconciliation {
        Reconciliation::NoEvidence => {
            out.push_str("_No grounding evidence was returned for this article._\n");
        }
        Reconciliation::Cited { segments, warnings } => {
            for (i, segment) in segments.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                let _ = writeln!(out, "> {}", segment.segment_text.trim());
                if segment.sources.is_empty() {
                    out.push_str("- (no sources)\n");
                }
                for source in &segment.sources {
                    let _ = writeln!(out, "- [{}]({})", source.title, source.uri);
                }
            }
            if !warnings.is_empty() {
                out.push_str("\n**Warnings**\n");
                for w in warnings {
                    let _ = writeln!(out, "- {w}");
                }
            }
        }
    }

    out
}
