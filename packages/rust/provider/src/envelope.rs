//! Wire schema for the Gemini `generateContent` and `models` endpoints.
//!
//! Every nested response field is optional or defaulted: grounding metadata
//! is best-effort, so a sparse envelope normalizes to empty collections
//! instead of failing.

use serde::{Deserialize, Deserializer, Serialize};

use llmo_shared::{GroundingResponse, GroundingSupport, SourceChunk};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

/// Serializes as `{}`: the tool takes no options.
#[derive(Debug, Serialize)]
struct GoogleSearch {}

impl<'a> GenerateContentRequest<'a> {
    /// Plain completion request.
    pub(crate) fn text(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            tools: Vec::new(),
        }
    }

    /// Completion request with the Google Search tool enabled.
    pub(crate) fn grounded(prompt: &'a str) -> Self {
        Self {
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
            ..Self::text(prompt)
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct GenerateContentResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Candidate {
    pub content: Option<Content>,
    pub grounding_metadata: Option<GroundingMetadata>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Content {
    #[serde(deserialize_with = "null_as_default")]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Part {
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct GroundingMetadata {
    #[serde(deserialize_with = "null_as_default")]
    pub web_search_queries: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub grounding_chunks: Vec<GroundingChunk>,
    #[serde(deserialize_with = "null_as_default")]
    pub grounding_supports: Vec<Support>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct GroundingChunk {
    pub web: Option<WebChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct WebChunk {
    pub title: Option<String>,
    pub uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Support {
    pub segment: Option<Segment>,
    #[serde(deserialize_with = "null_as_default")]
    pub grounding_chunk_indices: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Segment {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// Concatenated text parts of the first candidate; empty when absent.
    pub(crate) fn text(&self) -> String {
        self.first_candidate()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    pub(crate) fn finish_reason(&self) -> Option<&str> {
        self.first_candidate()
            .and_then(|c| c.finish_reason.as_deref())
    }

    /// Normalize into the domain type.
    pub(crate) fn into_grounding(self) -> GroundingResponse {
        let generated_text = self.text();
        let metadata = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.grounding_metadata)
            .unwrap_or_default();

        GroundingResponse {
            generated_text,
            search_queries: metadata.web_search_queries,
            source_chunks: metadata
                .grounding_chunks
                .into_iter()
                .map(|chunk| {
                    let web = chunk.web.unwrap_or_default();
                    SourceChunk {
                        title: web.title,
                        uri: web.uri,
                    }
                })
                .collect(),
            supports: metadata
                .grounding_supports
                .into_iter()
                .map(|s| GroundingSupport {
                    text_segment: s.segment.and_then(|seg| seg.text).unwrap_or_default(),
                    chunk_indices: s.grounding_chunk_indices,
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Model listing
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ListModelsResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub models: Vec<ModelInfo>,
    pub next_page_token: Option<String>,
}

/// A model advertised by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelInfo {
    /// Resource name, e.g. `models/gemini-2.5-pro`.
    pub name: String,
    pub display_name: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }
}
