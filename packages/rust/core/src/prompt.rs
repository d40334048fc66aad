//! Prompt assembly for titles, articles, rewrites, and grounding.
//!
//! Every prompt is a list of `# heading` sections. Required sections are
//! validated up front; optional ones (summary, style) are emitted only when
//! they have content, so an absent field never leaves an empty heading behind.
//! Rendering is a pure function of its inputs.

use llmo_shared::{KeywordSet, LlmoError, Result};

/// Separator used when joining keywords into prompt text.
const KEYWORD_SEPARATOR: &str = "、";

/// Heading of the optional summary section.
pub const SUMMARY_HEADING: &str = "# 概要";

/// Heading of the optional style section.
pub const STYLE_HEADING: &str = "# 文体";

/// Default number of title candidates requested.
pub const DEFAULT_TITLE_COUNT: u32 = 5;

// ---------------------------------------------------------------------------
// Request model
// ---------------------------------------------------------------------------

/// Persona the prompt opens with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleTemplate {
    /// Titles and articles.
    ContentMarketer,
    /// Rewrites.
    Editor,
    /// Search-grounded fact checking.
    EditorResearcher,
}

impl RoleTemplate {
    fn persona(self) -> &'static str {
        match self {
            Self::ContentMarketer => {
                "あなたは、最新のLLMOに精通した、優秀なコンテンツマーケターです。"
            }
            Self::Editor => "あなたは、非常に優秀なプロの編集者です。",
            Self::EditorResearcher => "あなたは、非常に優秀なプロの編集者兼リサーチャーです。",
        }
    }
}

/// What the prompt asks the model to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Titles,
    Article,
    Rewrite,
    Grounding,
}

/// Everything needed to render one prompt. Built fresh per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub kind: PromptKind,
    pub role: RoleTemplate,
    /// Joined keywords, the chosen title, or the current article text.
    pub subject: String,
    pub summary: Option<String>,
    pub style: Option<String>,
    pub target_length: Option<u32>,
    pub instruction: Option<String>,
}

/// How an optional field is treated when rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionRule {
    /// Emit the section only when the value is non-empty.
    IncludeIfPresent,
    /// Always emit; a missing value is an input error.
    AlwaysInclude,
    /// Must be present and non-empty for the prompt kinds that use it.
    Required,
}

/// Recognized optional sections and how each is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionPolicy {
    pub summary: SectionRule,
    pub style: SectionRule,
    pub target_length: SectionRule,
    pub rewrite_instruction: SectionRule,
}

impl Default for SectionPolicy {
    fn default() -> Self {
        Self {
            summary: SectionRule::IncludeIfPresent,
            style: SectionRule::IncludeIfPresent,
            target_length: SectionRule::AlwaysInclude,
            rewrite_instruction: SectionRule::Required,
        }
    }
}

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Parameterized prompt builder shared by every generation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    policy: SectionPolicy,
    title_count: u32,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE_COUNT)
    }
}

impl PromptBuilder {
    pub fn new(title_count: u32) -> Self {
        Self {
            policy: SectionPolicy::default(),
            title_count: title_count.max(1),
        }
    }

    pub fn with_policy(mut self, policy: SectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn title_count(&self) -> u32 {
        self.title_count
    }

    /// Prompt asking for a numbered list of title candidates.
    pub fn build_title_prompt(
        &self,
        keywords: &KeywordSet,
        summary: Option<&str>,
    ) -> Result<String> {
        if keywords.is_empty() {
            return Err(LlmoError::invalid_input(
                "add at least one keyword before generating titles",
            ));
        }
        self.render(&GenerationRequest {
            kind: PromptKind::Titles,
            role: RoleTemplate::ContentMarketer,
            subject: keywords.joined(KEYWORD_SEPARATOR),
            summary: summary.map(str::to_string),
            style: None,
            target_length: None,
            instruction: None,
        })
    }

    /// Prompt expanding a chosen title into a full article.
    pub fn build_article_prompt(
        &self,
        title: &str,
        target_length: u32,
        summary: Option<&str>,
        style: Option<&str>,
    ) -> Result<String> {
        self.render(&GenerationRequest {
            kind: PromptKind::Article,
            role: RoleTemplate::ContentMarketer,
            subject: title.to_string(),
            summary: summary.map(str::to_string),
            style: style.map(str::to_string),
            target_length: Some(target_length),
            instruction: None,
        })
    }

    /// Prompt applying a free-text edit instruction to the current article.
    pub fn build_rewrite_prompt(&self, current_text: &str, instruction: &str) -> Result<String> {
        self.render(&GenerationRequest {
            kind: PromptKind::Rewrite,
            role: RoleTemplate::Editor,
            subject: current_text.to_string(),
            summary: None,
            style: None,
            target_length: None,
            instruction: Some(instruction.to_string()),
        })
    }

    /// Prompt asking the model to back the article with searched sources.
    pub fn build_grounding_prompt(&self, current_text: &str) -> Result<String> {
        self.render(&GenerationRequest {
            kind: PromptKind::Grounding,
            role: RoleTemplate::EditorResearcher,
            subject: current_text.to_string(),
            summary: None,
            style: None,
            target_length: None,
            instruction: None,
        })
    }

    /// Render a request into prompt text.
    pub fn render(&self, request: &GenerationRequest) -> Result<String> {
        let subject = non_empty(Some(request.subject.as_str())).ok_or_else(|| {
            LlmoError::invalid_input(match request.kind {
                PromptKind::Titles => "keywords must not be empty",
                PromptKind::Article => "title must not be empty",
                PromptKind::Rewrite | PromptKind::Grounding => "article text must not be empty",
            })
        })?;

        let mut doc = PromptDoc::default();

        match request.kind {
            PromptKind::Titles => {
                doc.section(
                    "# 命令",
                    format!(
                        "{}\n以下のキーワードをもとに、\
                         生成AIが内容を正確に理解し、引用・参照したくなるような\
                         ブログ記事のタイトル案を{}個提案してください。\n\
                         出力は「1. タイトル」の形式の番号付きリストのみとし、\
                         余計な文章は一切含めないこと。",
                        request.role.persona(),
                        self.title_count
                    ),
                );
                doc.section("# キーワード", subject);
                self.optional(
                    &mut doc,
                    self.policy.summary,
                    SUMMARY_HEADING,
                    request.summary.as_deref(),
                    "summary",
                )?;
            }
            PromptKind::Article => {
                doc.section(
                    "# 命令",
                    format!(
                        "{}\n指定されたタイトルに基づき、\
                         生成AIが内容を正確に理解し、引用・参照したくなるような、\
                         構造化されたブログ記事を生成してください。\n\
                         なお、余計な文章（「承知しました」など）は一切含めないこと。",
                        request.role.persona()
                    ),
                );
                doc.section("# タイトル", subject);
                let length = self.target_length(request.target_length)?;
                doc.section("# 構造と要件", article_requirements(length));
                self.optional(
                    &mut doc,
                    self.policy.summary,
                    SUMMARY_HEADING,
                    request.summary.as_deref(),
                    "summary",
                )?;
                self.optional(
                    &mut doc,
                    self.policy.style,
                    STYLE_HEADING,
                    request.style.as_deref(),
                    "style",
                )?;
            }
            PromptKind::Rewrite => {
                let instruction = match self.policy.rewrite_instruction {
                    SectionRule::IncludeIfPresent => non_empty(request.instruction.as_deref()),
                    SectionRule::AlwaysInclude | SectionRule::Required => Some(
                        non_empty(request.instruction.as_deref()).ok_or_else(|| {
                            LlmoError::invalid_input("rewrite instruction must not be empty")
                        })?,
                    ),
                };
                doc.section(
                    "# 命令",
                    format!(
                        "{}\n以下の「元の文章」を、「編集指示」に従って、\
                         より質の高い文章に修正・再構成してください。\n\
                         元の文章の良い点は活かしつつ、指示に忠実に従ってください。\n\
                         なお、余計な文章は一切含めないこと。",
                        request.role.persona()
                    ),
                );
                doc.section("# 元の文章", fenced(subject));
                if let Some(instruction) = instruction {
                    doc.section("# 編集指示", fenced(instruction));
                }
                doc.heading_only("# 修正後の文章");
            }
            PromptKind::Grounding => {
                doc.section(
                    "# 命令",
                    format!(
                        "{}\n以下の「元の文章」の主張の信頼性を高めるため、\
                         Google検索ツールを自律的に使用し、\
                         発見した客観的な統計データや事例を引用してください。\n\
                         引用した場合は、必ず、\
                         検索で発見した実在する情報源を明記または示唆してください。\
                         例えば、「example.comによると、...」のような形で記述してください。\n\
                         URLを創作してはいけません。\n\
                         なお、余計な文章（「承知しました」など）は一切含めないこと。",
                        request.role.persona()
                    ),
                );
                doc.section("# 元の文章", fenced(subject));
            }
        }

        Ok(doc.finish())
    }

    fn optional(
        &self,
        doc: &mut PromptDoc,
        rule: SectionRule,
        heading: &str,
        value: Option<&str>,
        name: &str,
    ) -> Result<()> {
        match (rule, non_empty(value)) {
            (_, Some(value)) => doc.section(heading, value),
            (SectionRule::IncludeIfPresent, None) => {}
            (SectionRule::AlwaysInclude | SectionRule::Required, None) => {
                return Err(LlmoError::invalid_input(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    fn target_length(&self, value: Option<u32>) -> Result<Option<u32>> {
        match (self.policy.target_length, value) {
            (_, Some(0)) => Err(LlmoError::invalid_input("target length must be greater than 0")),
            (_, Some(length)) => Ok(Some(length)),
            (SectionRule::IncludeIfPresent, None) => Ok(None),
            (SectionRule::AlwaysInclude | SectionRule::Required, None) => Err(
                LlmoError::invalid_input("target length is required for articles"),
            ),
        }
    }
}

fn article_requirements(length: Option<u32>) -> String {
    let length_line = length
        .map(|n| format!("- 全体で{n}字程度の文章を生成してください。\n"))
        .unwrap_or_default();
    format!(
        "{length_line}\
         - 必ず以下の構造に従ってください。\n  \
           - 導入: 記事の概要を簡潔に記述。\n  \
           - 見出し: 記事の核心を表す見出しと、具体的な魅力を示す小見出し。\n  \
           - まとめ: 記事全体の要点を箇条書きでまとめる。\n\
         - 読者が具体的なイメージを持てるように、固有名詞をいくつか含めてください。"
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn fenced(text: &str) -> String {
    format!("---\n{text}\n---")
}

/// Accumulates `# heading` sections and joins them with blank lines.
#[derive(Default)]
struct PromptDoc {
    blocks: Vec<String>,
}

impl PromptDoc {
    fn section(&mut self, heading: &str, body: impl AsRef<str>) {
        self.blocks.push(format!("{heading}\n{}", body.as_ref()));
    }

    fn heading_only(&mut self, heading: &str) {
        self.blocks.push(heading.to_string());
    }

    fn finish(self) -> String {
        self.blocks.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(words: &[&str]) -> KeywordSet {
        KeywordSet::try_from(words.iter().map(|w| w.to_string()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn title_prompt_contains_every_keyword() {
        let builder = PromptBuilder::default();
        let prompt = builder
            .build_title_prompt(&keywords(&["東京の魅力", "下町", "東京の魅力"]), None)
            .unwrap();
        assert!(prompt.contains("東京の魅力、下町、東京の魅力"));
        assert!(prompt.contains("5個"));
    }

    #[test]
    fn title_prompt_summary_section_only_when_present() {
        let builder = PromptBuilder::default();
        let kws = keywords(&["東京"]);

        let with = builder.build_title_prompt(&kws, Some("観光客向けのガイド")).unwrap();
        assert!(with.contains(SUMMARY_HEADING));
        assert!(with.contains("観光客向けのガイド"));

        for empty in [None, Some(""), Some("   ")] {
            let without = builder.build_title_prompt(&kws, empty).unwrap();
            assert!(!without.contains(SUMMARY_HEADING));
            assert!(!without.ends_with('\n'));
            assert!(!without.contains("\n\n\n"));
        }
    }

    #[test]
    fn title_prompt_rejects_empty_keywords() {
        let err = PromptBuilder::default()
            .build_title_prompt(&KeywordSet::new(), Some("summary"))
            .unwrap_err();
        assert!(matches!(err, LlmoError::InvalidInput { .. }));
    }

    #[test]
    fn article_prompt_includes_length_and_optional_sections() {
        let builder = PromptBuilder::default();
        let prompt = builder
            .build_article_prompt(
                "浅草散策ガイド",
                400,
                Some("下町の魅力"),
                Some("親しみやすい口調"),
            )
            .unwrap();
        assert!(prompt.contains("# タイトル\n浅草散策ガイド"));
        assert!(prompt.contains("400字程度"));
        assert!(prompt.contains(SUMMARY_HEADING));
        assert!(prompt.contains(STYLE_HEADING));

        let bare = builder.build_article_prompt("浅草散策ガイド", 800, None, Some("")).unwrap();
        assert!(bare.contains("800字程度"));
        assert!(!bare.contains(SUMMARY_HEADING));
        assert!(!bare.contains(STYLE_HEADING));
    }

    #[test]
    fn article_prompt_rejects_zero_length_and_blank_title() {
        let builder = PromptBuilder::default();
        assert!(builder.build_article_prompt("t", 0, None, None).is_err());
        assert!(builder.build_article_prompt("  ", 400, None, None).is_err());
    }

    #[test]
    fn rewrite_prompt_requires_instruction() {
        let builder = PromptBuilder::default();
        let err = builder.build_rewrite_prompt("本文", "  ").unwrap_err();
        assert!(matches!(err, LlmoError::InvalidInput { .. }));

        let prompt = builder.build_rewrite_prompt("本文", "もっと短く").unwrap();
        assert!(prompt.contains("# 元の文章\n---\n本文\n---"));
        assert!(prompt.contains("# 編集指示\n---\nもっと短く\n---"));
        assert!(prompt.ends_with("# 修正後の文章"));
    }

    #[test]
    fn grounding_prompt_embeds_article() {
        let prompt = PromptBuilder::default()
            .build_grounding_prompt("東京は魅力的な都市です。")
            .unwrap();
        assert!(prompt.contains("編集者兼リサーチャー"));
        assert!(prompt.contains("東京は魅力的な都市です。"));
        assert!(PromptBuilder::default().build_grounding_prompt("").is_err());
    }

    #[test]
    fn stricter_policy_requires_summary() {
        let builder = PromptBuilder::default().with_policy(SectionPolicy {
            summary: SectionRule::Required,
            ..SectionPolicy::default()
        });
        assert!(builder.build_title_prompt(&keywords(&["a"]), None).is_err());
        assert!(builder.build_title_prompt(&keywords(&["a"]), Some("s")).is_ok());
    }

    #[test]
    fn rendering_is_deterministic() {
        let builder = PromptBuilder::new(3);
        let kws = keywords(&["a", "b"]);
        assert_eq!(
            builder.build_title_prompt(&kws, Some("s")).unwrap(),
            builder.build_title_prompt(&kws, Some("s")).unwrap()
        );
    }
}
