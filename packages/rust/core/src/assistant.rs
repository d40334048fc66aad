//! Action → reducer orchestration for a writing session.
//!
//! Front ends turn user input into an [`Action`] and hand it, together with
//! the current [`SessionState`], to [`Assistant::dispatch`]. Dispatch works on
//! a copy and returns the new state only on success, so a failed action (bad
//! input, provider failure, unusable output) never changes what the user had.

use serde::Serialize;
use tracing::{info, instrument};

use llmo_provider::{GroundedGenerator, TextGenerator};
use llmo_shared::{GroundingResponse, LlmoError, Result};

use crate::citation::{Reconciliation, reconcile};
use crate::prompt::PromptBuilder;
use crate::session::{GroundingReport, OptionalField, SessionState};
use crate::titles::parse_titles;

/// One discrete user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AddKeyword(String),
    RemoveKeyword(usize),
    SetOptionalField(OptionalField, String),
    SetTargetLength(u32),
    GenerateTitles,
    SelectTitle(String),
    GenerateArticle,
    /// Replace the article with user-edited text.
    EditArticle(String),
    ApplyRewrite(String),
    ApplyGrounding,
}

impl Action {
    /// Short name for logs and status lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddKeyword(_) => "add_keyword",
            Self::RemoveKeyword(_) => "remove_keyword",
            Self::SetOptionalField(..) => "set_optional_field",
            Self::SetTargetLength(_) => "set_target_length",
            Self::GenerateTitles => "generate_titles",
            Self::SelectTitle(_) => "select_title",
            Self::GenerateArticle => "generate_article",
            Self::EditArticle(_) => "edit_article",
            Self::ApplyRewrite(_) => "apply_rewrite",
            Self::ApplyGrounding => "apply_grounding",
        }
    }

    /// Whether handling this action makes an outbound model call.
    pub fn calls_provider(&self) -> bool {
        matches!(
            self,
            Self::GenerateTitles
                | Self::GenerateArticle
                | Self::ApplyRewrite(_)
                | Self::ApplyGrounding
        )
    }
}

/// A search-grounded answer to a free-form question, outside any session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroundedAnswer {
    pub question: String,
    pub response: GroundingResponse,
    pub reconciliation: Reconciliation,
}

/// Couples a model provider with the prompt builder.
#[derive(Debug, Clone)]
pub struct Assistant<P> {
    provider: P,
    prompts: PromptBuilder,
}

impl<P> Assistant<P>
where
    P: TextGenerator + GroundedGenerator,
{
    pub fn new(provider: P, prompts: PromptBuilder) -> Self {
        Self { provider, prompts }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn prompts(&self) -> &PromptBuilder {
        &self.prompts
    }

    /// Apply `action` to a copy of `state` and return the resulting state.
    #[instrument(skip_all, fields(session = %state.id(), action = action.name()))]
    pub async fn dispatch(&self, state: &SessionState, action: Action) -> Result<SessionState> {
        let mut next = state.clone();

        match action {
            Action::AddKeyword(keyword) => next.add_keyword(&keyword)?,
            Action::RemoveKeyword(index) => {
                next.remove_keyword(index);
            }
            Action::SetOptionalField(field, value) => next.append_optional_field(field, &value),
            Action::SetTargetLength(length) => next.set_target_length(length)?,
            Action::SelectTitle(title) => next.select_title(&title)?,
            Action::GenerateTitles => {
                let prompt = self
                    .prompts
                    .build_title_prompt(next.keywords(), next.summary())?;
                let raw = self.provider.generate(&prompt).await?;
                let titles = parse_titles(&raw)?;
                info!(count = titles.len(), "title candidates generated");
                next.set_titles(titles);
            }
            Action::GenerateArticle => {
                let title = next.selected_title().ok_or_else(|| {
                    LlmoError::invalid_input("select a title before generating the article")
                })?;
                let prompt = self.prompts.build_article_prompt(
                    title,
                    next.target_length(),
                    next.summary(),
                    next.style(),
                )?;
                let text = self.provider.generate(&prompt).await?;
                let version = next.set_article(text);
                info!(version, "article generated");
            }
            Action::EditArticle(text) => {
                let current = current_article_text(&next)?;
                if current != text {
                    let version = next.set_article(text);
                    info!(version, "article edited");
                }
            }
            Action::ApplyRewrite(instruction) => {
                let current = current_article_text(&next)?;
                let prompt = self.prompts.build_rewrite_prompt(current, &instruction)?;
                let text = self.provider.generate(&prompt).await?;
                let version = next.set_article(text);
                info!(version, "article rewritten");
            }
            Action::ApplyGrounding => {
                let current = current_article_text(&next)?;
                let prompt = self.prompts.build_grounding_prompt(current)?;
                let response = self.provider.generate_with_grounding(&prompt).await?;
                if response.generated_text.trim().is_empty() {
                    return Err(LlmoError::EmptyResponse);
                }

                let reconciliation = reconcile(&response);
                let article_version = next.set_article(response.generated_text.clone());
                info!(
                    version = article_version,
                    evidence = reconciliation.has_evidence(),
                    warnings = reconciliation.warnings().len(),
                    "article grounded"
                );
                next.record_grounding(GroundingReport {
                    article_version,
                    response,
                    reconciliation,
                });
            }
        }

        Ok(next)
    }

    /// Send `question` as-is to the grounded model and reconcile its citations.
    #[instrument(skip_all, fields(question_chars = question.chars().count()))]
    pub async fn ask(&self, question: &str) -> Result<GroundedAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(LlmoError::invalid_input("question must not be empty"));
        }

        let response = self.provider.generate_with_grounding(question).await?;
        if response.generated_text.trim().is_empty() {
            return Err(LlmoError::EmptyResponse);
        }

        let reconciliation = reconcile(&response);
        info!(
            evidence = reconciliation.has_evidence(),
            sources = response.source_chunks.len(),
            "question answered"
        );
        Ok(GroundedAnswer {
            question: question.to_string(),
            response,
            reconciliation,
        })
    }
}

fn current_article_text(state: &SessionState) -> Result<&str> {
    state
        .article()
        .map(|a| a.text.as_str())
        .ok_or_else(|| LlmoError::invalid_input("generate an article first"))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use llmo_shared::{GroundingResponse, GroundingSupport, SourceChunk};

    use super::*;
    use crate::citation::Reconciliation;

    /// In-memory provider that replays scripted replies and records prompts.
    #[derive(Default)]
    struct ScriptedProvider {
        replies: RefCell<VecDeque<Result<String>>>,
        grounded: RefCell<VecDeque<Result<GroundingResponse>>>,
        prompts: RefCell<Vec<String>>,
    }

    impl ScriptedProvider {
        fn reply(self, text: &str) -> Self {
            self.replies.borrow_mut().push_back(Ok(text.to_string()));
            self
        }

        fn fail(self, err: LlmoError) -> Self {
            self.replies.borrow_mut().push_back(Err(err));
            self
        }

        fn ground(self, response: GroundingResponse) -> Self {
            self.grounded.borrow_mut().push_back(Ok(response));
            self
        }

        fn last_prompt(&self) -> String {
            self.prompts.borrow().last().cloned().unwrap_or_default()
        }
    }

    impl TextGenerator for ScriptedProvider {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(LlmoError::provider("no scripted reply")))
        }
    }

    impl GroundedGenerator for ScriptedProvider {
        async fn generate_with_grounding(&self, prompt: &str) -> Result<GroundingResponse> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.grounded
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(LlmoError::provider("no scripted grounding")))
        }
    }

    fn assistant(provider: ScriptedProvider) -> Assistant<ScriptedProvider> {
        Assistant::new(provider, PromptBuilder::default())
    }

    async fn run(
        assistant: &Assistant<ScriptedProvider>,
        state: SessionState,
        actions: Vec<Action>,
    ) -> SessionState {
        let mut state = state;
        for action in actions {
            state = assistant.dispatch(&state, action).await.unwrap();
        }
        state
    }

    #[tokio::test]
    async fn end_to_end_tokyo_session() {
        let provider = ScriptedProvider::default()
            .reply("1. 浅草散策ガイド\n2. 渋谷の未来\nnoise line")
            .reply("# 浅草散策ガイド\n浅草は歴史と下町情緒が残る街です。")
            .reply("浅草は下町情緒の街。");
        let assistant = assistant(provider);

        let state = run(
            &assistant,
            SessionState::default(),
            vec![
                Action::AddKeyword("東京の魅力".into()),
                Action::SetOptionalField(OptionalField::Summary, String::new()),
                Action::GenerateTitles,
            ],
        )
        .await;
        assert_eq!(
            state.titles(),
            &["浅草散策ガイド".to_string(), "渋谷の未来".to_string()]
        );
        assert!(!assistant.provider().last_prompt().contains(crate::prompt::SUMMARY_HEADING));

        let state = run(
            &assistant,
            state,
            vec![
                Action::SelectTitle("浅草散策ガイド".into()),
                Action::SetTargetLength(400),
                Action::GenerateArticle,
            ],
        )
        .await;
        let article = state.article().unwrap();
        assert_eq!(article.version, 1);
        assert!(assistant.provider().last_prompt().contains("400字程度"));

        let rewrite = vec![Action::ApplyRewrite("もっと短く".into())];
        let state = run(&assistant, state, rewrite).await;
        let article = state.article().unwrap();
        assert_eq!(article.version, 2);
        assert_eq!(article.text, "浅草は下町情緒の街。");
        assert!(assistant.provider().last_prompt().contains("もっと短く"));
    }

    #[tokio::test]
    async fn generate_titles_without_keywords_is_invalid_input() {
        let assistant = assistant(ScriptedProvider::default().reply("1. never used"));
        let state = SessionState::default();

        let err = assistant.dispatch(&state, Action::GenerateTitles).await.unwrap_err();
        assert!(matches!(err, LlmoError::InvalidInput { .. }));
        assert!(assistant.provider().prompts.borrow().is_empty());
    }

    #[tokio::test]
    async fn unparseable_titles_leave_state_unchanged() {
        let assistant = assistant(
            ScriptedProvider::default()
                .reply("1. A\n2. B")
                .reply("Sorry, I cannot help with that."),
        );
        let state = run(
            &assistant,
            SessionState::default(),
            vec![Action::AddKeyword("k".into()), Action::GenerateTitles],
        )
        .await;

        let err = assistant.dispatch(&state, Action::GenerateTitles).await.unwrap_err();
        assert!(matches!(err, LlmoError::NoTitlesParsed));
        assert_eq!(state.titles(), &["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn provider_failure_keeps_prior_article() {
        let assistant = assistant(
            ScriptedProvider::default()
                .reply("1. T")
                .reply("draft")
                .fail(LlmoError::http(503, "unavailable")),
        );
        let state = run(
            &assistant,
            SessionState::default(),
            vec![
                Action::AddKeyword("k".into()),
                Action::GenerateTitles,
                Action::SelectTitle("T".into()),
                Action::GenerateArticle,
            ],
        )
        .await;

        let err = assistant
            .dispatch(&state, Action::ApplyRewrite("shorter".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmoError::Provider { status: Some(503), .. }));
        assert_eq!(state.article().unwrap().text, "draft");
        assert_eq!(state.article().unwrap().version, 1);
    }

    #[tokio::test]
    async fn invalid_selection_is_rejected() {
        let assistant = assistant(ScriptedProvider::default().reply("1. A"));
        let state = run(
            &assistant,
            SessionState::default(),
            vec![Action::AddKeyword("k".into()), Action::GenerateTitles],
        )
        .await;

        let err = assistant
            .dispatch(&state, Action::SelectTitle("X".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmoError::InvalidSelection { .. }));
        assert_eq!(state.selected_title(), None);
    }

    #[tokio::test]
    async fn article_requires_selection_and_rewrite_requires_article() {
        let assistant = assistant(ScriptedProvider::default());
        let state = SessionState::default();

        let err = assistant.dispatch(&state, Action::GenerateArticle).await.unwrap_err();
        assert!(matches!(err, LlmoError::InvalidInput { .. }));

        let err = assistant
            .dispatch(&state, Action::ApplyRewrite("x".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmoError::InvalidInput { .. }));

        let err = assistant.dispatch(&state, Action::ApplyGrounding).await.unwrap_err();
        assert!(matches!(err, LlmoError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn empty_rewrite_instruction_makes_no_call() {
        let assistant = assistant(ScriptedProvider::default());
        let mut state = SessionState::default();
        state.set_article("body");

        let err = assistant
            .dispatch(&state, Action::ApplyRewrite("   ".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmoError::InvalidInput { .. }));
        assert!(assistant.provider().prompts.borrow().is_empty());
    }

    #[tokio::test]
    async fn grounding_replaces_article_and_records_citations() {
        let response = GroundingResponse {
            generated_text: "jnto.go.jpによると、旅行者は増えています。".into(),
            search_queries: vec!["東京 旅行者数".into()],
            source_chunks: vec![SourceChunk {
                title: Some("jnto.go.jp".into()),
                uri: Some("https://example.com/r/1".into()),
            }],
            supports: vec![GroundingSupport {
                text_segment: "旅行者は増えています。".into(),
                chunk_indices: vec![0, 3],
            }],
        };
        let assistant = assistant(ScriptedProvider::default().ground(response));
        let mut state = SessionState::default();
        state.set_article("東京は人気です。");

        let state = assistant.dispatch(&state, Action::ApplyGrounding).await.unwrap();
        let article = state.article().unwrap();
        assert_eq!(article.version, 2);
        assert!(article.text.starts_with("jnto.go.jp"));
        assert!(assistant.provider().last_prompt().contains("東京は人気です。"));

        let report = state.grounding().unwrap();
        assert_eq!(report.article_version, 2);
        assert_eq!(report.reconciliation.segments()[0].sources.len(), 1);
        assert_eq!(report.reconciliation.warnings()[0].index, 3);
    }

    #[tokio::test]
    async fn grounding_without_supports_is_no_evidence() {
        let response = GroundingResponse {
            generated_text: "改善された本文".into(),
            ..Default::default()
        };
        let assistant = assistant(ScriptedProvider::default().ground(response));
        let mut state = SessionState::default();
        state.set_article("本文");

        let state = assistant.dispatch(&state, Action::ApplyGrounding).await.unwrap();
        assert_eq!(state.article().unwrap().text, "改善された本文");
        assert_eq!(
            state.grounding().unwrap().reconciliation,
            Reconciliation::NoEvidence
        );
    }

    #[tokio::test]
    async fn grounding_with_empty_text_keeps_article() {
        let assistant = assistant(ScriptedProvider::default().ground(GroundingResponse::default()));
        let mut state = SessionState::default();
        state.set_article("本文");

        let err = assistant.dispatch(&state, Action::ApplyGrounding).await.unwrap_err();
        assert!(matches!(err, LlmoError::EmptyResponse));
        assert_eq!(state.article().unwrap().version, 1);
        assert!(state.grounding().is_none());
    }

    #[tokio::test]
    async fn manual_edit_bumps_version_only_on_change() {
        let assistant = assistant(ScriptedProvider::default());
        let mut state = SessionState::default();
        state.set_article("本文");

        let same = assistant
            .dispatch(&state, Action::EditArticle("本文".into()))
            .await
            .unwrap();
        assert_eq!(same.article().unwrap().version, 1);

        let edited = assistant
            .dispatch(&state, Action::EditArticle("新しい本文".into()))
            .await
            .unwrap();
        assert_eq!(edited.article().unwrap().version, 2);
        assert_eq!(edited.article().unwrap().text, "新しい本文");
    }

    #[tokio::test]
    async fn ask_sends_question_verbatim_and_reconciles() {
        let response = GroundingResponse {
            generated_text: "2025年の総裁選の結果は…".into(),
            search_queries: vec!["自民党総裁選 2025".into()],
            source_chunks: vec![SourceChunk {
                title: Some("nhk.or.jp".into()),
                uri: Some("https://example.com/r/nhk".into()),
            }],
            supports: vec![GroundingSupport {
                text_segment: "2025年の総裁選の結果は…".into(),
                chunk_indices: vec![0],
            }],
        };
        let assistant = assistant(ScriptedProvider::default().ground(response));

        let answer = assistant
            .ask("  2025年の自民党総裁選挙で勝利したのは誰ですか？ ")
            .await
            .unwrap();
        assert_eq!(
            answer.question,
            "2025年の自民党総裁選挙で勝利したのは誰ですか？"
        );
        assert_eq!(
            assistant.provider().last_prompt(),
            "2025年の自民党総裁選挙で勝利したのは誰ですか？"
        );
        assert_eq!(answer.reconciliation.segments()[0].sources[0].title, "nhk.or.jp");
    }

    #[tokio::test]
    async fn ask_rejects_blank_question_without_calling() {
        let assistant = assistant(ScriptedProvider::default());
        let err = assistant.ask("   ").await.unwrap_err();
        assert!(matches!(err, LlmoError::InvalidInput { .. }));
        assert!(assistant.provider().prompts.borrow().is_empty());
    }

    #[tokio::test]
    async fn ask_with_empty_answer_is_empty_response() {
        let assistant = assistant(ScriptedProvider::default().ground(GroundingResponse::default()));
        let err = assistant.ask("質問").await.unwrap_err();
        assert!(matches!(err, LlmoError::EmptyResponse));
    }

    #[test]
    fn action_metadata() {
        assert!(Action::GenerateTitles.calls_provider());
        assert!(!Action::SelectTitle("x".into()).calls_provider());
        assert_eq!(Action::ApplyGrounding.name(), "apply_grounding");
    }
}
