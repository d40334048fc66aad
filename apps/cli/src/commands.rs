//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use llmo_core::citation::Reconciliation;
use llmo_core::session::GroundingReport;
use llmo_core::{
    Action, Assistant, GroundedAnswer, OptionalField, PromptBuilder, SessionState, render_markdown,
};
use llmo_provider::{GeminiClient, GroundedGenerator, TextGenerator};
use llmo_shared::{AppConfig, LlmoError, init_config, load_config, resolve_api_key};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LLMO: draft blog articles that generative AI wants to cite.
#[derive(Parser)]
#[command(
    name = "llmo",
    version,
    about = "Generate titles, articles, rewrites, and grounded fact checks with Gemini.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Suggest title candidates for a set of keywords.
    Titles {
        /// Keyword (repeatable).
        #[arg(short, long = "keyword", required = true)]
        keywords: Vec<String>,

        /// Optional article summary to steer the titles.
        #[arg(long)]
        summary: Option<String>,
    },

    /// Write an article for a title.
    Article {
        /// Article title.
        #[arg(short, long)]
        title: String,

        /// Target length in characters (defaults to config).
        #[arg(short, long)]
        length: Option<u32>,

        #[arg(long)]
        summary: Option<String>,

        /// Writing style, e.g. "です・ます調".
        #[arg(long)]
        style: Option<String>,

        /// Write the article here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Rewrite an article file following an instruction.
    Rewrite {
        /// Article to rewrite.
        #[arg(short, long)]
        input: PathBuf,

        /// Edit instruction, e.g. "もっと短く".
        #[arg(long)]
        instruction: String,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Back an article file with web-searched sources and list citations.
    Ground {
        #[arg(short, long)]
        input: PathBuf,

        /// Write the grounded article here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Print the full grounding report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Keywords to finished article in one go.
    Run {
        #[arg(short, long = "keyword", required = true)]
        keywords: Vec<String>,

        #[arg(long)]
        summary: Option<String>,

        #[arg(long)]
        style: Option<String>,

        /// Which title candidate to use (1-based).
        #[arg(long, default_value_t = 1)]
        pick: usize,

        #[arg(short, long)]
        length: Option<u32>,

        /// Apply one rewrite instruction after generation.
        #[arg(long)]
        rewrite: Option<String>,

        /// Run a grounded fact check as the last step.
        #[arg(long)]
        ground: bool,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Ask a free-form question answered with Google Search grounding.
    Ask {
        /// The question, sent to the model as-is.
        question: String,

        /// Print the answer, queries, and citations as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List models that support content generation.
    Models,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        format!("llmo={level},llmo_core={level},llmo_provider={level},llmo_shared={level}");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Titles { keywords, summary } => cmd_titles(&keywords, summary).await,
        Command::Article {
            title,
            length,
            summary,
            style,
            out,
        } => cmd_article(title, length, summary, style, out.as_deref()).await,
        Command::Rewrite {
            input,
            instruction,
            out,
        } => cmd_rewrite(&input, instruction, out.as_deref()).await,
        Command::Ground { input, out, json } => cmd_ground(&input, out.as_deref(), json).await,
        Command::Run {
            keywords,
            summary,
            style,
            pick,
            length,
            rewrite,
            ground,
            out,
        } => {
            let opts = RunOptions {
                summary,
                style,
                pick,
                length,
                rewrite,
                ground,
            };
            cmd_run(&keywords, opts, out.as_deref()).await
        }
        Command::Ask { question, json } => cmd_ask(&question, json).await,
        Command::Models => cmd_models().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Session plumbing
// ---------------------------------------------------------------------------

/// Loaded config plus a ready assistant. Fails fast on a missing API key.
struct Session {
    config: AppConfig,
    assistant: Assistant<GeminiClient>,
}

impl Session {
    fn connect() -> Result<Self> {
        let config = load_config()?;
        let client = gemini_client(&config)?;
        let prompts = PromptBuilder::new(config.defaults.title_count);
        Ok(Self {
            assistant: Assistant::new(client, prompts),
            config,
        })
    }

    fn new_state(&self) -> SessionState {
        SessionState::new(self.config.defaults.target_length)
    }

    /// Dispatch one action, with a spinner while a model call is in flight.
    async fn apply(&self, state: SessionState, action: Action) -> Result<SessionState> {
        let progress = action
            .calls_provider()
            .then(|| CliProgress::start(spinner_message(&action)));
        let result = self.assistant.dispatch(&state, action).await;
        if let Some(progress) = progress {
            progress.finish();
        }
        Ok(result?)
    }

    async fn apply_all(&self, state: SessionState, actions: Vec<Action>) -> Result<SessionState> {
        let mut state = state;
        for action in actions {
            state = self.apply(state, action).await?;
        }
        Ok(state)
    }
}

fn gemini_client(config: &AppConfig) -> Result<GeminiClient> {
    let api_key = resolve_api_key(config)?;
    Ok(GeminiClient::new(&config.gemini, api_key)?)
}

fn spinner_message(action: &Action) -> &'static str {
    match action {
        Action::GenerateTitles => "Generating title candidates...",
        Action::GenerateArticle => "Writing article...",
        Action::ApplyRewrite(_) => "Rewriting article...",
        Action::ApplyGrounding => "Fact checking with Google Search...",
        _ => "Working...",
    }
}

/// Actions that seed the optional prompt fields.
fn field_actions(
    summary: Option<String>,
    style: Option<String>,
    length: Option<u32>,
) -> Vec<Action> {
    let mut actions = Vec::new();
    if let Some(summary) = summary {
        actions.push(Action::SetOptionalField(OptionalField::Summary, summary));
    }
    if let Some(style) = style {
        actions.push(Action::SetOptionalField(OptionalField::Style, style));
    }
    if let Some(length) = length {
        actions.push(Action::SetTargetLength(length));
    }
    actions
}

/// Resolve a 1-based `--pick` against the candidate list.
fn pick_title(titles: &[String], pick: usize) -> Result<String> {
    pick.checked_sub(1)
        .and_then(|i| titles.get(i))
        .cloned()
        .ok_or_else(|| {
            eyre!(
                "--pick {pick} is out of range: {} title(s) were generated",
                titles.len()
            )
        })
}

fn read_article(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path).map_err(|e| LlmoError::io(path, e))?;
    if text.trim().is_empty() {
        return Err(LlmoError::invalid_input(format!("{} is empty", path.display())).into());
    }
    Ok(text)
}

fn write_article(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, text).map_err(|e| LlmoError::io(path, e))?;
            info!(path = %path.display(), "article written");
            eprintln!("Article written to {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn print_titles(titles: &[String]) {
    for (i, title) in titles.iter().enumerate() {
        println!("  {}. {title}", i + 1);
    }
}

fn print_grounding(report: &GroundingReport) {
    println!();
    print!(
        "{}",
        grounding_section(&report.response.search_queries, &report.reconciliation)
    );
}

/// Search queries followed by the citation report.
fn grounding_section(queries: &[String], reconciliation: &Reconciliation) -> String {
    let mut out = String::new();
    if !queries.is_empty() {
        out.push_str("## Search queries\n");
        for query in queries {
            out.push_str(&format!("- {query}\n"));
        }
        out.push('\n');
    }
    out.push_str("## Citations\n");
    out.push_str(&render_markdown(reconciliation));
    out
}

/// Text or JSON rendering of a grounded answer.
fn render_answer(answer: &GroundedAnswer, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(answer)?);
    }
    Ok(format!(
        "{}\n\n{}",
        answer.response.generated_text.trim(),
        grounding_section(&answer.response.search_queries, &answer.reconciliation)
    ))
}

async fn answer_question<P>(assistant: &Assistant<P>, question: &str, json: bool) -> Result<String>
where
    P: TextGenerator + GroundedGenerator,
{
    let answer = assistant.ask(question).await?;
    render_answer(&answer, json)
}

fn article_text(state: &SessionState) -> Result<&str> {
    state
        .article()
        .map(|a| a.text.as_str())
        .ok_or_else(|| eyre!("no article was produced"))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_titles(keywords: &[String], summary: Option<String>) -> Result<()> {
    let session = Session::connect()?;
    info!(keywords = keywords.len(), "generating titles");

    let mut actions: Vec<Action> = keywords.iter().cloned().map(Action::AddKeyword).collect();
    actions.extend(field_actions(summary, None, None));
    actions.push(Action::GenerateTitles);

    let state = session.apply_all(session.new_state(), actions).await?;
    print_titles(state.titles());
    Ok(())
}

async fn cmd_article(
    title: String,
    length: Option<u32>,
    summary: Option<String>,
    style: Option<String>,
    out: Option<&Path>,
) -> Result<()> {
    let session = Session::connect()?;

    let mut state = session.new_state();
    state.set_titles(vec![title.clone()]);

    let mut actions = vec![Action::SelectTitle(title)];
    actions.extend(field_actions(summary, style, length));
    actions.push(Action::GenerateArticle);

    let state = session.apply_all(state, actions).await?;
    write_article(out, article_text(&state)?)
}

async fn cmd_rewrite(input: &Path, instruction: String, out: Option<&Path>) -> Result<()> {
    let session = Session::connect()?;

    let mut state = session.new_state();
    state.set_article(read_article(input)?);

    let state = session.apply(state, Action::ApplyRewrite(instruction)).await?;
    write_article(out, article_text(&state)?)
}

async fn cmd_ground(input: &Path, out: Option<&Path>, json: bool) -> Result<()> {
    let session = Session::connect()?;

    let mut state = session.new_state();
    state.set_article(read_article(input)?);

    let state = session.apply(state, Action::ApplyGrounding).await?;
    let report = state
        .grounding()
        .ok_or_else(|| eyre!("grounding produced no report"))?;

    if json {
        if let Some(path) = out {
            write_article(Some(path), article_text(&state)?)?;
        }
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    write_article(out, article_text(&state)?)?;
    print_grounding(report);
    Ok(())
}

/// Optional inputs for `llmo run`.
struct RunOptions {
    summary: Option<String>,
    style: Option<String>,
    pick: usize,
    length: Option<u32>,
    rewrite: Option<String>,
    ground: bool,
}

async fn cmd_run(keywords: &[String], opts: RunOptions, out: Option<&Path>) -> Result<()> {
    let session = Session::connect()?;

    let mut actions: Vec<Action> = keywords.iter().cloned().map(Action::AddKeyword).collect();
    actions.extend(field_actions(opts.summary, opts.style, opts.length));
    actions.push(Action::GenerateTitles);
    let state = session.apply_all(session.new_state(), actions).await?;

    eprintln!("Title candidates:");
    for (i, title) in state.titles().iter().enumerate() {
        eprintln!("  {}. {title}", i + 1);
    }
    let title = pick_title(state.titles(), opts.pick)?;
    eprintln!("Using: {title}");

    let mut actions = vec![Action::SelectTitle(title), Action::GenerateArticle];
    if let Some(instruction) = opts.rewrite {
        actions.push(Action::ApplyRewrite(instruction));
    }
    if opts.ground {
        actions.push(Action::ApplyGrounding);
    }
    let state = session.apply_all(state, actions).await?;

    let article = state
        .article()
        .ok_or_else(|| eyre!("no article was produced"))?;
    info!(version = article.version, chars = article.text.chars().count(), "pipeline finished");

    write_article(out, &article.text)?;
    if let Some(report) = state.grounding() {
        print_grounding(report);
    }
    Ok(())
}

async fn cmd_ask(question: &str, json: bool) -> Result<()> {
    let session = Session::connect()?;
    info!(chars = question.chars().count(), "asking grounded question");

    let progress = CliProgress::start("Searching and answering...");
    let rendered = answer_question(&session.assistant, question, json).await;
    progress.finish();

    print!("{}", rendered?);
    Ok(())
}

async fn cmd_models() -> Result<()> {
    let config = load_config()?;
    let client = gemini_client(&config)?;

    let progress = CliProgress::start("Listing models...");
    let models = client.list_models().await;
    progress.finish();

    for model in models? {
        match &model.display_name {
            Some(display) => println!("{:<48} {display}", model.name),
            None => println!("{}", model.name),
        }
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress spinner
// ---------------------------------------------------------------------------

/// Spinner shown on stderr while a model request is in flight.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn start(message: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("static spinner template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(self) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use llmo_shared::GeminiConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_parses_repeated_keywords() {
        let cli = Cli::try_parse_from([
            "llmo", "run", "-k", "東京の魅力", "-k", "下町", "--pick", "2", "--ground",
        ])
        .unwrap();
        match cli.command {
            Command::Run {
                keywords,
                pick,
                ground,
                rewrite,
                ..
            } => {
                assert_eq!(keywords, vec!["東京の魅力", "下町"]);
                assert_eq!(pick, 2);
                assert!(ground);
                assert!(rewrite.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn titles_requires_a_keyword() {
        assert!(Cli::try_parse_from(["llmo", "titles"]).is_err());
    }

    #[test]
    fn ask_takes_a_positional_question() {
        let cli = Cli::try_parse_from(["llmo", "ask", "総裁選の勝者は？", "--json"]).unwrap();
        match cli.command {
            Command::Ask { question, json } => {
                assert_eq!(question, "総裁選の勝者は？");
                assert!(json);
            }
            _ => panic!("expected ask"),
        }
        assert!(Cli::try_parse_from(["llmo", "ask"]).is_err());
    }

    const FIXTURE: &str = include_str!("../../../fixtures/gemini/grounded-response.json");

    fn assistant_for(server: &MockServer) -> Assistant<GeminiClient> {
        let config = GeminiConfig {
            base_url: server.uri().parse().unwrap(),
            grounded_model: "models/gemini-test-pro".into(),
            timeout_secs: 5,
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new(&config, "test-key").unwrap();
        Assistant::new(client, PromptBuilder::default())
    }

    #[tokio::test]
    async fn ask_renders_answer_queries_and_citations() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test-pro:generateContent"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{"parts": [{"text": "東京の旅行者数は？"}]}],
                "tools": [{"googleSearch": {}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(FIXTURE))
            .expect(1)
            .mount(&server)
            .await;

        let assistant = assistant_for(&server);
        let text = answer_question(&assistant, "東京の旅行者数は？", false)
            .await
            .unwrap();
        assert!(text.starts_with("東京には年間1,900万人以上"));
        assert!(text.contains("## Search queries\n- 東京 外国人旅行者数 2024\n"));
        assert!(text.contains(
            "- [jnto.go.jp](https://vertexaisearch.cloud.google.com/grounding-api-redirect/aaa)"
        ));
        assert!(text.contains("citation index 7 is out of range"));
    }

    #[tokio::test]
    async fn ask_json_carries_reconciliation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FIXTURE))
            .mount(&server)
            .await;

        let assistant = assistant_for(&server);
        let json = answer_question(&assistant, "質問", true).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["question"], "質問");
        assert_eq!(value["reconciliation"]["status"], "cited");
        assert_eq!(value["reconciliation"]["segments"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn ask_surfaces_http_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_raw(
                r#"{"error":{"code":400,"message":"API key not valid."}}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let assistant = assistant_for(&server);
        let err = answer_question(&assistant, "質問", false).await.unwrap_err();
        let shown = err.to_string();
        assert!(shown.contains("API key not valid"));
        assert!(shown.contains("HTTP 400"));
    }

    #[test]
    fn pick_is_one_based() {
        let titles = vec!["A".to_string(), "B".to_string()];
        assert_eq!(pick_title(&titles, 1).unwrap(), "A");
        assert_eq!(pick_title(&titles, 2).unwrap(), "B");
        assert!(pick_title(&titles, 0).is_err());
        assert!(pick_title(&titles, 3).is_err());
    }

    #[test]
    fn field_actions_skip_absent_values() {
        let actions = field_actions(Some("概要".into()), None, Some(800));
        assert_eq!(
            actions,
            vec![
                Action::SetOptionalField(OptionalField::Summary, "概要".into()),
                Action::SetTargetLength(800),
            ]
        );
        assert!(field_actions(None, None, None).is_empty());
    }
}
