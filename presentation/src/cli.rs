use crate::report::{
    render_benchmark, render_comparison, render_embeddings, render_models, CHUNK_SEPARATOR,
};
use anyhow::{Context, Result};
use application::benchmark_service::{
    BenchmarkService, ChatSettings, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPLATE,
};
use application::compare_service::{CompareService, CompareSettings};
use application::embed_service::EmbedService;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use domain::models::Endpoint;
use domain::similarity::ComparePolicy;
use domain::source::EmbeddingSource;
use infrastructure::config::{
    ClientConfig, DEFAULT_API_KEY, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL, DEFAULT_URL,
    ENV_API_KEY, ENV_COMPARE_URL, ENV_URL,
};
use infrastructure::embedder::Embedder;
use infrastructure::openai_client::OpenAiClient;
use infrastructure::reference::ReferenceFile;
use infrastructure::triton_client::{TritonClient, TritonMode};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Validate and benchmark OpenAI-compatible inference endpoints.
#[derive(Parser, Debug)]
#[command(name = "infer_bench")]
#[command(
    about = "Validate and benchmark OpenAI-compatible inference endpoints",
    long_about = None
)]
pub struct Cli {
    /// API key sent as a bearer token
    #[arg(
        short = 'k',
        long = "api-key",
        global = true,
        env = ENV_API_KEY,
        default_value = DEFAULT_API_KEY,
        hide_env_values = true
    )]
    pub api_key: String,

    /// Per-request timeout in seconds (no timeout by default)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Only log errors
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Embed one or more inputs and time the request
    Embed(EmbedArgs),
    /// Compare the embedding of one input across several sources
    Compare(CompareArgs),
    /// Time a chat completion, optionally streamed
    Chat(ChatArgs),
    /// List the models an endpoint serves
    Models(ModelsArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Exact between two API endpoints, cosine otherwise
    Auto,
    /// Bit-for-bit equality of every value
    Exact,
    /// Cosine similarity, no pass/fail verdict
    Cosine,
}

impl From<PolicyArg> for ComparePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Auto => ComparePolicy::Auto,
            PolicyArg::Exact => ComparePolicy::Exact,
            PolicyArg::Cosine => ComparePolicy::Cosine,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TritonModeArg {
    /// `/v2/models/{model}/generate`, one request per input
    Generate,
    /// `/v2/models/{model}/infer` with a tensor batch
    Infer,
}

impl From<TritonModeArg> for TritonMode {
    fn from(arg: TritonModeArg) -> Self {
        match arg {
            TritonModeArg::Generate => TritonMode::Generate,
            TritonModeArg::Infer => TritonMode::Infer,
        }
    }
}

#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Model name
    #[arg(short, long, default_value = DEFAULT_EMBEDDING_MODEL)]
    pub model: String,

    /// URL including port and version
    #[arg(short, long, env = ENV_URL, default_value = DEFAULT_URL)]
    pub url: String,

    /// Text to embed; repeat for a batch
    #[arg(short, long, required = true)]
    pub input: Vec<String>,

    /// Print full vectors
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Model name
    #[arg(short, long, default_value = DEFAULT_EMBEDDING_MODEL)]
    pub model: String,

    /// Reference URL including port and version
    #[arg(short, long, env = ENV_URL, default_value = DEFAULT_URL)]
    pub url: String,

    /// URL to compare against the reference
    #[arg(short, long, env = ENV_COMPARE_URL)]
    pub compare: Option<String>,

    /// Model input text
    #[arg(short, long, default_value = "This is the ai-router model comparison test")]
    pub input: String,

    /// Batch size
    #[arg(short, long, default_value_t = 1)]
    pub batch: usize,

    /// Show compared vectors
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub verbose: bool,

    /// JSON file with the embedding of a locally run reference model
    #[arg(long)]
    pub reference_file: Option<PathBuf>,

    /// Model-serving framework base URL (e.g. http://localhost:8000)
    #[arg(long, requires = "triton_model")]
    pub triton_url: Option<String>,

    /// Model name on the serving framework
    #[arg(long, requires = "triton_url")]
    pub triton_model: Option<String>,

    /// Serving framework surface
    #[arg(long, value_enum, default_value_t = TritonModeArg::Infer)]
    pub triton_mode: TritonModeArg,

    /// How embeddings are judged against the reference
    #[arg(long, value_enum, default_value_t = PolicyArg::Auto)]
    pub policy: PolicyArg,

    /// Query all sources at the same time
    #[arg(long, action = ArgAction::SetTrue)]
    pub concurrent: bool,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Model name
    #[arg(short, long, default_value = DEFAULT_CHAT_MODEL)]
    pub model: String,

    /// URL including port and version
    #[arg(short, long, env = ENV_URL, default_value = DEFAULT_URL)]
    pub url: String,

    /// Input
    #[arg(short, long, default_value = "What fun things are there to do in Chicago?")]
    pub input: String,

    /// Max tokens to generate
    #[arg(short = 't', long, default_value_t = 1024)]
    pub tokens: u32,

    /// Enable streaming mode
    #[arg(short = 'S', long, action = ArgAction::SetTrue)]
    pub stream: bool,

    /// Print a separator after every streamed chunk
    #[arg(short = 'n', long, action = ArgAction::SetTrue)]
    pub newline: bool,

    /// System prompt
    #[arg(long, default_value = DEFAULT_SYSTEM_PROMPT)]
    pub system: String,

    /// Prompt template; `{input}` is replaced by the input text
    #[arg(long, default_value = DEFAULT_TEMPLATE)]
    pub template: String,

    /// Send the input without a prompt template
    #[arg(long, action = ArgAction::SetTrue)]
    pub raw: bool,
}

#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// URL including port and version
    #[arg(short, long, env = ENV_URL, default_value = DEFAULT_URL)]
    pub url: String,
}

impl ChatArgs {
    pub fn settings(&self) -> ChatSettings {
        ChatSettings {
            model: self.model.clone(),
            input: self.input.clone(),
            max_tokens: self.tokens,
            stream: self.stream,
            system: self.system.clone(),
            template: (!self.raw).then(|| self.template.clone()),
        }
    }
}

impl CompareArgs {
    pub fn settings(&self) -> CompareSettings {
        CompareSettings {
            input: self.input.clone(),
            batch: self.batch,
            policy: self.policy.into(),
            concurrent: self.concurrent,
        }
    }
}

fn write_chunk(chunk: &str, separator: bool) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "{chunk}")?;
    if separator {
        writeln!(stdout)?;
        writeln!(stdout, "{CHUNK_SEPARATOR}")?;
    }
    stdout.flush()
}

pub struct CliApp {
    client_config: ClientConfig,
    api_key: String,
}

impl CliApp {
    pub fn new(cli: &Cli) -> Self {
        Self {
            client_config: ClientConfig {
                timeout: cli.timeout.map(Duration::from_secs),
            },
            api_key: cli.api_key.clone(),
        }
    }

    fn openai(&self, url: &str, model: &str) -> Result<OpenAiClient> {
        let client = self.client_config.build_client()?;
        Ok(OpenAiClient::new(
            client,
            Endpoint::new(url, &self.api_key),
            model,
        ))
    }

    pub async fn run(&self, command: &Command) -> Result<()> {
        match command {
            Command::Embed(args) => self.embed(args).await,
            Command::Compare(args) => self.compare(args).await,
            Command::Chat(args) => self.chat(args).await,
            Command::Models(args) => self.models(args).await,
        }
    }

    async fn embed(&self, args: &EmbedArgs) -> Result<()> {
        let service = EmbedService::new(self.openai(&args.url, &args.model)?);
        let report = service
            .run(&args.input)
            .await
            .with_context(|| format!("embedding request to {} failed", args.url))?;
        print!("{}", render_embeddings(&report, args.verbose));
        Ok(())
    }

    async fn compare(&self, args: &CompareArgs) -> Result<()> {
        let settings = args.settings();
        let mut sources: Vec<Box<dyn EmbeddingSource>> = Vec::new();
        sources.push(Box::new(self.openai(&args.url, &args.model)?));
        if let Some(compare) = &args.compare {
            sources.push(Box::new(self.openai(compare, &args.model)?));
        }
        if let (Some(url), Some(model)) = (&args.triton_url, &args.triton_model) {
            sources.push(Box::new(TritonClient::new(
                self.client_config.build_client()?,
                Endpoint::new(url, &self.api_key),
                model,
                args.triton_mode.into(),
            )));
        }
        if let Some(path) = &args.reference_file {
            let reference = ReferenceFile::load(path)
                .await
                .with_context(|| format!("cannot load reference embedding {}", path.display()))?;
            sources.push(Box::new(reference));
        }
        tracing::debug!(sources = sources.len(), policy = %settings.policy, "comparing embeddings");

        let service = CompareService::new(Embedder::new(sources));
        let report = service.run(&settings).await.context("embedding comparison failed")?;
        print!("{}", render_comparison(&report, args.verbose));
        Ok(())
    }

    async fn chat(&self, args: &ChatArgs) -> Result<()> {
        let settings = args.settings();
        let request = settings.build_request();
        let service = BenchmarkService::new(self.openai(&args.url, &args.model)?);

        let newline = args.newline;
        let mut write_error = None;
        let result = service
            .run(&request, |chunk| {
                if write_error.is_none() {
                    write_error = write_chunk(chunk, newline).err();
                }
            })
            .await
            .with_context(|| format!("chat completion request to {} failed", args.url))?;
        if let Some(err) = write_error {
            return Err(err).context("cannot write streamed response");
        }
        print!("{}", render_benchmark(&result));
        Ok(())
    }

    async fn models(&self, args: &ModelsArgs) -> Result<()> {
        let client = self.openai(&args.url, "")?;
        let models = client
            .list_models()
            .await
            .with_context(|| format!("listing models at {} failed", args.url))?;
        print!("{}", render_models(&models));
        Ok(())
    }
}
