use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use file_agent_core::{AgentConfig, FileAgent, InteractionStatus};
use file_agent_indexer::{path_lock_wait_ms_max, Workspace, WorkspaceOptions};
use file_agent_tools::ToolRegistry;
use file_agent_vector_store::EmbeddingMode;
use std::env;
use std::io;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

const ENV_CONFIG: &str = "FILE_AGENT_CONFIG";

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "file-agent")]
#[command(about = "Natural-language file management over a sandboxed workspace", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (JSON or TOML); defaults to $FILE_AGENT_CONFIG
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Workspace root (overrides config and FILE_AGENT_ROOT)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Embedding backend for this process
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedMode>,

    /// Reasoning iterations allowed per request
    #[arg(long, global = true)]
    max_iterations: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EmbedMode {
    Hashing,
    Http,
}

impl From<EmbedMode> for EmbeddingMode {
    fn from(mode: EmbedMode) -> Self {
        match mode {
            EmbedMode::Hashing => EmbeddingMode::Hashing,
            EmbedMode::Http => EmbeddingMode::Http,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run one request through the guardrail and the tool loop
    Ask(AskArgs),

    /// Bring the index in line with the files on disk
    Index(JsonArgs),

    /// List workspace files
    Ls(JsonArgs),

    /// Print the tool catalogue as JSON
    Tools,
}

#[derive(Args)]
struct AskArgs {
    /// The request, e.g. "create notes.txt with 'buy eggs'"
    #[arg(required = true, num_args = 1..)]
    request: Vec<String>,

    /// Print the whole interaction (verdict, transcript) as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct JsonArgs {
    /// Output JSON format
    #[arg(long)]
    json: bool,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    let json_output = match &cli.command {
        Commands::Ask(args) => args.json,
        Commands::Index(args) | Commands::Ls(args) => args.json,
        Commands::Tools => true,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // reqwest and its connection pool are noisy at debug level
    if !cli.verbose {
        builder.filter_module("hyper_util", log::LevelFilter::Warn);
        builder.filter_module("reqwest", log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Ask(args) => run_ask(args, &config).await?,
        Commands::Index(args) => run_index(args, &config).await?,
        Commands::Ls(args) => run_ls(args, &config)?,
        Commands::Tools => run_tools(&config)?,
    }

    Ok(())
}

/// File, then environment, then flags.
fn load_config(cli: &Cli) -> Result<AgentConfig> {
    let path = cli
        .config
        .clone()
        .or_else(|| env::var_os(ENV_CONFIG).map(PathBuf::from));
    let mut config = match &path {
        Some(path) => AgentConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AgentConfig::from_env().context("Invalid environment configuration")?,
    };

    if let Some(root) = &cli.root {
        config.workspace_root = root.clone();
    }
    if let Some(mode) = cli.embed_mode {
        config.embedding.mode = mode.into();
    }
    if let Some(max) = cli.max_iterations {
        config.orchestrator.max_iterations = max;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn open_workspace(config: &AgentConfig) -> Result<Workspace> {
    let embedder = config
        .embedding
        .build()
        .context("Failed to configure the embedder")?;
    Workspace::open(
        &config.workspace_root,
        embedder,
        WorkspaceOptions {
            chunker: config.chunker,
            persist_index: config.persist_index,
        },
    )
    .with_context(|| {
        format!(
            "Failed to open workspace {}",
            config.workspace_root.display()
        )
    })
}

async fn run_ask(args: AskArgs, config: &AgentConfig) -> Result<()> {
    let request = args.request.join(" ");
    let agent = FileAgent::from_config(config)
        .await
        .context("Failed to start the file agent")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted; stopping after the current step");
            on_signal.cancel();
        }
    });

    let interaction = agent.handle_with_cancel(&request, &cancel).await;
    log::debug!(
        "{:?} after {} iteration(s) in {}ms; longest path lock wait {}ms",
        interaction.status,
        interaction.iterations,
        interaction.elapsed_ms,
        path_lock_wait_ms_max()
    );
    if args.json {
        print_stdout(&serde_json::to_string_pretty(&interaction)?)?;
    } else {
        print_stdout(&interaction.answer)?;
    }

    if interaction.status == InteractionStatus::Failed {
        if let Some(error) = &interaction.error {
            eprintln!("Error: {error}");
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run_index(args: JsonArgs, config: &AgentConfig) -> Result<()> {
    let workspace = open_workspace(config)?;
    let stats = workspace.sync().await.context("Index sync failed")?;

    if args.json {
        print_stdout(&serde_json::to_string_pretty(&stats)?)?;
    } else {
        eprintln!(
            "Indexed {} files ({} unchanged, {} removed), {} chunks in {}ms",
            stats.indexed, stats.skipped, stats.removed, stats.chunks, stats.time_ms
        );
        for error in &stats.errors {
            eprintln!("  not indexed: {error}");
        }
    }
    Ok(())
}

fn run_ls(args: JsonArgs, config: &AgentConfig) -> Result<()> {
    let workspace = open_workspace(config)?;
    let files = workspace.list_files().context("Failed to list files")?;

    if args.json {
        print_stdout(&serde_json::to_string_pretty(&files)?)?;
    } else if !files.is_empty() {
        print_stdout(&files.join("\n"))?;
    }
    Ok(())
}

fn run_tools(config: &AgentConfig) -> Result<()> {
    let registry = ToolRegistry::new(open_workspace(config)?, config.top_k);
    print_stdout(&serde_json::to_string_pretty(&registry.catalogue())?)
}
