//! hsn-agent CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use hsn_agent::{
    config::Config,
    error::{Error, Result},
    mcp::McpServer,
    progress::LogWriterFactory,
    tools::{corpus, documents, hsn, ToolContext, ToolResponse, ToolStatus},
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "hsn-agent")]
#[command(version, about = "HSN code lookup and RAG corpus tools with MCP server support", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the raw tool response as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Load an HSN master file and report what was read
    Load {
        /// CSV/TSV or spreadsheet path (defaults to hsn.master_path)
        path: Option<PathBuf>,
    },

    /// Validate HSN codes
    Validate {
        /// Codes, separated by spaces and/or commas
        #[arg(required = true)]
        codes: Vec<String>,
    },

    /// Ask a question: code patterns are answered from the table, the rest from a corpus
    Query {
        /// The question
        query: String,

        /// Corpus to search
        #[arg(long, default_value = "")]
        corpus: String,
    },

    /// Manage corpora
    Corpus {
        #[command(subcommand)]
        action: CorpusAction,
    },

    /// Manage documents in a corpus
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Start MCP server on stdio
    Mcp,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CorpusAction {
    /// Create a corpus
    Create { name: String },

    /// List corpora
    List,

    /// Show a corpus and its documents
    Info { name: String },

    /// Delete a corpus and all its documents
    Delete {
        name: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum DocsAction {
    /// Import documents (paths, URLs, gs:// URIs, or Drive links)
    Add {
        /// Target corpus
        #[arg(long)]
        corpus: String,

        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Delete one document
    Delete {
        /// Corpus holding the document
        #[arg(long)]
        corpus: String,

        document_id: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory))
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { force } => return handle_init(cli.config.as_deref(), force),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "hsn-agent", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(cli.config.as_deref())?;
    let ctx = ToolContext::new(config);

    let response = match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),
        Commands::Load { path } => {
            let path = path.map(|p| p.display().to_string());
            hsn::load_hsn_master(&ctx, path.as_deref())
        }
        Commands::Validate { codes } => hsn::validate_hsn_code(&ctx, &codes.join(" ")),
        Commands::Query { query, corpus } => documents::rag_query(&ctx, &corpus, &query).await,
        Commands::Corpus { action } => match action {
            CorpusAction::Create { name } => corpus::create_corpus(&ctx, &name).await,
            CorpusAction::List => corpus::list_corpora(&ctx).await,
            CorpusAction::Info { name } => corpus::get_corpus_info(&ctx, &name).await,
            CorpusAction::Delete { name, yes } => corpus::delete_corpus(&ctx, &name, yes).await,
        },
        Commands::Docs { action } => match action {
            DocsAction::Add { corpus, paths } => documents::add_data(&ctx, &corpus, &paths).await,
            DocsAction::Delete {
                corpus,
                document_id,
            } => documents::delete_document(&ctx, &corpus, &document_id).await,
        },
        Commands::Mcp => {
            let server = McpServer::new(ctx);
            return server
                .run()
                .await
                .map_err(|e| Error::McpProtocol(e.to_string()));
        }
    };

    emit(&response, cli.json)
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_from(None),
    }
}

fn handle_init(path: Option<&Path>, force: bool) -> Result<()> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_config_path);
    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let base_dir = config_path.parent().map(Path::to_path_buf);
    let config = Config::init(base_dir)?;
    println!("✓ Wrote default config to {}", config.paths.config_file.display());
    Ok(())
}

/// Print a tool response; error responses become the process error
fn emit(response: &ToolResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else if !response.is_error() {
        print_response(response);
    }

    if response.is_error() {
        return Err(Error::Other(response.message.clone()));
    }
    Ok(())
}

fn field<'a>(response: &'a ToolResponse, key: &str) -> &'a [Value] {
    response
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn text<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

fn print_response(response: &ToolResponse) {
    let marker = match response.status {
        ToolStatus::Success | ToolStatus::PatternSuggestions => "✓",
        ToolStatus::Info => "ℹ",
        ToolStatus::Warning => "⚠",
        ToolStatus::Error => "✗",
    };

    // Validation results and pattern suggestions carry their own prose
    if response.status == ToolStatus::PatternSuggestions {
        println!("{}", response.message);
        return;
    }
    println!("{} {}", marker, response.message);

    for result in field(response, "results") {
        if let Some(message) = result.get("message").and_then(Value::as_str) {
            println!("\n{}", message);
        } else if let Some(reason) = result.get("reason").and_then(Value::as_str) {
            println!("\n{}: {}", text(result, "code"), reason);
        } else {
            println!(
                "\n[{:.3}] {}\n{}",
                result.get("score").and_then(Value::as_f64).unwrap_or(0.0),
                text(result, "source_uri"),
                text(result, "text")
            );
        }
    }

    for corpus in field(response, "corpora") {
        println!(
            "  {}  {}",
            text(corpus, "display_name"),
            text(corpus, "resource_name")
        );
    }

    for file in field(response, "files") {
        println!(
            "  {}  {}  {}",
            text(file, "file_id"),
            text(file, "display_name"),
            text(file, "source_uri")
        );
    }

    for invalid in field(response, "invalid_paths") {
        println!("  ✗ {} ({})", text(invalid, "path"), text(invalid, "reason"));
    }
}
