use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kbqa_audit::{AuditStoreRef, InMemoryAuditStore};
use kbqa_core::{
    BedrockAgentClient, EmbeddingClient, KbqaConfig, KnowledgeBase, TitanEmbeddingClient,
};
use kbqa_handler::http_server::{self, AppState};
use kbqa_handler::RequestHandler;
use serde_json::Value;
use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kbqa-daemon", about = "Knowledge-base question answering service")]
struct Args {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Keep audit records in memory instead of writing to DynamoDB
    #[arg(long, global = true)]
    in_memory_audit: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// HTTP server address
        #[arg(long, default_value = "127.0.0.1:8080")]
        http_addr: SocketAddr,
    },
    /// Run a single invocation and print the response envelope
    Invoke {
        /// JSON event file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        event: String,
    },
    /// Print the embedding vector of a text
    Embed { text: String },
    /// Let the knowledge base retrieve and generate in one call
    RetrieveAndGenerate {
        input: String,
        #[arg(short = 'n', long)]
        result_count: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = KbqaConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    info!(region = config.region(), "Loaded configuration");

    let audit_store: Option<AuditStoreRef> = if args.in_memory_audit {
        info!("Audit records will be kept in memory");
        Some(Arc::new(InMemoryAuditStore::default()))
    } else {
        None
    };

    match args.command {
        Command::Serve { http_addr } => {
            let handler = RequestHandler::from_config(&config, audit_store)?;
            let embedder = TitanEmbeddingClient::new(&config)
                .context("Failed to initialize embedding client")?;
            let state = AppState::new(Arc::new(handler), Arc::new(embedder));

            if let Err(e) = http_server::run_server(state, http_addr).await {
                error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        Command::Invoke { event } => {
            let handler = RequestHandler::from_config(&config, audit_store)?;
            let event = read_event(&event)?;
            let envelope = handler.handle(&event).await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        Command::Embed { text } => {
            let embedder = TitanEmbeddingClient::new(&config)
                .context("Failed to initialize embedding client")?;
            let embedding = embedder.embed(&text).await.context("Embedding request failed")?;
            println!("{}", serde_json::to_string(&embedding)?);
        }
        Command::RetrieveAndGenerate {
            input,
            result_count,
        } => {
            let knowledge_base = BedrockAgentClient::new(&config)
                .context("Failed to initialize knowledge-base client")?;
            let answer = knowledge_base
                .retrieve_and_generate(&input, result_count.unwrap_or(config.result_count()))
                .await
                .context("Retrieve-and-generate request failed")?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
    }

    Ok(())
}

fn read_event(source: &str) -> Result<Value> {
    let raw = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read event from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read event file {}", source))?
    };

    serde_json::from_str(&raw).context("Event is not valid JSON")
}
