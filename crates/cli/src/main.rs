use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kurswissen_core::env_parse_with_default;
use kurswissen_dialogue::DialogueService;
use kurswissen_http::{create_router, AppState};
use kurswissen_oracle::{OracleClient, DEFAULT_MODEL};
use kurswissen_storage::Storage;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kurswissen")]
#[command(about = "Interview service eliciting tacit course knowledge", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server.
    Serve {
        /// Port to bind; defaults to KURSWISSEN_PORT or 3000.
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Fuzzy-search the catalog (debugging).
    Candidates {
        query: String,
        #[arg(short = 'k', long, default_value = "5")]
        limit: usize,
    },
    /// List stored session ids with their stage.
    Sessions,
}

fn get_api_key() -> Result<String> {
    std::env::var("KURSWISSEN_API_KEY")
        .map_err(|_| anyhow::anyhow!("KURSWISSEN_API_KEY environment variable must be set"))
}

fn get_base_url() -> String {
    std::env::var("KURSWISSEN_API_URL").unwrap_or_else(|_| "https://api.openai.com".to_owned())
}

fn get_model() -> String {
    std::env::var("KURSWISSEN_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_owned())
}

fn get_fallback_model() -> Option<String> {
    std::env::var("KURSWISSEN_FALLBACK_MODEL").ok().filter(|m| !m.is_empty())
}

fn get_data_dir() -> PathBuf {
    std::env::var("KURSWISSEN_DATA_DIR").map_or_else(
        |_| {
            dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("kurswissen")
        },
        PathBuf::from,
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    let storage = Arc::new(Storage::open(get_data_dir())?);

    match cli.command {
        Commands::Serve { port, host } => {
            let port = port.unwrap_or_else(|| env_parse_with_default("KURSWISSEN_PORT", 3000));
            let oracle = OracleClient::new(get_api_key()?, get_base_url(), storage.traces_dir())
                .with_model(get_model())
                .with_fallback_model(get_fallback_model());
            let dialogue =
                Arc::new(DialogueService::new(Arc::clone(&storage), Arc::new(oracle)));

            let state = Arc::new(AppState { dialogue, storage });
            let router = create_router(state);
            let addr = format!("{host}:{port}");
            tracing::info!("Starting HTTP server on {}", addr);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, router).await?;
        },
        Commands::Candidates { query, limit } => {
            let hits = storage.candidates(&query, limit);
            println!("{}", serde_json::to_string_pretty(&hits)?);
        },
        Commands::Sessions => {
            for (id, state) in storage.all_sessions() {
                println!("{id}\t{}\t{} turns", state.stage.name(), state.transcript.len());
            }
        },
    }

    Ok(())
}
