use clap::Parser;
use page_navigator_rs::config::NavConfig;
use page_navigator_rs::render::ViewMode;
use page_navigator_rs::server::{AppState, startup};
use page_navigator_rs::store::{Document, MemoryStore};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "page-navigator", about = "Level-paginated document tree browser")]
struct Cli {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Items per page for users without a stored preference
    #[arg(long, default_value_t = 10)]
    per_page: usize,

    /// Document kind to browse
    #[arg(long, default_value = "page")]
    kind: String,

    /// Base URL prefix for emitted links
    #[arg(long, default_value = "/admin")]
    base_url: String,

    /// "standalone" or "embedded"
    #[arg(long, default_value = "standalone")]
    view_mode: String,

    /// JSON file with seed documents
    #[arg(long)]
    documents: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let view_mode = ViewMode::parse(&cli.view_mode)
        .ok_or_else(|| anyhow::anyhow!("invalid view mode: {}", cli.view_mode))?;
    let config = NavConfig {
        host: cli.host,
        port: cli.port,
        default_per_page: cli.per_page,
        document_kind: cli.kind.clone(),
        view_mode,
        base_url: cli.base_url,
        ..NavConfig::default()
    };

    let store = MemoryStore::new(cli.kind);
    if let Some(path) = cli.documents {
        let json = std::fs::read_to_string(&path)?;
        let docs: Vec<Document> = serde_json::from_str(&json)?;
        println!("Loaded {} documents from {}", docs.len(), path.display());
        store.load(docs);
    }

    let state = AppState::new(config.clone(), Arc::new(store))?;
    let nonce = state.sessions.issue(1, true);
    println!("Editor session nonce: {}", nonce);

    actix_web::rt::System::new().block_on(async move {
        startup(config, state).await?;
        anyhow::Ok(())
    })
}
