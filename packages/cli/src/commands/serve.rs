use crate::config::Config;
use anyhow::Result;
use clap::Args;
use classdraft_common::{DocumentId, DocumentKind};
use classdraft_store::MemoryStore;
use colored::Colorize;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Create an empty assignment response with this id at startup
    #[arg(short, long = "document")]
    pub documents: Vec<String>,
}

pub async fn serve(args: ServeArgs, cwd: &str) -> Result<()> {
    let mut config = Config::load(cwd)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let store = Arc::new(MemoryStore::new(config.history_strategy()));
    for id in args.documents {
        store
            .create_document(DocumentId::new(id.clone()), DocumentKind::AssignmentResponse)
            .await?;
        println!("  {} Created document {}", "✓".green(), id.bright_white());
    }

    let addr = config.server_addr();
    println!(
        "{} in-memory store on {}",
        "Serving".bright_blue().bold(),
        format!("http://{}", addr).cyan()
    );
    println!("Press Ctrl+C to stop");

    classdraft_store::serve(store, &addr).await?;
    Ok(())
}
