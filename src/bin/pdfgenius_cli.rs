use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pdfgenius::{
    config::Config,
    embedding::build_embedding_client,
    index::EmbeddingStore,
    ingestion::{IngestionService, IngestionSettings},
    logging,
    pipeline::{AnswerPipeline, PipelineSettings},
    summarization::SummarizerService,
};

#[derive(Parser)]
#[command(
    name = "pdfgenius-cli",
    about = "Build the PDFGenius index and ask questions without the HTTP server"
)]
struct Cli {
    /// Directory holding the persisted index (defaults to INDEX_DIR).
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the index from every PDF in the upload directory.
    Ingest {
        /// Directory scanned for PDFs (defaults to UPLOAD_DIR).
        #[arg(long)]
        upload_dir: Option<PathBuf>,
    },
    /// Answer a single question and print the answer.
    Ask {
        /// Question to answer.
        query: String,
    },
}

#[tokio::main]
async fn main() {
    logging::init_cli_tracing();
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(index_dir) = cli.index_dir {
        config.index_dir = index_dir;
    }

    let embedding_client =
        build_embedding_client(&config).context("failed to build embedding client")?;
    let store = Arc::new(EmbeddingStore::new(
        embedding_client,
        config.index_dir.clone(),
        config.retrieval_score_threshold,
    ));

    match cli.command {
        Command::Ingest { upload_dir } => {
            if let Some(upload_dir) = upload_dir {
                config.upload_dir = upload_dir;
            }
            let service = IngestionService::new(store, IngestionSettings::from(&config));
            let outcome = service.rebuild().await.with_context(|| {
                format!("failed to index {}", config.upload_dir.display())
            })?;
            println!(
                "Indexed {} chunks from {} document(s) into {}",
                outcome.chunk_count,
                outcome.documents,
                config.index_dir.display()
            );
            for skipped in &outcome.skipped_documents {
                println!("Skipped unreadable document: {skipped}");
            }
        }
        Command::Ask { query } => {
            let pipeline = AnswerPipeline::new(
                store,
                Arc::new(SummarizerService::from_config(&config)),
                PipelineSettings::from(&config),
            );
            match pipeline.answer(&query).await {
                Ok(answer) => println!("{answer}"),
                Err(error) => bail!("{}", error.user_message()),
            }
        }
    }
    Ok(())
}
