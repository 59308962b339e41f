use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use docchat::ingest::pdf::{join_pages, PdfExtractor, TextExtractor};

#[derive(Parser, Debug)]
#[command(name = "extract")]
#[command(about = "Print the text an uploaded PDF would be stored as")]
struct Cli {
    /// PDF file to extract.
    pdf: PathBuf,
    /// Print per-page character counts instead of the text.
    #[arg(long, default_value_t = false)]
    summary: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let bytes = tokio::fs::read(&cli.pdf)
        .await
        .with_context(|| format!("failed reading {}", cli.pdf.display()))?;

    let pages = tokio::task::spawn_blocking(move || PdfExtractor.extract_pages(&bytes))
        .await
        .context("PDF extraction task panicked")??;

    if cli.summary {
        for (index, page) in pages.iter().enumerate() {
            println!("page {:>4}: {} chars", index + 1, page.chars().count());
        }
        println!("{} pages", pages.len());
    } else {
        print!("{}", join_pages(&pages));
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
