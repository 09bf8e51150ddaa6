use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use docqa_cli::{init_tracing, Settings};
use docqa_core::data_processor::DataProcessor;
use docqa_core::traits::EmbeddingProvider;
use docqa_providers::{build_embedder, build_generator};
use docqa_qa::{IndexBuilder, SummaryCache, Summarizer};
use docqa_vector::VectorStore;

struct Args {
    papers_dir: Option<PathBuf>,
    limit: Option<usize>,
    rebuild: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args { papers_dir: None, limit: None, rebuild: false };
    let mut it = env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--rebuild" | "-r" => args.rebuild = true,
            "--limit" => {
                let n = it.next().context("--limit requires a number")?;
                args.limit = Some(n.parse().with_context(|| format!("--limit requires a number, got '{n}'"))?);
            }
            _ if !arg.starts_with('-') => args.papers_dir = Some(PathBuf::from(arg)),
            other => anyhow::bail!("unknown option '{other}'. Usage: docqa-index [papers_dir] [--limit N] [--rebuild]"),
        }
    }
    Ok(args)
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = Settings::load()?;
    let args = parse_args()?;
    let papers_dir = args.papers_dir.clone().unwrap_or_else(|| settings.papers_dir());
    let index_dir = settings.index_dir();
    let processor = DataProcessor::new(settings.app.chunking.clone())?;

    println!("Paper indexer\n=============");
    println!("Papers directory: {}", papers_dir.display());

    let mut files = processor.list_source_files(&papers_dir)?;
    if let Some(limit) = args.limit {
        println!("Limiting to {} files", limit);
        files.truncate(limit);
    }

    match build_generator(&settings.app.provider) {
        Ok(generator) => {
            let summarizer = Summarizer::new(Arc::from(generator), &settings.app.retrieval)?;
            let cache = SummaryCache::load(settings.summaries_file())?;
            for file in &files {
                match summarizer.summary_for(&cache, file) {
                    Ok(record) => println!("\n{}\n{}", record.file_name, record.summary),
                    Err(e) => warn!(path = %file.display(), error = %e, "summary failed"),
                }
            }
            info!(summaries = cache.len(), file = %cache.path().display(), "summaries up to date");
        }
        Err(e) => warn!(error = %e, "skipping summaries"),
    }

    let embedder: Arc<dyn EmbeddingProvider> = Arc::from(build_embedder(&settings.app.provider)?);
    let rt = tokio::runtime::Runtime::new()?;
    let existing = rt.block_on(VectorStore::open(&index_dir))?;
    if existing.is_built() && !args.rebuild {
        match existing.ensure_compatible(embedder.embedder_id()) {
            Ok(()) => {
                println!("\n✅ Index already built at {} ({} chunks). Use --rebuild to rebuild it.", index_dir.display(), existing.len());
                return Ok(());
            }
            Err(e) => println!("\n⚠️  {e}"),
        }
    }

    let report = match args.limit {
        Some(limit) => processor.process_directory_limited(&papers_dir, limit)?,
        None => processor.process_directory(&papers_dir)?,
    };
    for (path, e) in &report.failures {
        println!("⚠️  Skipped {}: {}", path.display(), e);
    }
    if report.documents.is_empty() {
        println!("\n⚠️  No documents could be indexed from {}; nothing was written.", papers_dir.display());
        return Ok(());
    }

    let pb = ProgressBar::new(report.documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents {msg}")?
            .progress_chars("#>-"),
    );
    let mut store = VectorStore::new();
    let inserted = rt.block_on(IndexBuilder::new(embedder).build_and_persist(&report.documents, &mut store, &index_dir, |doc| {
        pb.set_message(doc.document_id.clone());
        pb.inc(1);
    }))?;
    pb.finish_with_message("done");

    println!("\n✅ Indexing completed successfully!");
    println!("📊 Indexed {} chunks from {} documents into {}", inserted, report.documents.len(), index_dir.display());
    println!("\n💡 To ask questions, use: cargo run --bin docqa-ask");
    Ok(())
}
