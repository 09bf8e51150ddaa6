use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use docqa_cli::{init_tracing, Settings};
use docqa_core::traits::{EmbeddingProvider, GenerationProvider};
use docqa_providers::{build_embedder, build_generator};
use docqa_qa::RetrievalQaEngine;
use docqa_vector::{StoreError, VectorStore};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = Settings::load()?;
    let question: String = env::args().skip(1).collect::<Vec<_>>().join(" ");

    let embedder: Arc<dyn EmbeddingProvider> = Arc::from(build_embedder(&settings.app.provider)?);
    let generator: Arc<dyn GenerationProvider> = Arc::from(build_generator(&settings.app.provider)?);

    let index_dir = settings.index_dir();
    let rt = tokio::runtime::Runtime::new()?;
    let store = match rt.block_on(VectorStore::load(&index_dir)) {
        Ok(store) => store,
        Err(StoreError::IndexNotFound { .. }) => {
            eprintln!("No index found at {}. Run docqa-index first.", index_dir.display());
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };
    drop(rt);

    let engine = RetrievalQaEngine::from_config(embedder, generator, &settings.app.retrieval);
    store.ensure_compatible(engine.embedder_id())?;
    let k = settings.app.retrieval.top_k;

    if !question.trim().is_empty() {
        match engine.answer(&question, &store, k) {
            Ok(answer) => println!("{answer}"),
            Err(e) => {
                println!("{e}");
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    println!("Ask about the indexed papers. Type 'exit' to quit.");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Your question: ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") {
            break;
        }
        if input.is_empty() {
            continue;
        }
        match engine.answer(input, &store, k) {
            Ok(answer) => println!("{answer}\n"),
            Err(e) => println!("{e}\n"),
        }
    }
    Ok(())
}
