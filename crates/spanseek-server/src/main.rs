//! spanseek — hybrid passage retrieval over markdown corpora.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use spanseek_core::{DataPaths, Fingerprint, RunConfig};
use spanseek_embed::create_backend;
use spanseek_eval::{load_cases, GridOrchestrator, GridSpace};
use spanseek_index::{ArtifactStore, CorpusProcessor};
use spanseek_ingest::Corpus;
use spanseek_query::QueryRunner;
use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("SPANSEEK_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

/// Load `config.json` from the data root if present, otherwise defaults.
fn resolve_config(data_dir: &Path) -> anyhow::Result<RunConfig> {
    let path = data_dir.join("config.json");
    if path.exists() {
        Ok(RunConfig::load(&path)?)
    } else {
        Ok(RunConfig::default())
    }
}

/// Ensure the corpus for `dataset` is processed, returning everything a
/// query session needs.
fn prepare(
    paths: &DataPaths,
    dataset: &str,
    config: &RunConfig,
) -> anyhow::Result<(ArtifactStore, Corpus, Fingerprint)> {
    let corpus = Corpus::load(paths.datasets.join(dataset))?;
    let store = ArtifactStore::new(paths.clone());

    let embedder = create_backend(&config.embedding_model)?;
    let tokenizer = spanseek_core::LexicalTokenizer::new(config.tokenizer_config());
    let processor = CorpusProcessor::new(&store, embedder.as_ref(), &tokenizer);
    let fingerprint = processor.process(&corpus, config)?;

    Ok((store, corpus, fingerprint))
}

fn cmd_preprocess(paths: &DataPaths, dataset: &str) -> anyhow::Result<()> {
    let config = resolve_config(&paths.root)?;
    let (store, _, fingerprint) = prepare(paths, dataset, &config)?;
    println!("processed '{}' -> {}", dataset, store.dir(&fingerprint).display());
    Ok(())
}

fn cmd_query(paths: &DataPaths, dataset: &str, text: &str) -> anyhow::Result<()> {
    let config = resolve_config(&paths.root)?;
    let (store, _, fingerprint) = prepare(paths, dataset, &config)?;

    let runner = QueryRunner::open(
        &store,
        &fingerprint,
        &config,
        create_backend(&config.embedding_model)?,
    )?;
    let chunks = store.load_chunks(&fingerprint)?;

    for (i, hit) in runner.search(text)?.iter().take(config.top_k).enumerate() {
        if let Some(meta) = chunks.get(&hit.chunk_id) {
            println!(
                "{}. [{:.4}] {} [{}..{}]",
                i + 1,
                hit.combined_score,
                meta.location,
                meta.char_range.0,
                meta.char_range.1
            );
            println!("   {}", meta.text.replace('\n', " "));
        }
    }
    Ok(())
}

fn cmd_grid(paths: &DataPaths, dataset: &str, space_file: Option<&str>) -> anyhow::Result<()> {
    let space: GridSpace = match space_file {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => serde_json::from_str(include_str!("default_grid.json"))?,
    };

    let corpus = Corpus::load(paths.datasets.join(dataset))?;
    let cases = load_cases(paths, dataset)?;

    let executed = GridOrchestrator::new(paths.clone()).run(&corpus, &cases, &space)?;
    println!("grid sweep done, {executed} new runs in {}", paths.results.display());
    Ok(())
}

async fn cmd_serve(paths: &DataPaths, dataset: &str) -> anyhow::Result<()> {
    let config = resolve_config(&paths.root)?;
    let (store, corpus, fingerprint) = prepare(paths, dataset, &config)?;

    let runner = QueryRunner::open(
        &store,
        &fingerprint,
        &config,
        create_backend(&config.embedding_model)?,
    )?;
    let chunks = store.load_chunks(&fingerprint)?;

    let state = Arc::new(AppState::new(
        corpus.dataset_name.clone(),
        config,
        fingerprint,
        runner,
        chunks,
    ));
    let app = routes::build_router(state);

    let port: u16 = std::env::var("SPANSEEK_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("spanseek server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// First subdirectory under `datasets/`, for when no dataset is named.
fn default_dataset(paths: &DataPaths) -> anyhow::Result<String> {
    let mut dirs: Vec<String> = std::fs::read_dir(&paths.datasets)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    dirs.sort();
    dirs.into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no datasets found under {}", paths.datasets.display()))
}

fn print_help() {
    println!("spanseek — hybrid passage retrieval");
    println!();
    println!("Usage: spanseek [command]");
    println!();
    println!("Commands:");
    println!("  (none) / serve [dataset]   Start the search server");
    println!("  preprocess [dataset]       Chunk, embed and index a dataset");
    println!("  query <dataset> <text>     Run a single query");
    println!("  grid <dataset> [space]     Sweep a configuration grid (JSON space file)");
    println!("  help                       Show this help message");
    println!();
    println!("Environment:");
    println!("  SPANSEEK_DATA_DIR   Data root (default: ./data)");
    println!("  SPANSEEK_PORT       Server port (default: 8080)");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let paths = DataPaths::new(resolve_data_dir())?;
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "preprocess" => {
                let dataset = match args.get(2) {
                    Some(name) => name.clone(),
                    None => default_dataset(&paths)?,
                };
                return cmd_preprocess(&paths, &dataset);
            }
            "query" => {
                if args.len() < 4 {
                    eprintln!("Usage: spanseek query <dataset> <text>");
                    std::process::exit(1);
                }
                let text = args[3..].join(" ");
                return cmd_query(&paths, &args[2], &text);
            }
            "grid" => {
                if args.len() < 3 {
                    eprintln!("Usage: spanseek grid <dataset> [space-file]");
                    std::process::exit(1);
                }
                return cmd_grid(&paths, &args[2], args.get(3).map(|s| s.as_str()));
            }
            "serve" => {
                let dataset = match args.get(2) {
                    Some(name) => name.clone(),
                    None => default_dataset(&paths)?,
                };
                return cmd_serve(&paths, &dataset).await;
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'spanseek help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let dataset = default_dataset(&paths)?;
    cmd_serve(&paths, &dataset).await
}
