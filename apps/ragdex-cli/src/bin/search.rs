use std::env;
use std::sync::Arc;

use ragdex_core::config::Config;
use ragdex_embed::EmbedderCache;
use ragdex_hybrid::HybridSearcher;
use ragdex_store::IndexStore;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <index-name> <query> [--k N] [--mode hybrid|vector|lexical] [--version VID]", args[0]);
        eprintln!("Example: {} notes 'battery bank' --k 5 --mode hybrid", args[0]);
        std::process::exit(1);
    }
    let config = Config::load()?;
    let name = &args[1];
    let query = &args[2];
    let mut k = config.top_k();
    let mut mode = "hybrid".to_string();
    let mut version: Option<String> = None;
    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--k" => { if i + 1 < args.len() { k = args[i + 1].parse()?; i += 1; } else { eprintln!("Error: --k requires a number"); std::process::exit(1); } }
            "--mode" => { if i + 1 < args.len() { mode = args[i + 1].clone(); i += 1; } else { eprintln!("Error: --mode requires a value"); std::process::exit(1); } }
            "--version" => { if i + 1 < args.len() { version = Some(args[i + 1].clone()); i += 1; } else { eprintln!("Error: --version requires a value"); std::process::exit(1); } }
            other => { eprintln!("Error: unknown flag {}", other); std::process::exit(1); }
        }
        i += 1;
    }

    let store = IndexStore::new(config.indexes_dir())?;
    let loaded = match &version {
        Some(v) => store.load_version(name, v)?,
        None => store.load_latest(name)?,
    };
    println!("🔍 ragdex-search\n================");
    println!("Index: {}{}  ({} chunks, backend {})",
        name,
        version.as_deref().map(|v| format!("@{v}")).unwrap_or_default(),
        loaded.manifest.count,
        loaded.manifest.backend);
    println!("Query: {}  (mode {}, k {})", query, mode, k);

    let cache = EmbedderCache::hashing(loaded.manifest.dim);
    let embedder = cache
        .get(&loaded.manifest.model, loaded.manifest.normalize)
        .map_err(|e| anyhow::anyhow!("load embedder {}: {e}", loaded.manifest.model))?;
    let searcher = HybridSearcher::new(loaded, Arc::clone(&embedder));

    let hits = match mode.as_str() {
        "hybrid" => searcher.query(query, k)?,
        "vector" => searcher.vector_only(query, k)?,
        "lexical" => searcher.lexical_only(query, k),
        other => { eprintln!("Error: unknown mode {}", other); std::process::exit(1); }
    };

    println!("\n🔍 Found {} results for: \"{}\"", hits.len(), query);
    for (i, hit) in hits.iter().enumerate() {
        let score = hit.score.map(|s| format!("{s:.4}")).unwrap_or_else(|| "-".to_string());
        println!("\n  {}. score={}  id={}  source={:?}", i + 1, score, hit.id, hit.source);
        if let Some(text) = searcher.text_of(&hit.id) {
            let snippet: String = text.chars().take(160).collect();
            println!("     📝 {}", snippet);
        }
    }
    Ok(())
}
