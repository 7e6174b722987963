use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use ragdex_core::config::Config;
use ragdex_core::traits::Embedder;
use ragdex_embed::EmbedderCache;
use ragdex_eval::{compare, evaluate, load_gold, EvalReport};
use ragdex_store::{IndexStore, LoadedIndex};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <index-name[@version]> <gold.json> [--k N] [--compare other-name[@version]]", args[0]);
        eprintln!("Example: {} notes@20260101-120000 gold.json --k 5 --compare notes", args[0]);
        std::process::exit(1);
    }
    let config = Config::load()?;
    let target = &args[1];
    let gold_path = PathBuf::from(&args[2]);
    let mut k = config.top_k();
    let mut other: Option<String> = None;
    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--k" => { if i + 1 < args.len() { k = args[i + 1].parse()?; i += 1; } else { eprintln!("Error: --k requires a number"); std::process::exit(1); } }
            "--compare" => { if i + 1 < args.len() { other = Some(args[i + 1].clone()); i += 1; } else { eprintln!("Error: --compare requires a target"); std::process::exit(1); } }
            flag => { eprintln!("Error: unknown flag {}", flag); std::process::exit(1); }
        }
        i += 1;
    }

    let store = IndexStore::new(config.indexes_dir())?;
    let gold = load_gold(&gold_path)?;
    println!("📏 ragdex-evaluate\n==================");
    println!("Gold set: {} question(s) from {}", gold.len(), gold_path.display());

    let (left, left_embedder) = load_target(&store, target)?;
    match other {
        None => {
            let report = evaluate(&left, &left_embedder, &gold, k)?;
            print_report(target, &report);
        }
        Some(other) => {
            let (right, right_embedder) = load_target(&store, &other)?;
            let report = compare(&left, &left_embedder, &right, &right_embedder, &gold, k)?;
            print_report(target, &report.left);
            print_report(&other, &report.right);
            println!("\n⚖️  Compare {} -> {}", target, other);
            println!("  improvements: {}  regressions: {}  changed: {}",
                report.improvements, report.regressions, report.changed);
            for outcome in &report.per_question {
                let delta = outcome.delta.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
                println!("  Δ{:>5}  L={:?} R={:?}  {}", delta, outcome.left_rank, outcome.right_rank, outcome.question);
            }
        }
    }
    Ok(())
}

/// `name` or `name@version`.
fn load_target(store: &IndexStore, target: &str) -> anyhow::Result<(LoadedIndex, Arc<dyn Embedder>)> {
    let loaded = match target.split_once('@') {
        Some((name, version)) => store.load_version(name, version)?,
        None => store.load_latest(target)?,
    };
    let cache = EmbedderCache::hashing(loaded.manifest.dim);
    let embedder = cache
        .get(&loaded.manifest.model, loaded.manifest.normalize)
        .map_err(|e| anyhow::anyhow!("load embedder {}: {e}", loaded.manifest.model))?;
    Ok((loaded, embedder))
}

fn print_report(target: &str, report: &EvalReport) {
    println!("\n📊 {}  (k={}, {} questions)", target, report.k, report.total);
    println!("  recall@{}: {:.4}", report.k, report.recall_at_k);
    println!("  MRR:      {:.4}", report.mrr);
    println!("  NDCG:     {:.4}", report.ndcg);
    for outcome in &report.per_question {
        let rank = outcome.rank.map(|r| r.to_string()).unwrap_or_else(|| "miss".to_string());
        println!("  [{}] {}  → {}", if outcome.found { "✓" } else { "✗" }, outcome.question, rank);
    }
}
