use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use ragdex_core::config::Config;
use ragdex_core::types::{BackendKind, BackendParams, BuildConfig, ChunkingSpec};
use ragdex_embed::EmbedderCache;
use ragdex_store::source::read_lines_source;
use ragdex_store::{BuildCoordinator, IndexStore, MemoryJobStore, ProgressBus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("Usage: ragdex-build <source-file> [--name N] [--mode fixed_chars|sentences|headings] [--size S] [--overlap O] [--backend flat|ivf] [--model M] [--nlist N] [--no-normalize]");
        std::process::exit(1);
    }

    let defaults = config.chunking();
    let mut source_path = None;
    let mut name = None;
    let mut mode = defaults.mode;
    let mut size = defaults.size;
    let mut overlap = defaults.overlap;
    let mut backend: BackendKind = config.default_backend()?;
    let mut model = config.embed_model();
    let mut normalize = config.embed_normalize();
    let mut params = BackendParams::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--name" => { name = Some(take_value(&args, &mut i, "--name")?); }
            "--mode" => { mode = take_value(&args, &mut i, "--mode")?; }
            "--size" => { size = take_value(&args, &mut i, "--size")?.parse()?; }
            "--overlap" => { overlap = take_value(&args, &mut i, "--overlap")?.parse()?; }
            "--backend" => { backend = take_value(&args, &mut i, "--backend")?.parse()?; }
            "--model" => { model = take_value(&args, &mut i, "--model")?; }
            "--nlist" => { params.nlist = take_value(&args, &mut i, "--nlist")?.parse()?; }
            "--nprobe" => { params.nprobe = take_value(&args, &mut i, "--nprobe")?.parse()?; }
            "--no-normalize" => normalize = false,
            _ if !args[i].starts_with('-') => source_path = Some(PathBuf::from(&args[i])),
            other => { eprintln!("Error: unknown flag {}", other); std::process::exit(1); }
        }
        i += 1;
    }
    let Some(source_path) = source_path else {
        eprintln!("Error: a source file is required");
        std::process::exit(1);
    };
    let name = name.unwrap_or_else(|| {
        source_path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| "index".to_string())
    });

    println!("ragdex-build\n============");
    println!("Source: {}", source_path.display());
    println!("Index:  {}  (backend {}, model {})", name, backend, model);

    let source = read_lines_source(&source_path)?;
    println!("📄 {} rows from {}", source.rows.len(), source.name);

    let dim = config.embed_dim();
    let store = IndexStore::new(config.indexes_dir())?;
    let progress = Arc::new(ProgressBus::new());
    let jobs = Arc::new(MemoryJobStore::new());
    let sink: Arc<dyn ragdex_core::traits::ProgressSink> = progress.clone();
    let job_store: Arc<dyn ragdex_core::traits::JobStore> = jobs.clone();
    let coordinator = Arc::new(BuildCoordinator::new(
        store,
        Arc::new(EmbedderCache::hashing(dim)),
        sink,
        job_store,
    ));

    let build_id = format!("build-{}", Utc::now().format("%Y%m%d-%H%M%S"));
    jobs.create(&build_id);
    let build_config = BuildConfig {
        index_name: name.clone(),
        model,
        normalize,
        backend,
        chunking: ChunkingSpec { mode, size, overlap },
        params,
    };
    let handle = coordinator.spawn(build_id.clone(), build_config, source);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    let mut rx = progress.subscribe(&build_id).ok_or_else(|| anyhow::anyhow!("progress channel already taken"))?;
    let mut failed = false;
    while let Some(message) = rx.recv().await {
        let terminal = ProgressBus::is_terminal(&message);
        if message.starts_with("ERROR") {
            failed = true;
            spinner.finish_and_clear();
            eprintln!("❌ {}", message);
        } else if message == "DONE" {
            spinner.finish_with_message("done");
        } else {
            spinner.set_message(message);
        }
        if terminal {
            break;
        }
    }
    progress.finish(&build_id);
    handle.await?;
    if failed {
        std::process::exit(1);
    }

    let versions = coordinator.store().list_versions(&name)?;
    if let Some(latest) = versions.first() {
        println!("\n✅ Build {} committed version {}", build_id, latest.version);
        println!("📊 {} vectors, backend {}, chunking {} ({}/{})",
            latest.vector_count, latest.index_backend, latest.chunking, latest.chunk_size, latest.chunk_overlap);
    }
    println!("\n💡 To search, use: cargo run --bin ragdex-search '{}' '<query>'", name);
    Ok(())
}

fn take_value(args: &[String], i: &mut usize, flag: &str) -> anyhow::Result<String> {
    if *i + 1 < args.len() {
        *i += 1;
        Ok(args[*i].clone())
    } else {
        Err(anyhow::anyhow!("{} requires a value", flag))
    }
}
