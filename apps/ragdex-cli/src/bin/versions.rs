use std::env;

use ragdex_core::config::Config;
use ragdex_store::IndexStore;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args: Vec<String> = env::args().skip(1).collect();
    let config = Config::load()?;
    let store = IndexStore::new(config.indexes_dir())?;

    match args.first().map(String::as_str) {
        None => {
            let names = store.list_indexes()?;
            println!("📚 {} index(es) under {}", names.len(), store.indexes_dir().display());
            for name in names {
                let versions = store.list_versions(&name)?;
                match versions.first() {
                    Some(latest) => println!("  {}  ({} versions, latest {})", name, versions.len(), latest.version),
                    None => println!("  {}  (no committed versions)", name),
                }
            }
        }
        Some(name) => {
            let versions = store.list_versions(name)?;
            if versions.is_empty() {
                println!("No versions for index '{}'", name);
                return Ok(());
            }
            println!("📚 {} version(s) of '{}'", versions.len(), name);
            for v in &versions {
                println!("\n  {}  created {}", v.version, v.created_at);
                println!("     model {}  backend {}  chunking {} ({}/{})",
                    v.embed_model, v.index_backend, v.chunking, v.chunk_size, v.chunk_overlap);
                println!("     {} vectors from {} source rows  (build {})",
                    v.vector_count, v.doc_count.map(|d| d.to_string()).unwrap_or_else(|| "?".to_string()), v.build_id);
                if !v.notes.is_empty() {
                    println!("     📝 {}", v.notes);
                }
            }
        }
    }
    Ok(())
}
