use std::sync::Arc;
use std::time::Duration;

use anyhow::Result as AnyResult;
use ragdex_core::traits::Embedder;
use ragdex_core::types::{BackendKind, BuildConfig, ChunkingSpec, SourceRows};
use ragdex_core::Error;
use ragdex_embed::{EmbedderCache, HashEmbedder};
use ragdex_store::{BuildCoordinator, IndexStore, JobStatus, MemoryJobStore, ProgressBus};

fn build_config(index_name: &str) -> BuildConfig {
    BuildConfig {
        index_name: index_name.to_string(),
        model: "hash-demo".to_string(),
        normalize: true,
        backend: BackendKind::Flat,
        chunking: ChunkingSpec { mode: "fixed_chars".into(), size: 200, overlap: 20 },
        params: ragdex_core::types::BackendParams::default(),
    }
}

fn source_rows() -> SourceRows {
    SourceRows {
        name: "notes.txt".to_string(),
        stored_name: "notes.txt".to_string(),
        sha256: Some("deadbeef".to_string()),
        rows: vec![
            ("0".to_string(), "solar panels charge the battery bank".to_string()),
            ("1".to_string(), "rainwater is filtered before storage".to_string()),
            ("2".to_string(), "the root cellar stays cool in summer".to_string()),
        ],
    }
}

fn coordinator(
    dir: &std::path::Path,
    embedders: EmbedderCache,
) -> (Arc<BuildCoordinator>, Arc<ProgressBus>, Arc<MemoryJobStore>) {
    let store = IndexStore::new(dir).expect("store");
    let progress = Arc::new(ProgressBus::new());
    let jobs = Arc::new(MemoryJobStore::new());
    let sink: Arc<dyn ragdex_core::traits::ProgressSink> = progress.clone();
    let job_store: Arc<dyn ragdex_core::traits::JobStore> = jobs.clone();
    let coordinator = Arc::new(BuildCoordinator::new(store, Arc::new(embedders), sink, job_store));
    (coordinator, progress, jobs)
}

async fn drain(progress: &ProgressBus, build_id: &str) -> Vec<String> {
    let mut rx = progress.subscribe(build_id).expect("receiver");
    let mut messages = Vec::new();
    while let Some(message) = rx.recv().await {
        let terminal = ProgressBus::is_terminal(&message);
        messages.push(message);
        if terminal {
            break;
        }
    }
    progress.finish(build_id);
    messages
}

#[tokio::test]
async fn build_publishes_stage_messages_and_commits_a_version() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (coordinator, progress, jobs) = coordinator(tmp.path(), EmbedderCache::hashing(32));
    jobs.create("job-1");

    let summary = coordinator
        .run_build("job-1", &build_config("notes"), &source_rows())
        .await
        .expect("build succeeds");

    assert_eq!(summary.vector_count, 3);
    assert_eq!(summary.index_backend, BackendKind::Flat);
    assert_eq!(summary.build_id, "job-1");
    assert_eq!(summary.doc_count, Some(3));

    let messages = drain(&progress, "job-1").await;
    assert_eq!(
        messages,
        vec![
            "Reading file",
            "Chunking",
            "Embedding 3 with hash-demo",
            "Building index [flat]",
            "DONE",
        ]
    );

    let job = jobs.get("job-1").expect("job record");
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.index_name.as_deref(), Some("notes"));

    let loaded = coordinator.store().load_latest("notes").expect("latest");
    assert_eq!(loaded.manifest.count, 3);
    assert_eq!(loaded.manifest.model, "hash-demo");
    assert_eq!(loaded.ids, vec!["0#0", "1#0", "2#0"]);
    assert!(loaded.manifest.sources.contains_key("notes.txt"));

    let versions = coordinator.store().list_versions("notes").expect("versions");
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version, summary.version);
}

#[tokio::test]
async fn built_index_answers_queries_with_the_same_embedder() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (coordinator, _progress, jobs) = coordinator(tmp.path(), EmbedderCache::hashing(64));
    jobs.create("job-1");

    coordinator
        .run_build("job-1", &build_config("notes"), &source_rows())
        .await
        .expect("build succeeds");

    let loaded = coordinator.store().load_latest("notes").expect("latest");
    let embedder = HashEmbedder::new("hash-demo", 64, true);
    let q = embedder
        .embed_batch(&["rainwater is filtered before storage".to_string()])
        .expect("embed")
        .remove(0);
    let hits = loaded.index.search(&q, 1, 10).expect("search");
    assert_eq!(loaded.ids[hits[0].0], "1#0");
}

#[tokio::test]
async fn invalid_config_ends_in_error_status_and_terminal_message() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (coordinator, progress, jobs) = coordinator(tmp.path(), EmbedderCache::hashing(32));
    jobs.create("job-1");

    let mut config = build_config("notes");
    config.chunking.size = 0;
    let err = coordinator.run_build("job-1", &config, &source_rows()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));

    let messages = drain(&progress, "job-1").await;
    assert!(messages.last().expect("terminal").starts_with("ERROR"));
    assert_eq!(jobs.get("job-1").expect("job").status, JobStatus::Error);

    // Nothing was committed for the failed build.
    let err = coordinator.store().load_latest("notes").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn failing_embedder_surfaces_as_operation_error() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cache = EmbedderCache::new(|_, _| anyhow::bail!("model weights missing"));
    let (coordinator, progress, jobs) = coordinator(tmp.path(), cache);
    jobs.create("job-1");

    let err = coordinator
        .run_build("job-1", &build_config("notes"), &source_rows())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Operation(_)));
    assert!(err.to_string().contains("model weights missing"));

    let messages = drain(&progress, "job-1").await;
    assert!(messages.contains(&"Embedding 3 with hash-demo".to_string()));
    assert!(messages.last().expect("terminal").starts_with("ERROR"));
    assert_eq!(jobs.get("job-1").expect("job").status, JobStatus::Error);
}

/// Embedder that parks until allowed to run, to hold a build in flight.
struct GatedEmbedder {
    inner: HashEmbedder,
    hold: Duration,
}

impl Embedder for GatedEmbedder {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn embed_batch(&self, texts: &[String]) -> AnyResult<Vec<Vec<f32>>> {
        std::thread::sleep(self.hold);
        self.inner.embed_batch(texts)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overlapping_build_for_same_index_is_rejected() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cache = EmbedderCache::new(|model_id, normalize| {
        Ok(Arc::new(GatedEmbedder {
            inner: HashEmbedder::new(model_id, 32, normalize),
            hold: Duration::from_millis(400),
        }) as Arc<dyn Embedder>)
    });
    let (coordinator, progress, jobs) = coordinator(tmp.path(), cache);
    jobs.create("job-slow");
    jobs.create("job-overlap");

    let first = coordinator.spawn("job-slow".to_string(), build_config("notes"), source_rows());
    tokio::time::sleep(Duration::from_millis(100)).await;

    let err = coordinator
        .run_build("job-overlap", &build_config("notes"), &source_rows())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("already in flight"));

    let overlap_messages = drain(&progress, "job-overlap").await;
    assert!(overlap_messages.last().expect("terminal").starts_with("ERROR"));
    assert_eq!(jobs.get("job-overlap").expect("job").status, JobStatus::Error);

    first.await.expect("first build task");
    assert_eq!(jobs.get("job-slow").expect("job").status, JobStatus::Done);

    // The lease is released; a follow-up build for the same name succeeds.
    jobs.create("job-after");
    coordinator
        .run_build("job-after", &build_config("notes"), &source_rows())
        .await
        .expect("second build succeeds after the first finishes");
    assert_eq!(coordinator.store().list_versions("notes").expect("versions").len(), 2);
}

#[tokio::test]
async fn builds_for_different_indexes_run_independently() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let (coordinator, _progress, jobs) = coordinator(tmp.path(), EmbedderCache::hashing(32));
    jobs.create("job-a");
    jobs.create("job-b");

    let a = coordinator.spawn("job-a".to_string(), build_config("alpha"), source_rows());
    let b = coordinator.spawn("job-b".to_string(), build_config("beta"), source_rows());
    a.await.expect("task a");
    b.await.expect("task b");

    assert_eq!(jobs.get("job-a").expect("job").status, JobStatus::Done);
    assert_eq!(jobs.get("job-b").expect("job").status, JobStatus::Done);
    assert_eq!(coordinator.store().list_indexes().expect("names"), vec!["alpha", "beta"]);
}
