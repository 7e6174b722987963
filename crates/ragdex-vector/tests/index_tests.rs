use std::collections::BTreeMap;

use ragdex_core::types::{BackendKind, BackendParams, ChunkingSpec, Manifest};
use ragdex_vector::{IvfIndex, VectorIndex};

fn manifest(dim: usize, count: usize, backend: BackendKind) -> Manifest {
    Manifest {
        dim,
        count,
        model: "demo-model".into(),
        normalize: true,
        backend,
        params: BackendParams::default(),
        chunking: ChunkingSpec { mode: "fixed_chars".into(), size: 1000, overlap: 150 },
        metric: "ip".into(),
        created_at: "2026-01-01T00:00:00".into(),
        sources: BTreeMap::new(),
    }
}

fn basis(dim: usize, axis: usize) -> Vec<f32> {
    let mut v = vec![0f32; dim];
    v[axis] = 1.0;
    v
}

#[test]
fn flat_search_is_exact_and_ordered() {
    let mut index = VectorIndex::create(BackendKind::Flat, 4, &BackendParams::default());
    let vectors: Vec<Vec<f32>> = (0..4).map(|i| basis(4, i)).collect();
    index.add(&vectors).expect("add");
    assert_eq!(index.len(), 4);

    let hits = index.search(&basis(4, 2), 2, 10).expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].0, 2);
    assert!((hits[0].1 - 1.0).abs() < 1e-6);
    assert!(hits[0].1 >= hits[1].1);
}

#[test]
fn flat_returns_at_most_k() {
    let mut index = VectorIndex::create(BackendKind::Flat, 2, &BackendParams::default());
    index.add(&[vec![1.0, 0.0], vec![0.0, 1.0]]).expect("add");
    let hits = index.search(&[1.0, 0.0], 10, 1).expect("search");
    assert_eq!(hits.len(), 2, "never more hits than stored vectors");
}

#[test]
fn ivf_auto_trains_on_first_add() {
    let mut ivf = IvfIndex::new(3, 8);
    assert!(!ivf.is_trained());
    let vectors: Vec<Vec<f32>> = (0..3).map(|i| basis(3, i)).collect();
    ivf.add(&vectors).expect("first add trains");
    assert!(ivf.is_trained());
    // nlist clamps to the training batch size for tiny corpora.
    let hits = ivf.search(&basis(3, 1), 1, 8).expect("search");
    assert_eq!(hits[0].0, 1);
}

#[test]
fn ivf_second_add_does_not_retrain() {
    let mut ivf = IvfIndex::new(2, 2);
    ivf.add(&[vec![1.0, 0.0], vec![0.0, 1.0]]).expect("add");
    assert!(ivf.is_trained());
    ivf.add(&[vec![0.9, 0.1]]).expect("second add");
    assert_eq!(ivf.len(), 3);
    // Explicit retrain is rejected.
    assert!(ivf.train(&[vec![1.0, 0.0]]).is_err());
}

#[test]
fn ivf_search_before_add_fails() {
    let ivf = IvfIndex::new(2, 4);
    let err = ivf.search(&[1.0, 0.0], 5, 2).unwrap_err();
    assert!(matches!(err, ragdex_core::Error::Operation(_)));
}

#[test]
fn ivf_full_probe_finds_exact_match() {
    let mut index = VectorIndex::create(
        BackendKind::Ivf,
        4,
        &BackendParams { nlist: 4, ..BackendParams::default() },
    );
    // Unit vectors with distinct directions: the query's best inner
    // product is then with itself, regardless of probe order.
    let vectors: Vec<Vec<f32>> = (0..16)
        .map(|i| {
            let mut v = basis(4, i % 4);
            v[(i + 1) % 4] = 0.1 * (1.0 + i as f32 / 16.0);
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            v.iter().map(|x| x / norm).collect()
        })
        .collect();
    index.add(&vectors).expect("add");
    // Probing every list degenerates to exact search.
    let hits = index.search(&vectors[7], 1, 4).expect("search");
    assert_eq!(hits[0].0, 7);
}

#[test]
fn save_load_roundtrip_preserves_count_and_dim() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("demo.index.json");

    let mut index = VectorIndex::create(BackendKind::Ivf, 3, &BackendParams::default());
    let vectors: Vec<Vec<f32>> = (0..6).map(|i| basis(3, i % 3)).collect();
    index.add(&vectors).expect("add");
    index.save(&path).expect("save");

    let loaded =
        VectorIndex::load(&path, &manifest(3, 6, BackendKind::Ivf)).expect("load");
    assert_eq!(loaded.len(), 6);
    assert_eq!(loaded.dim(), 3);
    assert_eq!(loaded.kind(), BackendKind::Ivf);

    let before = index.search(&basis(3, 0), 3, 16).expect("search");
    let after = loaded.search(&basis(3, 0), 3, 16).expect("search");
    assert_eq!(before, after);
}

#[test]
fn load_with_mismatched_dim_is_corruption() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("demo.index.json");

    let mut index = VectorIndex::create(BackendKind::Flat, 4, &BackendParams::default());
    index.add(&[basis(4, 0)]).expect("add");
    index.save(&path).expect("save");

    let err = VectorIndex::load(&path, &manifest(8, 1, BackendKind::Flat)).unwrap_err();
    assert!(matches!(err, ragdex_core::Error::Corrupted(_)));
}

#[test]
fn load_with_mismatched_backend_is_corruption() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("demo.index.json");

    let mut index = VectorIndex::create(BackendKind::Flat, 2, &BackendParams::default());
    index.add(&[basis(2, 0)]).expect("add");
    index.save(&path).expect("save");

    let err = VectorIndex::load(&path, &manifest(2, 1, BackendKind::Ivf)).unwrap_err();
    assert!(matches!(err, ragdex_core::Error::Corrupted(_)));
}

#[test]
fn inconsistent_ivf_blob_is_corruption_not_a_panic() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("demo.index.json");

    // Claims to be trained but carries no centroids or posting lists;
    // searching such an index would walk past empty slices.
    std::fs::write(
        &path,
        r#"{"kind":"ivf","dim":2,"nlist":4,"trained":true,"centroids":[],"lists":[],"vectors":[1.0,0.0]}"#,
    )
    .expect("write blob");
    let err = VectorIndex::load(&path, &manifest(2, 1, BackendKind::Ivf)).unwrap_err();
    assert!(matches!(err, ragdex_core::Error::Corrupted(_)));
}

#[test]
fn posting_entry_past_stored_vectors_is_corruption() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("demo.index.json");

    std::fs::write(
        &path,
        r#"{"kind":"ivf","dim":2,"nlist":1,"trained":true,"centroids":[1.0,0.0],"lists":[[9]],"vectors":[1.0,0.0]}"#,
    )
    .expect("write blob");
    let err = VectorIndex::load(&path, &manifest(2, 1, BackendKind::Ivf)).unwrap_err();
    assert!(matches!(err, ragdex_core::Error::Corrupted(_)));
}

#[test]
fn truncated_vector_data_is_corruption() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("demo.index.json");

    // Three floats cannot be rows of a dim-2 matrix.
    std::fs::write(
        &path,
        r#"{"kind":"flat","dim":2,"nlist":0,"trained":false,"centroids":[],"lists":[],"vectors":[1.0,0.0,0.5]}"#,
    )
    .expect("write blob");
    let err = VectorIndex::load(&path, &manifest(2, 1, BackendKind::Flat)).unwrap_err();
    assert!(matches!(err, ragdex_core::Error::Corrupted(_)));
}

#[test]
fn unknown_backend_name_is_a_config_error() {
    let err = "hnswlib".parse::<BackendKind>().unwrap_err();
    assert!(matches!(err, ragdex_core::Error::InvalidConfig(_)));
}
