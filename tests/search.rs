mod common;

use candle_core::Tensor;
use clipsearch::{Error, ImageTextModel, TensorStore};
use common::*;
use rstest::*;
use tempfile::TempDir;

#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn add_same_file_twice_keeps_one_record(temp_dir: TempDir) {
    let (searcher, _) = searcher(&temp_dir.path().join("db.safetensors"));
    let image = write_image(temp_dir.path(), "cat.png", 0.5);

    assert_eq!(searcher.add_image(&image).await.unwrap(), "cat.png");
    assert_eq!(searcher.add_image(&image).await.unwrap(), "cat.png");

    assert_eq!(searcher.store().len().await, 1);
    assert_eq!(searcher.store().names().await, ["cat.png"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn readd_overwrites_record(temp_dir: TempDir) {
    let (searcher, _) = searcher(&temp_dir.path().join("db.safetensors"));
    let image = write_image(temp_dir.path(), "cat.png", 0.1);
    searcher.add_image(&image).await.unwrap();
    let before = searcher.search("cat", 0.).await.unwrap();

    write_image(temp_dir.path(), "cat.png", 0.9);
    searcher.add_image(&image).await.unwrap();
    let after = searcher.search("cat", 0.).await.unwrap();

    assert_eq!(after.len(), 1);
    assert!(after[0].score > before[0].score);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn snapshot_survives_restart(temp_dir: TempDir) {
    let snapshot = temp_dir.path().join("embeddings").join("db.safetensors");
    let image = write_image(temp_dir.path(), "dog.jpg", 0.8);
    {
        let (searcher, _) = searcher(&snapshot);
        searcher.add_image(&image).await.unwrap();
    }

    assert!(snapshot.is_file());
    assert!(!temp_dir.path().join("embeddings").join("db.safetensors.tmp").exists());

    let (searcher, _) = searcher(&snapshot);
    assert!(searcher.store().contains("dog.jpg").await);
    let hits = searcher.search("dog", 50.).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].filename, "dog.jpg");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_file_is_not_found(temp_dir: TempDir) {
    let snapshot = temp_dir.path().join("db.safetensors");
    let (searcher, _) = searcher(&snapshot);
    let result = searcher.add_image(&temp_dir.path().join("missing.png")).await;

    assert!(matches!(result, Err(Error::ImageNotFound(_))));
    assert!(searcher.store().is_empty().await);
    assert!(!snapshot.exists());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn score_above_hundred_matches_nothing(temp_dir: TempDir) {
    let (searcher, _) = searcher(&temp_dir.path().join("db.safetensors"));
    for (name, weight) in [("a.png", 0.9), ("b.png", 5.0)] {
        searcher.add_image(&write_image(temp_dir.path(), name, weight)).await.unwrap();
    }

    assert!(searcher.search("anything", 100.1).await.unwrap().is_empty());
    assert_eq!(searcher.search("anything", 0.).await.unwrap().len(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn results_sorted_descending_and_filtered(temp_dir: TempDir) {
    let (searcher, _) = searcher(&temp_dir.path().join("db.safetensors"));
    for (name, weight) in [("low.png", -0.5), ("high.png", 0.9), ("mid.png", 0.2), ("top.png", 2.0)]
    {
        searcher.add_image(&write_image(temp_dir.path(), name, weight)).await.unwrap();
    }

    let hits = searcher.search("query", 0.).await.unwrap();
    let names = hits.iter().map(|hit| hit.filename.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["top.png", "high.png", "mid.png", "low.png"]);
    assert!(hits.windows(2).all(|w| w[0].score > w[1].score));
    assert!(hits.iter().all(|hit| (0.0..=100.0).contains(&hit.score)));

    // mid 约为 88.1，high 约为 99.99
    let hits = searcher.search("query", 90.).await.unwrap();
    let names = hits.iter().map(|hit| hit.filename.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["top.png", "high.png"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn empty_store_skips_model(temp_dir: TempDir) {
    let (searcher, model) = searcher(&temp_dir.path().join("db.safetensors"));

    assert!(searcher.search("cat", 0.).await.unwrap().is_empty());
    assert_eq!(model.forward_calls(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn one_forward_pass_per_query(temp_dir: TempDir) {
    let (searcher, model) = searcher(&temp_dir.path().join("db.safetensors"));
    for name in ["a.png", "b.png", "c.png"] {
        searcher.add_image(&write_image(temp_dir.path(), name, 0.3)).await.unwrap();
    }

    searcher.search("cat", 0.).await.unwrap();
    assert_eq!(model.forward_calls(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn extend_writes_one_snapshot(temp_dir: TempDir) {
    let snapshot = temp_dir.path().join("db.safetensors");
    let store = TensorStore::open(&snapshot).unwrap();
    let model = StubModel::default();
    let records = ["a.png", "b.png"]
        .into_iter()
        .map(|name| {
            let path = write_image(temp_dir.path(), name, 0.4);
            (name.to_string(), model.preprocess(&path).unwrap())
        })
        .collect::<Vec<_>>();

    store.extend(records).await.unwrap();
    store.extend(Vec::<(String, Tensor)>::new()).await.unwrap();

    let reopened = TensorStore::open(&snapshot).unwrap();
    assert_eq!(reopened.names().await, ["a.png", "b.png"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_snapshot_write_keeps_store_unchanged(temp_dir: TempDir) {
    let blocker = temp_dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();
    let (searcher, _) = searcher(&blocker.join("db.safetensors"));
    let image = write_image(temp_dir.path(), "cat.png", 0.9);

    assert!(searcher.add_image(&image).await.is_err());
    assert_eq!(searcher.store().len().await, 0);
    assert!(!searcher.store().contains("cat.png").await);
    assert!(searcher.search("cat", 0.).await.unwrap().is_empty());
}
