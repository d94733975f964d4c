//! Integration tests for strategy selection and configuration loading

mod common;

use common::{query, scorer, FakeChannel, FakeJudge};
use hybrid_retrieval::{
    channels::RetrievalChannel, ChannelKind, HybridConfig, RetrievalError, RetrievalMethod,
    RetrievalService, StrategyKind,
};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

fn channels() -> (Arc<dyn RetrievalChannel>, Arc<dyn RetrievalChannel>) {
    let dense: Arc<dyn RetrievalChannel> =
        Arc::new(FakeChannel::new(ChannelKind::Dense, &[("A", 0.9), ("B", 0.5)]));
    let sparse: Arc<dyn RetrievalChannel> =
        Arc::new(FakeChannel::new(ChannelKind::Sparse, &[("B", 0.8), ("C", 0.6)]));
    (dense, sparse)
}

#[tokio::test]
async fn test_dense_strategy_ignores_sparse_and_judge() {
    let (dense, sparse) = channels();
    let judge = Arc::new(FakeJudge::new(1, 5));
    let config = HybridConfig::default();
    let scorer = scorer(&judge, &config);

    let service =
        RetrievalService::from_name("dense", dense, Some(sparse), Some(scorer), Arc::new(config))
            .unwrap();
    assert_eq!(service.kind(), StrategyKind::Dense);

    let results = service.retrieve(&query("meaning"), "docs", 10).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.doc_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert!(results.iter().all(|r| r.retrieval_method == RetrievalMethod::Dense));
    assert!(results.iter().all(|r| r.alpha == 1.0 && r.sparse_rank.is_none()));
    assert_eq!(judge.calls(), 0);
}

#[tokio::test]
async fn test_hybrid_strategy_through_service() {
    let (dense, sparse) = channels();
    let judge = Arc::new(FakeJudge::new(3, 2));
    let config = HybridConfig::default();
    let scorer = scorer(&judge, &config);

    let service = RetrievalService::new(
        StrategyKind::Hybrid,
        dense,
        Some(sparse),
        Some(scorer),
        Arc::new(config),
    )
    .unwrap();

    let results = service.retrieve(&query("meaning"), "docs", 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].doc_id, "B");
    assert_eq!(judge.calls(), 1);
}

#[tokio::test]
async fn test_service_cancellation() {
    let (dense, sparse) = channels();
    let judge = Arc::new(FakeJudge::new(3, 2));
    let config = HybridConfig::default();
    let scorer = scorer(&judge, &config);
    let service =
        RetrievalService::from_name("hybrid", dense, Some(sparse), Some(scorer), Arc::new(config))
            .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = assert_err!(
        service
            .retrieve_with_cancel(&query("meaning"), "docs", 5, &cancel)
            .await
    );
    assert!(matches!(err, RetrievalError::Cancelled));
    assert_eq!(judge.calls(), 0);
}

#[test]
fn test_unknown_strategy_is_config_error() {
    let (dense, sparse) = channels();
    let result = RetrievalService::from_name(
        "reciprocal-rank",
        dense,
        Some(sparse),
        None,
        Arc::new(HybridConfig::default()),
    );
    assert!(matches!(result, Err(RetrievalError::ConfigError(_))));
}

#[test]
fn test_hybrid_requires_sparse_channel() {
    let (dense, _) = channels();
    let result = RetrievalService::new(
        StrategyKind::Hybrid,
        dense,
        None,
        None,
        Arc::new(HybridConfig::default()),
    );
    assert!(matches!(result, Err(RetrievalError::ConfigError(_))));
}

#[test]
fn test_config_file_drives_tuning() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[weights]
dense_weight_default = 0.7
sparse_weight_default = 0.3

[retrieval]
use_dynamic_tuning = false
"#,
    )
    .unwrap();

    let config = assert_ok!(HybridConfig::load(Some(path)));
    assert_eq!(config.weights.dense_weight_default, 0.7);
    assert!(!config.retrieval.use_dynamic_tuning);
    assert_eq!(config.retrieval.top_k_dense, 20);

    // No scorer is needed once tuning is off
    let (dense, sparse) = channels();
    assert!(RetrievalService::new(StrategyKind::Hybrid, dense, Some(sparse), None, Arc::new(config)).is_ok());
}

#[tokio::test]
async fn test_fixed_alpha_from_config() {
    let mut config = HybridConfig::default();
    config.retrieval.use_dynamic_tuning = false;
    config.weights.dense_weight_default = 1.0;
    config.weights.sparse_weight_default = 0.0;

    let (dense, sparse) = channels();
    let service =
        RetrievalService::new(StrategyKind::Hybrid, dense, Some(sparse), None, Arc::new(config))
            .unwrap();

    let results = service.retrieve(&query("meaning"), "docs", 10).await.unwrap();
    assert_eq!(results[0].doc_id, "A");
    assert!(results.iter().all(|r| r.alpha == 1.0));
}
