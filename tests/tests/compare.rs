use application::compare_service::{CompareService, CompareSettings};
use domain::models::Endpoint;
use domain::similarity::{ComparePolicy, MatchResult};
use domain::source::EmbeddingSource;
use infrastructure::embedder::Embedder;
use infrastructure::reference::ReferenceFile;
use infrastructure::triton_client::{TritonClient, TritonMode};
use reqwest::Client;
use shared::error::BenchError;
use std::io::Write;
use tests::{embeddings_server, openai_client};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(policy: ComparePolicy) -> CompareSettings {
    CompareSettings {
        input: "hello world".into(),
        batch: 1,
        policy,
        concurrent: false,
    }
}

fn pair(a: &MockServer, b: &MockServer) -> CompareService {
    let sources: Vec<Box<dyn EmbeddingSource>> = vec![
        Box::new(openai_client(a, "bge")) as Box<dyn EmbeddingSource>,
        Box::new(openai_client(b, "bge")),
    ];
    CompareService::new(Embedder::new(sources))
}

#[tokio::test]
async fn identical_endpoints_match() {
    let reference = embeddings_server(&[0.1, 0.2, 0.3]).await;
    let candidate = embeddings_server(&[0.1, 0.2, 0.3]).await;

    let report = pair(&reference, &candidate)
        .run(&settings(ComparePolicy::Auto))
        .await
        .unwrap();
    assert_eq!(report.verdict(), Some(true));
    assert_eq!(report.embeddings[0][0].vector, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn tiny_drift_fails_exact_but_not_cosine() {
    let reference = embeddings_server(&[0.1, 0.2, 0.3]).await;
    let candidate = embeddings_server(&[0.1, 0.2, 0.30001]).await;
    let service = pair(&reference, &candidate);

    let exact = service.run(&settings(ComparePolicy::Exact)).await.unwrap();
    assert_eq!(exact.verdict(), Some(false));

    let cosine = service.run(&settings(ComparePolicy::Cosine)).await.unwrap();
    match cosine.comparisons[0].result {
        MatchResult::Cosine { similarity } => {
            assert!(similarity > 0.999999 && similarity <= 1.0, "got {similarity}")
        }
        ref other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_requests_give_the_same_answer() {
    let reference = embeddings_server(&[0.5, 0.5]).await;
    let candidate = embeddings_server(&[0.5, 0.5]).await;
    let mut concurrent = settings(ComparePolicy::Auto);
    concurrent.concurrent = true;

    let report = pair(&reference, &candidate).run(&concurrent).await.unwrap();
    assert_eq!(report.verdict(), Some(true));
}

#[tokio::test]
async fn unequal_dimensions_are_reported() {
    let reference = embeddings_server(&[0.1, 0.2, 0.3]).await;
    let candidate = embeddings_server(&[0.1, 0.2]).await;

    let err = pair(&reference, &candidate)
        .run(&settings(ComparePolicy::Cosine))
        .await
        .unwrap_err();
    assert!(matches!(err, BenchError::DimensionMismatch { left: 3, right: 2 }));
}

#[tokio::test]
async fn unauthorized_candidate_discards_reference_result() {
    let reference = embeddings_server(&[0.1, 0.2, 0.3]).await;
    let candidate = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"message": "Invalid API key", "type": "invalid_request_error", "code": "invalid_api_key"}
        })))
        .mount(&candidate)
        .await;

    let err = pair(&reference, &candidate)
        .run(&settings(ComparePolicy::Auto))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn unknown_model_is_a_model_error() {
    let reference = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": {"message": "The model `bge` does not exist", "type": "invalid_request_error", "code": "model_not_found"}
        })))
        .mount(&reference)
        .await;
    let candidate = embeddings_server(&[0.1]).await;

    let err = pair(&reference, &candidate)
        .run(&settings(ComparePolicy::Auto))
        .await
        .unwrap_err();
    assert!(matches!(err, BenchError::Model { ref model, .. } if model == "bge"));
}

#[tokio::test]
async fn local_reference_against_serving_framework_uses_cosine() {
    let api = embeddings_server(&[0.1, 0.2, 0.3]).await;
    let triton = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/models/bge_large/infer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model_name": "bge_large",
            "outputs": [{
                "name": "embedding",
                "datatype": "FP32",
                "shape": [1, 3],
                "data": [0.1, 0.2, 0.3]
            }]
        })))
        .mount(&triton)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"embedding": [0.2, 0.4, 0.6]}}"#).unwrap();

    let sources: Vec<Box<dyn EmbeddingSource>> = vec![
        Box::new(openai_client(&api, "bge")) as Box<dyn EmbeddingSource>,
        Box::new(TritonClient::new(
            Client::new(),
            Endpoint::new(triton.uri(), "test"),
            "bge_large",
            TritonMode::Infer,
        )),
        Box::new(ReferenceFile::load(file.path()).await.unwrap()),
    ];
    let report = CompareService::new(Embedder::new(sources))
        .run(&settings(ComparePolicy::Auto))
        .await
        .unwrap();
    assert_eq!(report.comparisons.len(), 2);
    assert_eq!(report.verdict(), None);
    for comparison in &report.comparisons {
        match comparison.result {
            MatchResult::Cosine { similarity } => assert!((similarity - 1.0).abs() < 1e-6),
            ref other => panic!("unexpected {other:?}"),
        }
    }
}
