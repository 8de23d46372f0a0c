#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Full pipeline against a mocked Ollama server, plus opt-in checks against a real instance
// Run the real-instance tests with: cargo test --test integration_ollama -- --ignored

use serde_json::json;
use std::env;
use std::time::Duration;
use tempfile::TempDir;
use tracing::info;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use talent_search::config::{Config, GenerationProvider, OllamaConfig};
use talent_search::database::sqlite::NewResume;
use talent_search::embeddings::OllamaClient;
use talent_search::indexer::Indexer;
use talent_search::search::{SearchEngine, SearchOptions};

const DIMENSION: usize = 64;
const TEST_MODEL: &str = "nomic-embed-text:latest";
const DEFAULT_OLLAMA_HOST: &str = "localhost";
const DEFAULT_OLLAMA_PORT: u16 = 11434;

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok();
}

fn axis(index: usize) -> Vec<f32> {
    let mut vector = vec![0.0; DIMENSION];
    vector[index] = 1.0;
    vector
}

fn config_for(server: &MockServer, temp_dir: &TempDir) -> Config {
    let address = server.address();
    let mut config = Config::with_base_dir(temp_dir.path());
    config.ollama = OllamaConfig {
        host: address.ip().to_string(),
        port: address.port(),
        model: "test-embed".to_string(),
        embedding_dimension: DIMENSION as u32,
        timeout_seconds: 5,
        ..OllamaConfig::default()
    };
    config.generation.provider = GenerationProvider::Ollama;
    config.generation.model = "test-chat".to_string();
    config
}

fn resume(name: &str, skills: &[&str], summary: &str) -> NewResume {
    NewResume {
        name: name.to_string(),
        skills: skills.iter().map(|s| s.to_string()).collect(),
        experience: Some("4 years".to_string()),
        education: None,
        contact: Default::default(),
        summary: Some(summary.to_string()),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn search_pipeline_over_mocked_ollama() {
    init_test_tracing();
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_string_contains("python"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [axis(0)]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_string_contains("figma"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [axis(1)]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("test-chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "Ana is the strongest match.", "done": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, &temp_dir);
    let indexer = Indexer::from_config(&config).await.expect("indexer");
    assert!(
        indexer
            .upsert(&resume("Ana", &["python", "sql"], "Backend developer"))
            .await
            .expect("upsert")
            .indexed
    );
    assert!(
        indexer
            .upsert(&resume("Dee", &["figma"], "Product designer"))
            .await
            .expect("upsert")
            .indexed
    );

    let engine = SearchEngine::from_config(&config).await.expect("engine");
    let response = engine
        .search("python engineer", &SearchOptions::default())
        .await
        .expect("search");

    assert_eq!(response.matches[0].name, "Ana");
    assert!(response.matches[0].score > 1.0);
    assert_eq!(
        response.analysis.as_deref(),
        Some("Ana is the strongest match.")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_embedder_leaves_resume_pending_until_repair() {
    init_test_tracing();
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config_for(&server, &temp_dir);

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .mount(&server)
        .await;

    let indexer = Indexer::from_config(&config).await.expect("indexer");
    let outcome = indexer
        .upsert(&resume("Ana", &["python"], "Backend developer"))
        .await
        .expect("write succeeds without embedding");
    assert!(!outcome.indexed);
    assert_eq!(indexer.pending_resumes().await.expect("pending").len(), 1);

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [axis(2)]})))
        .mount(&server)
        .await;

    assert_eq!(indexer.repair().await.expect("repair"), 1);
    assert!(indexer.verify().await.expect("verify").is_consistent);
}

fn create_integration_test_client() -> OllamaClient {
    let host = env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_OLLAMA_HOST.to_string());
    let port = env::var("OLLAMA_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_OLLAMA_PORT);
    let model = env::var("OLLAMA_MODEL").unwrap_or_else(|_| TEST_MODEL.to_string());

    let config = OllamaConfig {
        host,
        port,
        model,
        ..OllamaConfig::default()
    };

    OllamaClient::new(&config)
        .expect("Failed to create Ollama client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(3)
}

#[test]
#[ignore = "requires a running Ollama instance"]
fn real_ollama_health_check() {
    init_test_tracing();
    let client = create_integration_test_client();

    info!("Testing health check against real Ollama instance");
    client.health_check().expect("Ollama should be healthy");
}

#[test]
#[ignore = "requires a running Ollama instance"]
fn real_ollama_embeddings_are_deterministic() {
    init_test_tracing();
    let client = create_integration_test_client();

    let text = "Senior backend engineer python sql";
    let first = client.generate_embedding(text).expect("first embedding");
    let second = client.generate_embedding(text).expect("second embedding");

    info!("Embedding dimension: {}", first.len());
    assert!(!first.is_empty());
    assert_eq!(first, second);
}
