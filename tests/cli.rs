//! Tests for the `recall` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Embeds by keyword so results are predictable through the real binary.
struct KeywordEmbeddings;

impl Respond for KeywordEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let data: Vec<Value> = body["input"]
            .as_array()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(index, text)| {
                let text = text.as_str().unwrap();
                let embedding = if text.contains("deploy") {
                    json!([1.0, 0.0, 0.0])
                } else if text.contains("lunch") {
                    json!([0.0, 1.0, 0.0])
                } else {
                    json!([0.8, 0.0, 0.6])
                };
                json!({ "index": index, "embedding": embedding })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
    }
}

fn setup_test_env(api_base: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[storage]
path = "{}/data/recall.sqlite"

[embedding]
model = "test-embed"
dims = 3
api_base = "{}"

[retrieval]
default_limit = 5
default_threshold = 0.7
context_window_minutes = 3
"#,
        root.display(),
        api_base
    );

    let config_path = config_dir.join("recall.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_recall(config_path: &Path, api_key: Option<&str>, args: &[&str]) -> (String, String, bool) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_recall"));
    cmd.arg("--config").arg(config_path).args(args);
    cmd.env_remove("OPENAI_API_KEY");
    if let Some(key) = api_key {
        cmd.env("OPENAI_API_KEY", key);
    }
    let output = cmd.output().expect("failed to run recall binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Runs the binary off the async runtime so the mock server keeps serving.
async fn run_recall_async(
    config_path: &Path,
    api_key: Option<&'static str>,
    args: &[&str],
) -> (String, String, bool) {
    let config_path = config_path.to_path_buf();
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_recall(&config_path, api_key, &args)
    })
    .await
    .unwrap()
}

#[test]
fn test_init_creates_database() {
    let (tmp, config) = setup_test_env("http://127.0.0.1:9");
    let (stdout, stderr, success) = run_recall(&config, None, &["init"]);
    assert!(success, "init failed: {stderr}");
    assert!(stdout.contains("Storage initialized"));
    assert!(tmp.path().join("data/recall.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config) = setup_test_env("http://127.0.0.1:9");
    let (_, _, first) = run_recall(&config, None, &["init"]);
    assert!(first);
    let (_, stderr, second) = run_recall(&config, None, &["init"]);
    assert!(second, "second init failed: {stderr}");
}

#[test]
fn test_init_needs_no_api_key() {
    let (_tmp, config) = setup_test_env("http://127.0.0.1:9");
    let (_, stderr, success) = run_recall(&config, None, &["init"]);
    assert!(success, "init failed: {stderr}");

    let (_, stderr, success) = run_recall(&config, None, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("api_key"), "stderr: {stderr}");
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_recall(&tmp.path().join("nope.toml"), None, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_embed_without_api_key_fails() {
    let (_tmp, config) = setup_test_env("http://127.0.0.1:9");
    let (_, stderr, success) = run_recall(&config, None, &["embed", "--type", "chat", "hello"]);
    assert!(!success);
    assert!(stderr.contains("api_key"), "stderr: {stderr}");
}

#[test]
fn test_unknown_type_rejected() {
    let (_tmp, config) = setup_test_env("http://127.0.0.1:9");
    let (_, stderr, success) =
        run_recall(&config, Some("k"), &["embed", "--type", "image", "hello"]);
    assert!(!success);
    assert!(stderr.contains("Unknown item type"), "stderr: {stderr}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_embed_search_recall_stats() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(KeywordEmbeddings)
        .mount(&server)
        .await;

    let (tmp, config) = setup_test_env(&server.uri());
    let key = Some("test-key");

    let (stdout, stderr, success) = run_recall_async(
        &config,
        key,
        &[
            "embed",
            "--type",
            "chat",
            "deploy finished",
            "--platform",
            "slack",
            "--timestamp",
            "2024-05-01T12:00:00Z",
            "--meta",
            "channel=ops",
        ],
    )
    .await;
    assert!(success, "embed failed: {stderr}");
    assert!(stdout.trim().starts_with("chat_"));

    let batch = tmp.path().join("batch.jsonl");
    fs::write(
        &batch,
        concat!(
            r#"{"type":"chat","content":"deploy started","metadata":{"platform":"slack","timestamp":"2024-05-01T12:02:00Z"}}"#,
            "\n\n",
            r#"{"type":"document","content":"lunch options"}"#,
            "\n",
        ),
    )
    .unwrap();
    let (stdout, stderr, success) =
        run_recall_async(&config, key, &["embed-batch", batch.to_str().unwrap()]).await;
    assert!(success, "embed-batch failed: {stderr}");
    assert!(stdout.contains("Stored 2 entries"));

    let (stdout, _, success) = run_recall_async(&config, key, &["search", "deploy"]).await;
    assert!(success);
    let results: Value = serde_json::from_str(&stdout).unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r["metadata"]["platform"] == "slack"));
    assert!(results.iter().all(|r| r.get("context").is_none()));

    let (stdout, _, success) = run_recall_async(&config, key, &["recall", "slack", "deploy"]).await;
    assert!(success);
    let results: Value = serde_json::from_str(&stdout).unwrap();
    let first = &results.as_array().unwrap()[0];
    let context: Vec<&str> = first["context"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["content"].as_str().unwrap())
        .collect();
    assert_eq!(context, vec!["deploy finished", "deploy started"]);

    let (stdout, _, success) = run_recall_async(&config, key, &["stats"]).await;
    assert!(success);
    let stats: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["categories"]["chat"], 2);
    assert_eq!(stats["categories"]["document"], 1);
}
