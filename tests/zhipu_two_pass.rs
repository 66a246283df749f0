use serde_json::json;

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatgate::config::{BackendConfig, ProviderConfig};
use chatgate::providers::{GenerateRequest, LlmGateway, Outcome, Sentinel, Turn};

fn gateway_for(server: &MockServer) -> LlmGateway {
    let config = ProviderConfig {
        default_provider: "zhipu".to_string(),
        zhipu: BackendConfig {
            api_base: Some(server.uri()),
            api_key: Some("test-key".to_string()),
        },
        ..ProviderConfig::default()
    };
    LlmGateway::new(&config)
}

fn request() -> GenerateRequest {
    GenerateRequest::new(vec![Turn::system("helper"), Turn::user("what's new?")])
        .with_provider("zhipu")
        .with_model("glm-4-flash")
}

fn completion(finish_reason: &str, content: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "finish_reason": finish_reason,
            "message": {"role": "assistant", "content": content}
        }]
    })
}

/// First pass returns text: exactly one call, tools attached
#[tokio::test]
async fn test_single_pass_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("stop", "fresh news")))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = gateway_for(&server).generate(request()).await;
    assert_eq!(outcome, Outcome::Text("fresh news".to_string()));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["tools"][0]["type"], "web_search");
    assert_eq!(body["tools"][0]["web_search"]["search_engine"], "search_pro");
}

/// Empty first pass on the tool path retries once, without tools
#[tokio::test]
async fn test_empty_first_pass_falls_back_without_tools() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("web_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("tool_calls", "")))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("stop", "plain answer")))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = gateway_for(&server).generate(request()).await;
    assert_eq!(outcome, Outcome::Text("plain answer".to_string()));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert!(second.get("tools").is_none());
}

/// Both passes empty resolves to the no-data sentinel, never a third call
#[tokio::test]
async fn test_empty_fallback_yields_search_sentinel() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("stop", "")))
        .expect(2)
        .mount(&server)
        .await;

    let outcome = gateway_for(&server).generate(request()).await;
    assert_eq!(outcome, Outcome::Sentinel(Sentinel::SearchNoData));
}

/// A sensitive finish reason short-circuits with no fallback call
#[tokio::test]
async fn test_sensitive_short_circuits() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("sensitive", "")))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = gateway_for(&server).generate(request()).await;
    assert_eq!(outcome, Outcome::Sentinel(Sentinel::SensitiveContent));
}

/// The search pipeline error code retries without tools instead of failing
#[tokio::test]
async fn test_search_pipeline_error_falls_back() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("web_search"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": "1703", "message": "search backend unavailable"}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("stop", "recovered")))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = gateway_for(&server).generate(request()).await;
    assert_eq!(outcome, Outcome::Text("recovered".to_string()));
}

/// Other API error codes surface as a provider error with code and message
#[tokio::test]
async fn test_other_api_error_is_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": "1002", "message": "invalid api key"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = gateway_for(&server).generate(request()).await;
    assert_eq!(
        outcome,
        Outcome::ProviderError("Zhipu API error 1002: invalid api key".to_string())
    );
}

/// Out-of-range temperatures are clamped before hitting the wire
#[tokio::test]
async fn test_temperature_clamped_on_wire() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("stop", "ok")))
        .mount(&server)
        .await;

    let mut req = request().with_web_search(false);
    req.temperature = 1.5;
    gateway_for(&server).generate(req).await;

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!((body["temperature"].as_f64().unwrap() - 0.99).abs() < 1e-6);
    assert!(body.get("tools").is_none());
}
