use super::*;
use serde_json::json;
use webpilot_protocols::Message;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

fn request() -> CompletionRequest {
    CompletionRequest::new("", vec![Message::user("Fix this workflow")]).with_system("You repair workflows.")
}

fn success_body() -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": "{\"nodes\":[],\"edges\":[]}" },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
}

#[test]
fn test_defaults() {
    let provider = OpenAIProvider::new("key".to_string());
    assert_eq!(provider.id(), "openai");
    assert_eq!(provider.api_url, DEFAULT_API_URL);
    assert_eq!(provider.default_model(), "gpt-4o-mini");
}

#[test]
fn test_build_request_uses_default_model_when_empty() {
    let provider = OpenAIProvider::new("key".to_string()).with_default_model("gpt-4o");
    let api_request = provider.build_request(&request().with_max_tokens(100));
    assert_eq!(api_request.model, "gpt-4o");
    assert_eq!(api_request.max_tokens, Some(100));
    assert!(!api_request.stream);
    assert_eq!(api_request.messages[0].role, "system");

    let explicit = CompletionRequest::new("o1", vec![Message::user("hi")]);
    assert_eq!(provider.build_request(&explicit).model, "o1");
}

#[tokio::test]
async fn test_complete_success() {
    let mock_server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/"))
        .and(matchers::header("authorization", "Bearer test-key"))
        .and(matchers::body_partial_json(json!({
            "model": "gpt-4o-mini",
            "stream": false,
            "messages": [
                { "role": "system", "content": "You repair workflows." },
                { "role": "user", "content": "Fix this workflow" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenAIProvider::with_url("test-key".to_string(), mock_server.uri());
    let response = provider.complete(request()).await.unwrap();

    assert_eq!(response.id, "chatcmpl-123");
    assert_eq!(response.text(), "{\"nodes\":[],\"edges\":[]}");
    assert_eq!(response.usage.total(), 15);
}

#[tokio::test]
async fn test_authentication_error() {
    let mock_server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string(
            r#"{"error": {"message": "Invalid API key", "type": "invalid_request_error"}}"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenAIProvider::with_url("bad-key".to_string(), mock_server.uri());
    match provider.complete(request()).await.unwrap_err() {
        ProviderError::AuthenticationFailed(message) => assert_eq!(message, "Invalid API key"),
        other => panic!("Expected AuthenticationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let mock_server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_string(r#"{"error": {"message": "Rate limit exceeded"}}"#),
        )
        .mount(&mock_server)
        .await;

    let provider = OpenAIProvider::with_url("test-key".to_string(), mock_server.uri());
    match provider.complete(request()).await.unwrap_err() {
        ProviderError::RateLimited { retry_after_seconds } => assert_eq!(retry_after_seconds, 7),
        other => panic!("Expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_keeps_plain_body() {
    let mock_server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let provider = OpenAIProvider::with_url("test-key".to_string(), mock_server.uri());
    match provider.complete(request()).await.unwrap_err() {
        ProviderError::ApiError { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal Server Error");
        }
        other => panic!("Expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body() {
    let mock_server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let provider = OpenAIProvider::with_url("test-key".to_string(), mock_server.uri());
    assert!(matches!(
        provider.complete(request()).await,
        Err(ProviderError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_request_timeout() {
    let mock_server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let provider = OpenAIProvider::with_url("test-key".to_string(), mock_server.uri());
    match provider.complete(request().with_timeout(1)).await.unwrap_err() {
        ProviderError::Timeout(seconds) => assert_eq!(seconds, 1),
        other => panic!("Expected Timeout, got {:?}", other),
    }
}
