//! End-to-end dispatch against mocked provider endpoints.

mod common;

use common::{config_for, openai_completion, sample_diff, TEST_KEY, TEST_MODEL};
use comet_llm::{CancellationToken, ChatMessage, ClientConfig, LlmClient, LlmError, ProviderKind, TokenUsage};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn openai_chat_returns_answer_and_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", format!("Bearer {TEST_KEY}").as_str()))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "model": TEST_MODEL,
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hello"}
            ],
            "max_tokens": 1024
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(&server, "openai")).unwrap();
    let resp = tokio_test::assert_ok!(
        client
            .chat(&CancellationToken::new(), "hello", &[ChatMessage::system("be brief")])
            .await
    );
    assert_eq!(resp.content, "hi there");
    assert_eq!(resp.usage, Some(TokenUsage::new(21, 6)));
    assert_eq!(resp.raw["id"], "chatcmpl-1");
}

#[tokio::test]
async fn non_2xx_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string(r#"{"error":"rate limited"}"#))
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(&server, "deepseek")).unwrap();
    let err = tokio_test::assert_err!(client.chat(&CancellationToken::new(), "diff", &[]).await);

    let message = err.to_string();
    assert!(message.contains("failed to make request"), "{message}");
    assert!(message.contains("429"), "{message}");
    assert!(message.contains("rate limited"), "{message}");
    assert_eq!(err.status_code().map(|s| s.as_u16()), Some(429));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn server_error_is_not_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(openai_completion("should not be read")))
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(&server, "openai")).unwrap();
    let err = client
        .chat(&CancellationToken::new(), "diff", &[])
        .await
        .unwrap_err();
    assert!(matches!(err.root(), LlmError::Api { .. }));
}

#[tokio::test]
async fn extra_headers_reach_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer override"))
        .and(header("x-trace", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, "openai")
        .with_header("Authorization", "Bearer override")
        .with_header("X-Trace", "abc");
    let client = LlmClient::new(config).unwrap();
    let resp = client
        .chat(&CancellationToken::new(), "diff", &[])
        .await
        .unwrap();
    assert_eq!(resp.content, "ok");
}

#[tokio::test]
async fn cancellation_aborts_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(openai_completion("too late"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(&server, "openai")).unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let err = client.chat(&cancel, "diff", &[]).await.unwrap_err();
    assert!(err.is_cancelled(), "{err}");
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn cancelled_token_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(&server, "openai")).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client.chat(&cancel, "diff", &[]).await.unwrap_err();
    assert!(matches!(err.root(), LlmError::Cancelled));
}

#[tokio::test]
async fn slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(openai_completion("too late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(&server, "openai").with_timeout(1)).unwrap();
    let err = client
        .chat(&CancellationToken::new(), "diff", &[])
        .await
        .unwrap_err();
    assert!(
        matches!(err.root(), LlmError::Timeout(limit) if *limit == Duration::from_secs(1)),
        "{err}"
    );
}

#[tokio::test]
async fn commit_message_strips_fence() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [{"role": "user", "content": format!("Describe:\n{}", sample_diff())}]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(openai_completion("```\nfeat: add parser module\n```")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(&server, "openai")).unwrap();
    let message = client
        .generate_commit_message(sample_diff(), "Describe:\n%s")
        .await
        .unwrap();
    assert_eq!(message, "feat: add parser module");
}

#[tokio::test]
async fn translate_fills_message_then_language() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "messages": [{"role": "user", "content": "Translate 'fix: typo' into German"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion(" fix: Tippfehler \n")))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(&server, "openai")).unwrap();
    let text = client
        .translate_message("Translate '%s' into %s", "fix: typo", "German")
        .await
        .unwrap();
    assert_eq!(text, "fix: Tippfehler");
}

#[tokio::test]
async fn unknown_provider_speaks_openai() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("fallback")))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(&server, "unknown-x")).unwrap();
    assert_eq!(client.provider().id(), ProviderKind::OpenAi);
    let resp = client
        .chat(&CancellationToken::new(), "diff", &[])
        .await
        .unwrap();
    assert_eq!(resp.content, "fallback");
}

#[tokio::test]
async fn missing_answer_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(&server, "openai")).unwrap();
    let err = client
        .chat(&CancellationToken::new(), "diff", &[])
        .await
        .unwrap_err();
    assert!(matches!(err.root(), LlmError::AnswerNotFound { .. }), "{err}");
}

#[tokio::test]
async fn claude_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", TEST_KEY))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "system": "be brief",
            "messages": [{"role": "user", "content": "diff"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "fix: handle empty input"}],
            "usage": {"input_tokens": 11, "output_tokens": 7}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(&server, "claude")).unwrap();
    let resp = client
        .chat(&CancellationToken::new(), "diff", &[ChatMessage::system("be brief")])
        .await
        .unwrap();
    assert_eq!(resp.content, "fix: handle empty input");
    assert_eq!(resp.usage, Some(TokenUsage::new(11, 7)));
}

#[tokio::test]
async fn azure_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/openai/deployments/{TEST_MODEL}/chat/completions")))
        .and(query_param("api-version", "2024-02-01"))
        .and(header("api-key", TEST_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("docs: note")))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, "azure").with_api_base(server.uri());
    let client = LlmClient::new(config).unwrap();
    let resp = client
        .chat(&CancellationToken::new(), "diff", &[])
        .await
        .unwrap();
    assert_eq!(resp.content, "docs: note");
}

#[tokio::test]
async fn gemini_model_in_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/models/{TEST_MODEL}:generateContent")))
        .and(header("x-goog-api-key", TEST_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "style: format"}], "role": "model"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(&server, "gemini")).unwrap();
    let resp = client
        .chat(&CancellationToken::new(), "diff", &[])
        .await
        .unwrap();
    assert_eq!(resp.content, "style: format");
    assert_eq!(resp.usage, None);
}

#[tokio::test]
async fn ollama_without_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .and(body_partial_json(json!({"stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "ci: cache deps"},
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(&server, "ollama")).unwrap();
    let resp = client
        .chat(&CancellationToken::new(), "diff", &[])
        .await
        .unwrap();
    assert_eq!(resp.content, "ci: cache deps");
    assert_eq!(resp.usage, None);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn concurrent_calls_are_independent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("same")))
        .expect(4)
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(&server, "openai")).unwrap();
    let calls = (0..4).map(|i| {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .chat(&CancellationToken::new(), &format!("diff {i}"), &[])
                .await
        })
    });
    for call in calls.collect::<Vec<_>>() {
        assert_eq!(call.await.unwrap().unwrap().content, "same");
    }
}

/// The mock server stands in for a forward proxy; the provider host never resolves.
fn via_proxy(server: &MockServer) -> ClientConfig {
    ClientConfig::new("openai")
        .with_api_base("http://llm.example/v1")
        .with_api_key(TEST_KEY)
        .with_proxy(format!("http://user:pass@{}", server.address()))
}

#[tokio::test]
async fn proxy_credentials_reach_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("proxy-authorization", "Basic dXNlcjpwYXNz"))
        .and(header("authorization", format!("Bearer {TEST_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("via proxy")))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(via_proxy(&server)).unwrap();
    let resp = client
        .chat(&CancellationToken::new(), "diff", &[])
        .await
        .unwrap();
    assert_eq!(resp.content, "via proxy");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.host_str(), Some("llm.example"));
}

#[tokio::test]
async fn configured_proxy_authorization_wins() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let config = via_proxy(&server).with_header("Proxy-Authorization", "Basic b3RoZXI6c2VjcmV0");
    let client = LlmClient::new(config).unwrap();
    client
        .chat(&CancellationToken::new(), "diff", &[])
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let values: Vec<_> = requests[0]
        .headers
        .get_all("proxy-authorization")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(values, vec!["Basic b3RoZXI6c2VjcmV0".to_string()]);
}
