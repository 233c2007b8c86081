//! Shared helpers for the dispatch integration tests.
//!
//! Not every helper is used by every test file.
#![allow(dead_code)]

use comet_llm::ClientConfig;
use serde_json::{json, Value};
use wiremock::MockServer;

pub const TEST_KEY: &str = "sk-test";
pub const TEST_MODEL: &str = "test-model";

/// Config for `provider` pointed at the mock server, mounted under `/v1`.
pub fn config_for(server: &MockServer, provider: &str) -> ClientConfig {
    ClientConfig::new(provider)
        .with_api_base(format!("{}/v1", server.uri()))
        .with_api_key(TEST_KEY)
        .with_model(TEST_MODEL)
}

/// An OpenAI chat-completions response body carrying `content`.
pub fn openai_completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": TEST_MODEL,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 21, "completion_tokens": 6, "total_tokens": 27}
    })
}

/// A small unified diff used as the prompt payload.
pub fn sample_diff() -> &'static str {
    "diff --git a/src/lib.rs b/src/lib.rs\n\
     --- a/src/lib.rs\n\
     +++ b/src/lib.rs\n\
     @@ -1 +1,2 @@\n\
     +pub mod parser;\n"
}
