//! GeminiClient against a local stand-in for the generateContent endpoint

use std::time::Duration;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use compass::providers::gemini::{
  classify_status, extract_text, GenerateContentRequest,
  GenerateContentResponse,
};
use compass::{
  Dispatcher, FailureKind, GeminiClient, GenerationBackend,
  GenerationOutcome, GenerationRequest,
};

const TEST_KEY: &str = "test-key";

async fn fake_generate(
  Path((version, call)): Path<(String, String)>
, headers: HeaderMap
, Json(body): Json<Value>
) -> Response
{   let key = headers
      .get("x-goog-api-key")
      .and_then(|v| v.to_str().ok());
    if key != Some(TEST_KEY)
    {   return (
          StatusCode::BAD_REQUEST,
          "API key not valid. Please pass a valid API key."
        ).into_response();
    }
    let model = call
      .strip_suffix(":generateContent")
      .unwrap_or(&call)
      .to_string();
    let prompt = body["contents"][0]["parts"][0]["text"]
      .as_str()
      .unwrap_or("")
      .to_string();

    match (version.as_str(), model.as_str())
    {   (_, "echo") => text_reply(&format!("echo: {}", prompt))
      , (_, "split") => Json(json!({
          "candidates": [{
            "content": { "role": "model", "parts": [
              { "text": "hel" }, { "text": "lo" }
            ]},
            "finishReason": "STOP"
          }]
        })).into_response()
      , (_, "empty") => Json(json!({ "candidates": [] })).into_response()
      , (_, "blocked-prompt") => Json(json!({
          "promptFeedback": { "blockReason": "SAFETY" }
        })).into_response()
      , (_, "blocked-reply") => Json(json!({
          "candidates": [{ "finishReason": "SAFETY" }]
        })).into_response()
      , (_, "quota") => (
          StatusCode::TOO_MANY_REQUESTS, "Resource has been exhausted"
        ).into_response()
      , (_, "broken") => (
          StatusCode::INTERNAL_SERVER_ERROR, "internal"
        ).into_response()
      , (_, "garbage") => "not json at all".into_response()
      , (_, "slow") => {
          tokio::time::sleep(Duration::from_secs(5)).await;
          text_reply("too late")
        }
      , ("v1", "v1-only") => text_reply("from v1")
      , _ => (
          StatusCode::NOT_FOUND,
          format!("models/{} is not found for API version {}", model, version)
        ).into_response()
    }
}

fn text_reply(text: &str) -> Response
{   Json(json!({
      "candidates": [{
        "content": { "role": "model", "parts": [{ "text": text }] },
        "finishReason": "STOP"
      }]
    })).into_response()
}

/// Serve the stand-in on an ephemeral port and return its base URL
async fn spawn_fake_gemini() -> String
{   let app = Router::new()
      .route("/{version}/models/{call}", post(fake_generate));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
      .await
      .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn client() -> GeminiClient
{   let base = spawn_fake_gemini().await;
    GeminiClient::new(Some(TEST_KEY.to_string()), base, "v1beta")
}

fn request(prompt: &str) -> GenerationRequest
{   GenerationRequest::new(prompt, 4000)
}

#[tokio::test]
async fn test_generate_returns_text()
{   let client = client().await;
    let text = client.generate("echo", &request("hi")).await.unwrap();
    assert_eq!(text, "echo: hi");
}

#[tokio::test]
async fn test_generate_joins_parts()
{   let client = client().await;
    let text = client.generate("split", &request("hi")).await.unwrap();
    assert_eq!(text, "hello");
}

#[tokio::test]
async fn test_generate_without_candidates_is_empty_text()
{   let client = client().await;
    let text = client.generate("empty", &request("hi")).await.unwrap();
    assert!(text.is_empty());
}

#[tokio::test]
async fn test_unknown_model_is_unavailable()
{   let client = client().await;
    let err = client.generate("nope", &request("hi")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::RetryableUnavailable);
}

#[tokio::test]
async fn test_block_signals()
{   let client = client().await;
    let err = client
      .generate("blocked-prompt", &request("hi"))
      .await
      .unwrap_err();
    assert_eq!(err.kind, FailureKind::Blocked);

    let err = client
      .generate("blocked-reply", &request("hi"))
      .await
      .unwrap_err();
    assert_eq!(err.kind, FailureKind::Blocked);
}

#[tokio::test]
async fn test_http_failures_are_classified()
{   let client = client().await;
    let err = client.generate("quota", &request("hi")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::AuthOrConfig);

    let err = client.generate("broken", &request("hi")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Transient);

    let err = client.generate("garbage", &request("hi")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Unknown);
}

#[tokio::test]
async fn test_wrong_key_is_auth_failure()
{   let base = spawn_fake_gemini().await;
    let client = GeminiClient::new(Some("wrong".to_string()), base, "v1beta");
    let err = client.generate("echo", &request("hi")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::AuthOrConfig);
}

#[tokio::test]
async fn test_missing_key_is_auth_failure()
{   let client = GeminiClient::new(None, "http://127.0.0.1:9", "v1beta");
    assert!(!client.has_api_key());
    let err = client.generate("echo", &request("hi")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::AuthOrConfig);
}

#[tokio::test]
async fn test_unreachable_host_is_transient()
{   let client = GeminiClient::new(
      Some(TEST_KEY.to_string()), "http://127.0.0.1:9", "v1beta"
    );
    let err = client.generate("echo", &request("hi")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Transient);
}

#[tokio::test]
async fn test_transport_error_does_not_carry_key()
{   let client = GeminiClient::new(
      Some("SECRET-KEY-123".to_string()), "http://127.0.0.1:9", "v1beta"
    );
    let err = client.generate("echo", &request("hi")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Transient);
    assert!(!err.message.contains("SECRET-KEY-123"));
    assert!(!err.to_string().contains("SECRET-KEY-123"));

    let candidates = vec!["echo".to_string()];
    match Dispatcher::new(&Default::default())
      .dispatch(&client, &request("hi"), &candidates)
      .await
    {   GenerationOutcome::Failure(failure) => {
          assert!(!failure.message.contains("SECRET-KEY-123"));
        }
      , other => panic!("expected failure, got {:?}", other)
    }
}

#[test]
fn test_endpoint_encodes_model_segment()
{   let client = GeminiClient::new(None, "http://localhost/", "v1beta");
    assert_eq!(
      client.endpoint("v1beta", "gemini-2.0-flash").unwrap().as_str(),
      "http://localhost/v1beta/models/gemini-2.0-flash:generateContent"
    );
    assert_eq!(
      client.endpoint("v1", "odd?model#x").unwrap().as_str(),
      "http://localhost/v1/models/odd%3Fmodel%23x:generateContent"
    );

    let prefixed = GeminiClient::new(None, "http://localhost/proxy", "v1beta");
    assert_eq!(
      prefixed.endpoint("v1beta", "m").unwrap().as_str(),
      "http://localhost/proxy/v1beta/models/m:generateContent"
    );

    let broken = GeminiClient::new(None, "not a url", "v1beta");
    assert_eq!(
      broken.endpoint("v1beta", "m").unwrap_err().kind,
      FailureKind::AuthOrConfig
    );
}

#[tokio::test]
async fn test_odd_model_name_stays_in_its_segment()
{   let client = client().await;
    let err = client
      .generate("echo?x=1#frag", &request("hi"))
      .await
      .unwrap_err();
    assert_eq!(err.kind, FailureKind::RetryableUnavailable);
    assert!(err.message.contains("echo?x=1#frag"));
}

#[tokio::test]
async fn test_version_prefix_selects_api_version()
{   let client = client().await;
    let err = client.generate("v1-only", &request("hi")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::RetryableUnavailable);

    let text = client.generate("v1/v1-only", &request("hi")).await.unwrap();
    assert_eq!(text, "from v1");
}

#[tokio::test]
async fn test_dispatch_over_http_ladder()
{   let client = client().await;
    let candidates: Vec<String> = vec![
      "nope".to_string(),
      "empty".to_string(),
      "v1-only".to_string(),
      "v1/v1-only".to_string(),
    ];
    let dispatcher = Dispatcher::new(&Default::default());
    let outcome = dispatcher
      .dispatch(&client, &request("hi"), &candidates)
      .await;

    match outcome
    {   GenerationOutcome::Success { text, model_used, models_tried } => {
          assert_eq!(text, "from v1");
          assert_eq!(model_used, "v1/v1-only");
          assert_eq!(models_tried.len(), 4);
        }
      , other => panic!("expected success, got {:?}", other)
    }
}

#[tokio::test]
async fn test_dispatch_times_out_slow_model()
{   let client = client().await;
    let candidates = vec!["slow".to_string(), "echo".to_string()];
    let dispatcher = Dispatcher::new(&Default::default())
      .with_timeouts(Duration::from_millis(200), Duration::from_secs(10));
    let (text, model) = dispatcher
      .dispatch(&client, &request("hi"), &candidates)
      .await
      .into_result()
      .unwrap();
    assert_eq!(model, "echo");
    assert_eq!(text, "echo: hi");
}

#[test]
fn test_split_identifier()
{   let client = GeminiClient::new(None, "http://localhost", "v1beta");
    assert_eq!(
      client.split_identifier("gemini-2.0-flash"),
      ("v1beta", "gemini-2.0-flash")
    );
    assert_eq!(
      client.split_identifier("v1/gemini-2.0-flash"),
      ("v1", "gemini-2.0-flash")
    );
    assert_eq!(
      client.split_identifier("tunedModels/abc"),
      ("v1beta", "tunedModels/abc")
    );
}

#[test]
fn test_classify_status()
{   assert_eq!(
      classify_status(404, "").kind,
      FailureKind::RetryableUnavailable
    );
    assert_eq!(
      classify_status(
        400,
        "models/x is not supported for generateContent"
      ).kind,
      FailureKind::RetryableUnavailable
    );
    assert_eq!(classify_status(400, "bad").kind, FailureKind::AuthOrConfig);
    assert_eq!(classify_status(401, "").kind, FailureKind::AuthOrConfig);
    assert_eq!(classify_status(503, "").kind, FailureKind::Transient);
    assert_eq!(classify_status(418, "").kind, FailureKind::Unknown);
}

#[test]
fn test_request_body_shape()
{   let request = GenerationRequest::new("hello", 4000);
    let body = serde_json::to_value(
      GenerateContentRequest::from_request(&request)
    ).unwrap();
    assert_eq!(body["contents"][0]["role"], "user");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 512);
    assert!(body["generationConfig"].get("topK").is_none());
}

#[test]
fn test_extract_text_keeps_truncated_reply()
{   let payload: GenerateContentResponse = serde_json::from_value(json!({
      "candidates": [{
        "content": { "parts": [{ "text": "partial" }] },
        "finishReason": "MAX_TOKENS"
      }]
    })).unwrap();
    assert_eq!(extract_text(payload).unwrap(), "partial");
}
