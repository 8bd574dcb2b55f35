use serde::{Deserialize, Serialize};
use log::{debug, trace, error, warn};

use crate::error::AttemptError;
use crate::request::{GenerationParameters, GenerationRequest};

/// Finish reasons that mean the model refused on policy grounds
const BLOCKING_FINISH_REASONS: [&str; 4]
  = ["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

const API_KEY_HEADER: &str = "x-goog-api-key";

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>
  , #[serde(default)]
    pub parts: Vec<Part>
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest
{   pub contents: Vec<Content>
  , pub generation_config: GenerationParameters
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse
{   #[serde(default)]
    pub candidates: Vec<Candidate>
  , #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate
{   #[serde(default)]
    pub content: Option<Content>
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback
{   #[serde(default)]
    pub block_reason: Option<String>
}

impl GenerateContentRequest
{   pub fn from_request(request: &GenerationRequest) -> Self
    {   GenerateContentRequest
        {   contents: vec![
              Content
              {   role: Some("user".to_string())
                , parts: vec![
                    Part { text: Some(request.prompt.clone()) }
                  ]
              }
            ]
          , generation_config: request.parameters.clone()
        }
    }
}

// ===== Gemini Client =====

/// `generateContent` backend.
///
/// Identifiers of the form `"v1/gemini-2.0-flash"` select an API version;
/// plain names use the configured default version.
pub struct GeminiClient
{   http_client: reqwest::Client
  , api_base: String
  , api_key: Option<String>
  , default_version: String
}

impl GeminiClient
{   pub fn new(
      api_key: Option<String>
    , api_base: impl Into<String>
    , default_version: impl Into<String>
    ) -> Self
    {   debug!("Creating GeminiClient");
        GeminiClient
        {   http_client: reqwest::Client::new()
          , api_base: api_base.into().trim_end_matches('/').to_string()
          , api_key
          , default_version: default_version.into()
        }
    }

    pub fn from_config(backend: &crate::config::BackendConfig) -> Self
    {   Self::new(
          backend.api_key.clone()
        , backend.api_base.clone()
        , backend.api_version.clone()
        )
    }

    pub fn has_api_key(&self) -> bool
    {   self.api_key.is_some()
    }

    /// Split an identifier into `(version, model)`
    pub fn split_identifier<'a>(&'a self, identifier: &'a str)
      -> (&'a str, &'a str)
    {   if let Some((prefix, model)) = identifier.split_once('/')
        {   let is_version = prefix.len() > 1
              && prefix.starts_with('v')
              && prefix[1..].starts_with(|c: char| c.is_ascii_digit());
            if is_version && !model.is_empty()
            {   return (prefix, model);
            }
        }
        (self.default_version.as_str(), identifier)
    }

    /// `{base}/{version}/models/{model}:generateContent`, with the model
    /// percent-encoded as a single path segment
    pub fn endpoint(&self, version: &str, model: &str)
      -> Result<reqwest::Url, AttemptError>
    {   let mut url = reqwest::Url::parse(&self.api_base).map_err(|e| {
          error!("Invalid Gemini API base: {}", e);
          AttemptError::auth_or_config(format!("invalid API base: {}", e))
        })?;
        url.path_segments_mut()
          .map_err(|_| {
            error!("Gemini API base cannot carry a path");
            AttemptError::auth_or_config("API base cannot carry a path")
          })?
          .pop_if_empty()
          .push(version)
          .push("models")
          .push(&format!("{}:generateContent", model));
        Ok(url)
    }

    async fn handle_generate(
      &self
    , identifier: &str
    , request: &GenerationRequest
    ) -> Result<String, AttemptError>
    {   let api_key = self.api_key.as_ref().ok_or_else(|| {
          error!("No API key configured for Gemini");
          AttemptError::auth_or_config("GEMINI_API_KEY is not set")
        })?;

        let (version, model) = self.split_identifier(identifier);
        debug!("Gemini generateContent: {} ({})", model, version);

        let body = GenerateContentRequest::from_request(request);
        trace!("Gemini request: {:?}", body);

        let response = self.http_client
          .post(self.endpoint(version, model)?)
          .header(API_KEY_HEADER, api_key.as_str())
          .json(&body)
          .send()
          .await
          .map_err(classify_transport)?;

        let status = response.status();
        trace!("Gemini response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            return Err(classify_status(status.as_u16(), &error_text));
        }

        let payload: GenerateContentResponse
          = response.json().await.map_err(|e| {
            if e.is_timeout()
            {   classify_transport(e)
            } else
            {   let e = e.without_url();
                error!("Parse error: {}", e);
                AttemptError::unknown(
                  format!("unreadable response: {}", e)
                )
            }
          })?;

        extract_text(payload)
    }
}

impl crate::providers::GenerationBackend for GeminiClient
{   async fn generate(
      &self
    , model: &str
    , request: &GenerationRequest
    ) -> Result<String, AttemptError>
    {   self.handle_generate(model, request).await
    }
}

/// Classify a failed send. The URL is dropped from the error before it is
/// formatted.
pub fn classify_transport(e: reqwest::Error) -> AttemptError
{   let e = e.without_url();
    if e.is_builder()
    {   error!("Malformed Gemini request: {}", e);
        return AttemptError::auth_or_config(
          format!("malformed request: {}", e)
        );
    }
    if e.is_timeout()
    {   warn!("Gemini request timed out");
        return AttemptError::transient("request timed out");
    }
    warn!("Gemini transport error: {}", e);
    AttemptError::transient(format!("transport error: {}", e))
}

/// Classify a non-success HTTP status
pub fn classify_status(status: u16, body: &str) -> AttemptError
{   let detail = format!("HTTP {} {}", status, body.trim());
    match status
    {   404 => AttemptError::unavailable(detail)
      , 400 if mentions_unsupported_model(body) => {
          AttemptError::unavailable(detail)
        }
      , 400 | 401 | 403 | 429 => {
          error!("Gemini rejected the call: HTTP {}", status);
          AttemptError::auth_or_config(detail)
        }
      , 408 | 500..=599 => AttemptError::transient(detail)
      , _ => AttemptError::unknown(detail)
    }
}

fn mentions_unsupported_model(body: &str) -> bool
{   let lower = body.to_ascii_lowercase();
    lower.contains("is not supported for generatecontent")
      || lower.contains("is not found for api version")
}

/// Pull text out of a successful response, or report a policy block
pub fn extract_text(payload: GenerateContentResponse)
  -> Result<String, AttemptError>
{   if let Some(reason) = payload.prompt_feedback
      .as_ref()
      .and_then(|f| f.block_reason.as_ref())
    {   warn!("Prompt blocked: {}", reason);
        return Err(AttemptError::blocked(
          format!("prompt blocked: {}", reason)
        ));
    }

    let Some(first) = payload.candidates.into_iter().next()
    else
    {   return Ok(String::new());
    };

    if let Some(reason) = first.finish_reason.as_deref()
    {   if BLOCKING_FINISH_REASONS.contains(&reason)
        {   warn!("Response blocked: {}", reason);
            return Err(AttemptError::blocked(
              format!("response blocked: {}", reason)
            ));
        }
    }

    let text: String = first.content
      .map(|c| {
        c.parts
          .into_iter()
          .filter_map(|p| p.text)
          .collect::<Vec<_>>()
          .join("")
      })
      .unwrap_or_default();
    Ok(text)
}
