//! Generation request/outcome types and the payloads surfaced to callers

use serde::{Deserialize, Serialize};

/// Sampling parameters forwarded to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParameters
{   /// Temperature for sampling
    pub temperature: f32
  , /// Max tokens to generate
    pub max_output_tokens: u32
  , /// Nucleus sampling cutoff
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>
  , /// Top-k sampling cutoff
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>
}

impl Default for GenerationParameters
{   fn default() -> Self
    {   GenerationParameters
        {   temperature: 0.7
          , max_output_tokens: 512
          , top_p: None
          , top_k: None
        }
    }
}

/// One logical request for generated text.
/// Built per inbound call and dropped once an outcome exists.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest
{   /// The prompt text, already cut to the configured bound
    pub prompt: String
  , pub parameters: GenerationParameters
}

impl GenerationRequest
{   /// Build a request, keeping at most `max_chars` characters of prompt
    pub fn new(
      prompt: impl Into<String>
    , max_chars: usize
    ) -> Self
    {   let prompt: String = prompt.into();
        let prompt = if prompt.chars().count() > max_chars
        {   prompt.chars().take(max_chars).collect()
        } else
        {   prompt
        };
        GenerationRequest
        {   prompt
          , parameters: GenerationParameters::default()
        }
    }

    pub fn with_parameters(
      mut self
    , parameters: GenerationParameters
    ) -> Self
    {   self.parameters = parameters;
        self
    }
}

/// A dispatch that did not produce text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchFailure
{   pub kind: crate::FailureKind
  , pub message: String
  , /// Attempted identifiers, in the order they were tried
    pub models_tried: Vec<crate::ModelIdentifier>
}

/// Result of one dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome
{   Success
    {   /// Generated text, non-empty after trimming
        text: String
      , model_used: crate::ModelIdentifier
      , models_tried: Vec<crate::ModelIdentifier>
    }
  , Failure(DispatchFailure)
}

impl GenerationOutcome
{   pub fn is_success(&self) -> bool
    {   matches!(self, GenerationOutcome::Success { .. })
    }

    pub fn models_tried(&self) -> &[crate::ModelIdentifier]
    {   match self
        {   GenerationOutcome::Success { models_tried, .. } => models_tried
          , GenerationOutcome::Failure(failure) => &failure.models_tried
        }
    }

    /// Failure kind, if any
    pub fn failure_kind(&self) -> Option<crate::FailureKind>
    {   match self
        {   GenerationOutcome::Success { .. } => None
          , GenerationOutcome::Failure(failure) => Some(failure.kind)
        }
    }

    /// Split into `(text, model_used)` or the failure
    pub fn into_result(self)
      -> Result<(String, crate::ModelIdentifier), DispatchFailure>
    {   match self
        {   GenerationOutcome::Success { text, model_used, .. } => {
              Ok((text, model_used))
            }
          , GenerationOutcome::Failure(failure) => Err(failure)
        }
    }
}

// ===== Inbound bodies =====

/// Free chat body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequestBody
{   #[serde(default)]
    pub message: String
}

/// One answered questionnaire item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidedAnswer
{   #[serde(default)]
    pub q: String
  , #[serde(default)]
    pub a: String
}

/// Guided questionnaire body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuidedRequestBody
{   #[serde(default)]
    pub step: usize
  , #[serde(default)]
    pub answers: Vec<GuidedAnswer>
}

// ===== Outbound payloads =====

/// Successful chat reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply
{   pub reply_text: String
  , pub model_used: crate::ModelIdentifier
  , /// Up to three enumerated items pulled from the reply
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>
}

/// Mission summary produced at the end of the questionnaire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mission
{   pub values: Vec<String>
  , pub passions: Vec<String>
  , pub statement: String
}

/// Guided flow reply: either the next question or the final summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GuidedReply
{   Question
    {   step: usize
      , total: usize
      , question: String
    }
  , Final
    {   mission: Mission
      , #[serde(rename = "modelUsed")]
        model_used: crate::ModelIdentifier
    }
}

/// Error body returned to HTTP callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload
{   pub error_message: String
  , pub kind: String
  , #[serde(default)]
    pub tried_models: Vec<crate::ModelIdentifier>
}
