pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod failover;
pub mod prompt;
pub mod extract;
pub mod client;
pub mod server;
use serde::{Deserialize, Serialize};

/*

Mission Compass: a thin service in front of a hosted generation API.

compass/
├── src/
│   ├── lib.rs          # Re-exports and shared taxonomy
│   ├── error.rs        # Crate errors and per-attempt classification
│   ├── config.rs       # Backend, dispatch and service configuration
│   ├── request.rs      # Generation request/outcome and wire payloads
│   ├── failover.rs     # Dispatcher: ordered model fallback
│   ├── providers/      # Generation backends
│   │   ├── mod.rs      # GenerationBackend trait
│   │   └── gemini.rs   # generateContent over HTTP
│   ├── prompt.rs       # Persona and questionnaire prompts
│   ├── extract.rs      # Post-processing of generated text
│   ├── client.rs       # Chat and guided flows
│   ├── server.rs       # HTTP routes
│   └── main.rs         # Service binary
└── tests/

*/

pub use client::CompassClient;
pub use config::CompassConfig;
pub use error::{AttemptError, Error};
pub use failover::{Dispatcher, ModelHint};
pub use providers::GenerationBackend;
pub use providers::gemini::GeminiClient;
pub use request::{
  DispatchFailure, GenerationOutcome, GenerationParameters, GenerationRequest,
};

/// Opaque name of a backend generation model.
/// A slice of these in preference order is a candidate list.
pub type ModelIdentifier = String;

/// Why an attempt, or a whole dispatch, did not produce text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind
{   /// Model not offered, or it produced nothing usable
    RetryableUnavailable
  , /// Content or safety policy refusal
    Blocked
  , /// Credentials, quota or malformed call
    AuthOrConfig
  , /// Timeout or transport failure
    Transient
  , /// Anything the backend could not classify
    Unknown
  , /// The candidate list was empty
    NoCandidates
}

impl FailureKind
{   /// Fatal kinds end the dispatch without trying further candidates.
    pub fn is_fatal(&self) -> bool
    {   matches!(self, FailureKind::Blocked | FailureKind::AuthOrConfig)
    }

    pub fn as_str(&self) -> &'static str
    {   match self
        {   FailureKind::RetryableUnavailable => "retryable_unavailable"
          , FailureKind::Blocked => "blocked"
          , FailureKind::AuthOrConfig => "auth_or_config"
          , FailureKind::Transient => "transient"
          , FailureKind::Unknown => "unknown"
          , FailureKind::NoCandidates => "no_candidates"
        }
    }
}

impl std::fmt::Display for FailureKind
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.write_str(self.as_str())
    }
}
