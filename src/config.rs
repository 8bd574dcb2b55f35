//! Configuration for the generation backend, the dispatcher and the service

use std::time::Duration;
use serde::{Deserialize, Serialize};
use log::{debug, warn};

pub const DEFAULT_API_BASE: &str
  = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_VERSION: &str = "v1beta";

/// Models tried after the configured one, in order
pub const FALLBACK_MODELS: [&str; 2]
  = ["gemini-2.0-flash", "gemini-1.5-flash-8b"];

/// Generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig
{   /// API key; never written back out
    #[serde(skip_serializing)]
    pub api_key: Option<String>
  , /// Preferred model
    pub model: String
  , /// API version path segment (v1beta, v1)
    pub api_version: String
  , /// API base URL
    pub api_base: String
  , /// Models appended after the built-in fallbacks
    pub extra_models: Vec<String>
  , /// Also try every model under the alternate API version
    pub version_fallback: bool
}

impl Default for BackendConfig
{   fn default() -> Self
    {   BackendConfig
        {   api_key: None
          , model: DEFAULT_MODEL.to_string()
          , api_version: DEFAULT_API_VERSION.to_string()
          , api_base: DEFAULT_API_BASE.to_string()
          , extra_models: vec![]
          , version_fallback: true
        }
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig
{   /// Upper bound for one backend attempt, in seconds
    pub attempt_timeout_secs: u64
  , /// Upper bound for a whole dispatch, in seconds
    pub call_budget_secs: u64
  , /// Try the last model that worked first
    pub use_hint: bool
  , /// Prompts are cut to this many characters
    pub max_prompt_chars: usize
}

impl DispatchConfig
{   pub fn attempt_timeout(&self) -> Duration
    {   Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn call_budget(&self) -> Duration
    {   Duration::from_secs(self.call_budget_secs)
    }
}

impl Default for DispatchConfig
{   fn default() -> Self
    {   DispatchConfig
        {   attempt_timeout_secs: 15
          , call_budget_secs: 20
          , use_hint: true
          , max_prompt_chars: 4000
        }
    }
}

/// HTTP service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig
{   pub host: String
  , pub port: u16
}

impl Default for ServiceConfig
{   fn default() -> Self
    {   ServiceConfig
        {   host: "0.0.0.0".to_string()
          , port: 3000
        }
    }
}

/// Mission Compass configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompassConfig
{   pub backend: BackendConfig
  , pub dispatch: DispatchConfig
  , pub service: ServiceConfig
}

impl CompassConfig
{   /// Load from the file named by `COMPASS_CONFIG` (if set),
    /// then apply environment overrides and validate
    pub fn load() -> Result<Self, crate::error::Error>
    {   let mut config = match std::env::var("COMPASS_CONFIG")
        {   Ok(path) => Self::from_json_file(&path)?
          , Err(_) => CompassConfig::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file; absent sections take their defaults
    pub fn from_json_file(path: &str)
      -> Result<Self, crate::error::Error>
    {   debug!("Reading config file: {}", path);
        let text = std::fs::read_to_string(path)?;
        let config: CompassConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in
    /// production, a map in tests)
    pub fn apply_env<F>(&mut self, lookup: F)
      -> Result<(), crate::error::Error>
    where
      F: Fn(&str) -> Option<String>
    {   if let Some(key) = lookup("GEMINI_API_KEY")
        {   let key = key.trim().to_string();
            self.backend.api_key
              = if key.is_empty() { None } else { Some(key) };
        }
        if let Some(model) = non_empty(lookup("GEMINI_MODEL"))
        {   self.backend.model = model;
        }
        if let Some(version) = non_empty(lookup("GEMINI_API_VERSION"))
        {   self.backend.api_version = version;
        }
        if let Some(base) = non_empty(lookup("GEMINI_API_BASE"))
        {   self.backend.api_base = base;
        }
        if let Some(extra) = lookup("GEMINI_EXTRA_MODELS")
        {   self.backend.extra_models = extra
              .split(',')
              .map(|m| m.trim())
              .filter(|m| !m.is_empty())
              .map(|m| m.to_string())
              .collect();
        }
        if let Some(flag) = lookup("GEMINI_VERSION_FALLBACK")
        {   self.backend.version_fallback
              = parse_value("GEMINI_VERSION_FALLBACK", &flag)?;
        }
        if let Some(secs) = lookup("COMPASS_ATTEMPT_TIMEOUT_SECS")
        {   self.dispatch.attempt_timeout_secs
              = parse_value("COMPASS_ATTEMPT_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("COMPASS_CALL_BUDGET_SECS")
        {   self.dispatch.call_budget_secs
              = parse_value("COMPASS_CALL_BUDGET_SECS", &secs)?;
        }
        if let Some(chars) = lookup("COMPASS_MAX_PROMPT_CHARS")
        {   self.dispatch.max_prompt_chars
              = parse_value("COMPASS_MAX_PROMPT_CHARS", &chars)?;
        }
        if let Some(flag) = lookup("COMPASS_USE_HINT")
        {   self.dispatch.use_hint
              = parse_value("COMPASS_USE_HINT", &flag)?;
        }
        if let Some(host) = non_empty(lookup("HOST"))
        {   self.service.host = host;
        }
        if let Some(port) = lookup("PORT")
        {   self.service.port = parse_value("PORT", &port)?;
        }
        Ok(())
    }

    /// Reject settings the dispatcher cannot run with
    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   if self.dispatch.attempt_timeout_secs == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "attempt timeout must be at least one second".to_string()
            ));
        }
        if self.dispatch.call_budget_secs == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "call budget must be at least one second".to_string()
            ));
        }
        if self.dispatch.max_prompt_chars == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "max prompt length must be positive".to_string()
            ));
        }
        if self.backend.model.trim().is_empty()
        {   return Err(crate::error::Error::InvalidConfiguration(
              "model name is empty".to_string()
            ));
        }
        if self.backend.api_key.is_none()
        {   warn!("GEMINI_API_KEY is not set; generation calls will fail");
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String>
{   value
      .map(|v| v.trim().to_string())
      .filter(|v| !v.is_empty())
}

fn parse_value<T: std::str::FromStr>(
  key: &str
, raw: &str
) -> Result<T, crate::error::Error>
{   raw.trim().parse::<T>().map_err(|_| {
      crate::error::Error::InvalidConfiguration(
        format!("{} has an invalid value: {:?}", key, raw)
      )
    })
}

/// The API version tried when the configured one does not know a model
pub fn alternate_version(version: &str) -> &'static str
{   if version == "v1" { "v1beta" } else { "v1" }
}

/// Build the candidate list in preference order.
///
/// Models under the configured version come first as plain names; with
/// version fallback on, the same models follow as `"<version>/<model>"`.
pub fn candidate_ladder(backend: &BackendConfig)
  -> Vec<crate::ModelIdentifier>
{   let primary = backend.model.trim().to_string();
    let mut models: Vec<String> = vec![primary.clone()];
    if let Some(stripped) = primary.strip_suffix("-latest")
    {   models.push(stripped.to_string());
    }
    models.extend(FALLBACK_MODELS.iter().map(|m| m.to_string()));
    models.extend(backend.extra_models.iter().cloned());

    let mut unique: Vec<String> = Vec::with_capacity(models.len());
    for model in models
    {   if !model.is_empty() && !unique.contains(&model)
        {   unique.push(model);
        }
    }

    let mut ladder = unique.clone();
    if backend.version_fallback
    {   let alternate = alternate_version(&backend.api_version);
        if alternate != backend.api_version
        {   ladder.extend(
              unique.iter().map(|m| format!("{}/{}", alternate, m))
            );
        }
    }
    debug!("Candidate ladder has {} entries", ladder.len());
    ladder
}
