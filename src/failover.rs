//! Ordered model fallback for one generation call

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use futures::FutureExt;
use log::{debug, error, info, warn};
use tokio::time::Instant;

use crate::error::AttemptError;
use crate::request::{DispatchFailure, GenerationOutcome, GenerationRequest};
use crate::{FailureKind, ModelIdentifier};

/// Last model that produced text, used as the first guess for the next
/// call. Staleness only changes the traversal order, never the output.
#[derive(Debug, Default)]
pub struct ModelHint
{   last: Mutex<Option<ModelIdentifier>>
}

impl ModelHint
{   pub fn new() -> Self
    {   ModelHint::default()
    }

    /// Start with a known-good model
    pub fn with_model(model: impl Into<ModelIdentifier>) -> Self
    {   ModelHint
        {   last: Mutex::new(Some(model.into()))
        }
    }

    /// Current hint; a poisoned lock reads as no hint
    pub fn get(&self) -> Option<ModelIdentifier>
    {   self.last.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn set(&self, model: &str)
    {   if let Ok(mut guard) = self.last.lock()
        {   *guard = Some(model.to_string());
        }
    }

}

/// Traversal order for one call: the hinted model first if it is a
/// candidate, then the rest in preference order
pub fn traversal_order<'a>(
  candidates: &'a [ModelIdentifier]
, hint: Option<&str>
) -> Vec<&'a str>
{   let mut order: Vec<&str> = Vec::with_capacity(candidates.len());
    if let Some(hinted) = hint
    {   if let Some(found) = candidates.iter().find(|c| c.as_str() == hinted)
        {   order.push(found.as_str());
        }
    }
    for candidate in candidates
    {   if !order.contains(&candidate.as_str())
        {   order.push(candidate.as_str());
        }
    }
    order
}

/// Tries candidates one at a time until one returns text or a fatal
/// failure ends the call
#[derive(Debug, Clone)]
pub struct Dispatcher
{   hint: Arc<ModelHint>
  , attempt_timeout: Duration
  , call_budget: Duration
  , use_hint: bool
}

impl Dispatcher
{   pub fn new(config: &crate::config::DispatchConfig) -> Self
    {   debug!(
          "Creating dispatcher: attempt timeout {}s, budget {}s",
          config.attempt_timeout_secs,
          config.call_budget_secs
        );
        Dispatcher
        {   hint: Arc::new(ModelHint::new())
          , attempt_timeout: config.attempt_timeout()
          , call_budget: config.call_budget()
          , use_hint: config.use_hint
        }
    }

    /// Share a hint cell, e.g. between dispatchers or with a test
    pub fn with_hint(mut self, hint: Arc<ModelHint>) -> Self
    {   self.hint = hint;
        self
    }

    pub fn with_timeouts(
      mut self
    , attempt_timeout: Duration
    , call_budget: Duration
    ) -> Self
    {   self.attempt_timeout = attempt_timeout;
        self.call_budget = call_budget;
        self
    }

    pub fn with_hint_enabled(mut self, use_hint: bool) -> Self
    {   self.use_hint = use_hint;
        self
    }

    pub fn hint(&self) -> &Arc<ModelHint>
    {   &self.hint
    }

    /// Obtain text from the first candidate that produces some.
    ///
    /// Attempts are strictly sequential. `Blocked` and `AuthOrConfig` stop
    /// the call; unavailable, empty, timed-out and unclassified attempts move
    /// on to the next candidate. On exhaustion the failure carries the kind
    /// of the last attempt.
    pub async fn dispatch<B>(
      &self
    , backend: &B
    , request: &GenerationRequest
    , candidates: &[ModelIdentifier]
    ) -> GenerationOutcome
    where
      B: crate::providers::GenerationBackend
    {   if candidates.is_empty()
        {   warn!("Dispatch called with no candidate models");
            return failure(
              FailureKind::NoCandidates
            , "no candidate models configured".to_string()
            , vec![]
            );
        }

        let hint = if self.use_hint { self.hint.get() } else { None };
        let order = traversal_order(candidates, hint.as_deref());
        let started = Instant::now();

        let mut models_tried: Vec<ModelIdentifier>
          = Vec::with_capacity(order.len());
        let mut last_kind = FailureKind::Unknown;
        let mut last_message = "no candidate produced text".to_string();

        for model in order
        {   let remaining = self.call_budget
              .saturating_sub(started.elapsed());
            if remaining.is_zero()
            {   warn!(
                  "Call budget spent after {} attempts",
                  models_tried.len()
                );
                return failure(
                  FailureKind::Transient
                , "call budget exhausted before all candidates were tried"
                    .to_string()
                , models_tried
                );
            }
            let limit = remaining.min(self.attempt_timeout);

            models_tried.push(model.to_string());
            debug!(
              "Attempt {} with model {} (limit {:?})",
              models_tried.len(), model, limit
            );

            match self.attempt(backend, model, request, limit).await
            {   Ok(text) => {
                  self.hint.set(model);
                  info!(
                    "Generated {} chars with {} after {} attempts",
                    text.len(), model, models_tried.len()
                  );
                  return GenerationOutcome::Success
                  {   text
                    , model_used: model.to_string()
                    , models_tried
                  };
                }
              , Err(e) => {
                  warn!("Model {} failed: {}", model, e);
                  if e.kind.is_fatal()
                  {   return failure(e.kind, e.message, models_tried);
                  }
                  last_kind = e.kind;
                  last_message = e.message;
                }
            }
        }

        warn!("All {} candidates failed", models_tried.len());
        failure(last_kind, last_message, models_tried)
    }

    /// One bounded attempt; timeouts, panics and blank text are
    /// classified here
    async fn attempt<B>(
      &self
    , backend: &B
    , model: &str
    , request: &GenerationRequest
    , limit: Duration
    ) -> Result<String, AttemptError>
    where
      B: crate::providers::GenerationBackend
    {   let call = AssertUnwindSafe(backend.generate(model, request))
          .catch_unwind();
        match tokio::time::timeout(limit, call).await
        {   Ok(Ok(Ok(text))) => {
              let trimmed = text.trim();
              if trimmed.is_empty()
              {   Err(AttemptError::unavailable("model returned no text"))
              } else
              {   Ok(trimmed.to_string())
              }
            }
          , Ok(Ok(Err(e))) => Err(e)
          , Ok(Err(payload)) => {
              let reason = panic_reason(payload.as_ref());
              error!("Backend panicked on {}: {}", model, reason);
              Err(AttemptError::unknown(
                format!("backend panicked: {}", reason)
              ))
            }
          , Err(_) => Err(AttemptError::transient(
              format!("no response within {:?}", limit)
            ))
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str
{   if let Some(s) = payload.downcast_ref::<&str>()
    {   s
    } else if let Some(s) = payload.downcast_ref::<String>()
    {   s.as_str()
    } else
    {   "unknown panic"
    }
}

fn failure(
  kind: FailureKind
, message: String
, models_tried: Vec<ModelIdentifier>
) -> GenerationOutcome
{   GenerationOutcome::Failure(DispatchFailure
    {   kind
      , message
      , models_tried
    })
}
