#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use compass::error::AttemptError;
use compass::request::GenerationRequest;

/// What the stub does for one model
#[derive(Debug, Clone)]
pub enum Script
{   Text(String)
  , Fail(AttemptError)
  , Slow(Duration, String)
  , Panic(String)
}

/// Deterministic backend: one script per model, unknown models are
/// reported as unavailable. Records every call in order.
#[derive(Debug, Default)]
pub struct ScriptedBackend
{   scripts: HashMap<String, Script>
  , calls: Mutex<Vec<String>>
  , prompts: Mutex<Vec<String>>
}

impl ScriptedBackend
{   pub fn new() -> Self
    {   ScriptedBackend::default()
    }

    pub fn text(mut self, model: &str, text: &str) -> Self
    {   self.scripts.insert(
          model.to_string(),
          Script::Text(text.to_string())
        );
        self
    }

    pub fn fail(mut self, model: &str, error: AttemptError) -> Self
    {   self.scripts.insert(model.to_string(), Script::Fail(error));
        self
    }

    pub fn slow(mut self, model: &str, delay: Duration, text: &str)
      -> Self
    {   self.scripts.insert(
          model.to_string(),
          Script::Slow(delay, text.to_string())
        );
        self
    }

    pub fn panic(mut self, model: &str, message: &str) -> Self
    {   self.scripts.insert(
          model.to_string(),
          Script::Panic(message.to_string())
        );
        self
    }

    pub fn calls(&self) -> Vec<String>
    {   self.calls.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String>
    {   self.prompts.lock().unwrap().clone()
    }
}

impl compass::GenerationBackend for ScriptedBackend
{   async fn generate(
      &self
    , model: &str
    , request: &GenerationRequest
    ) -> Result<String, AttemptError>
    {   self.calls.lock().unwrap().push(model.to_string());
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let script = self.scripts.get(model).cloned();
        match script
        {   Some(Script::Text(text)) => Ok(text)
          , Some(Script::Fail(error)) => Err(error)
          , Some(Script::Slow(delay, text)) => {
              tokio::time::sleep(delay).await;
              Ok(text)
            }
          , Some(Script::Panic(message)) => panic!("{}", message)
          , None => Err(AttemptError::unavailable(
              format!("HTTP 404 model {} not found", model)
            ))
        }
    }
}

pub fn models(names: &[&str]) -> Vec<String>
{   names.iter().map(|n| n.to_string()).collect()
}

pub fn request(prompt: &str) -> GenerationRequest
{   GenerationRequest::new(prompt, 4000)
}

pub fn dispatcher() -> compass::Dispatcher
{   compass::Dispatcher::new(&compass::config::DispatchConfig::default())
}
