//! Generation backends

pub mod gemini;

use std::future::Future;

// Re-export for convenience
pub use gemini::GeminiClient;

/// One attempt at generating text with a named model.
///
/// Implementations classify their own failures into an
/// [`AttemptError`](crate::error::AttemptError); an `Ok` with empty text is
/// left for the dispatcher to judge.
pub trait GenerationBackend: Send + Sync
{   fn generate(
      &self
    , model: &str
    , request: &crate::request::GenerationRequest
    ) -> impl Future<Output = Result<String, crate::error::AttemptError>>
      + Send;
}

impl<B: GenerationBackend> GenerationBackend for std::sync::Arc<B>
{   fn generate(
      &self
    , model: &str
    , request: &crate::request::GenerationRequest
    ) -> impl Future<Output = Result<String, crate::error::AttemptError>>
      + Send
    {   (**self).generate(model, request)
    }
}
