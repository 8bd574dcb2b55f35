use std::fmt;

/// Custom error type for Mission Compass operations
/// Implements Clone so outcomes can be shared across tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Inbound request failed validation
    InvalidRequest(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Failed to parse a payload
    ParseError(String)
  , /// Every candidate failed, or a fatal failure stopped the dispatch
    Generation(crate::request::DispatchFailure)
  , /// Filesystem error while loading configuration
    Io(String)
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::InvalidRequest(msg) => {
              write!(f, "Invalid request: {}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::Generation(failure) => {
              write!(f,
                "Generation failed ({}): {}",
                failure.kind,
                failure.message
              )
            }
          , Error::Io(msg) => {
              write!(f, "I/O error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error
{   fn from(e: std::io::Error) -> Self
    {   Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error
{   fn from(e: serde_json::Error) -> Self
    {   Error::ParseError(e.to_string())
    }
}

impl From<crate::request::DispatchFailure> for Error
{   fn from(failure: crate::request::DispatchFailure) -> Self
    {   Error::Generation(failure)
    }
}

/// Classified failure of a single backend attempt.
/// The backend decides the kind; the dispatcher decides what to do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptError
{   pub kind: crate::FailureKind
  , pub message: String
}

impl AttemptError
{   pub fn new(
      kind: crate::FailureKind
    , message: impl Into<String>
    ) -> Self
    {   AttemptError
        {   kind
          , message: message.into()
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self
    {   Self::new(crate::FailureKind::RetryableUnavailable, message)
    }

    pub fn blocked(message: impl Into<String>) -> Self
    {   Self::new(crate::FailureKind::Blocked, message)
    }

    pub fn auth_or_config(message: impl Into<String>) -> Self
    {   Self::new(crate::FailureKind::AuthOrConfig, message)
    }

    pub fn transient(message: impl Into<String>) -> Self
    {   Self::new(crate::FailureKind::Transient, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self
    {   Self::new(crate::FailureKind::Unknown, message)
    }
}

impl fmt::Display for AttemptError
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AttemptError {}
