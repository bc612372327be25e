use std::fmt;

/// Error type for media generation operations
/// Implements Clone so a failed attempt can be kept while the
/// fallback chain moves on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Prompt is missing, blank or not a string
    InvalidInput(String)
  , /// No credentials or model could be resolved
    ConfigurationMissing(String)
  , /// Upstream answered with a non-success status,
    /// or the transport failed before any status arrived
    UpstreamHttp
    {   status: Option<u16>
      , message: String
    }
  , /// Upstream answered success but embedded an error
    UpstreamLogical(String)
  , /// Poll budget exhausted while the job was still pending
    Timeout
    {   attempts: u32
    }
  , /// Upstream said ok but no media URL could be found
    ResponseShapeUnrecognized(String)
  , /// Upstream safety filters rejected the prompt
    PromptBlocked(String)
  , /// Provider does not offer the requested capability
    Unsupported(String)
  , /// Caller went away or the server is shutting down
    Cancelled
}

impl Error
{   /// HTTP status reported to the caller for this error
    pub fn http_status(&self) -> u16
    {   match self
        {   Error::InvalidInput(_) => 400
          , Error::PromptBlocked(_) => 400
          , Error::ConfigurationMissing(_) => 500
          // only 4xx/5xx pass through
          , Error::UpstreamHttp { status: Some(status), .. }
              if (400..=599).contains(status) => *status
          , Error::UpstreamHttp { .. } => 502
          , Error::UpstreamLogical(_) => 500
          , Error::Timeout { .. } => 504
          , Error::ResponseShapeUnrecognized(_) => 502
          , Error::Unsupported(_) => 500
          , Error::Cancelled => 499
        }
    }

    /// Whether the fallback chain may try its next entry after this error
    pub fn is_fallback_eligible(&self) -> bool
    {   !matches!(
          self,
          Error::ConfigurationMissing(_)
            | Error::InvalidInput(_)
            | Error::Cancelled
        )
    }

    /// Build an upstream HTTP error from a status code
    pub fn upstream(status: u16, message: impl Into<String>) -> Self
    {   Error::UpstreamHttp
        {   status: Some(status)
          , message: message.into()
        }
    }

    /// Build an upstream error for a request that never got a status
    pub fn transport(message: impl Into<String>) -> Self
    {   Error::UpstreamHttp
        {   status: None
          , message: message.into()
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::InvalidInput(msg) => {
              write!(f, "{}", msg)
            }
          , Error::ConfigurationMissing(msg) => {
              write!(f, "Missing configuration: {}", msg)
            }
          , Error::UpstreamHttp { status: Some(status), message } => {
              write!(f, "Upstream HTTP {}: {}", status, message)
            }
          , Error::UpstreamHttp { status: None, message } => {
              write!(f, "Upstream request failed: {}", message)
            }
          , Error::UpstreamLogical(msg) => {
              write!(f, "Upstream error: {}", msg)
            }
          , Error::Timeout { attempts } => {
              write!(f,
                "Generation timed out before completion after {} polls",
                attempts
              )
            }
          , Error::ResponseShapeUnrecognized(msg) => {
              write!(f,
                "Provider completed the request but returned no media URL ({})",
                msg
              )
            }
          , Error::PromptBlocked(msg) => {
              write!(f, "Prompt was blocked: {}", msg)
            }
          , Error::Unsupported(msg) => {
              write!(f, "Unsupported: {}", msg)
            }
          , Error::Cancelled => {
              write!(f, "Request was cancelled")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error
{   fn from(e: reqwest::Error) -> Self
    {   match e.status()
        {   Some(status) => Error::upstream(
              status.as_u16(),
              e.to_string()
            )
          , None => Error::transport(e.to_string())
        }
    }
}
