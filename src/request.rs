//! Unified request and response types for MEDIAGEN

use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::error::Error;
use crate::MediaKind;

const LOG_PROMPT_CHARS: usize = 60;

/// Validated generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest
{   prompt: String
  , mode: MediaKind
  , model_override: Option<String>
}

impl GenerationRequest
{   /// Validate and build a request; blank prompts are rejected
    pub fn new(
      prompt: impl Into<String>
    , mode: MediaKind
    ) -> Result<Self, Error>
    {   let prompt = prompt.into();
        if prompt.trim().is_empty()
        {   return Err(Error::InvalidInput(
              "Prompt is required".to_string()
            ));
        }
        Ok(GenerationRequest
        {   prompt
          , mode
          , model_override: None
        })
    }

    /// Pin the model for this request
    pub fn with_model_override(
      mut self
    , model: impl Into<String>
    ) -> Self
    {   let model = crate::normalize_model_id(&model.into());
        self.model_override = (!model.is_empty()).then_some(model);
        self
    }

    pub fn prompt(&self) -> &str
    {   &self.prompt
    }

    pub fn mode(&self) -> MediaKind
    {   self.mode
    }

    pub fn model_override(&self) -> Option<&str>
    {   self.model_override.as_deref()
    }

    /// Same prompt re-targeted at another media kind,
    /// optionally with a descriptive suffix appended
    pub fn retarget(
      &self
    , mode: MediaKind
    , suffix: Option<&str>
    ) -> Self
    {   let prompt = match suffix.map(str::trim).filter(|s| !s.is_empty())
        {   Some(suffix) => format!(
              "{}, {}",
              self.prompt.trim_end().trim_end_matches(&['.', ','][..]),
              suffix
            )
          , None => self.prompt.clone()
        };
        // an override names a model of the original kind
        let model_override = if mode == self.mode
        {   self.model_override.clone()
        } else
        {   None
        };
        GenerationRequest
        {   prompt
          , mode
          , model_override
        }
    }

    /// Prompt shortened for log lines
    pub fn log_prompt(&self) -> String
    {   truncate_chars(&self.prompt, LOG_PROMPT_CHARS)
    }
}

/// Terminal outcome of a successful generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult
{   /// Kind of media actually produced
    #[serde(rename = "type")]
    pub kind: MediaKind
  , /// Absolute URL or data URI
    pub url: String
  , /// Set when a fallback path produced the result
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>
}

impl GenerationResult
{   pub fn new(kind: MediaKind, url: impl Into<String>) -> Self
    {   GenerationResult
        {   kind
          , url: url.into()
          , note: None
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self
    {   self.note = Some(note.into());
        self
    }
}

/// Body of a successful `/generate-audio` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioResponse
{   pub url: String
}

/// Body of any failed call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse
{   pub error: String
}

/// Read a non-blank string field out of a raw JSON request body.
/// Bad JSON, a missing field, a non-string or a blank string
/// all yield `InvalidInput` with `message`.
pub fn prompt_from_body(
  body: &[u8]
, field: &str
, message: &str
) -> Result<String, Error>
{   let parsed: Value = serde_json::from_slice(body)
      .map_err(|_| Error::InvalidInput(message.to_string()))?;
    parsed
      .get(field)
      .and_then(Value::as_str)
      .filter(|text| !text.trim().is_empty())
      .map(str::to_string)
      .ok_or_else(|| Error::InvalidInput(message.to_string()))
}

/// Truncate on a char boundary, marking the cut with an ellipsis
pub fn truncate_chars(text: &str, max_chars: usize) -> String
{   if text.chars().count() <= max_chars
    {   return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
