pub mod error;
pub mod config;
pub mod request;
pub mod normalize;
pub mod providers;
pub mod polling;
pub mod failover;
pub mod client;
pub mod server;
use serde::{Deserialize, Serialize};
use std::fmt;

/*

mediagen: one request syntax for text-to-media generation across
providers. A prompt goes in, a media URL comes out.

  caller -> client (orchestrator)
         -> providers (submit / generate)
         -> polling (until done, failed, timed out or cancelled)
         -> normalize (find the URL in whatever shape came back)
         -> caller

On failure the failover chain may retry the request against
another (provider, kind) pair, e.g. a still image in place of a
video.

*/

pub use client::MediaClient;
pub use config::{AppConfig, ProviderConfig};
pub use error::Error;
pub use request::{GenerationRequest, GenerationResult};

/// MEDIAGEN STRUCTURES:

/// Kind of media a request asks for, or a result carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind
{   Video
  , Audio
  , Image
}

impl MediaKind
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   MediaKind::Video => "video"
          , MediaKind::Audio => "audio"
          , MediaKind::Image => "image"
        }
    }

    /// MIME type assumed for inline bytes that do not declare one
    pub fn default_mime(&self) -> &'static str
    {   match self
        {   MediaKind::Video => "video/mp4"
          , MediaKind::Audio => "audio/mpeg"
          , MediaKind::Image => "image/png"
        }
    }
}

impl fmt::Display for MediaKind
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.as_str())
    }
}

/// Generation providers this crate can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider
{   /// Google Gemini API (Veo video models)
    Gemini
  , /// OpenAI (image and speech endpoints)
    OpenAI
}

impl Provider
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   Provider::Gemini => "gemini"
          , Provider::OpenAI => "openai"
        }
    }

    /// Parse a provider name as found in configuration
    pub fn parse(raw: &str) -> Option<Provider>
    {   match raw.trim().to_ascii_lowercase().as_str()
        {   "gemini" | "google" | "veo" => Some(Provider::Gemini)
          , "openai" => Some(Provider::OpenAI)
          , _ => None
        }
    }
}

impl fmt::Display for Provider
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.as_str())
    }
}

/// A model as advertised by a provider's model listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelDescriptor
{   /// Model id without any `models/` prefix
    pub name: String
  , /// Human-readable name, when the provider gives one
    pub display_name: Option<String>
  , /// Capability tags (e.g. "predictLongRunning")
    pub supported_generation_methods: Vec<String>
}

impl ModelDescriptor
{   /// True if the model advertises any of the given capability tags
    pub fn supports_any(&self, tags: &[&str]) -> bool
    {   self.supported_generation_methods
          .iter()
          .any(|method| tags.contains(&method.as_str()))
    }
}

/// Strip the `models/` prefix some providers put on model ids
pub fn normalize_model_id(raw: &str) -> String
{   let trimmed = raw.trim();
    trimmed
      .strip_prefix("models/")
      .unwrap_or(trimmed)
      .to_string()
}
