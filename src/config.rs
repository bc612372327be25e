//! Configuration for providers, polling, failover and the server

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use crate::{MediaKind, Provider};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 4000;
/// ~3 minutes at the default interval
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 45;
pub const DEFAULT_FALLBACK_SUFFIX: &str = "cinematic still frame";

pub const GEMINI_API_BASE: &str
  = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENAI_API_BASE: &str
  = "https://api.openai.com/v1";

pub const DEFAULT_OPENAI_IMAGE_MODEL: &str = "gpt-image-1";
pub const DEFAULT_OPENAI_AUDIO_MODEL: &str = "gpt-4o-mini-tts";
pub const DEFAULT_OPENAI_VIDEO_MODEL: &str = "sora-2";
pub const DEFAULT_OPENAI_VOICE: &str = "alloy";

/// Load `.env.local` then `.env` into the process environment.
/// Variables already set are left alone, so earlier files win.
pub fn load_env_files()
{   for file in [".env.local", ".env"]
    {   match dotenvy::from_filename(file)
        {   Ok(path) => debug!("Loaded environment from {}", path.display())
          , Err(e) if e.not_found() => {}
          , Err(e) => warn!("Could not read {}: {}", file, e)
        }
    }
}

/// Settings resolved for a single provider attempt.
/// Read-only once built; the key is never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig
{   pub provider: Provider
  , pub api_key: String
  , pub model_id: String
  , pub poll_interval_ms: u64
  , pub max_poll_attempts: u32
  , /// Voice for speech synthesis, where the provider has one
    pub voice: Option<String>
}

impl ProviderConfig
{   pub fn poll_interval(&self) -> Duration
    {   Duration::from_millis(self.poll_interval_ms)
    }
}

impl fmt::Debug for ProviderConfig
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.debug_struct("ProviderConfig")
          .field("provider", &self.provider)
          .field("api_key", &redact_key(&self.api_key))
          .field("model_id", &self.model_id)
          .field("poll_interval_ms", &self.poll_interval_ms)
          .field("max_poll_attempts", &self.max_poll_attempts)
          .field("voice", &self.voice)
          .finish()
    }
}

/// Show at most the last four characters of a secret
pub fn redact_key(key: &str) -> String
{   let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8
    {   return "…".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    let head: String = chars[..3].iter().collect();
    format!("{}…{}", head, tail)
}

/// Credentials and model choices for one provider
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderSettings
{   /// Provider these settings belong to
    pub provider: Provider
  , /// API key, absent when not configured
    #[serde(skip_serializing)]
    pub api_key: Option<String>
  , /// API base URL
    pub api_base: String
  , /// Explicit video model, if any
    pub video_model: Option<String>
  , /// Explicit image model, if any
    pub image_model: Option<String>
  , /// Explicit speech model, if any
    pub audio_model: Option<String>
  , /// Speech voice
    pub voice: Option<String>
}

impl ProviderSettings
{   /// Empty settings pointing at the provider's public API
    pub fn new(provider: Provider) -> Self
    {   let api_base = match provider
        {   Provider::Gemini => GEMINI_API_BASE
          , Provider::OpenAI => OPENAI_API_BASE
        };
        ProviderSettings
        {   provider
          , api_key: None
          , api_base: api_base.to_string()
          , video_model: None
          , image_model: None
          , audio_model: None
          , voice: None
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self
    {   self.api_key = Some(key.into());
        self
    }

    /// Model configured for a media kind
    pub fn model_for(&self, kind: MediaKind) -> Option<&str>
    {   match kind
        {   MediaKind::Video => self.video_model.as_deref()
          , MediaKind::Image => self.image_model.as_deref()
          , MediaKind::Audio => self.audio_model.as_deref()
        }
    }

    /// Environment variables that supply this provider's key
    pub fn key_hint(&self) -> &'static str
    {   match self.provider
        {   Provider::Gemini => "GEMINI_API_KEY (or GOOGLE_API_KEY)"
          , Provider::OpenAI => "OPENAI_API_KEY"
        }
    }

    /// Environment variable that pins the model for a media kind
    pub fn model_hint(&self, kind: MediaKind) -> &'static str
    {   match (self.provider, kind)
        {   (Provider::Gemini, _) => "GEMINI_VIDEO_MODEL"
          , (Provider::OpenAI, MediaKind::Audio) => "OPENAI_AUDIO_MODEL"
          , (Provider::OpenAI, MediaKind::Video) => "OPENAI_VIDEO_MODEL"
          , (Provider::OpenAI, _) => "OPENAI_IMAGE_MODEL"
        }
    }
}

impl fmt::Debug for ProviderSettings
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.debug_struct("ProviderSettings")
          .field("provider", &self.provider)
          .field("api_key", &self.api_key.as_deref().map(redact_key))
          .field("api_base", &self.api_base)
          .field("video_model", &self.video_model)
          .field("image_model", &self.image_model)
          .field("audio_model", &self.audio_model)
          .field("voice", &self.voice)
          .finish()
    }
}

/// Polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig
{   /// Delay between polls in milliseconds
    pub interval_ms: u64
  , /// Poll calls allowed before giving up
    pub max_attempts: u32
}

impl Default for PollingConfig
{   fn default() -> Self
    {   PollingConfig
        {   interval_ms: DEFAULT_POLL_INTERVAL_MS
          , max_attempts: DEFAULT_MAX_POLL_ATTEMPTS
        }
    }
}

/// Failover configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverConfig
{   /// Fall back from video to a still image automatically
    pub video_fallback: bool
  , /// Appended to the prompt for the image fallback
    pub fallback_suffix: String
  , /// Provider asked for video
    pub video_provider: Provider
  , /// Provider asked for images
    pub image_provider: Provider
  , /// Provider asked for speech
    pub audio_provider: Provider
}

impl Default for FailoverConfig
{   fn default() -> Self
    {   FailoverConfig
        {   video_fallback: true
          , fallback_suffix: DEFAULT_FALLBACK_SUFFIX.to_string()
          , video_provider: Provider::Gemini
          , image_provider: Provider::OpenAI
          , audio_provider: Provider::OpenAI
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig
{   pub host: String
  , pub port: u16
}

impl ServerConfig
{   pub fn addr(&self) -> String
    {   format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig
{   fn default() -> Self
    {   ServerConfig
        {   host: "0.0.0.0".to_string()
          , port: 3000
        }
    }
}

/// MEDIAGEN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig
{   pub gemini: ProviderSettings
  , pub openai: ProviderSettings
  , pub polling: PollingConfig
  , pub failover: FailoverConfig
  , pub server: ServerConfig
}

impl Default for AppConfig
{   fn default() -> Self
    {   AppConfig
        {   gemini: ProviderSettings::new(Provider::Gemini)
          , openai: ProviderSettings::new(Provider::OpenAI)
          , polling: PollingConfig::default()
          , failover: FailoverConfig::default()
          , server: ServerConfig::default()
        }
    }
}

impl AppConfig
{   /// Load configuration from the process environment
    pub fn from_env() -> Self
    {   Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
      where F: Fn(&str) -> Option<String>
    {   let env = Lookup(lookup);
        let defaults = AppConfig::default();

        let mut gemini = ProviderSettings::new(Provider::Gemini);
        gemini.api_key = env.first(&["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
        gemini.video_model = env
          .first(&["GEMINI_VIDEO_MODEL", "GOOGLE_VIDEO_MODEL"])
          .map(|model| crate::normalize_model_id(&model))
          .filter(|model| !model.is_empty());
        if let Some(base) = env.base_url("GEMINI_API_BASE")
        {   gemini.api_base = base;
        }

        let mut openai = ProviderSettings::new(Provider::OpenAI);
        openai.api_key = env.get("OPENAI_API_KEY");
        openai.image_model = env.get("OPENAI_IMAGE_MODEL");
        openai.audio_model = env.get("OPENAI_AUDIO_MODEL");
        openai.video_model = env.get("OPENAI_VIDEO_MODEL");
        openai.voice = env.get("OPENAI_TTS_VOICE");
        if let Some(base) = env.base_url("OPENAI_API_BASE")
        {   openai.api_base = base;
        }

        let polling = PollingConfig
        {   interval_ms: env.parsed(
              "MEDIAGEN_POLL_INTERVAL_MS",
              defaults.polling.interval_ms
            )
          , max_attempts: env.parsed(
              "MEDIAGEN_MAX_POLL_ATTEMPTS",
              defaults.polling.max_attempts
            ).max(1)
        };

        let mut failover = defaults.failover;
        failover.video_fallback = env.switch(
          "MEDIAGEN_VIDEO_FALLBACK",
          failover.video_fallback
        );
        if let Some(suffix) = env.get("MEDIAGEN_FALLBACK_SUFFIX")
        {   failover.fallback_suffix = suffix;
        }
        if let Some(raw) = env.get("MEDIAGEN_VIDEO_PROVIDER")
        {   match Provider::parse(&raw)
            {   Some(provider) => failover.video_provider = provider
              , None => warn!(
                  "Unknown MEDIAGEN_VIDEO_PROVIDER='{}', keeping {}",
                  raw, failover.video_provider
                )
            }
        }

        let server = ServerConfig
        {   host: env.get("MEDIAGEN_HOST")
              .unwrap_or(defaults.server.host)
          , port: env.parsed("MEDIAGEN_PORT", defaults.server.port)
        };

        let config = AppConfig
        {   gemini
          , openai
          , polling
          , failover
          , server
        };
        debug!("Loaded configuration: {:?}", config);
        config
    }

    /// Settings for a provider
    pub fn settings(&self, provider: Provider) -> &ProviderSettings
    {   match provider
        {   Provider::Gemini => &self.gemini
          , Provider::OpenAI => &self.openai
        }
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
  where F: Fn(&str) -> Option<String>
{   fn get(&self, key: &str) -> Option<String>
    {   (self.0)(key)
          .map(|value| value.trim().to_string())
          .filter(|value| !value.is_empty())
    }

    fn first(&self, keys: &[&str]) -> Option<String>
    {   keys.iter().find_map(|key| self.get(key))
    }

    fn base_url(&self, key: &str) -> Option<String>
    {   self.get(key)
          .map(|value| value.trim_end_matches('/').to_string())
          .filter(|value| !value.is_empty())
    }

    fn parsed<T>(&self, key: &str, default: T) -> T
      where T: FromStr + fmt::Display
    {   match self.get(key)
        {   Some(raw) => match raw.parse::<T>()
            {   Ok(parsed) => parsed
              , Err(_) => {
                  warn!(
                    "Invalid {}='{}', falling back to {}",
                    key, raw, default
                  );
                  default
                }
            }
          , None => default
        }
    }

    fn switch(&self, key: &str, default: bool) -> bool
    {   match self.get(key).map(|raw| raw.to_ascii_lowercase())
        {   Some(raw) => match raw.as_str()
            {   "1" | "true" | "on" | "yes" => true
              , "0" | "false" | "off" | "no" => false
              , _ => {
                  warn!(
                    "Invalid {}='{}', falling back to {}",
                    key, raw, default
                  );
                  default
                }
            }
          , None => default
        }
    }
}
