//! Media generation provider implementations

pub mod gemini;
pub mod openai;

use std::collections::BTreeMap;
use std::sync::Arc;
use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;
use crate::config::ProviderConfig;
use crate::error::Error;
use crate::polling::JobSnapshot;
use crate::{MediaKind, ModelDescriptor, Provider};

// Re-export for convenience
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// How a provider produces a given media kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStyle
{   /// submit_job, then poll_job until terminal
    LongRunning
  , /// one generate_sync call
    Direct
}

/// One page of a model listing
#[derive(Debug, Clone, Default)]
pub struct ModelPage
{   pub models: Vec<ModelDescriptor>
  , pub next_page_token: Option<String>
}

/// Uniform interface over generation providers.
/// Providers implement the subset of capabilities they have;
/// the rest answer `Error::Unsupported`.
#[async_trait]
pub trait MediaProvider: Send + Sync
{   /// Which provider this is
    fn provider(&self) -> Provider;

    /// How `kind` is produced, or `None` if it is not offered
    fn generation_style(&self, kind: MediaKind) -> Option<GenerationStyle>;

    /// Model used when nothing else is configured
    fn default_model(&self, _kind: MediaKind) -> Option<&'static str>
    {   None
    }

    /// Capability tags a discovered model must advertise for `kind`.
    /// Empty means no auto-discovery.
    fn discovery_tags(&self, _kind: MediaKind) -> &'static [&'static str]
    {   &[]
    }

    /// Start an asynchronous job, returning its operation handle
    async fn submit_job(
      &self
    , _prompt: &str
    , _config: &ProviderConfig
    ) -> Result<String, Error>
    {   Err(self.unsupported("submitting long-running jobs"))
    }

    /// Check a job's status once
    async fn poll_job(
      &self
    , _operation_handle: &str
    , _config: &ProviderConfig
    ) -> Result<JobSnapshot, Error>
    {   Err(self.unsupported("polling long-running jobs"))
    }

    /// Generate media in a single call
    async fn generate_sync(
      &self
    , _prompt: &str
    , _kind: MediaKind
    , _config: &ProviderConfig
    ) -> Result<Value, Error>
    {   Err(self.unsupported("direct generation"))
    }

    /// Fetch one page of the model listing
    async fn list_models(
      &self
    , _api_key: &str
    , _page_token: Option<&str>
    ) -> Result<ModelPage, Error>
    {   Err(self.unsupported("listing models"))
    }

    fn unsupported(&self, what: &str) -> Error
    {   Error::Unsupported(format!(
          "{} does not support {}",
          self.provider(), what
        ))
    }
}

/// Walk a provider's model listing until a model advertising one of
/// `tags` turns up. Listing failures count as "no match".
pub async fn discover_model(
  provider: &dyn MediaProvider
, api_key: &str
, tags: &[&str]
) -> Option<String>
{   let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop
    { let page = match provider
          .list_models(api_key, page_token.as_deref())
          .await
      {   Ok(page) => page
        , Err(e) => {
            warn!(
              "Unable to auto-detect a {} model: {}",
              provider.provider(), e
            );
            return None;
          }
      };
      pages += 1;

      if let Some(found) = page.models
        .iter()
        .find(|model| model.supports_any(tags))
      {   debug!(
            "Discovered {} model {} after {} page(s)",
            provider.provider(), found.name, pages
          );
          return Some(found.name.clone());
      }

      match page.next_page_token.filter(|token| !token.is_empty())
      {   Some(next) if page_token.as_deref() == Some(next.as_str()) => {
            warn!("Model listing repeated page token, stopping");
            return None;
          }
        , Some(next) => page_token = Some(next)
        , None => {
            debug!(
              "No {} model advertises {:?} ({} page(s))",
              provider.provider(), tags, pages
            );
            return None;
          }
      }
    }
}

/// Registry of provider adapters, keyed by provider
#[derive(Default, Clone)]
pub struct ProviderRegistry
{   providers: BTreeMap<Provider, Arc<dyn MediaProvider>>
}

impl ProviderRegistry
{   pub fn new() -> Self
    {   Self::default()
    }

    /// Adapters for every supported provider, sharing one HTTP client
    pub fn with_defaults(
      config: &crate::config::AppConfig
    , http: reqwest::Client
    ) -> Self
    {   let mut registry = ProviderRegistry::new();
        registry.register(GeminiProvider::new(
          &config.gemini.api_base,
          http.clone()
        ));
        registry.register(OpenAiProvider::new(
          &config.openai.api_base,
          http
        ));
        registry
    }

    pub fn register<P: MediaProvider + 'static>(&mut self, provider: P)
    {   self.insert(Arc::new(provider));
    }

    pub fn insert(&mut self, provider: Arc<dyn MediaProvider>)
    {   self.providers.insert(provider.provider(), provider);
    }

    pub fn get(&self, provider: Provider) -> Option<&Arc<dyn MediaProvider>>
    {   self.providers.get(&provider)
    }

    pub fn names(&self) -> Vec<Provider>
    {   self.providers.keys().copied().collect()
    }
}
