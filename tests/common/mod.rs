#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use serde_json::Value;
use mediagen::config::{AppConfig, ProviderConfig};
use mediagen::polling::JobSnapshot;
use mediagen::providers::{GenerationStyle, MediaProvider, ModelPage, ProviderRegistry};
use mediagen::{Error, MediaClient, MediaKind, Provider};

/// Call counters for a scripted provider
#[derive(Debug, Default)]
pub struct Calls
{   pub submit: AtomicUsize
  , pub poll: AtomicUsize
  , pub sync: AtomicUsize
  , pub list: AtomicUsize
}

impl Calls
{   pub fn submit(&self) -> usize { self.submit.load(Ordering::SeqCst) }
    pub fn poll(&self) -> usize { self.poll.load(Ordering::SeqCst) }
    pub fn sync(&self) -> usize { self.sync.load(Ordering::SeqCst) }
    pub fn list(&self) -> usize { self.list.load(Ordering::SeqCst) }

    pub fn total(&self) -> usize
    {   self.submit() + self.poll() + self.sync() + self.list()
    }
}

/// In-memory provider that replays scripted answers
pub struct ScriptedProvider
{   provider: Provider
  , styles: Vec<(MediaKind, GenerationStyle)>
  , tags: &'static [&'static str]
  , default_model: Option<&'static str>
  , submit: Mutex<Option<Result<String, Error>>>
  , polls: Mutex<VecDeque<Result<JobSnapshot, Error>>>
  , sync: Mutex<Option<Result<Value, Error>>>
  , pages: Mutex<VecDeque<Result<ModelPage, Error>>>
  , pub calls: Calls
  , pub prompts: Mutex<Vec<String>>
  , pub models: Mutex<Vec<String>>
}

impl ScriptedProvider
{   fn new(provider: Provider) -> Self
    {   ScriptedProvider
        {   provider
          , styles: Vec::new()
          , tags: &[]
          , default_model: None
          , submit: Mutex::new(None)
          , polls: Mutex::new(VecDeque::new())
          , sync: Mutex::new(None)
          , pages: Mutex::new(VecDeque::new())
          , calls: Calls::default()
          , prompts: Mutex::new(Vec::new())
          , models: Mutex::new(Vec::new())
        }
    }

    /// Long-running video provider
    pub fn video(provider: Provider) -> Self
    {   let mut scripted = Self::new(provider);
        scripted.styles.push((MediaKind::Video, GenerationStyle::LongRunning));
        scripted.tags = &["predictLongRunning", "generateVideo"];
        scripted
    }

    /// Direct provider for the given kinds
    pub fn direct(provider: Provider, kinds: &[MediaKind]) -> Self
    {   let mut scripted = Self::new(provider);
        for kind in kinds
        {   scripted.styles.push((*kind, GenerationStyle::Direct));
        }
        scripted.default_model = Some("scripted-default");
        scripted
    }

    pub fn submit_returns(self, outcome: Result<String, Error>) -> Self
    {   *self.submit.lock().unwrap() = Some(outcome);
        self
    }

    pub fn polls_return(self, outcomes: Vec<Result<JobSnapshot, Error>>) -> Self
    {   self.polls.lock().unwrap().extend(outcomes);
        self
    }

    pub fn sync_returns(self, outcome: Result<Value, Error>) -> Self
    {   *self.sync.lock().unwrap() = Some(outcome);
        self
    }

    pub fn pages_return(self, pages: Vec<Result<ModelPage, Error>>) -> Self
    {   self.pages.lock().unwrap().extend(pages);
        self
    }

    pub fn last_prompt(&self) -> Option<String>
    {   self.prompts.lock().unwrap().last().cloned()
    }

    pub fn last_model(&self) -> Option<String>
    {   self.models.lock().unwrap().last().cloned()
    }

    fn record(&self, prompt: &str, config: &ProviderConfig)
    {   self.prompts.lock().unwrap().push(prompt.to_string());
        self.models.lock().unwrap().push(config.model_id.clone());
    }
}

#[async_trait]
impl MediaProvider for ScriptedProvider
{   fn provider(&self) -> Provider
    {   self.provider
    }

    fn generation_style(&self, kind: MediaKind) -> Option<GenerationStyle>
    {   self.styles
          .iter()
          .find(|(k, _)| *k == kind)
          .map(|(_, style)| *style)
    }

    fn default_model(&self, _kind: MediaKind) -> Option<&'static str>
    {   self.default_model
    }

    fn discovery_tags(&self, _kind: MediaKind) -> &'static [&'static str]
    {   self.tags
    }

    async fn submit_job(
      &self
    , prompt: &str
    , config: &ProviderConfig
    ) -> Result<String, Error>
    {   self.calls.submit.fetch_add(1, Ordering::SeqCst);
        self.record(prompt, config);
        self.submit
          .lock()
          .unwrap()
          .clone()
          .unwrap_or_else(|| Ok("op-default".to_string()))
    }

    async fn poll_job(
      &self
    , _operation_handle: &str
    , _config: &ProviderConfig
    ) -> Result<JobSnapshot, Error>
    {   self.calls.poll.fetch_add(1, Ordering::SeqCst);
        self.polls
          .lock()
          .unwrap()
          .pop_front()
          .unwrap_or_else(|| Ok(JobSnapshot::pending(serde_json::json!({ "done": false }))))
    }

    async fn generate_sync(
      &self
    , prompt: &str
    , _kind: MediaKind
    , config: &ProviderConfig
    ) -> Result<Value, Error>
    {   self.calls.sync.fetch_add(1, Ordering::SeqCst);
        self.record(prompt, config);
        self.sync
          .lock()
          .unwrap()
          .clone()
          .unwrap_or_else(|| Err(Error::UpstreamLogical("no scripted answer".to_string())))
    }

    async fn list_models(
      &self
    , _api_key: &str
    , _page_token: Option<&str>
    ) -> Result<ModelPage, Error>
    {   self.calls.list.fetch_add(1, Ordering::SeqCst);
        self.pages
          .lock()
          .unwrap()
          .pop_front()
          .unwrap_or_else(|| Ok(ModelPage::default()))
    }
}

/// Configuration with both keys set and a pinned video model
pub fn keyed_config() -> AppConfig
{   let mut config = AppConfig::default();
    config.gemini.api_key = Some("gemini-test-key-0000".to_string());
    config.gemini.video_model = Some("veo-test".to_string());
    config.openai.api_key = Some("sk-test-key-0000".to_string());
    config
}

/// Client over the given scripted providers
pub fn client_with(
  config: AppConfig
, providers: Vec<Arc<ScriptedProvider>>
) -> MediaClient
{   let mut registry = ProviderRegistry::new();
    for provider in providers
    {   registry.insert(provider);
    }
    MediaClient::with_providers(config, registry)
}

/// Provider config for driving a polling loop directly
pub fn provider_config(interval_ms: u64, max_attempts: u32) -> ProviderConfig
{   ProviderConfig
    {   provider: Provider::Gemini
      , api_key: "gemini-test-key-0000".to_string()
      , model_id: "veo-test".to_string()
      , poll_interval_ms: interval_ms
      , max_poll_attempts: max_attempts
      , voice: None
    }
}

/// Serve `router` on an ephemeral local port; returns its base URL
pub async fn spawn_upstream(router: axum::Router) -> String
{   let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
      .await
      .expect("bind local listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
      axum::serve(listener, router).await.expect("serve upstream");
    });
    format!("http://{}", addr)
}
