use std::sync::Arc;
use log::{debug, error, info};
use tokio_util::sync::CancellationToken;
use crate::config::{AppConfig, ProviderConfig};
use crate::error::Error;
use crate::failover::FallbackChain;
use crate::normalize;
use crate::polling::PollingLoop;
use crate::providers::{
  discover_model,
  GenerationStyle,
  MediaProvider,
  ProviderRegistry,
};
use crate::request::{GenerationRequest, GenerationResult};
use crate::{ModelDescriptor, Provider};

/// Entry point for media generation.
///
/// Holds only read-only state (configuration and provider adapters),
/// so one instance is shared by every concurrent request.
#[derive(Clone)]
pub struct MediaClient
{   config: Arc<AppConfig>
  , providers: ProviderRegistry
}

impl MediaClient
{   /// Create a client with the built-in provider adapters
    pub fn new(config: AppConfig) -> Self
    {   debug!("Creating MediaClient");
        let providers = ProviderRegistry::with_defaults(
          &config,
          reqwest::Client::new()
        );
        Self::with_providers(config, providers)
    }

    /// Create a client with explicit provider adapters
    pub fn with_providers(
      config: AppConfig
    , providers: ProviderRegistry
    ) -> Self
    {   debug!(
          "MediaClient providers: {:?}",
          providers.names()
        );
        MediaClient
        {   config: Arc::new(config)
          , providers
        }
    }

    pub fn config(&self) -> &AppConfig
    {   &self.config
    }

    /// Generate media for a request, falling back per configuration.
    /// Every failure comes back as an `Error`; none escape as panics.
    pub async fn generate(
      &self
    , request: GenerationRequest
    , cancel: CancellationToken
    ) -> Result<GenerationResult, Error>
    {   let chain = FallbackChain::for_request(
          &request,
          &self.config.failover
        );
        info!(
          "Generating {} for '{}'",
          request.mode(), request.log_prompt()
        );

        let client = self;
        let result = chain
          .run(&request, move |provider, step_request| {
            client.attempt(provider, step_request, cancel.clone())
          })
          .await;

        match &result
        {   Ok(generated) => info!(
              "Generated {} for '{}'{}",
              generated.kind,
              request.log_prompt(),
              if generated.note.is_some() { " (fallback)" } else { "" }
            )
          , Err(e) => {
              let providers: Vec<String> = chain
                .steps()
                .iter()
                .map(|step| format!("{}:{}", step.provider, step.mode))
                .collect();
              error!(
                "Generation of {} failed for '{}' via [{}]: {}",
                request.mode(),
                request.log_prompt(),
                providers.join(", "),
                e
              );
            }
        }
        result
    }

    /// One attempt against one provider, no fallback
    pub async fn attempt(
      &self
    , provider: Provider
    , request: GenerationRequest
    , cancel: CancellationToken
    ) -> Result<GenerationResult, Error>
    {   let adapter = self.adapter(provider)?;
        let kind = request.mode();
        let style = adapter.generation_style(kind)
          .ok_or_else(|| Error::Unsupported(format!(
            "{} cannot generate {}",
            provider, kind
          )))?;

        let config = self.resolve_config(adapter, &request).await?;
        debug!("Resolved {:?}", config);

        if cancel.is_cancelled()
        {   return Err(Error::Cancelled);
        }

        let payload = match style
        {   GenerationStyle::LongRunning => {
              let handle = tokio::select!
              {   _ = cancel.cancelled() => {
                    return Err(Error::Cancelled);
                  }
                , submitted = adapter.submit_job(
                    request.prompt(),
                    &config
                  ) => submitted?
              };
              info!("{} accepted job {}", provider, handle);
              PollingLoop::new(adapter, &config, cancel)
                .run(handle)
                .await?
            }
          , GenerationStyle::Direct => {
              tokio::select!
              {   _ = cancel.cancelled() => {
                    return Err(Error::Cancelled);
                  }
                , generated = adapter.generate_sync(
                    request.prompt(),
                    kind,
                    &config
                  ) => generated?
              }
            }
        };

        if let Some(reason) = normalize::filtered_reason(&payload)
        {   return Err(Error::PromptBlocked(reason));
        }

        let url = normalize::extract_media_url(&payload, kind)?;
        Ok(GenerationResult::new(kind, url))
    }

    /// Resolve key and model for one attempt.
    ///
    /// Model priority: request override, configured model, adapter
    /// default, then auto-discovery through the model listing.
    pub async fn resolve_config(
      &self
    , adapter: &dyn MediaProvider
    , request: &GenerationRequest
    ) -> Result<ProviderConfig, Error>
    {   let provider = adapter.provider();
        let kind = request.mode();
        let settings = self.config.settings(provider);

        let api_key = settings.api_key
          .clone()
          .filter(|key| !key.trim().is_empty())
          .ok_or_else(|| {
            error!("Missing {} environment variable", settings.key_hint());
            Error::ConfigurationMissing(format!(
              "{} environment variable is not configured.",
              settings.key_hint()
            ))
          })?;

        let explicit = request.model_override()
          .or_else(|| settings.model_for(kind))
          .or_else(|| adapter.default_model(kind))
          .map(str::to_string);

        let model_id = match explicit
        {   Some(model) => model
          , None => {
              let tags = adapter.discovery_tags(kind);
              let discovered = if tags.is_empty()
              {   None
              } else
              {   discover_model(adapter, &api_key, tags).await
              };
              discovered.ok_or_else(|| {
                Error::ConfigurationMissing(format!(
                  "No {} models supporting {} are available for this API \
                   key. Set {} to a supported model.",
                  provider,
                  kind,
                  settings.model_hint(kind)
                ))
              })?
            }
        };

        Ok(ProviderConfig
        {   provider
          , api_key
          , model_id
          , poll_interval_ms: self.config.polling.interval_ms
          , max_poll_attempts: self.config.polling.max_attempts
          , voice: settings.voice.clone()
        })
    }

    /// List models with the configured key, to verify credentials
    pub async fn check_credentials(
      &self
    , provider: Provider
    ) -> Result<Vec<ModelDescriptor>, Error>
    {   let adapter = self.adapter(provider)?;
        let settings = self.config.settings(provider);
        let api_key = settings.api_key
          .as_deref()
          .filter(|key| !key.trim().is_empty())
          .ok_or_else(|| {
            Error::ConfigurationMissing(format!(
              "{} is missing.",
              settings.key_hint()
            ))
          })?;
        let page = adapter.list_models(api_key, None).await?;
        Ok(page.models)
    }

    fn adapter(&self, provider: Provider) -> Result<&dyn MediaProvider, Error>
    {   self.providers
          .get(provider)
          .map(|adapter| adapter.as_ref())
          .ok_or_else(|| Error::ConfigurationMissing(format!(
            "no adapter registered for {}",
            provider
          )))
    }
}
