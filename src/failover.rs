//! Fallback chain across (provider, media kind) strategies

use std::future::Future;
use log::{debug, info, warn};
use crate::config::FailoverConfig;
use crate::error::Error;
use crate::request::{truncate_chars, GenerationRequest, GenerationResult};
use crate::{MediaKind, Provider};

/// One strategy in the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackStep
{   pub provider: Provider
  , /// Kind of media this step generates
    pub mode: MediaKind
  , /// Appended to the prompt when this step runs
    pub prompt_suffix: Option<String>
}

impl FallbackStep
{   pub fn new(provider: Provider, mode: MediaKind) -> Self
    {   FallbackStep
        {   provider
          , mode
          , prompt_suffix: None
        }
    }

    pub fn with_prompt_suffix(mut self, suffix: impl Into<String>) -> Self
    {   self.prompt_suffix = Some(suffix.into());
        self
    }

    /// The request as this step will send it
    pub fn apply(&self, request: &GenerationRequest) -> GenerationRequest
    {   request.retarget(self.mode, self.prompt_suffix.as_deref())
    }
}

/// Ordered strategies attempted for one request
#[derive(Debug, Clone)]
pub struct FallbackChain
{   steps: Vec<FallbackStep>
}

impl FallbackChain
{   /// Create a chain from explicit steps
    pub fn new(steps: Vec<FallbackStep>) -> Self
    {   debug!("Creating fallback chain with {} steps", steps.len());
        FallbackChain { steps }
    }

    /// Chain for a request under the given failover configuration.
    /// Video gets an image fallback when enabled; other kinds get
    /// their configured provider only.
    pub fn for_request(
      request: &GenerationRequest
    , config: &FailoverConfig
    ) -> Self
    {   let steps = match request.mode()
        {   MediaKind::Video => {
              let mut steps = vec![
                FallbackStep::new(config.video_provider, MediaKind::Video)
              ];
              if config.video_fallback
              {   steps.push(
                    FallbackStep::new(config.image_provider, MediaKind::Image)
                      .with_prompt_suffix(config.fallback_suffix.clone())
                  );
              }
              steps
            }
          , MediaKind::Image => vec![
              FallbackStep::new(config.image_provider, MediaKind::Image)
            ]
          , MediaKind::Audio => vec![
              FallbackStep::new(config.audio_provider, MediaKind::Audio)
            ]
        };
        FallbackChain::new(steps)
    }

    pub fn steps(&self) -> &[FallbackStep]
    {   &self.steps
    }

    /// Run `attempt` for each step in order until one succeeds.
    ///
    /// `ConfigurationMissing` (and any other non-eligible error) stops
    /// the chain at once. When every step fails the last error is
    /// returned. A result from any step but the first carries a note.
    pub async fn run<F, Fut>(
      &self
    , request: &GenerationRequest
    , mut attempt: F
    ) -> Result<GenerationResult, Error>
      where F: FnMut(Provider, GenerationRequest) -> Fut
          , Fut: Future<Output = Result<GenerationResult, Error>>
    {   let mut last_error: Option<Error> = None;

        for (index, step) in self.steps.iter().enumerate()
        {   let step_request = step.apply(request);
            debug!(
              "Attempt {}/{}: {} {} for '{}'",
              index + 1, self.steps.len(), step.provider,
              step.mode, step_request.log_prompt()
            );

            match attempt(step.provider, step_request).await
            {   Ok(result) => {
                  if index == 0
                  {   return Ok(result);
                  }
                  let note = substitution_note(
                    request.mode(),
                    &result,
                    last_error.as_ref()
                  );
                  info!(
                    "Fallback {} {} succeeded for '{}'",
                    step.provider, step.mode, request.log_prompt()
                  );
                  return Ok(result.with_note(note));
                }
              , Err(e) if !e.is_fallback_eligible() => {
                  warn!(
                    "{} {} failed without fallback: {}",
                    step.provider, step.mode, e
                  );
                  return Err(e);
                }
              , Err(e) => {
                  warn!(
                    "{} {} attempt failed for '{}': {}",
                    step.provider, step.mode, request.log_prompt(), e
                  );
                  last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
          Error::ConfigurationMissing(
            "no generation strategy is configured for this request"
              .to_string()
          )
        }))
    }
}

fn substitution_note(
  requested: MediaKind
, result: &GenerationResult
, cause: Option<&Error>
) -> String
{   let cause = cause
      .map(|e| format!(" ({})", truncate_chars(&e.to_string(), 160)))
      .unwrap_or_default();
    match (requested, result.kind)
    {   (MediaKind::Video, MediaKind::Image) => format!(
          "Video generation failed{}; showing a cinematic still frame \
           generated from the same prompt instead.",
          cause
        )
      , (requested, produced) if requested == produced => format!(
          "Primary {} provider failed{}; result came from a fallback provider.",
          requested, cause
        )
      , (requested, produced) => format!(
          "{} generation failed{}; returned {} instead.",
          capitalize(requested.as_str()), cause, produced
        )
    }
}

fn capitalize(word: &str) -> String
{   let mut chars = word.chars();
    match chars.next()
    {   Some(first) => first.to_uppercase().chain(chars).collect()
      , None => String::new()
    }
}
