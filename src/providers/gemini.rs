use async_trait::async_trait;
use log::{debug, error, trace};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use crate::config::ProviderConfig;
use crate::error::Error;
use crate::polling::{JobSnapshot, JobStatus};
use crate::providers::{GenerationStyle, MediaProvider, ModelPage};
use crate::{MediaKind, ModelDescriptor, Provider};

const API_KEY_HEADER: &str = "x-goog-api-key";
const MODELS_PAGE_SIZE: &str = "100";

/// Capability tags of models that can generate video
pub const VIDEO_GENERATION_METHODS: &[&str]
  = &["predictLongRunning", "generateVideo"];

// ===== Wire Types =====

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiErrorEnvelope
{   pub error: Option<GeminiErrorBody>
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiErrorBody
{   #[serde(default)]
    pub code: Option<u16>
  , #[serde(default)]
    pub message: Option<String>
  , #[serde(default)]
    pub status: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiOperation
{   #[serde(default)]
    pub name: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiModelsResponse
{   #[serde(default)]
    pub models: Vec<GeminiModel>
  , #[serde(default)]
    pub next_page_token: Option<String>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiModel
{   #[serde(default)]
    pub name: Option<String>
  , #[serde(default)]
    pub display_name: Option<String>
  , #[serde(default)]
    pub supported_generation_methods: Vec<String>
}

// ===== Gemini Client =====

/// Gemini API adapter: Veo video through long-running predictions
pub struct GeminiProvider
{   api_base: String
  , http: reqwest::Client
}

impl GeminiProvider
{   pub fn new(api_base: &str, http: reqwest::Client) -> Self
    {   debug!("Creating GeminiProvider for {}", api_base);
        GeminiProvider
        {   api_base: api_base.trim_end_matches('/').to_string()
          , http
        }
    }

    fn predict_endpoint(&self, model: &str) -> String
    {   format!(
          "{}/models/{}:predictLongRunning",
          self.api_base,
          crate::normalize_model_id(model)
        )
    }

    fn operation_endpoint(&self, operation_handle: &str) -> String
    {   format!(
          "{}/{}",
          self.api_base,
          operation_handle.trim_start_matches('/')
        )
    }

    /// Turn a non-success response into an upstream error
    async fn upstream_error(
      response: reqwest::Response
    , fallback: String
    ) -> Error
    {   let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<GeminiErrorEnvelope>(&body)
          .ok()
          .and_then(|envelope| envelope.error);
        let message = parsed
          .as_ref()
          .and_then(|e| e.message.clone())
          .filter(|m| !m.trim().is_empty())
          .unwrap_or(fallback);
        let not_found = parsed
          .as_ref()
          .and_then(|e| e.status.as_deref())
          == Some("NOT_FOUND");
        error!("Gemini API error ({}): {}", status, message);
        Error::UpstreamHttp
        {   status: Some(status)
          , message: if not_found
            {   format!(
                  "{} The configured model is unavailable for \
                   predictLongRunning. Set GEMINI_VIDEO_MODEL to a \
                   supported Gemini video model available to your API \
                   key (use the ListModels API to confirm access).",
                  message
                )
            } else
            {   message
            }
        }
    }
}

#[async_trait]
impl MediaProvider for GeminiProvider
{   fn provider(&self) -> Provider
    {   Provider::Gemini
    }

    fn generation_style(&self, kind: MediaKind) -> Option<GenerationStyle>
    {   match kind
        {   MediaKind::Video => Some(GenerationStyle::LongRunning)
          , _ => None
        }
    }

    fn discovery_tags(&self, kind: MediaKind) -> &'static [&'static str]
    {   match kind
        {   MediaKind::Video => VIDEO_GENERATION_METHODS
          , _ => &[]
        }
    }

    async fn submit_job(
      &self
    , prompt: &str
    , config: &ProviderConfig
    ) -> Result<String, Error>
    {   let endpoint = self.predict_endpoint(&config.model_id);
        debug!("Submitting Gemini job to {}", endpoint);

        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "sampleCount": 1 },
        });
        trace!("Gemini request: {}", body);

        let response = self.http
          .post(&endpoint)
          .header(API_KEY_HEADER, &config.api_key)
          .json(&body)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            Error::from(e)
          })?;

        let status = response.status();
        trace!("Gemini submit status: {}", status);

        if !status.is_success()
        {   return Err(Self::upstream_error(
              response,
              format!(
                "Gemini returned HTTP {} when starting video generation.",
                status.as_u16()
              )
            ).await);
        }

        let operation: GeminiOperation = response.json().await
          .map_err(|e| {
            error!("Parse error: {}", e);
            Error::UpstreamLogical(format!(
              "Gemini returned an unreadable operation: {}", e
            ))
          })?;

        operation.name
          .map(|name| name.trim().to_string())
          .filter(|name| !name.is_empty())
          .ok_or_else(|| {
            error!("No operation name in response");
            Error::UpstreamLogical(
              "Gemini did not return an operation name for the request."
                .to_string()
            )
          })
    }

    async fn poll_job(
      &self
    , operation_handle: &str
    , config: &ProviderConfig
    ) -> Result<JobSnapshot, Error>
    {   let endpoint = self.operation_endpoint(operation_handle);

        let response = self.http
          .get(&endpoint)
          .header(API_KEY_HEADER, &config.api_key)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            Error::from(e)
          })?;

        let status = response.status();
        if !status.is_success()
        {   return Err(Self::upstream_error(
              response,
              format!(
                "Gemini returned HTTP {} while polling video generation.",
                status.as_u16()
              )
            ).await);
        }

        let payload: Value = response.json().await
          .map_err(|e| {
            error!("Parse error: {}", e);
            Error::UpstreamLogical(format!(
              "Gemini returned an unreadable operation: {}", e
            ))
          })?;
        trace!("Gemini operation payload: {}", payload);

        let done = payload
          .get("done")
          .and_then(Value::as_bool)
          .unwrap_or(false);
        Ok(JobSnapshot
        {   status: if done { JobStatus::Done } else { JobStatus::Pending }
          , payload
        })
    }

    async fn list_models(
      &self
    , api_key: &str
    , page_token: Option<&str>
    ) -> Result<ModelPage, Error>
    {   let endpoint = format!("{}/models", self.api_base);
        let mut query = vec![
          ("view", "FULL"),
          ("pageSize", MODELS_PAGE_SIZE),
        ];
        if let Some(token) = page_token
        {   query.push(("pageToken", token));
        }

        let response = self.http
          .get(&endpoint)
          .header(API_KEY_HEADER, api_key)
          .query(&query)
          .send()
          .await
          .map_err(|e| {
            error!("Failed to fetch models: {}", e);
            Error::from(e)
          })?;

        let status = response.status();
        trace!("Models response status: {}", status);

        if !status.is_success()
        {   return Err(Self::upstream_error(
              response,
              format!(
                "Gemini returned HTTP {} while listing models.",
                status.as_u16()
              )
            ).await);
        }

        let listing: GeminiModelsResponse = response.json().await
          .map_err(|e| {
            error!("Parse error: {}", e);
            Error::UpstreamLogical(e.to_string())
          })?;

        let models: Vec<ModelDescriptor> = listing.models
          .into_iter()
          .filter_map(|model| {
            let name = crate::normalize_model_id(model.name.as_deref()?);
            (!name.is_empty()).then(|| ModelDescriptor
            {   name
              , display_name: model.display_name
              , supported_generation_methods
                  : model.supported_generation_methods
            })
          })
          .collect();

        debug!("Retrieved {} Gemini models", models.len());
        Ok(ModelPage
        {   models
          , next_page_token: listing.next_page_token
        })
    }
}
