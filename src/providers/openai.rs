use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::{debug, error, trace};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use crate::config::{
  ProviderConfig,
  DEFAULT_OPENAI_AUDIO_MODEL,
  DEFAULT_OPENAI_IMAGE_MODEL,
  DEFAULT_OPENAI_VIDEO_MODEL,
  DEFAULT_OPENAI_VOICE,
};
use crate::error::Error;
use crate::polling::{JobSnapshot, JobStatus};
use crate::providers::{GenerationStyle, MediaProvider, ModelPage};
use crate::{MediaKind, ModelDescriptor, Provider};

const IMAGE_SIZE: &str = "1024x1024";
const SPEECH_FORMAT: &str = "mp3";

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationRequest
{   pub model: String
  , pub prompt: String
  , pub n: u32
  , pub size: String
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoJobRequest
{   pub model: String
  , pub prompt: String
}

/// A video job as returned by `POST /videos` and `GET /videos/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct VideoJob
{   #[serde(default)]
    pub id: Option<String>
  , #[serde(default)]
    pub status: Option<String>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechRequest
{   pub model: String
  , pub voice: String
  , pub input: String
  , pub response_format: String
}

/// OpenAI error envelope; either shape may appear
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiErrorPayload
{   #[serde(default)]
    pub message: Option<String>
  , #[serde(default)]
    pub error: Option<OpenAiErrorDetail>
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiErrorDetail
{   #[serde(default)]
    pub message: Option<String>
  , #[serde(default, rename = "type")]
    pub kind: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiModelsResponse
{   #[serde(default)]
    pub data: Vec<OpenAiModel>
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiModel
{   pub id: String
  , #[serde(default)]
    pub owned_by: Option<String>
}

/// Caller-facing message for an OpenAI failure
pub fn describe_openai_error(status: u16, body: &str) -> String
{   if status == 401
    {   return "OpenAI rejected the request with status 401. Confirm that \
                OPENAI_API_KEY is correct and has access to the required models."
          .to_string();
    }
    let payload = serde_json::from_str::<OpenAiErrorPayload>(body)
      .unwrap_or_default();
    payload.error
      .and_then(|detail| detail.message)
      .or(payload.message)
      .map(|message| message.trim().to_string())
      .filter(|message| !message.is_empty())
      .unwrap_or_else(|| {
        "An unexpected error occurred while communicating with OpenAI."
          .to_string()
      })
}

// ===== OpenAI Client =====

/// OpenAI adapter: image generation, text-to-speech and video jobs
pub struct OpenAiProvider
{   api_base: String
  , http: reqwest::Client
}

impl OpenAiProvider
{   pub fn new(api_base: &str, http: reqwest::Client) -> Self
    {   debug!("Creating OpenAiProvider for {}", api_base);
        OpenAiProvider
        {   api_base: api_base.trim_end_matches('/').to_string()
          , http
        }
    }

    async fn post_json<T: Serialize + ?Sized>(
      &self
    , path: &str
    , api_key: &str
    , body: &T
    ) -> Result<reqwest::Response, Error>
    {   let endpoint = format!("{}/{}", self.api_base, path);
        debug!("POST {}", endpoint);
        let request = self.http
          .post(&endpoint)
          .bearer_auth(api_key)
          .json(body);
        Self::send(request).await
    }

    async fn get(
      &self
    , path: &str
    , api_key: &str
    ) -> Result<reqwest::Response, Error>
    {   let endpoint = format!("{}/{}", self.api_base, path);
        trace!("GET {}", endpoint);
        let request = self.http
          .get(&endpoint)
          .bearer_auth(api_key);
        Self::send(request).await
    }

    /// Send, mapping any non-success status through the OpenAI error envelope
    async fn send(request: reqwest::RequestBuilder)
      -> Result<reqwest::Response, Error>
    {   let response = request
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            Error::from(e)
          })?;

        let status = response.status();
        trace!("OpenAI response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_default();
            let message = describe_openai_error(
              status.as_u16(),
              &error_text
            );
            error!("OpenAI API error ({}): {}", status, message);
            return Err(Error::upstream(status.as_u16(), message));
        }
        Ok(response)
    }

    async fn generate_image(
      &self
    , prompt: &str
    , config: &ProviderConfig
    ) -> Result<Value, Error>
    {   let request = ImageGenerationRequest
        {   model: config.model_id.clone()
          , prompt: prompt.to_string()
          , n: 1
          , size: IMAGE_SIZE.to_string()
        };
        let response = self
          .post_json("images/generations", &config.api_key, &request)
          .await?;

        response.json::<Value>().await.map_err(|e| {
          error!("Parse error: {}", e);
          Error::UpstreamLogical(format!(
            "OpenAI returned an unreadable image response: {}", e
          ))
        })
    }

    async fn generate_speech(
      &self
    , text: &str
    , config: &ProviderConfig
    ) -> Result<Value, Error>
    {   let request = SpeechRequest
        {   model: config.model_id.clone()
          , voice: config.voice
              .clone()
              .unwrap_or_else(|| DEFAULT_OPENAI_VOICE.to_string())
          , input: text.to_string()
          , response_format: SPEECH_FORMAT.to_string()
        };
        let response = self
          .post_json("audio/speech", &config.api_key, &request)
          .await?;
        inline_media(response, MediaKind::Audio).await
    }

    /// Download a finished video; the job payload itself carries no URL
    async fn download_video(
      &self
    , video_id: &str
    , config: &ProviderConfig
    ) -> Result<Value, Error>
    {   let response = self
          .get(&format!("videos/{}/content", video_id), &config.api_key)
          .await?;
        inline_media(response, MediaKind::Video).await
    }
}

/// JSON bodies pass through; media bytes become an `inlineData` object
async fn inline_media(
  response: reqwest::Response
, kind: MediaKind
) -> Result<Value, Error>
{   let content_type = response
      .headers()
      .get(reqwest::header::CONTENT_TYPE)
      .and_then(|value| value.to_str().ok())
      .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
      .filter(|value| !value.is_empty())
      .unwrap_or_else(|| kind.default_mime().to_string());

    if content_type.ends_with("json")
    {   return response.json::<Value>().await.map_err(|e| {
          error!("Parse error: {}", e);
          Error::UpstreamLogical(e.to_string())
        });
    }

    let bytes = response.bytes().await.map_err(|e| {
      error!("Failed reading {} bytes: {}", kind, e);
      Error::from(e)
    })?;
    if bytes.is_empty()
    {   return Err(Error::UpstreamLogical(format!(
          "OpenAI returned an empty {} body.",
          kind
        )));
    }
    debug!("Received {} bytes of {}", bytes.len(), content_type);

    Ok(json!({
        "inlineData": {
            "mimeType": content_type,
            "data": BASE64.encode(&bytes),
        }
    }))
}

#[async_trait]
impl MediaProvider for OpenAiProvider
{   fn provider(&self) -> Provider
    {   Provider::OpenAI
    }

    fn generation_style(&self, kind: MediaKind) -> Option<GenerationStyle>
    {   match kind
        {   MediaKind::Image | MediaKind::Audio => Some(GenerationStyle::Direct)
          , MediaKind::Video => Some(GenerationStyle::LongRunning)
        }
    }

    fn default_model(&self, kind: MediaKind) -> Option<&'static str>
    {   match kind
        {   MediaKind::Image => Some(DEFAULT_OPENAI_IMAGE_MODEL)
          , MediaKind::Audio => Some(DEFAULT_OPENAI_AUDIO_MODEL)
          , MediaKind::Video => Some(DEFAULT_OPENAI_VIDEO_MODEL)
        }
    }

    async fn submit_job(
      &self
    , prompt: &str
    , config: &ProviderConfig
    ) -> Result<String, Error>
    {   let request = VideoJobRequest
        {   model: config.model_id.clone()
          , prompt: prompt.to_string()
        };
        let response = self
          .post_json("videos", &config.api_key, &request)
          .await?;

        let job: VideoJob = response.json().await.map_err(|e| {
          error!("Parse error: {}", e);
          Error::UpstreamLogical(format!(
            "OpenAI returned an unreadable video job: {}", e
          ))
        })?;
        trace!("OpenAI video job status: {:?}", job.status);

        job.id
          .map(|id| id.trim().to_string())
          .filter(|id| !id.is_empty())
          .ok_or_else(|| {
            error!("No video id in response");
            Error::UpstreamLogical(
              "OpenAI did not return a video id for the request.".to_string()
            )
          })
    }

    async fn poll_job(
      &self
    , operation_handle: &str
    , config: &ProviderConfig
    ) -> Result<JobSnapshot, Error>
    {   let response = self
          .get(&format!("videos/{}", operation_handle), &config.api_key)
          .await?;
        let payload: Value = response.json().await.map_err(|e| {
          error!("Parse error: {}", e);
          Error::UpstreamLogical(format!(
            "OpenAI returned an unreadable video job: {}", e
          ))
        })?;
        trace!("OpenAI video payload: {}", payload);

        match payload.get("status").and_then(Value::as_str)
        {   Some("completed") => {
              let content = self
                .download_video(operation_handle, config)
                .await?;
              Ok(JobSnapshot::done(content))
            }
          , Some("failed") => Ok(JobSnapshot
            {   status: JobStatus::Failed
              , payload
            })
          , _ => Ok(JobSnapshot::pending(payload))
        }
    }

    async fn generate_sync(
      &self
    , prompt: &str
    , kind: MediaKind
    , config: &ProviderConfig
    ) -> Result<Value, Error>
    {   match kind
        {   MediaKind::Image => self.generate_image(prompt, config).await
          , MediaKind::Audio => self.generate_speech(prompt, config).await
          , MediaKind::Video => Err(self.unsupported("direct video generation"))
        }
    }

    async fn list_models(
      &self
    , api_key: &str
    , _page_token: Option<&str>
    ) -> Result<ModelPage, Error>
    {   let response = self.get("models", api_key).await?;

        let listing: OpenAiModelsResponse = response.json().await
          .map_err(|e| {
            error!("Parse error: {}", e);
            Error::UpstreamLogical(e.to_string())
          })?;

        let models: Vec<ModelDescriptor> = listing.data
          .into_iter()
          .map(|model| ModelDescriptor
          {   name: model.id
            , display_name: None
            , supported_generation_methods: Vec::new()
          })
          .collect();

        debug!("Retrieved {} OpenAI models", models.len());
        Ok(ModelPage
        {   models
          , next_page_token: None
        })
    }
}
