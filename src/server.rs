//! HTTP API: `POST /generate-audio` and `POST /generate-video`

use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use log::debug;
use tokio_util::sync::CancellationToken;
use crate::client::MediaClient;
use crate::error::Error;
use crate::request::{
  prompt_from_body,
  AudioResponse,
  ErrorResponse,
  GenerationRequest,
  GenerationResult,
};
use crate::MediaKind;

/// Shared handler state; cheap to clone
#[derive(Clone)]
pub struct AppState
{   pub client: Arc<MediaClient>
  , /// Cancelled when the server shuts down
    pub shutdown: CancellationToken
}

impl AppState
{   pub fn new(client: MediaClient) -> Self
    {   Self::with_shutdown(client, CancellationToken::new())
    }

    pub fn with_shutdown(
      client: MediaClient
    , shutdown: CancellationToken
    ) -> Self
    {   AppState
        {   client: Arc::new(client)
          , shutdown
        }
    }

    /// Token for one request. It fires on shutdown, and also when the
    /// returned guard is dropped (the handler future went away).
    fn request_token(&self) -> (CancellationToken, tokio_util::sync::DropGuard)
    {   let token = self.shutdown.child_token();
        let guard = token.clone().drop_guard();
        (token, guard)
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router
{   Router::new()
      .route("/generate-audio", post(generate_audio))
      .route("/generate-video", post(generate_video))
      .with_state(state)
}

/// API error: status plus an `{error}` body
#[derive(Debug)]
pub struct ApiError
{   pub status: StatusCode
  , pub message: String
}

impl From<Error> for ApiError
{   fn from(err: Error) -> Self
    {   ApiError
        {   status: StatusCode::from_u16(err.http_status())
              .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
          , message: err.to_string()
        }
    }
}

impl IntoResponse for ApiError
{   fn into_response(self) -> Response
    {   let body = Json(ErrorResponse
        {   error: self.message
        });
        (self.status, body).into_response()
    }
}

async fn generate_video(
  State(state): State<AppState>
, body: Bytes
) -> Result<Json<GenerationResult>, ApiError>
{   let prompt = prompt_from_body(&body, "prompt", "Prompt is required")?;
    let request = GenerationRequest::new(prompt, MediaKind::Video)?;
    debug!("[generate-video] prompt: {}", request.log_prompt());

    let (cancel, _guard) = state.request_token();
    let result = state.client.generate(request, cancel).await?;
    Ok(Json(result))
}

async fn generate_audio(
  State(state): State<AppState>
, body: Bytes
) -> Result<Json<AudioResponse>, ApiError>
{   let text = prompt_from_body(&body, "text", "Text is required.")?;
    let request = GenerationRequest::new(text, MediaKind::Audio)?;
    debug!("[generate-audio] text: {}", request.log_prompt());

    let (cancel, _guard) = state.request_token();
    let result = state.client.generate(request, cancel).await?;
    Ok(Json(AudioResponse
    {   url: result.url
    }))
}
