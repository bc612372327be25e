//! MEDIAGEN server - HTTP front for text-to-media generation

use log::{info, warn};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use mediagen::config::{load_env_files, AppConfig};
use mediagen::server::{create_router, AppState};
use mediagen::{MediaClient, Provider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>>
{   load_env_files();
    env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).init();

    info!("Starting MEDIAGEN server");

    let config = AppConfig::from_env();
    for provider in [Provider::Gemini, Provider::OpenAI]
    {   let settings = config.settings(provider);
        if settings.api_key.is_none()
        {   warn!(
              "{} not set; {} requests will fail",
              settings.key_hint(),
              served_kinds(&config, provider)
            );
        }
    }
    info!(
      "Video via {} (image fallback {}), polling every {} ms up to {} times",
      config.failover.video_provider,
      if config.failover.video_fallback { "on" } else { "off" },
      config.polling.interval_ms,
      config.polling.max_attempts
    );

    let addr = config.server.addr();
    let shutdown = CancellationToken::new();
    let state = AppState::with_shutdown(
      MediaClient::new(config),
      shutdown.clone()
    );
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
      .with_graceful_shutdown(shutdown_signal(shutdown))
      .await?;

    info!("Server stopped");
    Ok(())
}

/// Media kinds routed to `provider` by the failover configuration
fn served_kinds(config: &AppConfig, provider: Provider) -> String
{   let failover = &config.failover;
    let kinds: Vec<&str> = [
        (failover.video_provider, "video"),
        (failover.image_provider, "image"),
        (failover.audio_provider, "audio"),
      ]
      .iter()
      .filter(|(routed, _)| *routed == provider)
      .map(|(_, kind)| *kind)
      .collect();
    if kinds.is_empty()
    {   "no".to_string()
    } else
    {   kinds.join(" and ")
    }
}

/// Wait for Ctrl+C or SIGTERM, then cancel in-flight work
async fn shutdown_signal(shutdown: CancellationToken)
{   let ctrl_c = async {
      if let Err(e) = signal::ctrl_c().await
      {   warn!("Failed to listen for Ctrl+C: {}", e);
          std::future::pending::<()>().await;
      }
    };

    #[cfg(unix)]
    let terminate = async {
      match signal::unix::signal(signal::unix::SignalKind::terminate())
      {   Ok(mut stream) => {
            stream.recv().await;
          }
        , Err(e) => {
            warn!("Failed to listen for SIGTERM: {}", e);
            std::future::pending::<()>().await;
          }
      }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select!
    {   _ = ctrl_c => {
          info!("Received Ctrl+C, shutting down...");
        }
      , _ = terminate => {
          info!("Received SIGTERM, shutting down...");
        }
    }
    shutdown.cancel();
}
