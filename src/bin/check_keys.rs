//! Verify configured provider keys by listing models once per provider

use std::process::ExitCode;
use log::debug;
use mediagen::config::{load_env_files, AppConfig};
use mediagen::{Error, MediaClient, Provider};

#[tokio::main]
async fn main() -> ExitCode
{   load_env_files();
    env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("warn")
    ).init();

    let config = AppConfig::from_env();
    let client = MediaClient::new(config);
    let mut failures = 0usize;
    let mut checked = 0usize;

    for provider in [Provider::OpenAI, Provider::Gemini]
    {   if client.config().settings(provider).api_key.is_none()
        {   println!("- {}: no key configured, skipped", provider);
            continue;
        }
        checked += 1;
        debug!("Checking {} credentials", provider);

        match client.check_credentials(provider).await
        {   Ok(models) => {
              println!("✅ Successfully contacted {}.", provider);
              if let Some(first) = models.first()
              {   println!("   First available model: {}", first.name);
              }
            }
          , Err(e) => {
              failures += 1;
              report_failure(provider, &e);
            }
        }
    }

    if checked == 0
    {   eprintln!(
          "❌ No API keys found. Add OPENAI_API_KEY or GEMINI_API_KEY to .env.local."
        );
        return ExitCode::FAILURE;
    }
    if failures > 0
    {   return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn report_failure(provider: Provider, error: &Error)
{   let status = match error
    {   Error::UpstreamHttp { status: Some(status), .. } => status.to_string()
      , _ => "unknown".to_string()
    };
    eprintln!("❌ Failed to verify the {} API key.", provider);
    eprintln!("   Status: {}", status);
    eprintln!("   Message: {}", error);
}
