use std::collections::HashMap;
use mediagen::config::{redact_key, AppConfig, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS};
use mediagen::{MediaKind, Provider};

fn config_from(vars: &[(&str, &str)]) -> AppConfig
{   let vars: HashMap<String, String> = vars
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    AppConfig::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn test_defaults()
{   let config = config_from(&[]);

    assert_eq!(config.gemini.api_key, None);
    assert_eq!(config.openai.api_key, None);
    assert_eq!(config.gemini.api_base, "https://generativelanguage.googleapis.com/v1beta");
    assert_eq!(config.openai.api_base, "https://api.openai.com/v1");
    assert_eq!(config.polling.interval_ms, DEFAULT_POLL_INTERVAL_MS);
    assert_eq!(config.polling.max_attempts, DEFAULT_MAX_POLL_ATTEMPTS);
    assert!(config.failover.video_fallback);
    assert_eq!(config.failover.fallback_suffix, "cinematic still frame");
    assert_eq!(config.failover.video_provider, Provider::Gemini);
    assert_eq!(config.server.addr(), "0.0.0.0:3000");
}

#[test]
fn test_gemini_key_falls_back_to_google_key()
{   let config = config_from(&[("GOOGLE_API_KEY", "google-key-123456")]);
    assert_eq!(config.gemini.api_key.as_deref(), Some("google-key-123456"));

    let config = config_from(&[
      ("GEMINI_API_KEY", "gemini-key-123456"),
      ("GOOGLE_API_KEY", "google-key-123456"),
    ]);
    assert_eq!(config.gemini.api_key.as_deref(), Some("gemini-key-123456"));

    let config = config_from(&[
      ("GEMINI_API_KEY", "   "),
      ("GOOGLE_API_KEY", "google-key-123456"),
    ]);
    assert_eq!(config.gemini.api_key.as_deref(), Some("google-key-123456"));
}

#[test]
fn test_video_model_is_normalized()
{   let config = config_from(&[("GEMINI_VIDEO_MODEL", " models/veo-3.0-generate-preview ")]);
    assert_eq!(
      config.gemini.model_for(MediaKind::Video),
      Some("veo-3.0-generate-preview")
    );

    let config = config_from(&[("GOOGLE_VIDEO_MODEL", "veo-2.0-generate-001")]);
    assert_eq!(config.gemini.video_model.as_deref(), Some("veo-2.0-generate-001"));
}

#[test]
fn test_overrides()
{   let config = config_from(&[
      ("OPENAI_API_KEY", "sk-abcdefghijkl"),
      ("OPENAI_API_BASE", "http://localhost:8080/v1/"),
      ("OPENAI_IMAGE_MODEL", "dall-e-3"),
      ("OPENAI_TTS_VOICE", "verse"),
      ("MEDIAGEN_POLL_INTERVAL_MS", "250"),
      ("MEDIAGEN_MAX_POLL_ATTEMPTS", "0"),
      ("MEDIAGEN_VIDEO_FALLBACK", "off"),
      ("MEDIAGEN_FALLBACK_SUFFIX", "film still"),
      ("MEDIAGEN_PORT", "8081"),
    ]);

    assert_eq!(config.openai.api_base, "http://localhost:8080/v1");
    assert_eq!(config.openai.model_for(MediaKind::Image), Some("dall-e-3"));
    assert_eq!(config.openai.model_for(MediaKind::Audio), None);
    assert_eq!(config.openai.voice.as_deref(), Some("verse"));
    assert_eq!(config.polling.interval_ms, 250);
    assert_eq!(config.polling.max_attempts, 1);
    assert!(!config.failover.video_fallback);
    assert_eq!(config.failover.fallback_suffix, "film still");
    assert_eq!(config.server.port, 8081);
}

#[test]
fn test_invalid_values_keep_defaults()
{   let config = config_from(&[
      ("MEDIAGEN_POLL_INTERVAL_MS", "soon"),
      ("MEDIAGEN_VIDEO_FALLBACK", "maybe"),
      ("MEDIAGEN_VIDEO_PROVIDER", "sora"),
      ("MEDIAGEN_PORT", "70000"),
    ]);

    assert_eq!(config.polling.interval_ms, DEFAULT_POLL_INTERVAL_MS);
    assert!(config.failover.video_fallback);
    assert_eq!(config.failover.video_provider, Provider::Gemini);
    assert_eq!(config.server.port, 3000);
}

#[test]
fn test_keys_never_appear_in_debug_output()
{   let config = config_from(&[
      ("GEMINI_API_KEY", "gemini-secret-value-9876"),
      ("OPENAI_API_KEY", "sk-secret-value-5432"),
    ]);
    let printed = format!("{:?}", config);

    assert!(!printed.contains("gemini-secret-value"), "{}", printed);
    assert!(!printed.contains("sk-secret-value"), "{}", printed);
    assert!(printed.contains("9876"));

    let serialized = serde_json::to_string(&config).expect("serializable");
    assert!(!serialized.contains("secret"), "{}", serialized);
}

#[test]
fn test_redact_key()
{   assert_eq!(redact_key("short"), "…");
    assert_eq!(redact_key("sk-abcdefghijkl"), "sk-…ijkl");
}

#[test]
fn test_video_can_route_to_openai()
{   let config = config_from(&[
      ("MEDIAGEN_VIDEO_PROVIDER", "OpenAI"),
      ("OPENAI_VIDEO_MODEL", "sora-2-pro"),
    ]);
    assert_eq!(config.failover.video_provider, Provider::OpenAI);
    assert_eq!(config.openai.model_for(MediaKind::Video), Some("sora-2-pro"));

    let config = config_from(&[("MEDIAGEN_VIDEO_PROVIDER", "openai")]);
    assert_eq!(config.failover.video_provider, Provider::OpenAI);
    assert_eq!(config.openai.model_for(MediaKind::Video), None);
}
