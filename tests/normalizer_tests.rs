use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use mediagen::normalize::{extract_media_url, filtered_reason, is_media_url, looks_like_base64};
use mediagen::{Error, MediaKind};

#[test]
fn test_video_uri_is_returned_verbatim()
{   let uri = "https://generativelanguage.googleapis.com/files/abc:download?alt=media&key=1";
    let payload = json!({ "video": { "uri": uri } });
    let url = assert_ok!(extract_media_url(&payload, MediaKind::Video));
    assert_eq!(url, uri);
}

#[test]
fn test_generated_samples_in_operation_envelope()
{   let payload = json!({
        "name": "operations/op-123",
        "done": true,
        "response": {
            "generateVideoResponse": {
                "generatedSamples": [
                    { "video": { "uri": "https://x/1.mp4" } }
                ]
            }
        }
    });
    let url = assert_ok!(extract_media_url(&payload, MediaKind::Video));
    assert_eq!(url, "https://x/1.mp4");
}

#[test]
fn test_download_uri_used_when_uri_missing()
{   let payload = json!({ "video": { "downloadUri": "https://x/dl.mp4" } });
    let url = assert_ok!(extract_media_url(&payload, MediaKind::Video));
    assert_eq!(url, "https://x/dl.mp4");
}

#[test]
fn test_direct_fields_win_over_containers()
{   let payload = json!({
        "uri": "https://x/direct.mp4",
        "predictions": [{ "uri": "https://x/prediction.mp4" }]
    });
    let url = assert_ok!(extract_media_url(&payload, MediaKind::Video));
    assert_eq!(url, "https://x/direct.mp4");
}

#[test]
fn test_container_priority_order()
{   let payload = json!({
        "data": [{ "url": "https://x/data.png" }],
        "output": [{ "url": "https://x/output.png" }],
        "predictions": [{ "url": "https://x/prediction.png" }]
    });
    let url = assert_ok!(extract_media_url(&payload, MediaKind::Image));
    assert_eq!(url, "https://x/prediction.png");

    let payload = json!({
        "data": [{ "url": "https://x/data.png" }],
        "output": ["https://x/output.png"]
    });
    let url = assert_ok!(extract_media_url(&payload, MediaKind::Image));
    assert_eq!(url, "https://x/output.png");
}

#[test]
fn test_openai_image_shapes()
{   let payload = json!({
        "created": 1700000000,
        "data": [{ "url": "https://x/1.png", "revised_prompt": "a cat" }]
    });
    let url = assert_ok!(extract_media_url(&payload, MediaKind::Image));
    assert_eq!(url, "https://x/1.png");

    let payload = json!({ "data": [{ "b64_json": "aGVsbG8=" }] });
    let url = assert_ok!(extract_media_url(&payload, MediaKind::Image));
    assert_eq!(url, "data:image/png;base64,aGVsbG8=");
}

#[test]
fn test_inline_bytes_become_decodable_data_uri()
{   let bytes: Vec<u8> = (0u8..=255).collect();
    let encoded = BASE64.encode(&bytes);
    let payload = json!({
        "generateVideoResponse": {
            "generatedSamples": [{
                "video": {
                    "bytesBase64Encoded": encoded,
                    "mimeType": "video/webm"
                }
            }]
        }
    });

    let url = assert_ok!(extract_media_url(&payload, MediaKind::Video));
    let prefix = "data:video/webm;base64,";
    assert!(url.starts_with(prefix), "unexpected url: {}", url);
    let decoded = assert_ok!(BASE64.decode(&url[prefix.len()..]));
    assert_eq!(decoded, bytes);
}

#[test]
fn test_inline_bytes_default_mime_follows_kind()
{   let payload = json!({ "inlineData": { "data": "SUQzBAA=" } });
    let url = assert_ok!(extract_media_url(&payload, MediaKind::Audio));
    assert_eq!(url, "data:audio/mpeg;base64,SUQzBAA=");

    let url = assert_ok!(extract_media_url(&payload, MediaKind::Video));
    assert_eq!(url, "data:video/mp4;base64,SUQzBAA=");
}

#[test]
fn test_bare_data_field_is_not_media()
{   for payload in [
      json!({ "data": "test" }),
      json!({ "output": [{ "data": "dGVzdA==" }] }),
      json!({ "video": { "data": "dGVzdA==" } }),
    ]
    {   let err = assert_err!(extract_media_url(&payload, MediaKind::Video));
        assert!(matches!(err, Error::ResponseShapeUnrecognized(_)), "{:?}", err);
    }

    let payload = json!({ "inline_data": { "mime_type": "video/webm", "data": "dGVzdA==" } });
    let url = assert_ok!(extract_media_url(&payload, MediaKind::Video));
    assert_eq!(url, "data:video/webm;base64,dGVzdA==");
}

#[test]
fn test_malformed_base64_is_skipped()
{   for encoded in ["aGVsbG8", "aGVs bG8=", "aGVsbG8-", "a===", "aGVsbG8=aGVs", ""]
    {   let payload = json!({ "video": { "bytesBase64Encoded": encoded } });
        let err = assert_err!(extract_media_url(&payload, MediaKind::Video));
        assert!(matches!(err, Error::ResponseShapeUnrecognized(_)), "{}: {:?}", encoded, err);
    }

    // an invalid first source does not hide a valid later one
    let payload = json!({
        "bytesBase64Encoded": "not base64!",
        "video": { "bytesBase64Encoded": "aGVsbG8=", "mimeType": "video/mp4" }
    });
    let url = assert_ok!(extract_media_url(&payload, MediaKind::Video));
    assert_eq!(url, "data:video/mp4;base64,aGVsbG8=");
}

#[test]
fn test_looks_like_base64()
{   assert!(looks_like_base64("aGVsbG8="));
    assert!(looks_like_base64("aGVsbA=="));
    assert!(looks_like_base64("aGVsbG8h"));
    assert!(looks_like_base64("ab+/"));
    assert!(!looks_like_base64(""));
    assert!(!looks_like_base64("aGVsbG8"));
    assert!(!looks_like_base64("a==="));
    assert!(!looks_like_base64("aGVs=G8="));
    assert!(!looks_like_base64("aGVsbG8_"));
}

#[test]
fn test_audio_container()
{   let payload = json!({ "audio": { "url": "https://x/speech.mp3" } });
    let url = assert_ok!(extract_media_url(&payload, MediaKind::Audio));
    assert_eq!(url, "https://x/speech.mp3");
}

#[test]
fn test_nested_output_is_searched()
{   let payload = json!({
        "output": [
            { "status": "ok" },
            { "output": [{ "video": { "uri": "https://x/nested.mp4" } }] }
        ]
    });
    let url = assert_ok!(extract_media_url(&payload, MediaKind::Video));
    assert_eq!(url, "https://x/nested.mp4");
}

#[test]
fn test_non_url_strings_are_rejected()
{   let payload = json!({
        "video": { "uri": "files/abc123" },
        "url": "ftp://x/1.mp4",
        "output": ["not a url"]
    });
    let err = assert_err!(extract_media_url(&payload, MediaKind::Video));
    assert!(matches!(err, Error::ResponseShapeUnrecognized(_)));
}

#[test]
fn test_unrecognized_payload_lists_keys()
{   let payload = json!({ "done": true, "response": { "foo": 1, "bar": [] } });
    let err = assert_err!(extract_media_url(&payload, MediaKind::Video));
    match err
    {   Error::ResponseShapeUnrecognized(detail) => {
          assert!(detail.contains("foo"), "detail: {}", detail);
          assert!(detail.contains("bar"), "detail: {}", detail);
        }
      , other => panic!("unexpected error: {:?}", other)
    }
}

#[test]
fn test_odd_payloads_do_not_panic()
{   for payload in [json!(null), json!([]), json!("https://x"), json!(42), json!({})]
    {   let err = assert_err!(extract_media_url(&payload, MediaKind::Video));
        assert_eq!(err.http_status(), 502);
    }
}

#[test]
fn test_filtered_reason()
{   let blocked = json!({
        "response": {
            "generateVideoResponse": {
                "raiMediaFilteredCount": 1,
                "raiMediaFilteredReasons": ["Prompt contained unsafe content."]
            }
        }
    });
    assert_eq!(
      filtered_reason(&blocked).as_deref(),
      Some("Prompt contained unsafe content.")
    );

    let counted = json!({
        "generateVideoResponse": { "raiMediaFilteredCount": 2 }
    });
    assert!(filtered_reason(&counted).is_some());

    let fine = json!({
        "generateVideoResponse": {
            "generatedSamples": [{ "video": { "uri": "https://x/1.mp4" } }]
        }
    });
    assert_eq!(filtered_reason(&fine), None);
}

#[test]
fn test_is_media_url()
{   assert!(is_media_url("https://x/1.mp4"));
    assert!(is_media_url("HTTP://x/1.mp4"));
    assert!(is_media_url("data:audio/mpeg;base64,AAAA"));
    assert!(!is_media_url("ftp://x/1.mp4"));
    assert!(!is_media_url("files/abc"));
    assert!(!is_media_url(""));
}
