//! Media URL extraction from provider payloads
//!
//! Payloads are treated as untyped JSON. The search is an ordered
//! list of readers so a new provider shape is a one-line change:
//!
//! 1. direct fields (`video.uri`, `video.downloadUri`, `uri`, ...)
//! 2. known containers (`generateVideoResponse.generatedSamples[]`,
//!    `predictions[]`, `output[]`, `data[]`, `audio`)
//! 3. inline base64 bytes, turned into a data URI
//! 4. depth-first descent into `output[]` / `generatedSamples[]`

use log::trace;
use serde_json::{Map, Value};
use crate::error::Error;
use crate::MediaKind;

const MAX_DEPTH: usize = 8;

/// (object, field) pairs read for a URL, in priority order.
/// An empty object name means the field sits on the candidate itself.
const URL_FIELDS: &[(&str, &str)] = &[
    ("video", "uri"),
    ("video", "downloadUri"),
    ("", "uri"),
    ("", "url"),
    ("", "downloadUri"),
    ("media", "url"),
    ("media", "downloadUri"),
];

/// Containers whose elements are candidates, in priority order
const CONTAINER_PATHS: &[&[&str]] = &[
    &["generateVideoResponse", "generatedSamples"],
    &["predictions"],
    &["output"],
    &["data"],
    &["audio"],
];

/// Array fields searched recursively with the full reader list
const RECURSIVE_FIELDS: &[&str] = &["output", "generatedSamples"];

const MEDIA_BYTES_FIELDS: &[&str] = &["bytesBase64Encoded", "b64_json"];
/// `data` is too generic a name to trust outside an inline part
const PART_BYTES_FIELDS: &[&str] = &["data"];

/// (holder, bytes fields) searched for inline media, in priority order
const INLINE_SOURCES: &[(&str, &[&str])] = &[
    ("", MEDIA_BYTES_FIELDS),
    ("video", MEDIA_BYTES_FIELDS),
    ("image", MEDIA_BYTES_FIELDS),
    ("inlineData", PART_BYTES_FIELDS),
    ("inline_data", PART_BYTES_FIELDS),
];
const INLINE_MIME_FIELDS: &[&str] = &["mimeType", "mime_type"];

/// Find the media URL in a provider payload.
///
/// `kind` only supplies the MIME type for inline bytes that do not
/// declare one. Fails with `ResponseShapeUnrecognized` when nothing
/// in the payload qualifies.
pub fn extract_media_url(
  payload: &Value
, kind: MediaKind
) -> Result<String, Error>
{   let root = search_root(payload);
    match find_media_url(root, kind, 0)
    {   Some(url) => {
          trace!("Extracted media URL ({} chars)", url.len());
          Ok(url)
        }
      , None => Err(Error::ResponseShapeUnrecognized(
          describe_shape(root)
        ))
    }
}

/// Reason a completed job's output was withheld by safety filters
pub fn filtered_reason(payload: &Value) -> Option<String>
{   let root = search_root(payload);
    let response = root.get("generateVideoResponse")?;
    let reasons = response
      .get("raiMediaFilteredReasons")
      .and_then(Value::as_array)
      .filter(|reasons| !reasons.is_empty());
    if let Some(reasons) = reasons
    {   let first = reasons
          .iter()
          .find_map(Value::as_str)
          .unwrap_or("The prompt was rejected by the provider's safety filters.");
        return Some(first.to_string());
    }
    let filtered_count = response
      .get("raiMediaFilteredCount")
      .and_then(Value::as_u64)
      .unwrap_or(0);
    let has_samples = response
      .get("generatedSamples")
      .and_then(Value::as_array)
      .map_or(false, |samples| !samples.is_empty());
    if filtered_count > 0 && !has_samples
    {   return Some(format!(
          "{} generated sample(s) were removed by the provider's safety filters.",
          filtered_count
        ));
    }
    None
}

/// True for strings that can be handed to a browser as media
pub fn is_media_url(candidate: &str) -> bool
{   let lowered = candidate
      .trim_start()
      .get(..8)
      .unwrap_or(candidate)
      .to_ascii_lowercase();
    lowered.starts_with("http://")
      || lowered.starts_with("https://")
      || lowered.starts_with("data:")
}

/// Build a self-contained data URI from already-encoded base64
pub fn data_uri(mime: &str, base64_data: &str) -> String
{   format!("data:{};base64,{}", mime, base64_data)
}

fn search_root(payload: &Value) -> &Value
{   match payload.get("response")
    {   Some(response) if response.is_object() => response
      , _ => payload
    }
}

fn find_media_url(
  value: &Value
, kind: MediaKind
, depth: usize
) -> Option<String>
{   if depth > MAX_DEPTH
    {   return None;
    }
    let obj = value.as_object()?;

    if let Some(url) = read_url_fields(obj)
    {   return Some(url);
    }

    for path in CONTAINER_PATHS
    {   let Some(container) = lookup(obj, path) else
        {   continue;
        };
        let found = match container
        {   Value::Array(items) => items
              .iter()
              .find_map(|item| read_candidate(item, kind))
          , Value::Object(_) => read_candidate(container, kind)
          , _ => None
        };
        if found.is_some()
        {   return found;
        }
    }

    if let Some(url) = read_inline(obj, kind)
    {   return Some(url);
    }

    for field in RECURSIVE_FIELDS
    {   let Some(items) = obj.get(*field).and_then(Value::as_array) else
        {   continue;
        };
        for item in items
        {   if let Some(url) = find_media_url(item, kind, depth + 1)
            {   return Some(url);
            }
        }
    }

    None
}

fn read_candidate(value: &Value, kind: MediaKind) -> Option<String>
{   match value
    {   Value::String(raw) => accept_url(raw)
      , Value::Object(obj) => read_url_fields(obj)
          .or_else(|| read_inline(obj, kind))
      , _ => None
    }
}

fn read_url_fields(obj: &Map<String, Value>) -> Option<String>
{   URL_FIELDS.iter().find_map(|(holder, field)| {
      let source = if holder.is_empty()
      {   Some(obj)
      } else
      {   obj.get(*holder).and_then(Value::as_object)
      };
      source?
        .get(*field)
        .and_then(Value::as_str)
        .and_then(accept_url)
    })
}

fn read_inline(obj: &Map<String, Value>, kind: MediaKind) -> Option<String>
{   INLINE_SOURCES.iter().find_map(|(holder, fields)| {
      let source = if holder.is_empty()
      {   Some(obj)
      } else
      {   obj.get(*holder).and_then(Value::as_object)
      };
      inline_data_uri(source?, fields, kind)
    })
}

fn inline_data_uri(
  obj: &Map<String, Value>
, fields: &[&str]
, kind: MediaKind
) -> Option<String>
{   let encoded = fields
      .iter()
      .filter_map(|field| obj.get(*field).and_then(Value::as_str))
      .map(str::trim)
      .find(|encoded| looks_like_base64(encoded))?;
    let mime = INLINE_MIME_FIELDS
      .iter()
      .filter_map(|field| obj.get(*field).and_then(Value::as_str))
      .map(str::trim)
      .find(|mime| mime.contains('/'))
      .unwrap_or_else(|| kind.default_mime());
    Some(data_uri(mime, encoded))
}

/// Standard-alphabet base64 with valid padding. Checked without
/// decoding, since video payloads run to megabytes.
pub fn looks_like_base64(encoded: &str) -> bool
{   if encoded.is_empty() || encoded.len() % 4 != 0
    {   return false;
    }
    let body = encoded.trim_end_matches('=');
    encoded.len() - body.len() <= 2
      && body
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

fn accept_url(raw: &str) -> Option<String>
{   let trimmed = raw.trim();
    is_media_url(trimmed).then(|| trimmed.to_string())
}

fn lookup<'a>(obj: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value>
{   let (first, rest) = path.split_first()?;
    let mut current = obj.get(*first)?;
    for segment in rest
    {   current = current.get(*segment)?;
    }
    Some(current)
}

fn describe_shape(value: &Value) -> String
{   match value
    {   Value::Object(obj) if obj.is_empty() => {
          "empty object".to_string()
        }
      , Value::Object(obj) => {
          let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
          format!("keys: {}", keys.join(", "))
        }
      , Value::Null => "null payload".to_string()
      , other => format!("unexpected {} payload", json_type(other))
    }
}

fn json_type(value: &Value) -> &'static str
{   match value
    {   Value::Null => "null"
      , Value::Bool(_) => "boolean"
      , Value::Number(_) => "number"
      , Value::String(_) => "string"
      , Value::Array(_) => "array"
      , Value::Object(_) => "object"
    }
}
