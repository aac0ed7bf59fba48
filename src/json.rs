use crate::error::JsonError;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use byte_unit::Byte;
use futures_util::stream::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::error::Category;
use serde_json::Value;

/// JSON body configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct JsonConfig {
    /// Maximum size of a request body.
    pub max_body_size: Byte,
    /// Accept keys that the destination type does not know about.
    pub allow_unknown_fields: bool,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self {
            max_body_size: Byte::from_u64(1024 * 1024),
            allow_unknown_fields: false,
        }
    }
}

/// Envelope for JSON responses.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JsonResponse {
    /// Whether the response describes an error.
    pub error: bool,
    /// Human readable message.
    pub message: String,
    /// Payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonResponse {
    /// Constructs a successful response.
    pub fn ok<S: Into<String>>(message: S, data: Option<Value>) -> Self {
        Self {
            error: false,
            message: message.into(),
            data,
        }
    }

    /// Constructs an error response without payload.
    pub fn error<S: Into<String>>(message: S) -> Self {
        Self {
            error: true,
            message: message.into(),
            data: None,
        }
    }
}

/// Decodes a single JSON value from `bytes`.
///
/// Decode failures are classified into [`JsonError`] variants whose messages
/// are safe to show to the client.
pub fn decode_json<T: DeserializeOwned>(
    bytes: &[u8],
    config: &JsonConfig,
) -> Result<T, JsonError> {
    let limit = config.max_body_size.as_u64();
    if bytes.len() as u64 > limit {
        return Err(JsonError::TooLarge { limit });
    }
    if bytes
        .iter()
        .all(|&b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
    {
        return Err(JsonError::Empty);
    }
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    let mut unknown_fields = Vec::new();
    let value = serde_ignored::deserialize(&mut deserializer, |path| {
        unknown_fields.push(path.to_string())
    })
    .map_err(classify_error)?;
    if !config.allow_unknown_fields {
        if let Some(field) = unknown_fields.into_iter().next() {
            return Err(JsonError::UnknownField(field));
        }
    }
    deserializer.end().map_err(|_| JsonError::MultipleValues)?;
    Ok(value)
}

/// Checks that `bytes` hold exactly one well-formed JSON value.
pub fn validate_json(bytes: &[u8], config: &JsonConfig) -> Result<(), JsonError> {
    decode_json::<Value>(bytes, config).map(|_| ())
}

/// Reads the request body, enforcing [`max_body_size`] while streaming.
///
/// [`max_body_size`]: JsonConfig::max_body_size
pub async fn read_body(
    mut payload: web::Payload,
    config: &JsonConfig,
) -> Result<web::Bytes, JsonError> {
    let limit = config.max_body_size.as_u64();
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk?;
        if (body.len() + chunk.len()) as u64 > limit {
            tracing::warn!("body rejected: exceeds {} bytes", limit);
            return Err(JsonError::TooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

/// Reads the request body and decodes it with [`decode_json`].
pub async fn read_json<T: DeserializeOwned>(
    payload: web::Payload,
    config: &JsonConfig,
) -> Result<T, JsonError> {
    let body = read_body(payload, config).await?;
    decode_json(&body, config).map_err(|e| {
        tracing::debug!("body rejected: {}", e);
        e
    })
}

/// Serializes `data` as the response body.
pub fn write_json<T: Serialize + ?Sized>(status: StatusCode, data: &T) -> HttpResponse {
    HttpResponse::build(status).json(data)
}

/// Builds a [`JsonResponse`] error from `error`, using its status code.
pub fn error_json<E: ResponseError>(error: &E) -> HttpResponse {
    write_json(error.status_code(), &JsonResponse::error(error.to_string()))
}

fn classify_error(error: serde_json::Error) -> JsonError {
    match error.classify() {
        Category::Eof | Category::Io => JsonError::UnexpectedEof,
        Category::Syntax => JsonError::BadlyFormed {
            line: error.line(),
            column: error.column(),
        },
        Category::Data => {
            let message = error.to_string();
            if let Some(rest) = message.strip_prefix("missing field ") {
                JsonError::MissingField(backquoted(rest))
            } else if let Some(rest) = message.strip_prefix("unknown field ") {
                JsonError::UnknownField(backquoted(rest))
            } else {
                JsonError::IncorrectType(message)
            }
        }
    }
}

/// Extracts the first `quoted` word of a serde message.
fn backquoted(message: &str) -> String {
    message.split('`').nth(1).unwrap_or(message).to_string()
}
