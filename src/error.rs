use crate::json::{self, JsonResponse};
use actix_multipart::MultipartError;
use actix_web::error::PayloadError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::io::Error as IoError;
use thiserror::Error;

/// Errors of the random string generator.
#[derive(Debug, Error)]
pub enum RandomError {
    /// None of the character classes are enabled.
    #[error("at least one character class must be included")]
    EmptyCharset,
    /// Requested length is above the allowed maximum.
    #[error("random string length must not exceed {max} characters")]
    TooLong {
        /// Maximum length.
        max: usize,
    },
}

/// Errors of the multipart upload handler.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request did not contain any file field.
    #[error("no file was uploaded")]
    NoFile,
    /// The file exceeds the configured size ceiling.
    #[error("the uploaded file is too big (limit: {limit} bytes)")]
    TooLarge {
        /// Maximum file size in bytes.
        limit: u64,
    },
    /// The sniffed content type is not in the allowed list.
    #[error("the uploaded file type is not permitted ({0})")]
    TypeNotPermitted(String),
    /// The original file name is too long to be stored as is.
    #[error("file name must not be longer than {max} bytes")]
    FileNameTooLong {
        /// Maximum file name length in bytes.
        max: usize,
    },
    /// A file with the target name exists already.
    #[error("file already exists: {0}")]
    AlreadyExists(String),
    /// The random file name could not be generated.
    #[error(transparent)]
    Random(#[from] RandomError),
    /// The multipart stream is malformed.
    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
    /// Writing to the upload directory failed.
    #[error("failed to store file: {0}")]
    Io(#[from] IoError),
}

/// Errors of the JSON body decoder.
///
/// Every variant renders as a message that can be returned to the client as is.
#[derive(Debug, Error)]
pub enum JsonError {
    /// Body is empty or only contains whitespace.
    #[error("body must not be empty")]
    Empty,
    /// Body exceeds the configured size ceiling.
    #[error("body must not be larger than {limit} bytes")]
    TooLarge {
        /// Maximum body size in bytes.
        limit: u64,
    },
    /// Body is not syntactically valid JSON.
    #[error("body contains badly-formed JSON (at line {line}, column {column})")]
    BadlyFormed {
        /// Line of the error.
        line: usize,
        /// Column of the error.
        column: usize,
    },
    /// Body ended in the middle of a value.
    #[error("body contains badly-formed JSON")]
    UnexpectedEof,
    /// A value has the wrong JSON type for its destination.
    #[error("body contains incorrect JSON type ({0})")]
    IncorrectType(String),
    /// A required key is absent.
    #[error("body is missing a required key ({0})")]
    MissingField(String),
    /// A key is not known to the destination type.
    #[error("body contains unknown key \"{0}\"")]
    UnknownField(String),
    /// More than one JSON value follows each other in the body.
    #[error("body must contain only one JSON value")]
    MultipleValues,
    /// The body stream could not be read.
    #[error("failed to read body: {0}")]
    Payload(#[from] PayloadError),
}

impl ResponseError for RandomError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        json::error_json(self)
    }
}

impl ResponseError for UploadError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NoFile | Self::FileNameTooLong { .. } | Self::Multipart(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::TypeNotPermitted(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::Random(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            // keep file system details out of the response
            Self::Io(_) => json::write_json(
                self.status_code(),
                &JsonResponse::error("failed to store file"),
            ),
            _ => json::error_json(self),
        }
    }
}

impl ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        json::error_json(self)
    }
}
