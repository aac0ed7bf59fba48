//! **Reqkit** is a collection of request-handling helpers for actix-web backends.
#![warn(missing_docs, clippy::unwrap_used)]

/// Configuration file parser.
pub mod config;

/// Error types.
pub mod error;

/// Random string generator.
pub mod random;

/// Content type sniffing.
pub mod mime;

/// HTTP headers.
pub mod header;

/// Multipart upload handler.
pub mod upload;

/// JSON body decoder.
pub mod json;

/// Server routes.
pub mod server;

/// Server middlewares.
pub mod middleware;

/// Utility functions.
pub mod util;
