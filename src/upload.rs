use crate::error::UploadError;
use crate::header::ContentDisposition;
use crate::mime::{self as sniffer, SniffedType, SNIFF_LEN};
use crate::random::RandomStringOptions;
use crate::util;
use actix_multipart::{Field, Multipart};
use byte_unit::Byte;
use futures_util::stream::StreamExt;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Length of the random part of renamed files.
pub const RENAMED_FILE_LENGTH: usize = 25;

/// Longest original extension kept for renamed files.
pub const MAX_EXTENSION_LENGTH: usize = 16;

/// Longest file name accepted when files are not renamed.
pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// Upload configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Storage path.
    pub upload_path: PathBuf,
    /// Maximum size of a single file.
    pub max_file_size: Byte,
    /// Permitted media types (e.g. `image/png` or `image/*`), empty allows all.
    pub allowed_file_types: Vec<String>,
    /// Replace the original file names with random strings.
    pub rename: bool,
    /// Extension for renamed files when it can't be determined otherwise.
    pub default_extension: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_path: PathBuf::from("upload"),
            max_file_size: Byte::from_u64(1024 * 1024 * 1024),
            allowed_file_types: Vec::new(),
            rename: true,
            default_extension: String::from("bin"),
        }
    }
}

/// Information about a stored file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UploadedFile {
    /// Name of the file on disk.
    pub new_file_name: String,
    /// Name of the file as sent by the client.
    pub original_file_name: String,
    /// Size in bytes.
    pub file_size: u64,
    /// Sniffed media type.
    pub content_type: String,
}

/// Returns the name that the uploaded file is stored under.
///
/// - If `rename` is `true`, the name is a random string with the original
///   extension, falling back to the sniffed extension and then to
///   [`default_extension`]. Original extensions longer than
///   [`MAX_EXTENSION_LENGTH`] or with non-alphanumeric characters are not kept.
/// - Otherwise the sanitized original name is kept, as long as it fits in
///   [`MAX_FILE_NAME_LENGTH`] bytes.
///
/// [`default_extension`]: UploadConfig::default_extension
pub fn target_file_name(
    original_file_name: &str,
    rename: bool,
    sniffed: &SniffedType,
    config: &UploadConfig,
) -> Result<String, UploadError> {
    let file_name = util::sanitize_file_name(original_file_name);
    if !rename {
        if file_name.len() > MAX_FILE_NAME_LENGTH {
            return Err(UploadError::FileNameTooLong {
                max: MAX_FILE_NAME_LENGTH,
            });
        }
        return Ok(file_name);
    }
    let random_name = RandomStringOptions::alphanumeric(RENAMED_FILE_LENGTH).generate()?;
    let extension = Path::new(&file_name)
        .extension()
        .and_then(|v| v.to_str())
        .filter(|v| {
            !v.is_empty()
                && v.len() <= MAX_EXTENSION_LENGTH
                && v.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .or(sniffed.extension)
        .unwrap_or(&config.default_extension);
    if extension.is_empty() {
        Ok(random_name)
    } else {
        Ok(format!("{random_name}.{extension}"))
    }
}

/// Stores every file of a `multipart/form-data` body in `upload_dir`.
///
/// Fields without a file name are skipped. If any file fails, the files
/// already written for this request are removed.
pub async fn upload_files(
    mut payload: Multipart,
    upload_dir: &Path,
    rename: bool,
    config: &UploadConfig,
) -> Result<Vec<UploadedFile>, UploadError> {
    util::create_dir_if_not_exists(upload_dir).await?;
    let mut uploaded_files: Vec<UploadedFile> = Vec::new();
    let result = async {
        while let Some(item) = payload.next().await {
            let mut field = item?;
            let content = ContentDisposition::from(field.content_disposition().clone());
            let Some(original_file_name) = content.get_file_name().map(String::from) else {
                tracing::debug!(
                    "skipping form field without file: {}",
                    content.get_field_name().unwrap_or("unnamed")
                );
                while let Some(chunk) = field.next().await {
                    chunk?;
                }
                continue;
            };
            let uploaded_file =
                store_field(&mut field, &original_file_name, upload_dir, rename, config).await?;
            uploaded_files.push(uploaded_file);
        }
        Ok::<(), UploadError>(())
    }
    .await;
    if let Err(e) = result {
        for file in &uploaded_files {
            if let Err(e) = fs::remove_file(upload_dir.join(&file.new_file_name)).await {
                tracing::error!("failed to remove {}: {}", file.new_file_name, e);
            }
        }
        return Err(e);
    }
    if uploaded_files.is_empty() {
        return Err(UploadError::NoFile);
    }
    Ok(uploaded_files)
}

/// Stores the first file of a `multipart/form-data` body.
///
/// See [`upload_files`].
pub async fn upload_one_file(
    payload: Multipart,
    upload_dir: &Path,
    rename: bool,
    config: &UploadConfig,
) -> Result<UploadedFile, UploadError> {
    upload_files(payload, upload_dir, rename, config)
        .await?
        .into_iter()
        .next()
        .ok_or(UploadError::NoFile)
}

/// Sniffs, validates and writes a single file field.
async fn store_field(
    field: &mut Field,
    original_file_name: &str,
    upload_dir: &Path,
    rename: bool,
    config: &UploadConfig,
) -> Result<UploadedFile, UploadError> {
    let limit = config.max_file_size.as_u64();
    let mut head = Vec::with_capacity(SNIFF_LEN);
    let mut eof = false;
    while head.len() < SNIFF_LEN {
        match field.next().await {
            Some(chunk) => head.extend_from_slice(&chunk?),
            None => {
                eof = true;
                break;
            }
        }
    }
    if head.len() as u64 > limit {
        tracing::warn!("upload rejected: {} exceeds {} bytes", original_file_name, limit);
        return Err(UploadError::TooLarge { limit });
    }

    let sniffed = sniffer::sniff(&head);
    if !sniffer::is_allowed(&sniffed.mime, &config.allowed_file_types) {
        tracing::warn!(
            "upload rejected: {} has a forbidden type ({})",
            original_file_name,
            sniffed.mime
        );
        return Err(UploadError::TypeNotPermitted(sniffed.mime.to_string()));
    }

    let new_file_name = target_file_name(original_file_name, rename, &sniffed, config)?;
    let path = util::safe_path_join(upload_dir, &new_file_name)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
        .map_err(|e| match e.kind() {
            IoErrorKind::AlreadyExists => UploadError::AlreadyExists(new_file_name.clone()),
            _ => UploadError::Io(e),
        })?;
    // a finished field must not be polled again
    let rest = (!eof).then_some(field);
    match write_field(&mut file, &head, rest, limit).await {
        Ok(file_size) => {
            tracing::info!(
                "{} ({} bytes, {}) is stored as {}",
                original_file_name,
                file_size,
                sniffed.mime,
                new_file_name
            );
            Ok(UploadedFile {
                new_file_name,
                original_file_name: original_file_name.to_string(),
                file_size,
                content_type: sniffed.mime.to_string(),
            })
        }
        Err(e) => {
            drop(file);
            if let Err(e) = fs::remove_file(&path).await {
                tracing::error!("failed to remove {}: {}", path.display(), e);
            }
            Err(e)
        }
    }
}

/// Writes the already buffered head and the rest of the field to `file`.
///
/// `field` is `None` when the head holds the whole file.
/// Returns the total number of bytes written.
async fn write_field(
    file: &mut File,
    head: &[u8],
    field: Option<&mut Field>,
    limit: u64,
) -> Result<u64, UploadError> {
    file.write_all(head).await?;
    let mut file_size = head.len() as u64;
    if let Some(field) = field {
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            file_size += chunk.len() as u64;
            if file_size > limit {
                tracing::warn!("upload rejected: file exceeds {} bytes", limit);
                return Err(UploadError::TooLarge { limit });
            }
            file.write_all(&chunk).await?;
        }
    }
    file.flush().await?;
    Ok(file_size)
}
