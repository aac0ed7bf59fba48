use path_clean::PathClean;
use std::io::{Error as IoError, ErrorKind as IoErrorKind, Result as IoResult};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Joins the paths whilst ensuring the path doesn't drastically change.
/// `base` is assumed to be a trusted value.
pub fn safe_path_join<B: AsRef<Path>, P: AsRef<Path>>(base: B, part: P) -> IoResult<PathBuf> {
    let new_path = base.as_ref().join(part).clean();

    let cleaned_base = base.as_ref().clean();

    if !new_path.starts_with(cleaned_base) {
        return Err(IoError::new(
            IoErrorKind::InvalidData,
            format!(
                "{} is outside of {}",
                new_path.display(),
                base.as_ref().display()
            ),
        ));
    }

    Ok(new_path)
}

/// Strips any directory components from a client supplied file name.
///
/// Both `/` and `\` are treated as separators. Names without a usable
/// component (e.g. `..` or `dir/`) are replaced with `file`.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base_name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match base_name {
        "" | "." | ".." => String::from("file"),
        v => v.to_string(),
    }
}

/// Creates the directory (and its parents) unless it exists already.
pub async fn create_dir_if_not_exists(path: &Path) -> IoResult<()> {
    if fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Ok(());
    }
    fs::create_dir_all(path).await
}
