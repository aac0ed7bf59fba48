use actix_web::http::header::ContentDisposition as ActixContentDisposition;

/// Wrapper for Actix content disposition header.
///
/// Aims to parse the file data from multipart body.
///
/// e.g. `Content-Disposition: form-data; name="field_name"; filename="filename.jpg"`
pub struct ContentDisposition {
    inner: ActixContentDisposition,
}

impl From<ActixContentDisposition> for ContentDisposition {
    fn from(content_disposition: ActixContentDisposition) -> Self {
        Self {
            inner: content_disposition,
        }
    }
}

impl ContentDisposition {
    /// Returns the name of the form field.
    pub fn get_field_name(&self) -> Option<&str> {
        self.inner.get_name()
    }

    /// Parses the file name from parameters if it exists.
    ///
    /// Empty file names are reported as absent.
    pub fn get_file_name(&self) -> Option<&str> {
        self.inner
            .parameters
            .iter()
            .find(|param| param.is_filename())
            .and_then(|param| param.as_filename())
            .filter(|file_name| !file_name.is_empty())
    }
}
