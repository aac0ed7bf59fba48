use crate::config::Config;
use crate::json::{self, JsonResponse};
use crate::upload::upload_files;
use actix_multipart::Multipart;
use actix_web::error::{InternalError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{error, get, post, web, Error, HttpRequest, HttpResponse, Responder};
use serde_json::Value;
use std::sync::RwLock;

/// Returns a snapshot of the shared configuration.
fn read_config(config: &RwLock<Config>) -> Result<Config, Error> {
    config
        .read()
        .map(|config| config.clone())
        .map_err(|_| error::ErrorInternalServerError("cannot acquire config"))
}

/// Shows the landing page.
#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().body(concat!(env!("CARGO_PKG_NAME"), " is running\n"))
}

/// Stores the files of a `multipart/form-data` body.
#[post("/upload")]
async fn upload(
    payload: Multipart,
    config: web::Data<RwLock<Config>>,
) -> Result<HttpResponse, Error> {
    let config = read_config(&config)?.upload;
    let files = upload_files(payload, &config.upload_path, config.rename, &config).await?;
    Ok(json::write_json(StatusCode::OK, &files))
}

/// Decodes a JSON body and sends it back.
#[post("/json")]
async fn echo_json(
    payload: web::Payload,
    config: web::Data<RwLock<Config>>,
) -> Result<HttpResponse, Error> {
    let config = read_config(&config)?.json;
    let value: Value = json::read_json(payload, &config).await?;
    Ok(json::write_json(
        StatusCode::OK,
        &JsonResponse::ok("received", Some(value)),
    ))
}

/// Overrides for the configured random string options.
#[derive(Debug, Default, serde::Deserialize)]
struct RandomQuery {
    length: Option<usize>,
    letters: Option<bool>,
    numbers: Option<bool>,
    symbols: Option<bool>,
}

/// Generates a random string.
#[get("/random")]
async fn random_string(
    query: web::Query<RandomQuery>,
    config: web::Data<RwLock<Config>>,
) -> Result<HttpResponse, Error> {
    let mut options = read_config(&config)?.random;
    let query = query.into_inner();
    options.length = query.length.unwrap_or(options.length);
    options.include_letters = query.letters.unwrap_or(options.include_letters);
    options.include_numbers = query.numbers.unwrap_or(options.include_numbers);
    options.include_symbols = query.symbols.unwrap_or(options.include_symbols);
    let random_string = options.generate()?;
    Ok(HttpResponse::Ok()
        .content_type(mime::TEXT_PLAIN_UTF_8)
        .body(random_string))
}

/// Renders query string errors as a [`JsonResponse`].
fn query_error_handler(err: QueryPayloadError, _: &HttpRequest) -> Error {
    tracing::debug!("query rejected: {}", err);
    let response = json::error_json(&err);
    InternalError::from_response(err, response).into()
}

/// Configures the server routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .service(index)
        .service(upload)
        .service(echo_json)
        .service(random_string);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::ContentLengthLimiter;
    use crate::upload::tests::multipart_request;
    use crate::upload::UploadedFile;
    use actix_web::body::MessageBody;
    use actix_web::dev::ServiceResponse;
    use actix_web::http::header::{self, HeaderValue};
    use actix_web::{test, App};
    use byte_unit::Byte;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    macro_rules! init_service {
        ($config:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(RwLock::new($config)))
                    .configure(configure_routes),
            )
            .await
        };
    }

    fn upload_config(path: &Path) -> Config {
        let mut config = Config::default();
        config.upload.upload_path = path.to_path_buf();
        config
    }

    async fn assert_error_message<B: MessageBody>(response: ServiceResponse<B>, message: &str) {
        let body: JsonResponse = test::read_body_json(response).await;
        assert!(body.error);
        assert_eq!(message, body.message);
    }

    #[actix_rt::test]
    async fn test_index() {
        let app = init_service!(Config::default());
        let request = test::TestRequest::default().uri("/").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(StatusCode::OK, response.status());
        let body = test::read_body(response).await;
        assert_eq!(b"reqkit is running\n".as_slice(), &body[..]);
    }

    #[actix_rt::test]
    async fn test_upload() -> Result<(), Error> {
        let test_upload_dir = tempdir()?;
        let mut config = upload_config(test_upload_dir.path());
        config.upload.rename = false;
        let app = init_service!(config);

        let request = multipart_request(&[("file", Some("x.txt"), b"hello".as_slice())])
            .uri("/upload")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(StatusCode::OK, response.status());
        let files: Vec<UploadedFile> = test::read_body_json(response).await;
        assert_eq!(
            vec![UploadedFile {
                new_file_name: String::from("x.txt"),
                original_file_name: String::from("x.txt"),
                file_size: 5,
                content_type: String::from("text/plain; charset=utf-8"),
            }],
            files
        );
        assert_eq!(
            "hello",
            fs::read_to_string(test_upload_dir.path().join("x.txt"))?
        );

        let request = multipart_request(&[("file", Some("x.txt"), b"again".as_slice())])
            .uri("/upload")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(StatusCode::CONFLICT, response.status());
        assert_error_message(response, "file already exists: x.txt").await;
        Ok(())
    }

    #[actix_rt::test]
    async fn test_upload_renamed() -> Result<(), Error> {
        let test_upload_dir = tempdir()?;
        let app = init_service!(upload_config(test_upload_dir.path()));

        let request = multipart_request(&[
            ("file", Some("first.md"), b"# title".as_slice()),
            ("file", Some("second.md"), b"# title".as_slice()),
        ])
        .uri("/upload")
        .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(StatusCode::OK, response.status());
        let files: Vec<UploadedFile> = test::read_body_json(response).await;
        assert_eq!(2, files.len());
        assert_ne!(files[0].new_file_name, files[1].new_file_name);
        for file in files {
            assert!(file.new_file_name.ends_with(".md"));
            assert_eq!(
                "# title",
                fs::read_to_string(test_upload_dir.path().join(&file.new_file_name))?
            );
        }
        Ok(())
    }

    #[actix_rt::test]
    async fn test_upload_rejected() -> Result<(), Error> {
        let test_upload_dir = tempdir()?;
        let mut config = upload_config(test_upload_dir.path());
        config.upload.allowed_file_types = vec![String::from("image/*")];
        config.upload.max_file_size = Byte::from_u64(4);
        let app = init_service!(config);

        let request = multipart_request(&[("file", Some("x.txt"), b"text".as_slice())])
            .uri("/upload")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(StatusCode::UNSUPPORTED_MEDIA_TYPE, response.status());
        assert_error_message(
            response,
            "the uploaded file type is not permitted (text/plain; charset=utf-8)",
        )
        .await;

        let gif = b"GIF89a\x01\x00\x01\x00";
        let request = multipart_request(&[("file", Some("x.gif"), gif.as_slice())])
            .uri("/upload")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(StatusCode::PAYLOAD_TOO_LARGE, response.status());
        assert_error_message(response, "the uploaded file is too big (limit: 4 bytes)").await;

        let request = multipart_request(&[("note", None, b"text".as_slice())])
            .uri("/upload")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
        assert_error_message(response, "no file was uploaded").await;

        assert_eq!(0, fs::read_dir(test_upload_dir.path())?.count());
        Ok(())
    }

    #[actix_rt::test]
    async fn test_content_length_limit() -> Result<(), Error> {
        let test_upload_dir = tempdir()?;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(RwLock::new(upload_config(
                    test_upload_dir.path(),
                ))))
                .wrap(ContentLengthLimiter::new(Byte::from_u64(16)))
                .configure(configure_routes),
        )
        .await;
        let request = multipart_request(&[("file", Some("x.txt"), b"hello".as_slice())])
            .uri("/upload")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(StatusCode::PAYLOAD_TOO_LARGE, response.status());
        assert_error_message(response, "request must not be larger than 16 bytes").await;
        assert_eq!(0, fs::read_dir(test_upload_dir.path())?.count());
        Ok(())
    }

    #[actix_rt::test]
    async fn test_echo_json() {
        let app = init_service!(Config::default());
        let request = test::TestRequest::post()
            .uri("/json")
            .insert_header((
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            ))
            .set_payload(r#"{"name": "Ada", "tags": ["math"]}"#)
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(StatusCode::OK, response.status());
        let body: JsonResponse = test::read_body_json(response).await;
        assert_eq!(
            JsonResponse::ok(
                "received",
                Some(serde_json::json!({"name": "Ada", "tags": ["math"]}))
            ),
            body
        );

        let request = test::TestRequest::post().uri("/json").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
        assert_error_message(response, "body must not be empty").await;

        let request = test::TestRequest::post()
            .uri("/json")
            .set_payload("[1, 2,")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
        assert_error_message(response, "body contains badly-formed JSON").await;
    }

    #[actix_rt::test]
    async fn test_echo_json_limit() {
        let mut config = Config::default();
        config.json.max_body_size = Byte::from_u64(8);
        let app = init_service!(config);
        let request = test::TestRequest::post()
            .uri("/json")
            .set_payload(r#"{"name": "Ada"}"#)
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(StatusCode::PAYLOAD_TOO_LARGE, response.status());
        assert_error_message(response, "body must not be larger than 8 bytes").await;
    }

    #[actix_rt::test]
    async fn test_random_string() {
        let app = init_service!(Config::default());
        let request = test::TestRequest::default()
            .uri("/random?length=12&letters=false")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(StatusCode::OK, response.status());
        let body = test::read_body(response).await;
        assert_eq!(12, body.len());
        assert!(body.iter().all(u8::is_ascii_digit));

        let request = test::TestRequest::default().uri("/random").to_request();
        let response = test::call_service(&app, request).await;
        let body = test::read_body(response).await;
        assert_eq!(Config::default().random.length, body.len());

        let request = test::TestRequest::default()
            .uri("/random?letters=false&numbers=false")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
        assert_error_message(response, "at least one character class must be included").await;
    }

    #[actix_rt::test]
    async fn test_extractor_errors() -> Result<(), Error> {
        let app = init_service!(Config::default());
        let request = test::TestRequest::default()
            .uri("/random?length=-1")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
        let body: JsonResponse = test::read_body_json(response).await;
        assert!(body.error);
        assert!(body.message.starts_with("Query deserialize error"));

        let test_upload_dir = tempdir()?;
        let app = init_service!(upload_config(test_upload_dir.path()));
        let request = test::TestRequest::post()
            .uri("/upload")
            .insert_header((
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            ))
            .set_payload("{}")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
        assert_error_message(
            response,
            "invalid multipart body: Multipart boundary is not found",
        )
        .await;
        Ok(())
    }
}
