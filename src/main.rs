use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use hotwatch::notify::event::ModifyKind;
use hotwatch::{Event, EventKind, Hotwatch};
use reqkit::config::Config;
use reqkit::middleware::ContentLengthLimiter;
use reqkit::server;
use reqkit::util;
use std::env;
use std::io::{Error as IoError, Result as IoResult};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Reloads the configuration from `path` into `config`.
fn reload_config(path: &Path, config: &RwLock<Config>) {
    match Config::parse(path) {
        Ok(new_config) => match config.write() {
            Ok(mut config) => {
                *config = new_config;
                tracing::info!("Configuration has been updated.");
            }
            Err(e) => {
                tracing::error!("Failed to acquire config: {}", e);
            }
        },
        Err(e) => {
            tracing::error!("Failed to update config: {}", e);
        }
    }
}

#[actix_web::main]
async fn main() -> IoResult<()> {
    // Initialize logger.
    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse configuration.
    dotenvy::dotenv().ok();
    let config_path =
        PathBuf::from(env::var("CONFIG").unwrap_or_else(|_| String::from("config.toml")));
    let config = Config::parse(&config_path).map_err(IoError::other)?;
    let server_config = config.server.clone();

    // Create the upload directory.
    util::create_dir_if_not_exists(&config.upload.upload_path).await?;

    // Set up a watcher for the configuration file changes.
    let mut hotwatch = Hotwatch::new_with_custom_delay(
        config
            .settings
            .as_ref()
            .map(|v| v.refresh_rate)
            .unwrap_or_else(|| Duration::from_secs(1)),
    )
    .map_err(IoError::other)?;

    // Hot-reload the configuration file.
    let config = Arc::new(RwLock::new(config));
    let cloned_config = Arc::clone(&config);
    let config_watcher = move |event: Event| {
        if let (EventKind::Modify(ModifyKind::Data(_)), Some(path)) =
            (event.kind, event.paths.first())
        {
            reload_config(path, &cloned_config);
        }
    };
    hotwatch
        .watch(&config_path, config_watcher)
        .map_err(IoError::other)?;

    // Create a HTTP server.
    tracing::info!("Server is running at {}", server_config.address);
    let max_content_length = server_config.max_content_length;
    let mut http_server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::from(Arc::clone(&config)))
            .wrap(Logger::new(
                "%{r}a \"%r\" %s %b \"%{Referer}i\" \"%{User-Agent}i\" %T",
            ))
            .wrap(ContentLengthLimiter::new(max_content_length))
            .configure(server::configure_routes)
    })
    .bind(&server_config.address)?;

    // Set worker count for the server.
    if let Some(workers) = server_config.workers {
        http_server = http_server.workers(workers);
    }

    // Run the server.
    http_server.run().await
}
