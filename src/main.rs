use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod store;
mod utils;
mod validation;

use config::Config;
use db::{bootstrap_admin, init_store};
use store::Store;
use utils::UsernameIndex;

use crate::docs::ApiDoc;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

const WARMUP_BATCH_SIZE: usize = 100;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("LOG_LEVEL is not a valid filter")?;

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(backend = %config.storage_backend, "Server starting...");

    let store: std::sync::Arc<dyn Store> = init_store(&config).await?;
    let index = Data::new(UsernameIndex::new());

    if let Some(admin) = &config.admin {
        bootstrap_admin(store.as_ref(), index.get_ref(), admin).await?;
    }

    let warmup_store = store.clone();
    let warmup_index = index.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = warmup_index
            .warmup(warmup_store.as_ref(), WARMUP_BATCH_SIZE)
            .await
        {
            error!(error = %e, "Failed to warm up username index");
        }
    });

    let server_addr = config.server_addr.clone();
    let store_data: Data<dyn Store> = Data::from(store);
    let config_data = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(store_data.clone())
            .app_data(index.clone())
            .app_data(config_data.clone())
            .configure(|cfg| routes::configure(cfg, config_data.get_ref()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
