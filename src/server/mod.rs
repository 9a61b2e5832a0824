pub mod handlers;
pub mod multipart;

use crate::{
    config::Config,
    error::{Result, StagingError},
    models::Catalog,
    pipeline::StagingPipeline,
};
use actix_web::{web, App, HttpServer};

/// Refine bodies carry a whole staged image as a data URI.
const REFINE_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Read-only state shared by every worker.
pub struct AppState {
    pub catalog: Catalog,
    pub pipeline: StagingPipeline,
    pub output_quality: u8,
    pub max_upload_bytes: usize,
    pub allowed_image_hosts: Vec<String>,
}

impl AppState {
    pub fn new(catalog: Catalog, pipeline: StagingPipeline) -> Self {
        let defaults = Config::default();
        Self {
            catalog,
            pipeline,
            output_quality: defaults.output_quality,
            max_upload_bytes: defaults.max_upload_bytes,
            allowed_image_hosts: defaults.allowed_image_hosts,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => {
                log::info!("📚 Loading catalog from {}", path);
                Catalog::from_json_file(path)?
            }
            None => Catalog::builtin(),
        };

        Ok(Self {
            catalog,
            pipeline: StagingPipeline::from_config(config)?,
            output_quality: config.output_quality,
            max_upload_bytes: config.max_upload_bytes,
            allowed_image_hosts: config.allowed_image_hosts.clone(),
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health))
        .route("/api/styles", web::get().to(handlers::list_styles))
        .route("/api/room-types", web::get().to(handlers::list_room_types))
        .route("/api/generate", web::post().to(handlers::generate))
        .service(
            web::resource("/api/refine")
                .app_data(web::JsonConfig::default().limit(REFINE_BODY_LIMIT))
                .route(web::post().to(handlers::refine)),
        );
}

pub async fn run(config: Config) -> Result<()> {
    let state = web::Data::new(AppState::from_config(&config)?);
    let bind = (config.host.clone(), config.port_or_default());

    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(bind)
        .map_err(|e| StagingError::Config(format!("cannot bind server: {}", e)))?
        .run()
        .await
        .map_err(|e| StagingError::Internal(format!("server stopped: {}", e)))
}
