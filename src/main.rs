use actix_cors::Cors;
use actix_web::dev::Service;
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use futures_util::FutureExt;
use log::{error, info};
use std::io;
use uuid::Uuid;

use churn_api::config::{CorsSettings, Settings};
use churn_api::handlers;
use churn_api::service::ModelService;

const REQUEST_ID_HEADER: &str = "x-request-id";

fn build_cors(settings: &CorsSettings) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(settings.methods.clone())
        .max_age(3600);

    cors = if settings.origins.is_empty() {
        cors.allow_any_origin()
    } else {
        settings
            .origins
            .iter()
            .fold(cors, |cors, origin| cors.allowed_origin(origin))
    };

    cors = if settings.headers.is_empty() {
        cors.allow_any_header()
    } else {
        cors.allowed_headers(settings.headers.iter().map(String::as_str))
    };

    if settings.allow_credentials {
        cors = cors.supports_credentials();
    }
    cors
}

fn init_logging(settings: &Settings) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&settings.log_level))
        .format_timestamp_millis()
        .init();
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let settings = Settings::from_env().map_err(|e| {
        eprintln!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;
    init_logging(&settings);

    info!("Starting {} v{}", settings.app_name, settings.app_version);
    info!("{}", settings.app_description);
    log::debug!("Settings: {:?}", settings);

    let model = ModelService::load(&settings.model_path, &settings.threshold_path).map_err(|e| {
        error!("Failed to load model artifact: {}", e);
        io::Error::new(io::ErrorKind::Other, e)
    })?;
    info!(
        "Loaded model from {} (decision threshold {})",
        settings.model_path.display(),
        model.threshold()
    );
    let model = web::Data::new(model);

    let bind_address = settings.bind_address();
    info!("Server running at http://{} with {} workers", bind_address, settings.workers);

    let log_format = if settings.debug {
        r#"%{x-request-id}o %a "%r" %s %b "%{User-Agent}i" %Dms"#
    } else {
        r#"%{x-request-id}o "%r" %s %Dms"#
    };
    let workers = settings.workers;
    let max_body_bytes = settings.max_body_bytes;

    HttpServer::new(move || {
        App::new()
            .wrap_fn(|req, srv| {
                let request_id = Uuid::new_v4().to_string();
                srv.call(req).map(move |res| {
                    res.map(|mut res| {
                        if let Ok(value) = HeaderValue::from_str(&request_id) {
                            res.headers_mut()
                                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                        }
                        res
                    })
                })
            })
            .wrap(build_cors(&settings.cors))
            .wrap(Logger::new(log_format))
            .app_data(model.clone())
            .app_data(handlers::json_config(max_body_bytes))
            .app_data(handlers::query_config())
            .configure(handlers::config)
    })
    .workers(workers)
    .bind(&bind_address)?
    .run()
    .await
}
