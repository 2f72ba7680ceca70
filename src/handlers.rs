use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, ValidationIssue};
use crate::models::{RootResponse, StatusResponse, ThresholdResponse};
use crate::schema;
use crate::service::ModelService;

pub const RANDOM_MIN: i64 = 1;
pub const RANDOM_MAX: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct RandomParams {
    n: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PredictParams {
    threshold: Option<f64>,
}

fn query_issue(field: &str, kind: &'static str, msg: String) -> ApiError {
    ApiError::invalid(ValidationIssue::new(
        vec!["query".into(), field.into()],
        kind,
        msg,
    ))
}

pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(RootResponse {
        message: "Hello, World!",
    })
}

pub async fn status() -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse { status: "ok" })
}

pub async fn threshold(model: web::Data<ModelService>) -> HttpResponse {
    HttpResponse::Ok().json(ThresholdResponse {
        threshold: model.threshold(),
    })
}

pub async fn predict(
    model: web::Data<ModelService>,
    params: web::Query<PredictParams>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let threshold = params.threshold;
    let mut issues = Vec::new();
    if let Some(t) = threshold {
        if !(0.0..=1.0).contains(&t) {
            issues.push(ValidationIssue::new(
                vec!["query".into(), "threshold".into()],
                "range",
                format!("Input should be between 0 and 1, got {t}"),
            ));
        }
    }

    let records = match schema::validate_batch(&body) {
        Ok(records) if issues.is_empty() => records,
        Ok(_) => return Err(ApiError::Validation(issues)),
        Err(ApiError::Validation(body_issues)) => {
            issues.extend(body_issues);
            return Err(ApiError::Validation(issues));
        }
        Err(other) => return Err(other),
    };
    log::debug!("Scoring {} record(s)", records.len());

    // Scoring is CPU-bound; keep it off the async workers.
    let results = web::block(move || model.predict_with_threshold(&records, threshold))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(results))
}

pub async fn random(
    model: web::Data<ModelService>,
    params: web::Query<RandomParams>,
) -> Result<HttpResponse, ApiError> {
    let n = params.n.unwrap_or(RANDOM_MIN);
    if n < RANDOM_MIN {
        return Err(query_issue(
            "n",
            "greater_than_equal",
            format!("Input should be greater than or equal to {RANDOM_MIN}"),
        ));
    }
    if n > RANDOM_MAX {
        return Err(query_issue(
            "n",
            "less_than_equal",
            format!("Input should be less than or equal to {RANDOM_MAX}"),
        ));
    }

    Ok(HttpResponse::Ok().json(model.generate_random(n as usize)))
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> Error {
    match err {
        JsonPayloadError::Deserialize(e) => ApiError::invalid(ValidationIssue::new(
            vec!["body".into()],
            "json_invalid",
            format!("JSON decode error: {e}"),
        ))
        .into(),
        JsonPayloadError::ContentType => ApiError::invalid(ValidationIssue::new(
            vec!["body".into()],
            "model_attributes_type",
            "Input should be a JSON document".to_string(),
        ))
        .into(),
        other => other.into(),
    }
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> Error {
    match err {
        QueryPayloadError::Deserialize(e) => ApiError::invalid(ValidationIssue::new(
            vec!["query".into()],
            "query_parsing",
            e.to_string(),
        ))
        .into(),
        other => other.into(),
    }
}

/// Body extractor settings: size limit, optional content type, and 422 on
/// undecodable JSON or a non-JSON content type.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .content_type_required(false)
        .error_handler(json_error)
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(query_error)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(root)))
        .service(
            web::scope("/api/v1")
                .route("/status", web::get().to(status))
                .route("/threshold", web::get().to(threshold))
                .route("/predict", web::post().to(predict))
                .route("/random", web::get().to(random)),
        );
}
