use actix_cors::Cors;
use actix_web::http::header::ContentType;
use actix_web::middleware::DefaultHeaders;
use actix_web::{get, post, web, HttpResponse, Responder};
use log::{error, warn};

use crate::error::ApiError;
use crate::inference::CostModel;
use crate::models::{ErrorResponse, FeatureRecord, PredictionRequest, PredictionResponse};

pub const HEALTH_MESSAGE: &str = "Cost-of-Treatment Prediction API is running";

const JSON_LIMIT: usize = 64 * 1024;

#[get("/")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(HEALTH_MESSAGE)
}

#[post("/predict")]
pub async fn predict(
    model: web::Data<dyn CostModel>,
    req: web::Json<PredictionRequest>,
) -> Result<HttpResponse, ApiError> {
    let record = FeatureRecord::try_from(req.into_inner()).map_err(|e| {
        warn!("rejected prediction request ({})", e.code());
        e
    })?;

    let model = model.into_inner();
    let raw = web::block(move || model.predict(&record))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| {
            error!("inference failed: {:#}", e);
            ApiError::Inference(format!("{:#}", e))
        })?;

    if !raw.is_finite() {
        error!("model returned a non-finite prediction");
        return Err(ApiError::Inference(format!("model returned {}", raw)));
    }

    Ok(HttpResponse::Ok().json(PredictionResponse::new(raw)))
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse::new("not_found", "endpoint not found"))
}

/// Malformed bodies answer with the same error shape as validation failures.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(|err, _req| ApiError::from(err).into())
}

/// Any origin may call the API.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
}

pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(health_check)
        .service(predict);
}
