use crate::models::HealthResponse;
use actix_web::HttpResponse;

/// `GET /ping`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        message: format!("authkit-callback {} is running", crate::VERSION),
    })
}
