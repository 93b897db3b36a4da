use crate::attendance::AttendanceEngine;
use crate::realtime::Notifier;
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    /// `mysql`, or `memory` when running degraded
    #[schema(example = "mysql")]
    pub store: String,
    pub degraded: bool,
    /// Open realtime connections
    pub connections: usize,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health(
    engine: web::Data<AttendanceEngine>,
    notifier: web::Data<Notifier>,
) -> impl Responder {
    let store = engine.store_backend();
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        store: store.to_string(),
        degraded: store == "memory",
        connections: notifier.connection_count(),
    })
}
