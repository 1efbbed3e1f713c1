use axum::Json;

#[tracing::instrument(level = "debug")]
#[utoipa::path(
    tag = "admin",
    get,
    path = "/api/health",
    responses((status = 200, description = "The invocation service is reachable", body = HealthResponse))
)]
pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    status: String,
    version: String,
}
