use std::sync::Arc;

use axum::{http::StatusCode, Json, Router};
use cloudldb_core::{HandlerError, Runtime};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};

mod compact;
mod get;

#[derive(utoipa::OpenApi)]
#[openapi()]
pub struct InvokeApiDoc;

pub(crate) fn setup_invoke_router() -> (Router<Arc<Runtime>>, utoipa::openapi::OpenApi) {
    let (invoke_router, invoke_api) = OpenApiRouter::with_openapi(InvokeApiDoc::openapi())
        .routes(routes!(compact::compact))
        .routes(routes!(get::get))
        .split_for_parts();

    (invoke_router, invoke_api)
}

/// Invocation faults carry no partial result, only the error message.
pub(crate) fn handler_error(err: HandlerError) -> (StatusCode, Json<String>) {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(err.to_string()))
}
