use std::sync::Arc;

use axum::Router;
use cloudldb_core::Runtime;
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};

mod check;

#[derive(OpenApi)]
#[openapi()]
pub struct AdminApiDoc;

pub(crate) fn setup_admin_router() -> (Router<Arc<Runtime>>, utoipa::openapi::OpenApi) {
    let (admin_router, admin_api) = OpenApiRouter::with_openapi(AdminApiDoc::openapi())
        .routes(routes!(check::health))
        .split_for_parts();

    (admin_router, admin_api)
}
