use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use cloudldb_core::{lookup::LookupEvent, response::LookupResponse, Runtime};

use super::handler_error;

#[tracing::instrument(level = "info", skip(state))]
#[utoipa::path(
    tag = "invoke",
    post,
    path = "/api/invoke/get",
    request_body = LookupEvent,
    responses(
        (status = 200, description = "Lookup result; `status` is 0 when found, the reader's exit code on a miss and the negated signal when the reader was killed"),
        (status = 400, description = "The table number is out of range"),
        (status = 500, description = "Staging or launching the table reader failed"),
    )
)]
pub(crate) async fn get(
    State(state): State<Arc<Runtime>>,
    Json(event): Json<LookupEvent>,
) -> Result<Json<LookupResponse>, (StatusCode, Json<String>)> {
    state.get(event).await.map(Json).map_err(handler_error)
}
