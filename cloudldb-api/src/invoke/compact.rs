use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use cloudldb_core::{
    compaction::CompactionEvent, response::CompactionResponse, Runtime,
};

use super::handler_error;

#[tracing::instrument(level = "info", skip(state, event))]
#[utoipa::path(
    tag = "invoke",
    post,
    path = "/api/invoke/compact",
    request_body = CompactionEvent,
    responses(
        (status = 200, description = "Merge result passed through under `data`, or a `{status, value}` envelope when the merger did not succeed"),
        (status = 400, description = "The event payload could not be parsed"),
        (status = 500, description = "Staging, merging or uploading failed"),
    )
)]
pub(crate) async fn compact(
    State(state): State<Arc<Runtime>>,
    Json(event): Json<CompactionEvent>,
) -> Result<Json<CompactionResponse>, (StatusCode, Json<String>)> {
    state.compact(event).await.map(Json).map_err(handler_error)
}
