use cloudldb_config::InvocationConfig;
use cloudldb_object_storage::TableStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    error::{HandlerError, HandlerResult},
    process::{ExternalCommand, MissReason, ProcessOutcome},
    response::{trim_line_ending, LookupResponse, PhaseTimings, StatusEnvelope},
    staging::{StagingArea, GET_INPUT_FILE},
    table::TableNumber,
};

/// Point lookup invocation event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LookupEvent {
    #[schema(example = 5)]
    pub number: u64,
    /// Passed to the table reader untouched.
    #[schema(example = "a2V5")]
    pub user_key: String,
}

/// Shape a successful reader run.
///
/// A JSON object is spread into the response beside `status: 0`. Anything else
/// is the raw value and is returned verbatim as a string under `value`.
pub fn found_response(stdout: &str, timings: PhaseTimings) -> LookupResponse {
    let raw = trim_line_ending(stdout);
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(mut fields)) => {
            fields.retain(|key, _| {
                let reserved = key == "status" || timings.get(key).is_some();
                if reserved {
                    tracing::warn!(%key, "table reader output field shadows a response field; dropped");
                }
                !reserved
            });
            LookupResponse::Fields {
                status: 0,
                fields,
                timings,
            }
        }
        _ => LookupResponse::Outcome(StatusEnvelope::new(
            0,
            Value::String(raw.to_string()),
            timings,
        )),
    }
}

/// Stage one table and ask the table reader for `user_key`.
pub async fn run_lookup(
    config: &InvocationConfig,
    store: &dyn TableStore,
    event: &LookupEvent,
) -> HandlerResult<LookupResponse> {
    let payload =
        serde_json::to_string(event).map_err(|e| HandlerError::InvalidEvent(e.to_string()))?;
    tracing::info!(event = %payload, "got lookup event");

    let table = TableNumber::new(event.number)?;
    let staging = StagingArea::create(&config.scratch_dir())?;
    staging.record_payload(GET_INPUT_FILE, &payload).await?;

    let mut timings = PhaseTimings::new(config.report_timings);
    timings
        .measure("download_time", staging.fetch_tables(store, &[table]))
        .await?;

    let reader = ExternalCommand::table_reader(
        &config.table_reader_bin,
        &staging.table_path(table),
        &event.user_key,
    );
    let outcome = timings.measure("command_time", reader.run()).await?;

    let response = match outcome {
        ProcessOutcome::Success { stdout, .. } => {
            tracing::info!(result = %stdout, "got lookup result");
            found_response(&stdout, timings)
        }
        ProcessOutcome::DomainMiss { code, stdout, .. } => {
            tracing::info!(code, reason = ?MissReason::from_code(code), %table, "lookup missed");
            LookupResponse::Outcome(StatusEnvelope::miss(code, &stdout, timings))
        }
        ProcessOutcome::Terminated {
            signal,
            stdout,
            stderr,
        } => {
            tracing::error!(signal, %table, "table reader was terminated");
            LookupResponse::Outcome(StatusEnvelope::terminated(signal, &stdout, stderr, timings))
        }
    };

    Ok(response)
}
