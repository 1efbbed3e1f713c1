use cloudldb_config::InvocationConfig;
use cloudldb_object_storage::TableStore;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{HandlerError, HandlerResult},
    process::{ExternalCommand, ProcessOutcome},
    response::{CompactionResponse, PhaseTimings, StatusEnvelope},
    staging::{StagingArea, MERGE_INPUT_FILE},
    table::{table_numbers, TableDescriptor, TableNumber},
};

/// Compaction invocation event. `data` holds the JSON encoded [`CompactionRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompactionEvent {
    #[schema(example = r#"{"cloud_files":[{"number":1}],"local_files":[{"number":2}]}"#)]
    pub data: String,
}

/// Tables taking part in a merge, split by where they came from.
///
/// The split matters to the merger only. Other top-level fields of the payload
/// are ignored here but still reach the merger through the recorded payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompactionRequest {
    #[serde(default)]
    pub cloud_files: Vec<TableDescriptor>,
    #[serde(default)]
    pub local_files: Vec<TableDescriptor>,
}

impl CompactionRequest {
    pub fn parse(data: &str) -> HandlerResult<Self> {
        serde_json::from_str(data).map_err(|e| HandlerError::InvalidEvent(e.to_string()))
    }

    /// Every table to stage: cloud tables first, then local ones.
    pub fn tables(&self) -> HandlerResult<Vec<TableNumber>> {
        table_numbers(self.cloud_files.iter().chain(&self.local_files))
    }
}

/// Parse the merger's report of tables that must be written back.
pub fn parse_merge_result(stdout: &str) -> HandlerResult<Vec<TableDescriptor>> {
    serde_json::from_str(stdout).map_err(|source| HandlerError::MalformedOutput {
        stdout: stdout.to_string(),
        source,
    })
}

/// Stage the requested tables, merge them and upload what the merger changed.
pub async fn run_compaction(
    config: &InvocationConfig,
    store: &dyn TableStore,
    event: &CompactionEvent,
) -> HandlerResult<CompactionResponse> {
    tracing::info!(data = %event.data, "got compaction event");

    let staging = StagingArea::create(&config.scratch_dir())?;
    staging.record_payload(MERGE_INPUT_FILE, &event.data).await?;

    let request = CompactionRequest::parse(&event.data)?;
    let inputs = request.tables()?;
    let mut timings = PhaseTimings::new(config.report_timings);

    timings
        .measure("download_time", staging.fetch_tables(store, &inputs))
        .await?;

    let merger = ExternalCommand::merger(
        &config.merger_bin,
        &config.region,
        &config.bucket,
        staging.path(),
    );
    let outcome = timings.measure("merge_time", merger.run()).await?;

    let stdout = match outcome {
        ProcessOutcome::Success { stdout, .. } => stdout,
        ProcessOutcome::DomainMiss { code, stdout, .. } => {
            tracing::warn!(code, "merge reported a miss; nothing uploaded");
            return Ok(CompactionResponse::Outcome(StatusEnvelope::miss(
                code, &stdout, timings,
            )));
        }
        ProcessOutcome::Terminated {
            signal,
            stdout,
            stderr,
        } => {
            tracing::error!(signal, "merger was terminated; nothing uploaded");
            return Ok(CompactionResponse::Outcome(StatusEnvelope::terminated(
                signal, &stdout, stderr, timings,
            )));
        }
    };
    tracing::info!(result = %stdout, "got merge result");

    let outputs = table_numbers(&parse_merge_result(&stdout)?).map_err(|e| match e {
        HandlerError::TableNumberOutOfRange(number) => HandlerError::MergeTableOutOfRange(number),
        other => other,
    })?;
    timings
        .measure("upload_time", staging.send_tables(store, &outputs))
        .await?;

    Ok(CompactionResponse::Merged {
        data: stdout,
        timings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_lists_cloud_tables_before_local_ones() {
        let request = CompactionRequest::parse(
            r#"{"local_files":[{"number":7},{"number":2}],"cloud_files":[{"number":5}],"next_cloud_file_num":11}"#,
        )
        .unwrap();
        let tables: Vec<u64> = request.tables().unwrap().iter().map(TableNumber::get).collect();
        assert_eq!(tables, vec![5, 7, 2]);
    }

    #[test]
    fn missing_partitions_default_to_empty() {
        let request = CompactionRequest::parse(r#"{"cloud_files":[{"number":1}]}"#).unwrap();
        assert!(request.local_files.is_empty());
        assert_eq!(request.tables().unwrap().len(), 1);
    }

    #[test]
    fn invalid_payload_is_a_client_error() {
        let err = CompactionRequest::parse("not json").unwrap_err();
        assert!(err.is_client_error());

        let err = CompactionRequest::parse(r#"{"cloud_files":[{"number":1000000}]}"#)
            .unwrap()
            .tables()
            .unwrap_err();
        assert!(matches!(err, HandlerError::TableNumberOutOfRange(1_000_000)));
    }

    #[test]
    fn malformed_merge_output_is_reported_with_stdout() {
        let err = parse_merge_result("Put successful\n[").unwrap_err();
        match err {
            HandlerError::MalformedOutput { stdout, .. } => {
                assert_eq!(stdout, "Put successful\n[")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn merge_result_keeps_descriptor_metadata() {
        let result = parse_merge_result(r#"[{"number":9,"file_size":10}]"#).unwrap();
        assert_eq!(result[0].number, 9);
        assert_eq!(result[0].metadata["file_size"], 10);
    }
}
