//! Invocation response shapes.

use std::{future::Future, time::Instant};

use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::{Map, Value};

/// Wall-clock duration of each invocation phase, in seconds.
///
/// Phases are only recorded when enabled; a disabled instance serializes to
/// nothing when flattened into a response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseTimings {
    enabled: bool,
    phases: Vec<(&'static str, f64)>,
}

impl PhaseTimings {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            phases: Vec::new(),
        }
    }

    pub async fn measure<F: Future>(&mut self, phase: &'static str, fut: F) -> F::Output {
        let start = Instant::now();
        let output = fut.await;
        if self.enabled {
            self.phases.push((phase, start.elapsed().as_secs_f64()));
        }
        output
    }

    pub fn get(&self, phase: &str) -> Option<f64> {
        self.phases
            .iter()
            .find(|(name, _)| *name == phase)
            .map(|(_, secs)| *secs)
    }
}

impl Serialize for PhaseTimings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.phases.len()))?;
        for (phase, secs) in &self.phases {
            map.serialize_entry(phase, secs)?;
        }
        map.end()
    }
}

/// `{status, value}` envelope for every outcome that is not a plain success.
///
/// Terminated processes additionally carry stderr and `terminated: true`, so
/// callers never confuse them with a domain miss.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEnvelope {
    pub status: i32,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub terminated: bool,
    #[serde(flatten)]
    pub timings: PhaseTimings,
}

impl StatusEnvelope {
    pub fn new(status: i32, value: Value, timings: PhaseTimings) -> Self {
        Self {
            status,
            value,
            stderr: None,
            terminated: false,
            timings,
        }
    }

    /// A positive exit code: the executable answered, just not with a value.
    pub fn miss(code: i32, stdout: &str, timings: PhaseTimings) -> Self {
        Self::new(code, Value::String(trim_line_ending(stdout).to_string()), timings)
    }

    /// The executable was killed; `status` is the negated signal number.
    pub fn terminated(signal: i32, stdout: &str, stderr: String, timings: PhaseTimings) -> Self {
        Self {
            status: signal.saturating_neg(),
            value: Value::String(trim_line_ending(stdout).to_string()),
            stderr: Some(stderr),
            terminated: true,
            timings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CompactionResponse {
    /// The merger's stdout, unmodified, under `data`.
    Merged {
        data: String,
        #[serde(flatten)]
        timings: PhaseTimings,
    },
    Outcome(StatusEnvelope),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LookupResponse {
    /// The reader printed a JSON object; its fields are returned beside `status`.
    Fields {
        status: i32,
        #[serde(flatten)]
        fields: Map<String, Value>,
        #[serde(flatten)]
        timings: PhaseTimings,
    },
    Outcome(StatusEnvelope),
}

impl LookupResponse {
    pub fn status(&self) -> i32 {
        match self {
            LookupResponse::Fields { status, .. } => *status,
            LookupResponse::Outcome(envelope) => envelope.status,
        }
    }
}

pub(crate) fn trim_line_ending(s: &str) -> &str {
    s.trim_end_matches(['\n', '\r'])
}
