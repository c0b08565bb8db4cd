use serde_json::{Map, Value};
use tracker_core::{FeatureKind, JobSnapshot, JobStatus, SubmitOutcome};

use crate::AdapterError;

/// Maps one feature's backend payloads onto the canonical job shape.
pub trait PayloadAdapter: Send + Sync {
    fn submit_outcome(&self, payload: &Value) -> Result<SubmitOutcome, AdapterError>;
    fn snapshot(&self, payload: &Value) -> Result<JobSnapshot, AdapterError>;
}

/// Candidate field names, tried in order. Fields are looked up on the top-level
/// object first and then inside each envelope object (`data`, `job`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    pub envelopes: Vec<&'static str>,
    pub id: Vec<&'static str>,
    pub status: Vec<&'static str>,
    pub artifact: Vec<&'static str>,
    pub error: Vec<&'static str>,
    pub progress: Vec<&'static str>,
    pub cached: Vec<&'static str>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            envelopes: vec!["data", "job", "result"],
            id: vec!["job_id", "jobId", "id"],
            status: vec!["status", "state"],
            artifact: vec!["artifact_url", "video_url", "url"],
            error: vec!["error_message", "error", "message"],
            progress: vec!["progress", "progress_percent"],
            cached: vec!["cached", "from_cache"],
        }
    }
}

impl FieldMap {
    pub fn for_feature(kind: FeatureKind) -> Self {
        let base = Self::default();
        match kind {
            FeatureKind::Documentary => base
                .prefer_id(&["render_id", "script_id"])
                .prefer_status(&["render_status"])
                .prefer_artifact(&["final_video_url"]),
            FeatureKind::TopicShort => base.prefer_artifact(&["short_url"]),
            FeatureKind::PyqExplanation => base
                .prefer_id(&["explanation_id"])
                .prefer_artifact(&["avatar_url", "explanation_video_url"]),
            FeatureKind::PalaceAnimation => base
                .prefer_id(&["animation_id"])
                .prefer_artifact(&["animation_url"]),
            FeatureKind::MapTour => base
                .prefer_id(&["tour_id"])
                .prefer_artifact(&["tour_video_url"]),
        }
    }

    pub fn prefer_id(mut self, names: &[&'static str]) -> Self {
        prepend(&mut self.id, names);
        self
    }

    pub fn prefer_status(mut self, names: &[&'static str]) -> Self {
        prepend(&mut self.status, names);
        self
    }

    pub fn prefer_artifact(mut self, names: &[&'static str]) -> Self {
        prepend(&mut self.artifact, names);
        self
    }
}

fn prepend(list: &mut Vec<&'static str>, names: &[&'static str]) {
    let mut merged: Vec<&'static str> = names.to_vec();
    merged.extend(list.iter().copied().filter(|name| !names.contains(name)));
    *list = merged;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapAdapter {
    fields: FieldMap,
}

impl FieldMapAdapter {
    pub fn new(fields: FieldMap) -> Self {
        Self { fields }
    }

    pub fn for_feature(kind: FeatureKind) -> Self {
        Self::new(FieldMap::for_feature(kind))
    }

    /// First usable value for `names`, by name priority. Each name is tried on
    /// the top-level object and then inside every envelope before the next one.
    fn find<'a, T>(
        &self,
        payload: &'a Value,
        names: &[&'static str],
        usable: impl Fn(&'a Value) -> Option<T>,
    ) -> Option<T> {
        let root = payload.as_object()?;
        let scopes: Vec<&'a Map<String, Value>> = std::iter::once(root)
            .chain(
                self.fields
                    .envelopes
                    .iter()
                    .filter_map(|env| root.get(*env).and_then(Value::as_object)),
            )
            .collect();
        names.iter().find_map(|name| {
            scopes
                .iter()
                .copied()
                .filter_map(|scope| scope.get(*name))
                .find_map(&usable)
        })
    }

    fn text(&self, payload: &Value, names: &[&'static str]) -> Option<String> {
        self.find(payload, names, text_value)
    }

    fn status(&self, payload: &Value) -> Result<Option<JobStatus>, AdapterError> {
        match self.text(payload, &self.fields.status) {
            Some(label) => normalize_status(&label)
                .map(Some)
                .ok_or(AdapterError::UnknownStatus(label)),
            None => Ok(None),
        }
    }

    fn is_cached(&self, payload: &Value) -> bool {
        self.find(payload, &self.fields.cached, Value::as_bool)
            .unwrap_or(false)
    }

    fn error_text(&self, payload: &Value) -> Option<String> {
        self.find(payload, &self.fields.error, |value| match value {
            Value::Object(obj) => obj.get("message").and_then(non_blank),
            other => non_blank(other),
        })
    }
}

impl PayloadAdapter for FieldMapAdapter {
    fn submit_outcome(&self, payload: &Value) -> Result<SubmitOutcome, AdapterError> {
        let status = self.status(payload)?;
        if status == Some(JobStatus::Failed) {
            return Err(AdapterError::FailedOnSubmit(self.error_text(payload)));
        }
        if let Some(artifact_url) = self.text(payload, &self.fields.artifact) {
            if self.is_cached(payload) || status == Some(JobStatus::Completed) {
                return Ok(SubmitOutcome::Cached { artifact_url });
            }
        }
        self.text(payload, &self.fields.id)
            .map(|job_id| SubmitOutcome::Started { job_id })
            .ok_or(AdapterError::MissingField("job id"))
    }

    fn snapshot(&self, payload: &Value) -> Result<JobSnapshot, AdapterError> {
        let status = self.status(payload)?.ok_or(AdapterError::MissingField("status"))?;
        let progress = self.find(payload, &self.fields.progress, normalize_progress);
        Ok(JobSnapshot {
            status,
            artifact_url: self.text(payload, &self.fields.artifact),
            error: self.error_text(payload),
            progress,
        })
    }
}

fn non_blank(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(ToOwned::to_owned)
}

fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        other => non_blank(other),
    }
}

/// Folds the per-feature status vocabularies into the four canonical states.
pub fn normalize_status(label: &str) -> Option<JobStatus> {
    let label = label.trim().to_ascii_lowercase().replace(['-', ' '], "_");
    let status = match label.as_str() {
        "queued" | "pending" | "waiting" | "created" | "submitted" => JobStatus::Queued,
        "processing" | "generating" | "rendering" | "running" | "in_progress" | "started" => {
            JobStatus::Processing
        }
        "completed" | "complete" | "done" | "ready" | "succeeded" | "success" => {
            JobStatus::Completed
        }
        "failed" | "failure" | "error" | "errored" | "cancelled" | "canceled" => JobStatus::Failed,
        _ => return None,
    };
    Some(status)
}

/// Accepts `0..=100` integers, `0.0..=1.0` fractions, and the same forms as
/// strings. A `%` suffix always means a percentage.
pub fn normalize_progress(value: &Value) -> Option<u8> {
    let percent = match value {
        Value::Number(n) if n.is_f64() => scale_fraction(n.as_f64()?),
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if let Some(percent) = s.strip_suffix('%') {
                percent.trim().parse::<f64>().ok()?
            } else if s.contains('.') {
                scale_fraction(s.parse::<f64>().ok()?)
            } else {
                s.parse::<f64>().ok()?
            }
        }
        _ => return None,
    };
    if percent.is_nan() {
        return None;
    }
    Some(percent.clamp(0.0, 100.0).round() as u8)
}

fn scale_fraction(raw: f64) -> f64 {
    if (0.0..=1.0).contains(&raw) {
        raw * 100.0
    } else {
        raw
    }
}
