use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use tracker_core::{FeatureKind, InputRule, JobInput, JobSnapshot, SubmitOutcome};
use tracker_logging::{tracker_debug, tracker_warn};
use url::Url;

use crate::adapter::{FieldMapAdapter, PayloadAdapter};
use crate::session::{Credential, SessionProvider};
use crate::{PollError, SetupError, SubmitError};

/// Error codes a backend uses to say "pay or upgrade first".
const ENTITLEMENT_CODES: &[&str] = &[
    "upgrade_required",
    "insufficient_credits",
    "quota_exceeded",
    "subscription_required",
    "limit_reached",
];

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_body_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Submit and status routes for one feature. `status_path` contains `{job_id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub submit_path: String,
    pub status_path: String,
}

impl Endpoint {
    pub fn new(submit_path: impl Into<String>, status_path: impl Into<String>) -> Self {
        Self {
            submit_path: submit_path.into(),
            status_path: status_path.into(),
        }
    }

    pub fn for_feature(kind: FeatureKind) -> Self {
        match kind {
            FeatureKind::Documentary => {
                Self::new("api/documentary/render", "api/documentary/status/{job_id}")
            }
            FeatureKind::TopicShort => {
                Self::new("api/topic-shorts/generate", "api/topic-shorts/{job_id}")
            }
            FeatureKind::PyqExplanation => Self::new(
                "api/pyq/video-explanation",
                "api/pyq/video-explanation/{job_id}",
            ),
            FeatureKind::PalaceAnimation => {
                Self::new("api/palace/animate", "api/palace/animate/{job_id}")
            }
            FeatureKind::MapTour => Self::new("api/maps/tour-video", "api/maps/tour-video/{job_id}"),
        }
    }

    fn status_for(&self, job_id: &str) -> String {
        // Form encoding escapes a literal '+', so any '+' left is a space.
        let encoded: String = url::form_urlencoded::byte_serialize(job_id.as_bytes())
            .collect::<String>()
            .replace('+', "%20");
        self.status_path.replace("{job_id}", &encoded)
    }
}

/// Starts jobs and reads their status on the feature backends.
#[async_trait::async_trait]
pub trait JobClient: Send + Sync {
    async fn submit(
        &self,
        feature: FeatureKind,
        input: &JobInput,
    ) -> Result<SubmitOutcome, SubmitError>;

    async fn poll(&self, feature: FeatureKind, job_id: &str) -> Result<JobSnapshot, PollError>;
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    topic: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    question_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    script_id: Option<&'a str>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    facts: &'a [String],
}

impl<'a> SubmitBody<'a> {
    fn new(rule: InputRule, input: &'a JobInput) -> Self {
        let target = input.target_id.as_deref();
        Self {
            topic: &input.topic,
            question_id: matches!(rule, InputRule::QuestionId).then_some(target).flatten(),
            script_id: matches!(rule, InputRule::ScriptId).then_some(target).flatten(),
            facts: &input.facts,
        }
    }
}

pub struct ReqwestJobClient {
    settings: ClientSettings,
    base: Url,
    client: reqwest::Client,
    session: Arc<dyn SessionProvider>,
    endpoints: HashMap<FeatureKind, Endpoint>,
    adapters: HashMap<FeatureKind, Arc<dyn PayloadAdapter>>,
}

impl ReqwestJobClient {
    pub fn new(
        settings: ClientSettings,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self, SetupError> {
        let base = parse_base_url(&settings.base_url)?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| SetupError::Client(err.to_string()))?;

        let endpoints = FeatureKind::ALL
            .into_iter()
            .map(|kind| (kind, Endpoint::for_feature(kind)))
            .collect();
        let adapters = FeatureKind::ALL
            .into_iter()
            .map(|kind| {
                let adapter: Arc<dyn PayloadAdapter> =
                    Arc::new(FieldMapAdapter::for_feature(kind));
                (kind, adapter)
            })
            .collect();

        Ok(Self {
            settings,
            base,
            client,
            session,
            endpoints,
            adapters,
        })
    }

    pub fn with_endpoint(mut self, kind: FeatureKind, endpoint: Endpoint) -> Self {
        self.endpoints.insert(kind, endpoint);
        self
    }

    pub fn with_adapter(mut self, kind: FeatureKind, adapter: Arc<dyn PayloadAdapter>) -> Self {
        self.adapters.insert(kind, adapter);
        self
    }

    fn endpoint(&self, kind: FeatureKind) -> Endpoint {
        self.endpoints
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Endpoint::for_feature(kind))
    }

    fn adapter(&self, kind: FeatureKind) -> Arc<dyn PayloadAdapter> {
        self.adapters
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Arc::new(FieldMapAdapter::for_feature(kind)))
    }

    fn url(&self, path: &str) -> Result<Url, String> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|err| err.to_string())
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>, BodyError> {
        let max_bytes = self.settings.max_body_bytes;
        if let Some(len) = response.content_length() {
            if len > max_bytes {
                return Err(BodyError::TooLarge);
            }
        }
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(BodyError::Transport)?;
            if body.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(BodyError::TooLarge);
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl JobClient for ReqwestJobClient {
    async fn submit(
        &self,
        feature: FeatureKind,
        input: &JobInput,
    ) -> Result<SubmitOutcome, SubmitError> {
        let credential = self
            .session
            .credential()
            .ok_or(SubmitError::Unauthenticated)?;
        let endpoint = self.endpoint(feature);
        let url = self
            .url(&endpoint.submit_path)
            .map_err(SubmitError::Network)?;
        let rule = tracker_core::FeatureConfig::for_kind(feature).input_rule;
        let body = serde_json::to_vec(&SubmitBody::new(rule, input))
            .map_err(|err| SubmitError::Network(err.to_string()))?;

        tracker_debug!("submit feature={} url={}", feature, url);
        let response = authorized(self.client.post(url), &credential)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(submit_transport_error)?;

        let status = response.status().as_u16();
        let bytes = self
            .read_body(response)
            .await
            .map_err(|err| err.into_submit(self.settings.max_body_bytes))?;

        if !(200..300).contains(&status) {
            let err = classify_submit_failure(status, &bytes);
            tracker_warn!("submit feature={} failed: {}", feature, err);
            return Err(err);
        }

        let payload: Value = serde_json::from_slice(&bytes)
            .map_err(|err| crate::AdapterError::InvalidJson(err.to_string()))?;
        if let Some(code) = error_code(&payload).filter(|code| is_entitlement_code(code)) {
            return Err(SubmitError::EntitlementDenied { reason: Some(code) });
        }
        Ok(self.adapter(feature).submit_outcome(&payload)?)
    }

    async fn poll(&self, feature: FeatureKind, job_id: &str) -> Result<JobSnapshot, PollError> {
        let credential = self.session.credential().ok_or(PollError::Unauthenticated)?;
        let endpoint = self.endpoint(feature);
        let url = self
            .url(&endpoint.status_for(job_id))
            .map_err(PollError::Network)?;

        let response = authorized(self.client.get(url), &credential)
            .send()
            .await
            .map_err(poll_transport_error)?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(PollError::HttpStatus(status));
        }
        let bytes = self
            .read_body(response)
            .await
            .map_err(|err| err.into_poll(self.settings.max_body_bytes))?;
        let payload: Value = serde_json::from_slice(&bytes)
            .map_err(|err| crate::AdapterError::InvalidJson(err.to_string()))?;
        Ok(self.adapter(feature).snapshot(&payload)?)
    }
}

fn authorized(builder: reqwest::RequestBuilder, credential: &Credential) -> reqwest::RequestBuilder {
    builder
        .bearer_auth(credential.token())
        .header(ACCEPT, "application/json")
}

fn parse_base_url(raw: &str) -> Result<Url, SetupError> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    let url = Url::parse(&normalized).map_err(|err| SetupError::InvalidBaseUrl {
        url: raw.to_string(),
        message: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SetupError::InvalidBaseUrl {
            url: raw.to_string(),
            message: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(url)
}

enum BodyError {
    TooLarge,
    Transport(reqwest::Error),
}

impl BodyError {
    fn into_submit(self, max_bytes: u64) -> SubmitError {
        match self {
            BodyError::TooLarge => SubmitError::TooLarge { max_bytes },
            BodyError::Transport(err) => submit_transport_error(err),
        }
    }

    fn into_poll(self, max_bytes: u64) -> PollError {
        match self {
            BodyError::TooLarge => PollError::TooLarge { max_bytes },
            BodyError::Transport(err) => poll_transport_error(err),
        }
    }
}

fn submit_transport_error(err: reqwest::Error) -> SubmitError {
    if err.is_timeout() {
        SubmitError::Timeout
    } else {
        SubmitError::Network(err.to_string())
    }
}

fn poll_transport_error(err: reqwest::Error) -> PollError {
    if err.is_timeout() {
        PollError::Timeout
    } else {
        PollError::Network(err.to_string())
    }
}

/// Maps a non-2xx submit response to the UI-relevant failure class.
fn classify_submit_failure(status: u16, body: &[u8]) -> SubmitError {
    let payload: Option<Value> = serde_json::from_slice(body).ok();
    let code = payload.as_ref().and_then(error_code);
    let message = payload.as_ref().and_then(error_message);

    match status {
        401 => SubmitError::Unauthenticated,
        402 => SubmitError::EntitlementDenied {
            reason: code.or(message),
        },
        403 if code.as_deref().is_some_and(is_entitlement_code) => {
            SubmitError::EntitlementDenied { reason: code }
        }
        429 | 503 => SubmitError::RateLimited { message },
        400 | 403 | 422 => SubmitError::Rejected {
            message: message.unwrap_or_else(|| format!("request rejected with status {status}")),
        },
        _ => SubmitError::HttpStatus(status),
    }
}

fn error_code(payload: &Value) -> Option<String> {
    ["code", "error_code", "error"]
        .iter()
        .filter_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(|code| code.trim().to_ascii_lowercase())
        .find(|code| !code.is_empty() && !code.contains(' '))
}

fn error_message(payload: &Value) -> Option<String> {
    ["message", "error_description", "error"]
        .iter()
        .filter_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|message| !message.is_empty())
        .map(ToOwned::to_owned)
}

fn is_entitlement_code(code: &str) -> bool {
    ENTITLEMENT_CODES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(code))
}
