// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Blocking HTTP collaborator for the collector's REST configuration API.
//!
//! Every entity kind lives under `/api/cfg/<resource>`; the reference check
//! is `/api/cfg/<resource>/checkondel/<id>`.

use anyhow::{Context, Result, bail};
use pipecfg_app::{
    ApiError, ApiResult, DeleteReference, EntityApi, EntityKind, FilterPattern, Record,
};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const API_ROOT: [&str; 2] = ["api", "cfg"];
const CHECK_ON_DELETE: &str = "checkondel";

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            bail!("http.base_url must not be empty");
        }
        let base_url =
            Url::parse(trimmed).with_context(|| format!("parse http.base_url {trimmed:?}"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!(
                "http.base_url {trimmed:?} must use http or https, got {}",
                base_url.scheme()
            );
        }
        if base_url.cannot_be_a_base() {
            bail!("http.base_url {trimmed:?} cannot carry a path");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Collaborator for one entity kind sharing this client's connection pool.
    pub fn entity(&self, kind: EntityKind) -> EntityClient {
        EntityClient {
            client: self.clone(),
            kind,
        }
    }

    /// Checks that the API answers by listing one collection.
    pub fn ping(&self) -> Result<()> {
        self.entity(EntityKind::Server)
            .list(None)
            .map(|_| ())
            .with_context(|| format!("ping configuration API at {}", self.base_url))
    }

    fn endpoint(&self, kind: EntityKind, tail: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                ApiError::Network(format!("base url {} cannot carry a path", self.base_url))
            })?;
            segments
                .pop_if_empty()
                .extend(API_ROOT)
                .push(kind.resource())
                .extend(tail);
        }
        Ok(url)
    }

    fn execute(&self, request: RequestBuilder) -> ApiResult<Option<Value>> {
        let response = request
            .send()
            .map_err(|error| connection_error(self.base_url.as_str(), error))?;

        let status = response.status();
        let body = response.text().map_err(|error| {
            ApiError::Network(format!("read response body ({status}): {error}"))
        })?;
        if !status.is_success() {
            let error = status_error(status, &body);
            warn!(status = status.as_u16(), %error, "configuration API rejected request");
            return Err(error);
        }
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|error| ApiError::Network(format!("decode response body: {error}")))
    }
}

/// [`EntityApi`] for one kind over HTTP. Records are decoded and encoded with
/// the kind's field codecs, so string-encoded numbers from the server become
/// typed values.
#[derive(Debug, Clone)]
pub struct EntityClient {
    client: Client,
    kind: EntityKind,
}

impl EntityClient {
    fn decode_record(&self, value: &Value) -> ApiResult<Record> {
        self.kind.schema().decode_json(value).map_err(|error| {
            ApiError::Network(format!(
                "malformed {} in response: {error}",
                self.kind.as_str()
            ))
        })
    }

    fn decode_written(&self, body: Option<Value>, sent: &Record) -> ApiResult<Record> {
        match body {
            Some(value @ Value::Object(_)) => self.decode_record(&value),
            _ => Ok(sent.clone()),
        }
    }
}

impl EntityApi for EntityClient {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn list(&self, filter: Option<&str>) -> ApiResult<Vec<Record>> {
        let url = self.client.endpoint(self.kind, &[])?;
        debug!(kind = self.kind.as_str(), %url, "list");
        let body = self.client.execute(self.client.http.get(url))?;

        let records = match body {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| self.decode_record(item))
                .collect::<ApiResult<Vec<_>>>()?,
            Some(other) => {
                return Err(ApiError::Network(format!(
                    "expected a list of {} records, got {}",
                    self.kind.as_str(),
                    json_kind(&other)
                )));
            }
        };

        let Some(filter) = filter.filter(|raw| !raw.is_empty()) else {
            return Ok(records);
        };
        let pattern = FilterPattern::new(filter);
        Ok(records
            .into_iter()
            .filter(|record| record.id().is_some_and(|id| pattern.is_match(id)))
            .collect())
    }

    fn get_by_id(&self, id: &str) -> ApiResult<Record> {
        let url = self.client.endpoint(self.kind, &[id])?;
        debug!(kind = self.kind.as_str(), %url, "get");
        match self.client.execute(self.client.http.get(url))? {
            Some(value) => self.decode_record(&value),
            None => Err(ApiError::NotFound(format!(
                "{} {id} not found",
                self.kind.as_str()
            ))),
        }
    }

    fn create(&self, record: &Record) -> ApiResult<Record> {
        let url = self.client.endpoint(self.kind, &[])?;
        debug!(kind = self.kind.as_str(), %url, "create");
        let payload = self.kind.schema().encode_json(record);
        let body = self
            .client
            .execute(self.client.http.post(url).json(&payload))?;
        self.decode_written(body, record)
    }

    fn update(&self, id: &str, record: &Record) -> ApiResult<Record> {
        let url = self.client.endpoint(self.kind, &[id])?;
        debug!(kind = self.kind.as_str(), %url, "update");
        let payload = self.kind.schema().encode_json(record);
        let body = self
            .client
            .execute(self.client.http.put(url).json(&payload))?;
        self.decode_written(body, record)
    }

    fn delete(&self, id: &str) -> ApiResult<()> {
        let url = self.client.endpoint(self.kind, &[id])?;
        debug!(kind = self.kind.as_str(), %url, "delete");
        self.client.execute(self.client.http.delete(url))?;
        Ok(())
    }

    fn check_delete(&self, id: &str) -> ApiResult<Vec<DeleteReference>> {
        let url = self.client.endpoint(self.kind, &[CHECK_ON_DELETE, id])?;
        debug!(kind = self.kind.as_str(), %url, "check delete");
        match self.client.execute(self.client.http.get(url))? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value).map_err(|error| {
                ApiError::Network(format!("malformed delete check response: {error}"))
            }),
        }
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> ApiError {
    ApiError::Network(format!(
        "cannot reach {base_url} -- check [http].base_url and that the collector is running ({error})"
    ))
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Maps a failed response to the collaborator error vocabulary.
fn status_error(status: StatusCode, body: &str) -> ApiError {
    let message = clean_error_message(status, body);
    match status {
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::CONFLICT => ApiError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ApiError::Validation(message),
        _ => ApiError::Network(message),
    }
}

fn clean_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.message.or(parsed.error)
        && !message.is_empty()
    {
        return format!("server error ({}): {message}", status.as_u16());
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 200 && !trimmed.contains('{') {
        return format!("server error ({}): {trimmed}", status.as_u16());
    }

    format!("server returned {}", status.as_u16())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::{Client, clean_error_message, status_error};
    use pipecfg_app::{ApiError, EntityKind};
    use reqwest::StatusCode;
    use std::time::Duration;

    #[test]
    fn new_rejects_unusable_base_urls() {
        assert!(Client::new("", Duration::from_secs(1)).is_err());
        assert!(Client::new("ftp://collector.local", Duration::from_secs(1)).is_err());
        assert!(Client::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn endpoints_nest_under_base_path_and_escape_ids() -> anyhow::Result<()> {
        let client = Client::new("http://collector.local:8090/snmp/", Duration::from_secs(1))?;
        let list = client.endpoint(EntityKind::Metric, &[])?;
        assert_eq!(
            list.as_str(),
            "http://collector.local:8090/snmp/api/cfg/snmpmetric"
        );

        let check = client.endpoint(EntityKind::Group, &["checkondel", "core switches"])?;
        assert_eq!(
            check.as_str(),
            "http://collector.local:8090/snmp/api/cfg/measgroup/checkondel/core%20switches"
        );
        Ok(())
    }

    #[test]
    fn status_codes_map_to_error_kinds() {
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            status_error(StatusCode::CONFLICT, ""),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, ""),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, ""),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, ""),
            ApiError::Network(_)
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, ""),
            ApiError::Network(_)
        ));
    }

    #[test]
    fn error_messages_prefer_server_text() {
        assert_eq!(
            clean_error_message(StatusCode::CONFLICT, r#"{"message":"ID already in use"}"#),
            "server error (409): ID already in use"
        );
        assert_eq!(
            clean_error_message(StatusCode::BAD_REQUEST, r#"{"error":"bad port"}"#),
            "server error (400): bad port"
        );
        assert_eq!(
            clean_error_message(StatusCode::NOT_FOUND, "no such device\n"),
            "server error (404): no such device"
        );
        assert_eq!(
            clean_error_message(StatusCode::BAD_GATEWAY, r#"{"unexpected":true}"#),
            "server returned 502"
        );
    }
}
