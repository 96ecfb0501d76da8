// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tablehub_app::{
    CellValue, Endpoint, GridData, LoadedView, OperationError, OperationRequest,
    OperationResponse, ViewId, ViewKind,
};
use url::Url;

/// Blocking HTTP client for one view server.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    endpoint: Endpoint,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, endpoint: Endpoint, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("server.base_url must not be empty");
        }
        let base_url = Url::parse(trimmed)
            .with_context(|| format!("server.base_url {trimmed:?} is not a URL"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!(
                "server.base_url {trimmed:?} must use http or https, got {}",
                base_url.scheme()
            );
        }
        if base_url.cannot_be_a_base() {
            bail!("server.base_url {trimmed:?} cannot carry a path");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            endpoint,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub const fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `{base}/sheets/<id>` or `{base}/tables/<id>`, with the id escaped as a
    /// single path segment.
    pub fn view_url(&self, view: &ViewId) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("server.base_url {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .push(self.endpoint.as_str())
            .push(view.as_str());
        Ok(url)
    }

    /// Posts one operation against `view`. A 400 carries a message for the
    /// user; any success may name the next view to load.
    pub fn perform(
        &self,
        view: &ViewId,
        request: &OperationRequest,
    ) -> Result<OperationResponse, OperationError> {
        let url = self
            .view_url(view)
            .map_err(|error| OperationError::Transport(error.to_string()))?;
        tracing::debug!(%url, opcode = request.opcode(), "posting operation");

        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .map_err(|error| connection_error(self.base_url(), &error))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|error| OperationError::Transport(format!("read response body: {error}")))?;

        if status == StatusCode::BAD_REQUEST {
            return Err(rejection(&body));
        }
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "operation failed on the server");
            return Err(clean_error_response(status, &body));
        }

        let parsed: OperationBody = serde_json::from_str(&body)
            .map_err(|error| OperationError::MalformedResponse(error.to_string()))?;
        let new_view = match self.endpoint {
            Endpoint::Sheets => parsed.new_sheet,
            Endpoint::Tables => parsed.new_table,
        };
        Ok(OperationResponse {
            new_view: new_view.map(ViewId::new),
        })
    }

    pub fn load_view(&self, view: &ViewId) -> Result<LoadedView> {
        let url = self.view_url(view)?;
        tracing::debug!(%url, "loading view");

        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|error| anyhow::Error::new(connection_error(self.base_url(), &error)))?;
        let payload: ViewPayload = decode_success(response)
            .with_context(|| format!("load view {view}"))?;
        payload.into_loaded_view(view.clone())
    }
}

fn decode_success(response: Response) -> Result<ViewPayload> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(anyhow::Error::new(clean_error_response(status, &body)));
    }
    response.json().context("decode view payload")
}

fn connection_error(base_url: &str, error: &reqwest::Error) -> OperationError {
    let reason = if error.is_timeout() {
        "timed out".to_owned()
    } else {
        error.to_string()
    };
    tracing::warn!(base_url, %reason, "view server unreachable");
    OperationError::Transport(format!("{base_url} ({reason}); check server.base_url"))
}

fn rejection(body: &str) -> OperationError {
    match serde_json::from_str::<DetailEnvelope>(body) {
        Ok(DetailEnvelope {
            detail: Some(detail),
        }) if !detail.is_empty() => OperationError::Rejected { detail },
        _ => OperationError::MalformedResponse("rejected without a detail message".to_owned()),
    }
}

fn clean_error_response(status: StatusCode, body: &str) -> OperationError {
    if let Ok(DetailEnvelope {
        detail: Some(detail),
    }) = serde_json::from_str::<DetailEnvelope>(body)
        && !detail.is_empty()
    {
        return OperationError::Server {
            status: status.as_u16(),
            message: detail,
        };
    }

    let trimmed = body.trim();
    let message = if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('{') {
        trimmed.to_owned()
    } else {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_ascii_lowercase()
    };
    OperationError::Server {
        status: status.as_u16(),
        message,
    }
}

#[derive(Debug, Deserialize)]
struct DetailEnvelope {
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationBody {
    new_sheet: Option<String>,
    new_table: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PayloadKind {
    #[default]
    Base,
    Frequency,
    Catalog,
}

#[derive(Debug, Deserialize)]
struct ViewPayload {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<CellValue>>,
    #[serde(default)]
    kind: PayloadKind,
    #[serde(default)]
    key_columns: Vec<usize>,
    #[serde(default)]
    wrapped_columns: BTreeSet<usize>,
}

impl ViewPayload {
    fn into_loaded_view(self, id: ViewId) -> Result<LoadedView> {
        let num_cols = self.columns.len();
        if let Some(col) = self.key_columns.iter().find(|col| **col >= num_cols) {
            bail!("view {id} names key column {col} but has only {num_cols} columns");
        }
        let kind = match self.kind {
            PayloadKind::Base => ViewKind::Base,
            PayloadKind::Frequency => ViewKind::Frequency {
                key_columns: self.key_columns,
            },
            PayloadKind::Catalog => ViewKind::Catalog,
        };
        Ok(LoadedView {
            id,
            kind,
            grid: GridData::new(self.columns, self.rows),
            wrapped_columns: self.wrapped_columns,
        })
    }
}
