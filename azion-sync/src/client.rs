//! Remote edge functions API.
//!
//! Every response is classified by its envelope, not its status code alone:
//! a body carrying `results` is a success; anything else is an error body
//! (`{"detail": "..."}`) or garbage. Error statuses still have their bodies
//! read so the remote `detail` reaches the user.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use azion_core::{EdgeFunctionRecord, FieldPatch, FunctionId, NewEdgeFunction, Settings, Token};

use crate::error::ApiError;

pub const ACCEPT_HEADER: &str = "application/json; version=3";

/// One page of the collection listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub results: Vec<EdgeFunctionRecord>,
    /// Absolute URL of the following page, `None` on the last page.
    pub next: Option<String>,
}

/// The operations the sync core needs from the remote API.
pub trait EdgeFunctionApi {
    /// Fetch one listing page: the collection root when `url` is `None`,
    /// otherwise a `links.next` URL from a previous page.
    fn list_page(&self, token: &Token, url: Option<&str>) -> Result<Page, ApiError>;

    /// Partial update sending only the changed field. Returns `results`.
    fn patch(&self, token: &Token, id: FunctionId, patch: &FieldPatch) -> Result<Value, ApiError>;

    fn create(
        &self,
        token: &Token,
        function: &NewEdgeFunction,
    ) -> Result<EdgeFunctionRecord, ApiError>;
}

// ---------------------------------------------------------------------------
// Envelope classification
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    results: Vec<EdgeFunctionRecord>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    next: Option<String>,
}

/// Turn a raw HTTP exchange into the envelope value or a typed error.
pub(crate) fn classify(status: u16, body: &str) -> Result<Value, ApiError> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        if matches!(status, 401 | 403) {
            return Err(ApiError::Auth { detail: None });
        }
        return Err(ApiError::UpstreamProtocol {
            status,
            detail: None,
            body: body.to_owned(),
        });
    };

    if value.get("results").is_some_and(|r| !r.is_null()) {
        return Ok(value);
    }

    let detail = value
        .get("detail")
        .and_then(Value::as_str)
        .map(str::to_owned);
    let token_rejected = detail
        .as_deref()
        .is_some_and(|d| d.to_ascii_lowercase().contains("invalid token"));
    if token_rejected || matches!(status, 401 | 403) {
        return Err(ApiError::Auth { detail });
    }
    Err(ApiError::UpstreamProtocol {
        status,
        detail,
        body: body.to_owned(),
    })
}

fn malformed(status: u16, body: &str, err: serde_json::Error) -> ApiError {
    ApiError::UpstreamProtocol {
        status,
        detail: Some(format!("malformed response: {err}")),
        body: body.to_owned(),
    }
}

pub(crate) fn parse_page(status: u16, body: &str) -> Result<Page, ApiError> {
    let value = classify(status, body)?;
    let envelope: ListEnvelope =
        serde_json::from_value(value).map_err(|e| malformed(status, body, e))?;
    Ok(Page {
        results: envelope.results,
        next: envelope.links.next.filter(|next| !next.trim().is_empty()),
    })
}

pub(crate) fn parse_results(status: u16, body: &str) -> Result<Value, ApiError> {
    let mut value = classify(status, body)?;
    Ok(value
        .get_mut("results")
        .map(Value::take)
        .unwrap_or(Value::Null))
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// [`EdgeFunctionApi`] over HTTPS with `ureq`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    collection_url: String,
}

impl HttpClient {
    pub fn new(collection_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("azion-cli/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            collection_url: collection_url.into().trim_end_matches('/').to_owned(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.api_url.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    fn request(&self, method: &str, url: &str, token: &Token) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Authorization", &format!("Token {}", token.expose()))
            .set("Accept", ACCEPT_HEADER)
            .set("Content-Type", "application/json")
    }

    /// Read status and body from either side of a ureq result.
    fn exchange(result: Result<ureq::Response, ureq::Error>) -> Result<(u16, String), ApiError> {
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => return Err(ApiError::Transport(err.to_string())),
        };
        let status = response.status();
        let body = response
            .into_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok((status, body))
    }
}

impl EdgeFunctionApi for HttpClient {
    fn list_page(&self, token: &Token, url: Option<&str>) -> Result<Page, ApiError> {
        let url = url.unwrap_or(&self.collection_url);
        tracing::debug!("GET {url}");
        let (status, body) = Self::exchange(self.request("GET", url, token).call())?;
        parse_page(status, &body)
    }

    fn patch(&self, token: &Token, id: FunctionId, patch: &FieldPatch) -> Result<Value, ApiError> {
        let url = format!("{}/{id}", self.collection_url);
        tracing::debug!("PATCH {url} ({})", patch.field());
        let payload = patch.body().to_string();
        let (status, body) =
            Self::exchange(self.request("PATCH", &url, token).send_string(&payload))?;
        parse_results(status, &body)
    }

    fn create(
        &self,
        token: &Token,
        function: &NewEdgeFunction,
    ) -> Result<EdgeFunctionRecord, ApiError> {
        tracing::debug!("POST {} ({})", self.collection_url, function.name);
        let payload = serde_json::to_string(function).map_err(|e| malformed(0, "", e))?;
        let (status, body) = Self::exchange(
            self.request("POST", &self.collection_url, token)
                .send_string(&payload),
        )?;
        let results = parse_results(status, &body)?;
        serde_json::from_value(results).map_err(|e| malformed(status, &body, e))
    }
}
