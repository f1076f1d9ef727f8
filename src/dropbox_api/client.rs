use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SyncError;
use crate::sync::store::AccountInfo;

use super::types::{ApiErrorBody, FullAccount};

const API_BASE: &str = "https://api.dropboxapi.com/2";
const CONTENT_BASE: &str = "https://content.dropboxapi.com/2";

/// Header carrying the JSON argument of content endpoints.
pub const API_ARG_HEADER: &str = "Dropbox-API-Arg";
/// Header carrying the JSON result of the download endpoint.
pub const API_RESULT_HEADER: &str = "Dropbox-API-Result";

pub struct DropboxClient {
    http: reqwest::Client,
    token: String,
}

impl DropboxClient {
    pub fn new(token: impl Into<String>) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            token: token.into(),
        })
    }

    /// Build a request to an RPC endpoint (api.dropboxapi.com); the
    /// argument goes in the JSON body.
    pub fn rpc_request(&self, endpoint: &str) -> DropboxRequest<'_> {
        DropboxRequest {
            client: self,
            endpoint: endpoint.to_string(),
            builder: self.http.post(format!("{API_BASE}{endpoint}")),
        }
    }

    /// Build a request to a content endpoint (content.dropboxapi.com); the
    /// argument goes in the `Dropbox-API-Arg` header.
    pub fn content_request<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        arg: &T,
    ) -> Result<DropboxRequest<'_>, SyncError> {
        let arg = header_safe_json(arg)?;
        Ok(DropboxRequest {
            client: self,
            endpoint: endpoint.to_string(),
            builder: self
                .http
                .post(format!("{CONTENT_BASE}{endpoint}"))
                .header(API_ARG_HEADER, arg),
        })
    }
}

/// Helper that attaches the bearer token and maps error responses.
pub struct DropboxRequest<'a> {
    client: &'a DropboxClient,
    endpoint: String,
    builder: RequestBuilder,
}

impl<'a> DropboxRequest<'a> {
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.builder = self.builder.json(body);
        self
    }

    /// Raw upload body for content endpoints.
    pub fn octet_stream(mut self, body: Vec<u8>) -> Self {
        self.builder = self
            .builder
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body);
        self
    }

    /// Send the request. Non-success responses become a [`SyncError`]
    /// according to [`classify_error`]. Rate limits are not retried.
    pub async fn send(self) -> Result<Response, SyncError> {
        let resp = self
            .builder
            .bearer_auth(&self.client.token)
            .send()
            .await
            .map_err(|e| SyncError::Backend(format!("{}: {e}", self.endpoint)))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        tracing::debug!(endpoint = %self.endpoint, %status, body = %body, "Dropbox API error");
        Err(classify_error(status, &body))
    }

    /// Send and parse the JSON response body.
    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T, SyncError> {
        let endpoint = self.endpoint.clone();
        let resp = self.send().await?;
        resp.json()
            .await
            .map_err(|e| SyncError::Backend(format!("{endpoint}: invalid response: {e}")))
    }
}

/// Map an error response to the sync error taxonomy.
///
/// 401 is an authentication failure, 409 with a `not_found` summary means
/// the path does not exist, everything else is a backend failure.
pub fn classify_error(status: StatusCode, body: &str) -> SyncError {
    let summary = serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.error_summary)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED => SyncError::Auth(summary),
        StatusCode::CONFLICT if summary.contains("not_found") => SyncError::NotFound(summary),
        _ => SyncError::Backend(format!("{status}: {summary}")),
    }
}

/// Serialize `arg` as JSON that is safe to put in an HTTP header: every
/// character outside printable ASCII is written as a `\uXXXX` escape.
pub fn header_safe_json<T: Serialize + ?Sized>(arg: &T) -> Result<String, SyncError> {
    let json = serde_json::to_string(arg)
        .map_err(|e| SyncError::Backend(format!("cannot encode request argument: {e}")))?;

    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() && c != '\u{7f}' {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    Ok(out)
}

impl DropboxClient {
    /// POST /users/get_current_account
    pub async fn get_current_account(&self) -> Result<AccountInfo, SyncError> {
        let account: FullAccount = self
            .rpc_request("/users/get_current_account")
            .send_json()
            .await?;

        Ok(AccountInfo {
            display_name: account.name.display_name,
            email: account.email,
            country: account.country,
            locale: account.locale,
        })
    }
}
