//! Client side of the scan API, used by the `pscli` binary.
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use url::Url;

use crate::error::ClientError;
use crate::types::{QueryRequest, QueryResponse, ScanRequest, ScanResponse};

pub const DEFAULT_SCHEME: &str = "http";

/// Overall deadline for one call to the scan server.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Raw client arguments, before any checking.
#[derive(Debug, Clone, Default)]
pub struct ClientArgs {
    pub host: String,
    pub ips: Option<Vec<String>>,
    pub port: Option<String>,
    pub scan_id: Option<String>,
}

/// A checked submit call: where to send it and what to send.
#[derive(Debug, Clone)]
pub struct SubmitCall {
    pub endpoint: Url,
    pub request: ScanRequest,
}

#[derive(Debug, Clone)]
pub struct QueryCall {
    pub endpoint: Url,
    pub request: QueryRequest,
}

impl ClientArgs {
    pub fn prepare_submit(&self) -> Result<SubmitCall, ClientError> {
        let endpoint = endpoint(&self.host, "/submit")?;
        let ips = self.ips.clone().ok_or(ClientError::MissingIps)?;

        let raw_port = match self.port.as_deref().map(str::trim) {
            None | Some("") => return Err(ClientError::MissingPort),
            Some(p) => p,
        };
        let port: u64 = raw_port
            .parse()
            .map_err(|_| ClientError::InvalidPort(raw_port.to_string()))?;

        let request = ScanRequest::new(ips, port);
        request.validate()?;
        Ok(SubmitCall { endpoint, request })
    }

    pub fn prepare_query(&self) -> Result<QueryCall, ClientError> {
        let endpoint = endpoint(&self.host, "/query")?;
        let id = match self.scan_id.as_deref().map(str::trim) {
            None | Some("") => return Err(ClientError::MissingScanId),
            Some(raw) => raw.parse::<u64>().map_err(|_| ClientError::InvalidScanId)?,
        };
        Ok(QueryCall {
            endpoint,
            request: QueryRequest { id },
        })
    }
}

/// Normalise a user supplied host into the URL of `path` on that server.
///
/// A host given without `http://` or `https://` gets the default scheme.
pub fn endpoint(host: &str, path: &str) -> Result<Url, ClientError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(ClientError::MissingHost);
    }
    let with_scheme = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("{DEFAULT_SCHEME}://{host}")
    };

    let mut url = Url::parse(&with_scheme).map_err(|_| ClientError::InvalidHost)?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ClientError::InvalidHost);
    }
    url.set_path(path);
    Ok(url)
}

pub fn default_client() -> Result<Client, ClientError> {
    Client::builder()
        .timeout(CLIENT_TIMEOUT)
        .build()
        .map_err(ClientError::Transport)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted(u64),
    /// The server refused the scan; `message` holds whatever body it sent back.
    Rejected { status: StatusCode, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Unknown,
    Pending,
    Ready(QueryResponse),
    Refused { status: StatusCode, message: String },
}

pub async fn submit(client: &Client, call: &SubmitCall) -> Result<SubmitOutcome, ClientError> {
    match post::<_, ScanResponse>(client, &call.endpoint, &call.request).await? {
        Ok(resp) => Ok(SubmitOutcome::Accepted(resp.id)),
        Err((status, message)) => Ok(SubmitOutcome::Rejected { status, message }),
    }
}

pub async fn query(client: &Client, call: &QueryCall) -> Result<QueryOutcome, ClientError> {
    match post::<_, QueryResponse>(client, &call.endpoint, &call.request).await? {
        Ok(resp) if resp.ready => Ok(QueryOutcome::Ready(resp)),
        Ok(_) => Ok(QueryOutcome::Pending),
        Err((status, _)) if status == StatusCode::NOT_FOUND => Ok(QueryOutcome::Unknown),
        Err((status, message)) => {
            debug!(%status, %message, "query refused");
            Ok(QueryOutcome::Refused { status, message })
        }
    }
}

/// Lines shown to the user for a submit outcome.
pub fn describe_submit(outcome: &SubmitOutcome) -> String {
    match outcome {
        SubmitOutcome::Accepted(id) => format!("use {id} to query scan results"),
        SubmitOutcome::Rejected { message, .. } if !message.is_empty() => {
            format!("problem submitting scan\n{message}")
        }
        SubmitOutcome::Rejected { .. } => "problem submitting scan".to_string(),
    }
}

/// Lines shown to the user for a query outcome.
pub fn describe_query(id: u64, outcome: &QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Unknown => format!("scan id {id} is not a known id"),
        QueryOutcome::Pending => format!("scan {id} is not yet ready"),
        QueryOutcome::Ready(resp) => {
            let mut out = format!("results of scan of port {}", resp.port);
            for s in &resp.status {
                out.push_str(&format!("\nip {} in state {}", s.ip, s.state));
            }
            out
        }
        QueryOutcome::Refused { status, .. } => format!("problem querying scan {id} ({status})"),
    }
}

/// POST `body` as JSON. A 200 is decoded into `T`; any other status comes back with its text body.
async fn post<B, T>(
    client: &Client,
    url: &Url,
    body: &B,
) -> Result<Result<T, (StatusCode, String)>, ClientError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let resp = client
        .post(url.clone())
        .json(body)
        .send()
        .await
        .map_err(ClientError::Transport)?;

    let status = resp.status();
    if status != StatusCode::OK {
        let message = resp.text().await.unwrap_or_default();
        return Ok(Err((status, message)));
    }
    let parsed = resp.json::<T>().await.map_err(ClientError::UnexpectedBody)?;
    Ok(Ok(parsed))
}
