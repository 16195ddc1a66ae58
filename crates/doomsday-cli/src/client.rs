//! Per-target HTTP client, CLI error types, and error translation.

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use doomsday_api_models::{
    AuthRequest, AuthResponse, CacheResponse, InfoResponse, ProblemDetails, SchedulerInfo,
    TOKEN_HEADER,
};
use doomsday_session::{SessionError, TargetRecord};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;

/// Message shown in place of a raw 401 from the remote.
pub(crate) const LOGIN_HINT: &str = "Not authenticated. Please log in with `doomsday login`";

/// CLI-level error type. Each variant maps to one user-visible failure class.
#[derive(Debug)]
pub(crate) enum CliError {
    ConfigLoad(SessionError),
    ConfigSave(SessionError),
    NoTargetSelected,
    UnknownCommand(String),
    Unauthorized,
    AddressParse {
        address: String,
        reason: String,
    },
    Remote {
        status: StatusCode,
        message: String,
    },
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::NoTargetSelected
            | Self::Unauthorized
            | Self::AddressParse { .. }
            | Self::Validation(_) => 2,
            Self::ConfigLoad(_) | Self::ConfigSave(_) | Self::Remote { .. } | Self::Failure(_) => {
                3
            }
            Self::UnknownCommand(_) => 4,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::ConfigLoad(err) => format!("could not load CLI config: {}", error_chain(err)),
            Self::ConfigSave(err) => format!("could not save CLI config: {}", error_chain(err)),
            Self::NoTargetSelected => {
                "no doomsday server is currently targeted; run `doomsday target <name> <address>`"
                    .to_string()
            }
            Self::UnknownCommand(verb) => format!("unregistered command `{verb}`"),
            Self::Unauthorized => "the server rejected the request (status 401)".to_string(),
            Self::AddressParse { address, reason } => {
                format!("could not parse target address `{address}` as a URL: {reason}")
            }
            Self::Remote { status, message } => format!("{message} (status {status})"),
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.display_message())
    }
}

impl StdError for CliError {}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        Self::failure(anyhow::Error::new(err).context("failed to write output"))
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// A failure ready to print: one line and an exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UserFacingError {
    pub(crate) message: String,
    pub(crate) exit_code: i32,
}

/// Turn a handler or dispatch failure into what the operator sees.
///
/// Only a remote 401 is rewritten; every other failure keeps its own text.
pub(crate) fn translate(err: &CliError) -> UserFacingError {
    let message = match err {
        CliError::Unauthorized => LOGIN_HINT.to_string(),
        other => other.display_message(),
    };
    UserFacingError {
        message,
        exit_code: err.exit_code(),
    }
}

/// Destination for raw request/response traces.
#[derive(Clone)]
pub(crate) struct TraceSink(Arc<Mutex<dyn Write + Send>>);

impl TraceSink {
    pub(crate) fn new(writer: impl Write + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(writer)))
    }

    pub(crate) fn stderr() -> Self {
        Self::new(io::stderr())
    }

    fn record(&self, text: &str) {
        let Ok(mut writer) = self.0.lock() else {
            tracing::warn!("trace sink poisoned; dropping trace output");
            return;
        };
        if let Err(err) = writer.write_all(text.as_bytes()).and_then(|()| writer.flush()) {
            tracing::warn!(error = %err, "failed to write trace output");
        }
    }
}

/// HTTP client bound to exactly one target for the length of one invocation.
pub(crate) struct BoundClient {
    http: Client,
    base_url: Url,
    token: String,
    skip_verify: bool,
    trace: Option<TraceSink>,
}

impl BoundClient {
    /// Build a client from the target's address, token, and TLS policy.
    pub(crate) fn build(target: &TargetRecord, trace: Option<TraceSink>) -> CliResult<Self> {
        let base_url = parse_address(&target.address)?;

        let http = Client::builder()
            .danger_accept_invalid_certs(target.skip_verify)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        if target.skip_verify {
            tracing::debug!(target_name = %target.name, "TLS certificate validation disabled");
        }

        Ok(Self {
            http,
            base_url,
            token: target.token.clone(),
            skip_verify: target.skip_verify,
            trace,
        })
    }

    pub(crate) const fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) const fn skip_verify(&self) -> bool {
        self.skip_verify
    }

    pub(crate) async fn info(&self) -> CliResult<InfoResponse> {
        let body = self.send(Method::GET, "/v1/info", None).await?;
        decode("/v1/info", &body)
    }

    pub(crate) async fn authenticate(&self, request: &AuthRequest) -> CliResult<AuthResponse> {
        let payload = serde_json::to_vec(request)
            .map_err(|err| CliError::failure(anyhow!("failed to encode credentials: {err}")))?;
        let body = self.send(Method::POST, "/v1/auth", Some(payload)).await?;
        decode("/v1/auth", &body)
    }

    pub(crate) async fn cache(&self) -> CliResult<CacheResponse> {
        let body = self.send(Method::GET, "/v1/cache", None).await?;
        decode("/v1/cache", &body)
    }

    pub(crate) async fn refresh(&self) -> CliResult<()> {
        self.send(Method::POST, "/v1/cache/refresh", None).await?;
        Ok(())
    }

    pub(crate) async fn scheduler(&self) -> CliResult<SchedulerInfo> {
        let body = self.send(Method::GET, "/v1/scheduler", None).await?;
        decode("/v1/scheduler", &body)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Option<Vec<u8>>,
    ) -> CliResult<Vec<u8>> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| CliError::failure(anyhow!("invalid base URL: {err}")))?;

        let mut builder = self.http.request(method, url);
        if !self.token.is_empty() {
            builder = builder.header(TOKEN_HEADER, &self.token);
        }
        if let Some(payload) = payload {
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(payload);
        }
        let request = builder
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build request to {path}: {err}")))?;

        if let Some(trace) = &self.trace {
            let body = request.body().and_then(reqwest::Body::as_bytes).unwrap_or_default();
            trace.record(&format_exchange(
                '>',
                &format!("{} {}", request.method(), request.url()),
                request.headers(),
                body,
            ));
        }

        tracing::debug!(method = %request.method(), %path, "sending request");
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|err| CliError::failure(anyhow!("request to {path} failed: {err}")))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| {
                CliError::failure(anyhow!("failed to read response from {path}: {err}"))
            })?
            .to_vec();

        if let Some(trace) = &self.trace {
            trace.record(&format_exchange('<', &status.to_string(), &headers, &body));
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(CliError::Unauthorized);
        }
        if !status.is_success() {
            return Err(classify_problem(status, &body));
        }
        Ok(body)
    }
}

/// Parse a target address into an absolute `http`/`https` URL with a host.
fn parse_address(address: &str) -> CliResult<Url> {
    let invalid = |reason: String| CliError::AddressParse {
        address: address.to_string(),
        reason,
    };
    let url = Url::parse(address).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!(
            "unsupported scheme `{}` (expected http or https)",
            url.scheme()
        )));
    }
    if url.cannot_be_a_base() || url.host().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

fn decode<T: DeserializeOwned>(path: &str, body: &[u8]) -> CliResult<T> {
    serde_json::from_slice(body)
        .map_err(|err| CliError::failure(anyhow!("failed to parse response from {path}: {err}")))
}

/// Classify a non-success, non-401 response into a CLI error.
pub(crate) fn classify_problem(status: StatusCode, body: &[u8]) -> CliError {
    let text = String::from_utf8_lossy(body).trim().to_string();
    let message = serde_json::from_slice::<ProblemDetails>(body)
        .ok()
        .and_then(|problem| problem.message().map(str::to_string))
        .unwrap_or_else(|| {
            if text.is_empty() {
                "request failed".to_string()
            } else {
                text
            }
        });
    CliError::Remote { status, message }
}

fn format_exchange(marker: char, start_line: &str, headers: &HeaderMap, body: &[u8]) -> String {
    let mut text = format!("{marker} {start_line}\n");
    for (name, value) in headers {
        let shown = if name.as_str().eq_ignore_ascii_case(TOKEN_HEADER) {
            "<redacted>".into()
        } else {
            String::from_utf8_lossy(value.as_bytes())
        };
        text.push_str(&format!("{marker} {name}: {shown}\n"));
    }
    text.push_str(&format!("{marker}\n"));
    if !body.is_empty() {
        for line in redact_body(body).lines() {
            text.push_str(&format!("{marker} {line}\n"));
        }
    }
    text
}

/// JSON fields never written to a trace sink.
const SECRET_FIELDS: [&str; 2] = ["password", "token"];

/// Body text with secret JSON fields masked. Non-JSON bodies are shown as is.
fn redact_body(body: &[u8]) -> String {
    let Ok(mut value) = serde_json::from_slice::<serde_json::Value>(body) else {
        return String::from_utf8_lossy(body).into_owned();
    };
    let Some(object) = value.as_object_mut() else {
        return String::from_utf8_lossy(body).into_owned();
    };
    let mut masked = false;
    for field in SECRET_FIELDS {
        if let Some(slot) = object.get_mut(field) {
            *slot = serde_json::Value::String("<redacted>".into());
            masked = true;
        }
    }
    if !masked {
        return String::from_utf8_lossy(body).into_owned();
    }
    serde_json::to_string(&value).unwrap_or_else(|_| "<redacted>".into())
}
