// Admin server HTTP client
//
// Wraps `reqwest::Client` with URL construction and `{success, error}`
// envelope unwrapping. Endpoint groups (bot control, configuration,
// roster, activity) are implemented as inherent methods in sibling files
// to keep this module focused on transport mechanics.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Upper bound on how much of a response body is echoed into errors.
const BODY_PREVIEW_CHARS: usize = 200;

/// Raw HTTP client for the admin server's `/api/` routes.
///
/// Mutating routes and most reads answer with an envelope
/// `{ "success": bool, "error"?: string, ...payload }`; methods return the
/// unwrapped payload and turn `success: false` into [`Error::Api`] with the
/// server's message verbatim.
#[derive(Clone)]
pub struct DashboardClient {
    http: reqwest::Client,
    base_url: Url,
}

impl DashboardClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the admin server root, e.g. `http://127.0.0.1:5000`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The admin server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/{path}`, keeping any path prefix on the base URL
    /// (reverse-proxied deployments).
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/{path}"))?)
    }

    /// WebSocket URL of the Socket.IO endpoint (Engine.IO v4, WebSocket
    /// transport only).
    pub fn push_url(&self) -> Result<Url, Error> {
        let scheme = if self.base_url.scheme() == "https" {
            "wss"
        } else {
            "ws"
        };
        let mut url = self.base_url.clone();
        url.set_scheme(scheme).map_err(|()| {
            Error::PushConnect(format!("cannot derive push URL from {}", self.base_url))
        })?;
        let prefix = self.base_url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{prefix}/socket.io/"));
        url.set_query(Some("EIO=4&transport=websocket"));
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// GET a route that answers with a bare JSON document (no envelope).
    pub(crate) async fn get_plain<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        let body = read_body(resp).await?;
        decode(&body)
    }

    /// GET a route and unwrap the `{success}` envelope.
    pub(crate) async fn get_envelope(&self, url: Url) -> Result<Map<String, Value>, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        parse_envelope(&read_body(resp).await?)
    }

    /// POST a JSON body (or nothing) and unwrap the `{success}` envelope.
    pub(crate) async fn post_envelope(
        &self,
        url: Url,
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<Map<String, Value>, Error> {
        debug!("POST {}", url);
        let mut builder = self.http.post(url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await?;
        parse_envelope(&read_body(resp).await?)
    }

    /// PUT a JSON body and unwrap the `{success}` envelope.
    pub(crate) async fn put_envelope(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<Map<String, Value>, Error> {
        debug!("PUT {}", url);
        let resp = self.http.put(url).json(body).send().await?;
        parse_envelope(&read_body(resp).await?)
    }
}

/// Take a named payload field out of an unwrapped envelope.
///
/// A missing field decodes from `null`, so `Option`/`Vec`-with-default
/// payloads tolerate servers that omit empty collections.
pub(crate) fn take_field<T: DeserializeOwned>(
    envelope: &mut Map<String, Value>,
    field: &str,
) -> Result<T, Error> {
    let raw = envelope.remove(field).unwrap_or(Value::Null);
    serde_json::from_value(raw.clone()).map_err(|e| Error::Deserialization {
        message: format!("field `{field}`: {e}"),
        body: raw.to_string(),
    })
}

/// Check the HTTP status and return the body text.
async fn read_body(resp: reqwest::Response) -> Result<String, Error> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Status {
            status: status.as_u16(),
            message: preview(&body),
        });
    }
    Ok(resp.text().await?)
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(body)),
        body: body.to_owned(),
    })
}

/// Parse `{success, error?, ...}`, returning the remaining fields on
/// success or [`Error::Api`] carrying the server's message.
pub(crate) fn parse_envelope(body: &str) -> Result<Map<String, Value>, Error> {
    let mut map: Map<String, Value> = decode(body)?;
    let success = match map.remove("success") {
        Some(Value::Bool(ok)) => ok,
        Some(other) => {
            return Err(Error::Deserialization {
                message: format!("`success` must be a boolean, got {other}"),
                body: body.to_owned(),
            });
        }
        None => {
            return Err(Error::Deserialization {
                message: "response envelope has no `success` field".into(),
                body: body.to_owned(),
            });
        }
    };
    if success {
        return Ok(map);
    }
    let message = match map.remove("error") {
        Some(Value::String(msg)) => msg,
        Some(Value::Null) | None => "request failed".into(),
        Some(other) => other.to_string(),
    };
    Err(Error::Api { message })
}

/// Char-boundary-safe prefix of a response body.
fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}
