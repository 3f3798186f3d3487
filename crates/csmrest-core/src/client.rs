use crate::config::SessionConfig;
use crate::error::{CtError, Result};
use reqwest::Response;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Header names and values as configured, converted to a [`HeaderMap`] only
/// when a request is built.
pub type HeaderSet = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl FromStr for Method {
    type Err = CtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(CtError::RequestConstruction(format!(
                "unsupported HTTP method '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body: either a raw string sent as-is or a JSON document.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Raw(String),
    Json(Value),
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderSet,
    pub body: RequestBody,
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: &HeaderSet) -> Self {
        self.headers
            .extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn raw(mut self, body: impl Into<String>) -> Self {
        self.body = RequestBody::Raw(body.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }
}

pub(crate) fn to_header_map(headers: &HeaderSet) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(CtError::construction)?;
        let value = HeaderValue::from_str(value).map_err(CtError::construction)?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Header map with the bearer token masked, for logging.
pub(crate) fn redacted(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| {
            let value = if k == AUTHORIZATION {
                MASK.to_string()
            } else {
                v.to_str().unwrap_or("<binary>").to_string()
            };
            (k.to_string(), value)
        })
        .collect()
}

const MASK: &str = "********";

fn is_secret_field(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.contains("password") || name.contains("secret")
}

/// Copy of a JSON document with password and secret string fields masked,
/// for logging.
pub(crate) fn masked(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if is_secret_field(k) && v.is_string() {
                        Value::String(MASK.into())
                    } else {
                        masked(v)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(masked).collect()),
        other => other.clone(),
    }
}

/// Body text as it may appear in the log. Non-JSON text is reduced to its
/// length.
pub(crate) fn loggable_body(text: &str) -> String {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => masked(&value).to_string(),
        Err(_) => format!("<{} bytes>", text.len()),
    }
}

/// Thin wrapper issuing one HTTP request per call against the configured
/// management endpoint. Responses are returned untouched.
#[derive(Debug, Clone)]
pub struct RestClient {
    config: SessionConfig,
    http: reqwest::Client,
}

impl RestClient {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.rest.accept_invalid_certs)
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SessionConfig {
        &mut self.config
    }

    pub fn url(&self, endpoint: &str) -> String {
        let base = self.config.rest.base_url.trim_end_matches('/');
        if endpoint.starts_with('/') {
            format!("{}{}", base, endpoint)
        } else {
            format!("{}/{}", base, endpoint)
        }
    }

    pub async fn rest_call(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        let url = self.url(endpoint);
        let headers = to_header_map(&options.headers)?;

        tracing::debug!(
            %method,
            %url,
            headers = ?redacted(&headers),
            query = ?options.query,
            "REST call"
        );

        let mut builder = self.http.request(method.to_reqwest(), &url).headers(headers);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        builder = match options.body {
            RequestBody::Empty => builder,
            RequestBody::Raw(body) => {
                tracing::debug!(body = %loggable_body(&body), "Request body");
                builder.body(body)
            }
            RequestBody::Json(body) => {
                tracing::debug!(body = %masked(&body), "Request body");
                builder.json(&body)
            }
        };

        let response = builder.send().await?;
        tracing::debug!(status = %response.status(), %url, "REST response");
        Ok(response)
    }
}
