use super::sigv4::{Signer, canonical_query, encode_path, sha256_hex};
use super::xml;
use crate::config::SessionConfig;
use crate::error::{CtError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use md5::{Digest, Md5};
use reqwest::{Response, Url};
use std::collections::BTreeMap;
use std::time::Duration;

/// Path-style S3 client signing every request with one account's keys.
#[derive(Debug, Clone)]
pub struct S3Client {
    http: reqwest::Client,
    endpoint: Url,
    signer: Signer,
}

impl S3Client {
    pub fn new(
        endpoint: &str,
        signer: Signer,
        accept_invalid_certs: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| CtError::Config(format!("invalid S3 endpoint '{}': {}", endpoint, e)))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        Ok(Self {
            http,
            endpoint,
            signer,
        })
    }

    /// Client against the configured S3 endpoint, sharing the REST timeout
    /// and certificate settings.
    pub fn from_config(config: &SessionConfig, signer: Signer) -> Result<Self> {
        Self::new(
            &config.s3.endpoint,
            signer,
            config.rest.accept_invalid_certs,
            config.timeout(),
        )
    }

    pub fn access_key(&self) -> &str {
        &self.signer.access_key
    }

    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        query: &[(String, String)],
        body: Vec<u8>,
        extra_headers: BTreeMap<String, String>,
    ) -> Result<Response> {
        let uri = encode_path(path);
        let query = canonical_query(query);
        let payload_hash = sha256_hex(&body);

        let mut headers = extra_headers;
        headers.insert("host".into(), self.host());
        headers.insert("x-amz-date".into(), Utc::now().format("%Y%m%dT%H%M%SZ").to_string());
        headers.insert("x-amz-content-sha256".into(), payload_hash.clone());

        let authorization =
            self.signer
                .authorization(method.as_str(), &uri, &query, &headers, &payload_hash);
        headers.remove("host");

        let mut url = self.endpoint.clone();
        url.set_path(&uri);
        url.set_query(if query.is_empty() { None } else { Some(query.as_str()) });

        tracing::debug!(%method, %url, access_key = %self.signer.access_key, "S3 request");
        let mut builder = self
            .http
            .request(method, url)
            .header("authorization", authorization)
            .body(body);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder.send().await?;
        tracing::debug!(status = %response.status(), "S3 response");
        Ok(response)
    }

    /// Pass a success through, turn anything else into [`CtError::S3`].
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let code = xml::parse_error_code(&body).unwrap_or_else(|| status.to_string());
        Err(CtError::S3 {
            status: status.as_u16(),
            code,
        })
    }

    pub async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let path = format!("/{}", bucket);
        let response = self
            .send(reqwest::Method::PUT, &path, &[], Vec::new(), BTreeMap::new())
            .await?;
        Self::check(response).await.map(|_| ())
    }

    pub async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let path = format!("/{}", bucket);
        let response = self
            .send(reqwest::Method::DELETE, &path, &[], Vec::new(), BTreeMap::new())
            .await?;
        Self::check(response).await.map(|_| ())
    }

    pub async fn list_buckets(&self) -> Result<Vec<String>> {
        let response = self
            .send(reqwest::Method::GET, "/", &[], Vec::new(), BTreeMap::new())
            .await?;
        let body = Self::check(response).await?.text().await?;
        Ok(xml::parse_bucket_names(&body))
    }

    /// Upload `body` and return the ETag the server reports.
    pub async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<String> {
        let path = format!("/{}/{}", bucket, key);
        let content_md5 = BASE64.encode(Md5::digest(&body));
        let headers = BTreeMap::from([("content-md5".to_string(), content_md5)]);
        let response = self
            .send(reqwest::Method::PUT, &path, &[], body, headers)
            .await?;
        let response = Self::check(response).await?;
        Ok(response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .trim_matches('"')
            .to_string())
    }

    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = format!("/{}/{}", bucket, key);
        let response = self
            .send(reqwest::Method::GET, &path, &[], Vec::new(), BTreeMap::new())
            .await?;
        let bytes = Self::check(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let path = format!("/{}/{}", bucket, key);
        let response = self
            .send(reqwest::Method::DELETE, &path, &[], Vec::new(), BTreeMap::new())
            .await?;
        Self::check(response).await.map(|_| ())
    }
}
