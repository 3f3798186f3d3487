use super::{join_path, json_body};
use crate::auth::Login;
use crate::client::{Method, RequestOptions, RestClient};
use crate::config::keys;
use crate::error::Result;
use crate::verify::{Verdict, expect_status};
use chrono::{Duration, Utc};
use reqwest::{Response, header::CONTENT_TYPE};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditComponent {
    Csm,
    S3,
}

impl AuditComponent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditComponent::Csm => "CSM",
            AuditComponent::S3 => "S3",
        }
    }
}

/// Time range in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditWindow {
    pub start: i64,
    pub end: i64,
}

impl AuditWindow {
    /// The last `hours` hours up to now.
    pub fn last_hours(hours: i64) -> Self {
        let end = Utc::now();
        Self {
            start: (end - Duration::hours(hours)).timestamp(),
            end: end.timestamp(),
        }
    }

    /// End before start, which the server must refuse.
    pub fn inverted(self) -> Self {
        Self {
            start: self.end,
            end: self.start,
        }
    }
}

const DOWNLOAD_CONTENT_TYPES: [&str; 4] = [
    "application/gzip",
    "application/x-gzip",
    "application/octet-stream",
    "application/x-tar",
];

pub struct AuditLogHelper {
    rest: RestClient,
}

impl AuditLogHelper {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    async fn fetch(
        &self,
        login: &Login,
        key: &str,
        component: AuditComponent,
        window: AuditWindow,
    ) -> Result<Response> {
        let endpoint = join_path(self.rest.config().endpoint(key)?, component.as_str());
        let options = RequestOptions::new()
            .query("start_date", window.start)
            .query("end_date", window.end);
        let session = self.rest.authenticate(login).await?;
        session.rest_call(Method::Get, &endpoint, options).await
    }

    pub async fn show_audit_logs(
        &self,
        login: &Login,
        component: AuditComponent,
        window: AuditWindow,
    ) -> Result<Response> {
        self.fetch(login, keys::AUDIT_LOGS_SHOW, component, window).await
    }

    pub async fn download_audit_logs(
        &self,
        login: &Login,
        component: AuditComponent,
        window: AuditWindow,
    ) -> Result<Response> {
        self.fetch(login, keys::AUDIT_LOGS_DOWNLOAD, component, window)
            .await
    }

    /// Status check plus, on success, that the body is a JSON array that is
    /// non-empty when `expect_entries` is set.
    pub async fn verify_audit_logs_show(
        &self,
        login: &Login,
        component: AuditComponent,
        window: AuditWindow,
        expected_status: u16,
        expect_entries: bool,
    ) -> Result<Verdict> {
        let response = self.show_audit_logs(login, component, window).await?;
        let verdict = expect_status(response.status(), expected_status);
        if !verdict.is_pass() || !response.status().is_success() {
            return Ok(verdict);
        }
        let body: Value = json_body(response).await?;
        let Some(entries) = body.as_array() else {
            return Ok(Verdict::fail(format!("audit log body is not a list: {}", body)));
        };
        Ok(Verdict::check(!expect_entries || !entries.is_empty(), || {
            format!("no {} audit log entries in window {:?}", component.as_str(), window)
        }))
    }

    pub async fn verify_audit_logs_download(
        &self,
        login: &Login,
        component: AuditComponent,
        window: AuditWindow,
        expected_status: u16,
    ) -> Result<Verdict> {
        let response = self.download_audit_logs(login, component, window).await?;
        let verdict = expect_status(response.status(), expected_status);
        if !verdict.is_pass() || !response.status().is_success() {
            return Ok(verdict);
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().await?;
        Ok(Verdict::check(
            DOWNLOAD_CONTENT_TYPES
                .iter()
                .any(|t| content_type.starts_with(t)),
            || format!("unexpected download content type '{}'", content_type),
        )
        .and(Verdict::check(!body.is_empty(), || {
            "downloaded audit log is empty".to_string()
        })))
    }
}
