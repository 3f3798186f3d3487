//! Resource helpers for the management API: each builds payloads from a
//! closed set of variants, sends them through an authenticated session and
//! offers `*_and_verify` calls that re-read server state.

pub mod audit_log;
pub mod bucket;
pub mod bucket_policy;
pub mod csm_user;
pub mod iam_user;
pub mod s3_account;

pub use audit_log::{AuditComponent, AuditLogHelper, AuditWindow};
pub use bucket::{BucketHelper, BucketPayload};
pub use bucket_policy::{BucketPolicyHelper, PolicyDocument, PolicyPayload};
pub use csm_user::{CsmRole, CsmUserHelper, CsmUserPayload, ListQuery, SortDir};
pub use iam_user::{IamUserHelper, IamUserPayload};
pub use s3_account::{S3AccountHelper, S3AccountPayload};

use crate::client::loggable_body;
use crate::error::{CtError, Result};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Payload that was sent together with the server's answer.
#[derive(Debug)]
pub struct Created<P> {
    pub payload: P,
    pub response: Response,
}

/// Decode a response body, treating an unparsable body as a verification
/// failure since the request itself went through.
pub(crate) async fn json_body<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;
    tracing::debug!(%status, body = %loggable_body(&text), "Response body");
    serde_json::from_str(&text).map_err(|e| {
        CtError::Verification(format!("unexpected body for status {}: {} ({})", status, text, e))
    })
}

/// The array stored under `key`, or an empty slice.
pub(crate) fn array_at<'v>(body: &'v Value, key: &str) -> &'v [Value] {
    body.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

pub(crate) fn join_path(endpoint: &str, segment: &str) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), segment)
}
