use super::{join_path, json_body};
use crate::auth::Login;
use crate::client::{Method, RequestOptions, RestClient};
use crate::config::keys;
use crate::csm::iam_user::S3_ACCOUNT_IDENTITY;
use crate::error::{CtError, Result};
use crate::verify::{Verdict, expect_status, verify_json_contains};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for OneOrMany {
    fn from(s: &str) -> Self {
        OneOrMany::One(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    pub principal: Value,
    pub action: OneOrMany,
    pub resource: OneOrMany,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<Statement>) -> Self {
        Self {
            version: POLICY_VERSION.into(),
            statement,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyPayload {
    /// Anyone may GET objects of the bucket.
    AllowGetObject,
    /// Every S3 action denied to everyone.
    DenyAll,
    /// Resource ARN pointing at some other bucket.
    InvalidResource,
    /// `{}`
    Empty,
}

impl PolicyPayload {
    pub fn build(&self, bucket: &str) -> Value {
        let objects = format!("arn:aws:s3:::{}/*", bucket);
        let doc = match self {
            PolicyPayload::AllowGetObject => PolicyDocument::new(vec![Statement {
                sid: Some("AllowAnonymousGet".into()),
                effect: Effect::Allow,
                principal: serde_json::json!({ "AWS": "*" }),
                action: "s3:GetObject".into(),
                resource: objects.as_str().into(),
            }]),
            PolicyPayload::DenyAll => PolicyDocument::new(vec![Statement {
                sid: Some("DenyAll".into()),
                effect: Effect::Deny,
                principal: serde_json::json!({ "AWS": "*" }),
                action: "s3:*".into(),
                resource: OneOrMany::Many(vec![format!("arn:aws:s3:::{}", bucket), objects]),
            }]),
            PolicyPayload::InvalidResource => PolicyDocument::new(vec![Statement {
                sid: Some("WrongBucket".into()),
                effect: Effect::Allow,
                principal: serde_json::json!({ "AWS": "*" }),
                action: "s3:GetObject".into(),
                resource: format!("arn:aws:s3:::{}-other/*", bucket).as_str().into(),
            }]),
            PolicyPayload::Empty => return serde_json::json!({}),
        };
        serde_json::to_value(doc).unwrap_or_default()
    }
}

pub struct BucketPolicyHelper {
    rest: RestClient,
}

impl BucketPolicyHelper {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn default_login() -> Login {
        Login::as_identity(S3_ACCOUNT_IDENTITY)
    }

    fn endpoint(&self, bucket: &str) -> Result<String> {
        let base = self.rest.config().endpoint(keys::BUCKET_POLICY)?;
        Ok(join_path(base, bucket))
    }

    pub async fn put_bucket_policy(
        &self,
        login: &Login,
        bucket: &str,
        policy: &Value,
    ) -> Result<Response> {
        let endpoint = self.endpoint(bucket)?;
        let session = self.rest.authenticate(login).await?;
        session
            .rest_call(Method::Put, &endpoint, RequestOptions::new().json(policy.clone()))
            .await
    }

    pub async fn get_bucket_policy(&self, login: &Login, bucket: &str) -> Result<Response> {
        let endpoint = self.endpoint(bucket)?;
        let session = self.rest.authenticate(login).await?;
        session
            .rest_call(Method::Get, &endpoint, RequestOptions::new())
            .await
    }

    pub async fn delete_bucket_policy(&self, login: &Login, bucket: &str) -> Result<Response> {
        let endpoint = self.endpoint(bucket)?;
        let session = self.rest.authenticate(login).await?;
        session
            .rest_call(Method::Delete, &endpoint, RequestOptions::new())
            .await
    }

    /// Parsed policy currently attached to `bucket`.
    pub async fn fetch_policy(&self, login: &Login, bucket: &str) -> Result<PolicyDocument> {
        let response = self.get_bucket_policy(login, bucket).await?;
        if response.status() != StatusCode::OK {
            return Err(CtError::Verification(format!(
                "reading policy of {} returned {}",
                bucket,
                response.status()
            )));
        }
        json_body(response).await
    }

    pub async fn put_and_verify_policy(
        &self,
        login: &Login,
        bucket: &str,
        payload: PolicyPayload,
        expected_status: u16,
    ) -> Result<Verdict> {
        let policy = payload.build(bucket);
        let response = self.put_bucket_policy(login, bucket, &policy).await?;
        let verdict = expect_status(response.status(), expected_status);
        if !verdict.is_pass() || !response.status().is_success() {
            return Ok(verdict);
        }
        let fetched = self.get_bucket_policy(login, bucket).await?;
        let status = expect_status(fetched.status(), StatusCode::OK.as_u16());
        if !status.is_pass() {
            return Ok(status);
        }
        let body: Value = json_body(fetched).await?;
        Ok(verify_json_contains(&policy, &body))
    }

    pub async fn delete_and_verify_policy(&self, login: &Login, bucket: &str) -> Result<Verdict> {
        let response = self.delete_bucket_policy(login, bucket).await?;
        let verdict = Verdict::check(response.status().is_success(), || {
            format!("deleting policy of {} returned {}", bucket, response.status())
        });
        let fetched = self.get_bucket_policy(login, bucket).await?;
        Ok(verdict.and(expect_status(fetched.status(), StatusCode::NOT_FOUND.as_u16())))
    }
}
