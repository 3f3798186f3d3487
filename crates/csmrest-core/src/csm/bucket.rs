use super::{Created, array_at, join_path, json_body};
use crate::auth::Login;
use crate::client::{Method, RequestOptions, RestClient};
use crate::config::keys;
use crate::csm::iam_user::S3_ACCOUNT_IDENTITY;
use crate::error::{CtError, Result};
use crate::naming;
use crate::verify::{Verdict, count_matching, expect_status};
use reqwest::Response;
use serde::Serialize;
use serde_json::Value;

pub const MAX_BUCKET_NAME_LEN: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketPayload {
    Valid,
    /// Two characters, below the 3 character minimum.
    TooShort,
    /// One character past the 63 character maximum.
    TooLong,
    /// Leading underscore.
    InvalidFirstChar,
    Uppercase,
    IpAddress,
    /// Same valid name submitted twice.
    Duplicate,
    /// `bucket_name` omitted.
    Empty,
}

impl BucketPayload {
    /// Variants the server must reject with a client error.
    pub const INVALID: [BucketPayload; 6] = [
        BucketPayload::TooShort,
        BucketPayload::TooLong,
        BucketPayload::InvalidFirstChar,
        BucketPayload::Uppercase,
        BucketPayload::IpAddress,
        BucketPayload::Empty,
    ];

    pub fn build(&self) -> NewBucket {
        let valid = naming::unique("sampleb");
        let bucket_name = match self {
            BucketPayload::Valid | BucketPayload::Duplicate => Some(valid),
            BucketPayload::TooShort => Some("ab".to_string()),
            BucketPayload::TooLong => {
                let mut name = valid;
                while name.len() <= MAX_BUCKET_NAME_LEN {
                    name.push('a');
                }
                Some(name)
            }
            BucketPayload::InvalidFirstChar => Some(format!("_{}", valid)),
            BucketPayload::Uppercase => Some(valid.to_uppercase()),
            BucketPayload::IpAddress => Some("192.168.10.20".to_string()),
            BucketPayload::Empty => None,
        };
        NewBucket { bucket_name }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBucket {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
}

pub struct BucketHelper {
    rest: RestClient,
}

impl BucketHelper {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn default_login() -> Login {
        Login::as_identity(S3_ACCOUNT_IDENTITY)
    }

    fn endpoint(&self) -> Result<String> {
        Ok(self.rest.config().endpoint(keys::BUCKETS)?.to_string())
    }

    pub async fn create_bucket(&self, login: &Login, bucket: &NewBucket) -> Result<Response> {
        let endpoint = self.endpoint()?;
        let body = serde_json::to_value(bucket).map_err(CtError::construction)?;
        let session = self.rest.authenticate(login).await?;
        session
            .rest_call(Method::Post, &endpoint, RequestOptions::new().json(body))
            .await
    }

    /// Submit the payload for `variant`; `Duplicate` creates once, then
    /// repeats the identical call and returns that second answer.
    pub async fn create_variant(
        &self,
        login: &Login,
        variant: BucketPayload,
    ) -> Result<Created<NewBucket>> {
        let payload = variant.build();
        if variant == BucketPayload::Duplicate {
            let first = self.create_bucket(login, &payload).await?;
            tracing::debug!(status = %first.status(), "First create of duplicate bucket");
        }
        let response = self.create_bucket(login, &payload).await?;
        Ok(Created { payload, response })
    }

    pub async fn list_buckets(&self, login: &Login) -> Result<Response> {
        let endpoint = self.endpoint()?;
        let session = self.rest.authenticate(login).await?;
        session
            .rest_call(Method::Get, &endpoint, RequestOptions::new())
            .await
    }

    /// Entries under `buckets[]` of the list response.
    pub async fn list_all_created_buckets(&self, login: &Login) -> Result<Vec<Value>> {
        let response = self.list_buckets(login).await?;
        if !response.status().is_success() {
            return Err(CtError::Verification(format!(
                "listing buckets returned {}",
                response.status()
            )));
        }
        let body: Value = json_body(response).await?;
        Ok(array_at(&body, "buckets").to_vec())
    }

    /// An empty `name` addresses the collection itself.
    pub async fn delete_bucket(&self, login: &Login, name: &str) -> Result<Response> {
        let endpoint = join_path(&self.endpoint()?, name);
        let session = self.rest.authenticate(login).await?;
        session
            .rest_call(Method::Delete, &endpoint, RequestOptions::new())
            .await
    }

    pub async fn create_and_verify_new_bucket(
        &self,
        login: &Login,
        expected_status: u16,
        variant: BucketPayload,
    ) -> Result<Verdict> {
        let created = self.create_variant(login, variant).await?;
        let verdict = expect_status(created.response.status(), expected_status);
        if !verdict.is_pass() {
            return Ok(verdict);
        }

        let Some(name) = created.payload.bucket_name else {
            return Ok(Verdict::Pass);
        };
        let buckets = self.list_all_created_buckets(login).await?;
        let listed = count_matching(&buckets, "name", &name);
        let expected = if created.response.status().is_success()
            || variant == BucketPayload::Duplicate
        {
            1
        } else {
            0
        };
        Ok(Verdict::check(listed == expected, || {
            format!("bucket {} listed {} times, expected {}", name, listed, expected)
        }))
    }

    pub async fn delete_and_verify_bucket(&self, login: &Login, name: &str) -> Result<Verdict> {
        let response = self.delete_bucket(login, name).await?;
        let verdict = Verdict::check(response.status().is_success(), || {
            format!("deleting bucket {} returned {}", name, response.status())
        });
        let buckets = self.list_all_created_buckets(login).await?;
        Ok(verdict.and(Verdict::check(count_matching(&buckets, "name", name) == 0, || {
            format!("bucket {} still listed after delete", name)
        })))
    }
}
