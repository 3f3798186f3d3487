use super::{Created, array_at, join_path, json_body};
use crate::auth::Login;
use crate::client::{Method, RequestOptions, RestClient};
use crate::config::keys;
use crate::error::{CtError, Result};
use crate::naming;
use crate::verify::{Verdict, expect_status};
use reqwest::Response;
use serde::Serialize;
use serde_json::Value;

/// IAM users are managed by the owning S3 account, so helpers log in as
/// this identity unless told otherwise.
pub const S3_ACCOUNT_IDENTITY: &str = "s3account_user";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IamUserPayload {
    Valid,
    Duplicate,
    MissingPassword,
    /// Name with characters IAM rejects.
    InvalidName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewIamUser {
    pub user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub require_reset: bool,
}

impl IamUserPayload {
    pub fn build(&self) -> NewIamUser {
        let name = naming::unique("iam");
        let password = Some("Seagate@1".to_string());
        match self {
            IamUserPayload::Valid | IamUserPayload::Duplicate => NewIamUser {
                user_name: name,
                password,
                require_reset: false,
            },
            IamUserPayload::MissingPassword => NewIamUser {
                user_name: name,
                password: None,
                require_reset: false,
            },
            IamUserPayload::InvalidName => NewIamUser {
                user_name: format!("{}#$%", name),
                password,
                require_reset: false,
            },
        }
    }
}

pub struct IamUserHelper {
    rest: RestClient,
}

impl IamUserHelper {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn default_login() -> Login {
        Login::as_identity(S3_ACCOUNT_IDENTITY)
    }

    fn endpoint(&self) -> Result<String> {
        Ok(self.rest.config().endpoint(keys::IAM_USERS)?.to_string())
    }

    pub async fn create_iam_user(&self, login: &Login, user: &NewIamUser) -> Result<Response> {
        let endpoint = self.endpoint()?;
        let body = serde_json::to_value(user).map_err(CtError::construction)?;
        let session = self.rest.authenticate(login).await?;
        session
            .rest_call(Method::Post, &endpoint, RequestOptions::new().json(body))
            .await
    }

    pub async fn create_variant(
        &self,
        login: &Login,
        variant: &IamUserPayload,
    ) -> Result<Created<NewIamUser>> {
        let payload = variant.build();
        if *variant == IamUserPayload::Duplicate {
            let first = self.create_iam_user(login, &payload).await?;
            tracing::debug!(status = %first.status(), "First create of duplicate IAM user");
        }
        let response = self.create_iam_user(login, &payload).await?;
        Ok(Created { payload, response })
    }

    pub async fn list_iam_users(&self, login: &Login) -> Result<Response> {
        let endpoint = self.endpoint()?;
        let session = self.rest.authenticate(login).await?;
        session
            .rest_call(Method::Get, &endpoint, RequestOptions::new())
            .await
    }

    pub async fn list_user_names(&self, login: &Login) -> Result<Vec<String>> {
        let response = self.list_iam_users(login).await?;
        if !response.status().is_success() {
            return Err(CtError::Verification(format!(
                "listing IAM users returned {}",
                response.status()
            )));
        }
        let body: Value = json_body(response).await?;
        Ok(array_at(&body, "iam_users")
            .iter()
            .filter_map(|u| u.get("user_name").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    pub async fn delete_iam_user(&self, login: &Login, user_name: &str) -> Result<Response> {
        let endpoint = join_path(&self.endpoint()?, user_name);
        let session = self.rest.authenticate(login).await?;
        session
            .rest_call(Method::Delete, &endpoint, RequestOptions::new())
            .await
    }

    pub async fn create_and_verify_iam_user(
        &self,
        login: &Login,
        expected_status: u16,
        variant: &IamUserPayload,
    ) -> Result<Verdict> {
        let created = self.create_variant(login, variant).await?;
        let name = created.payload.user_name.clone();
        let verdict = expect_status(created.response.status(), expected_status);
        if !verdict.is_pass() {
            return Ok(verdict);
        }
        let listed = self
            .list_user_names(login)
            .await?
            .iter()
            .filter(|n| **n == name)
            .count();
        let expected = if created.response.status().is_success()
            || *variant == IamUserPayload::Duplicate
        {
            1
        } else {
            0
        };
        Ok(Verdict::check(listed == expected, || {
            format!("IAM user {} listed {} times, expected {}", name, listed, expected)
        }))
    }

    pub async fn delete_and_verify_iam_user(&self, login: &Login, user_name: &str) -> Result<Verdict> {
        let response = self.delete_iam_user(login, user_name).await?;
        let verdict = Verdict::check(response.status().is_success(), || {
            format!("deleting IAM user {} returned {}", user_name, response.status())
        });
        let names = self.list_user_names(login).await?;
        Ok(verdict.and(Verdict::check(!names.iter().any(|n| n == user_name), || {
            format!("IAM user {} still listed after delete", user_name)
        })))
    }
}
