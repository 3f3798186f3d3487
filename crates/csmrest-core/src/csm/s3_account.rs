use super::{Created, array_at, join_path, json_body};
use crate::auth::Login;
use crate::client::{Method, RequestOptions, RestClient};
use crate::config::{Credentials, keys};
use crate::error::{CtError, Result};
use crate::naming;
use crate::poll::poll_until;
use crate::verify::{Verdict, count_matching, expect_status};
use reqwest::Response;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_PASSWORD: &str = "Seagate@1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum S3AccountPayload {
    Valid,
    /// Creates the same account twice; the second answer is returned.
    Duplicate,
    MissingEmail,
    InvalidPassword,
    Custom {
        account_name: String,
        account_email: String,
        password: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewS3Account {
    pub account_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_email: Option<String>,
    pub password: String,
}

impl S3AccountPayload {
    pub fn build(&self) -> NewS3Account {
        let name = naming::unique("s3acc");
        match self {
            S3AccountPayload::Valid | S3AccountPayload::Duplicate => NewS3Account {
                account_email: Some(naming::email_for(&name)),
                account_name: name,
                password: DEFAULT_PASSWORD.into(),
            },
            S3AccountPayload::MissingEmail => NewS3Account {
                account_name: name,
                account_email: None,
                password: DEFAULT_PASSWORD.into(),
            },
            S3AccountPayload::InvalidPassword => NewS3Account {
                account_email: Some(naming::email_for(&name)),
                account_name: name,
                password: "weak".into(),
            },
            S3AccountPayload::Custom {
                account_name,
                account_email,
                password,
            } => NewS3Account {
                account_name: account_name.clone(),
                account_email: Some(account_email.clone()),
                password: password.clone(),
            },
        }
    }
}

/// Body returned when an account is created.
#[derive(Debug, Clone, Deserialize)]
pub struct S3AccountInfo {
    pub account_name: String,
    #[serde(default)]
    pub account_email: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EditS3Account {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_access_key: Option<bool>,
}

pub struct S3AccountHelper {
    rest: RestClient,
}

impl S3AccountHelper {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    fn endpoint(&self) -> Result<String> {
        Ok(self.rest.config().endpoint(keys::S3_ACCOUNTS)?.to_string())
    }

    pub async fn create_s3_account(&self, login: &Login, account: &NewS3Account) -> Result<Response> {
        let endpoint = self.endpoint()?;
        let body = serde_json::to_value(account).map_err(CtError::construction)?;
        let session = self.rest.authenticate(login).await?;
        session
            .rest_call(Method::Post, &endpoint, RequestOptions::new().json(body))
            .await
    }

    /// Build the payload for `variant` and submit it. `Duplicate` submits
    /// twice and hands back the second answer.
    pub async fn create_variant(
        &self,
        login: &Login,
        variant: &S3AccountPayload,
    ) -> Result<Created<NewS3Account>> {
        let payload = variant.build();
        if *variant == S3AccountPayload::Duplicate {
            let first = self.create_s3_account(login, &payload).await?;
            tracing::debug!(status = %first.status(), "First create of duplicate account");
        }
        let response = self.create_s3_account(login, &payload).await?;
        Ok(Created { payload, response })
    }

    pub async fn list_s3_accounts(&self, login: &Login) -> Result<Response> {
        let endpoint = self.endpoint()?;
        let session = self.rest.authenticate(login).await?;
        session
            .rest_call(Method::Get, &endpoint, RequestOptions::new())
            .await
    }

    /// Account objects from the list endpoint.
    pub async fn list_account_entries(&self, login: &Login) -> Result<Vec<Value>> {
        let response = self.list_s3_accounts(login).await?;
        if !response.status().is_success() {
            return Err(CtError::Verification(format!(
                "listing S3 accounts returned {}",
                response.status()
            )));
        }
        let body: Value = json_body(response).await?;
        Ok(array_at(&body, "s3_accounts").to_vec())
    }

    pub async fn edit_s3_account(
        &self,
        login: &Login,
        account_name: &str,
        edit: &EditS3Account,
    ) -> Result<Response> {
        let endpoint = join_path(&self.endpoint()?, account_name);
        let body = serde_json::to_value(edit).map_err(CtError::construction)?;
        let session = self.rest.authenticate(login).await?;
        session
            .rest_call(Method::Patch, &endpoint, RequestOptions::new().json(body))
            .await
    }

    /// DELETE the account, retrying at the configured interval while the
    /// server reports a transient (5xx) failure. Once the account-delete
    /// deadline passes, one last attempt is made and its answer returned.
    pub async fn delete_s3_account(&self, login: &Login, account_name: &str) -> Result<Response> {
        let endpoint = join_path(&self.endpoint()?, account_name);
        let polling = self.rest.config().polling.clone();
        let session = self.rest.authenticate(login).await?;

        let session = &session;
        let endpoint = endpoint.as_str();
        let outcome = poll_until(
            polling.delete_account_timeout(),
            polling.interval(),
            move || async move {
                let response = session
                    .rest_call(Method::Delete, endpoint, RequestOptions::new())
                    .await?;
                if response.status().is_server_error() {
                    tracing::debug!(status = %response.status(), "Account delete not done yet");
                    Ok(None)
                } else {
                    Ok(Some(response))
                }
            },
        )
        .await;
        match outcome {
            Err(CtError::Timeout(_)) => {
                session
                    .rest_call(Method::Delete, endpoint, RequestOptions::new())
                    .await
            }
            other => other,
        }
    }

    pub async fn create_and_verify_s3_account(
        &self,
        login: &Login,
        expected_status: u16,
        variant: &S3AccountPayload,
    ) -> Result<Verdict> {
        let created = self.create_variant(login, variant).await?;
        let name = created.payload.account_name.clone();
        let status_check = expect_status(created.response.status(), expected_status);
        if !status_check.is_pass() {
            return Ok(status_check);
        }

        let accounts = self.list_account_entries(login).await?;
        let listed = count_matching(&accounts, "account_name", &name);
        if created.response.status().is_success() {
            let info: S3AccountInfo = json_body(created.response).await?;
            Ok(Verdict::check(info.account_name == name, || {
                format!("created account name {} != requested {}", info.account_name, name)
            })
            .and(Verdict::check(!info.access_key.is_empty(), || {
                format!("no access key returned for {}", name)
            }))
            .and(Verdict::check(listed == 1, || {
                format!("account {} listed {} times", name, listed)
            })))
        } else {
            let expected = usize::from(*variant == S3AccountPayload::Duplicate);
            Ok(Verdict::check(listed == expected, || {
                format!("account {} listed {} times, expected {}", name, listed, expected)
            }))
        }
    }

    pub async fn verify_list_contains(&self, login: &Login, account_name: &str) -> Result<Verdict> {
        let accounts = self.list_account_entries(login).await?;
        Ok(Verdict::check(
            count_matching(&accounts, "account_name", account_name) == 1,
            || format!("account {} not listed", account_name),
        ))
    }

    /// Create a valid account and register it as `identity` so later calls
    /// can log in as it.
    pub async fn create_and_register(
        &mut self,
        login: &Login,
        identity: &str,
    ) -> Result<S3AccountInfo> {
        let account = S3AccountPayload::Valid.build();
        let response = self.create_s3_account(login, &account).await?;
        if !response.status().is_success() {
            return Err(CtError::Verification(format!(
                "creating S3 account {} returned {}",
                account.account_name,
                response.status()
            )));
        }
        let info: S3AccountInfo = json_body(response).await?;
        self.rest.config_mut().register_identity(
            identity,
            Credentials::new(&account.account_name, &account.password),
        );
        Ok(info)
    }

    pub fn into_rest(self) -> RestClient {
        self.rest
    }
}
