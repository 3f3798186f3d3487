use super::Login;
use crate::client::{HeaderSet, Method, RequestOptions, RestClient};
use crate::config::{Credentials, keys};
use crate::error::{CtError, Result};
use reqwest::{Response, StatusCode};

const AUTHORIZATION: &str = "Authorization";

/// Header set obtained from one login, borrowed alongside the client that
/// produced it. Dropped when the helper call that created it returns.
#[derive(Debug)]
pub struct Session<'a> {
    client: &'a RestClient,
    headers: HeaderSet,
    login_status: StatusCode,
}

impl<'a> Session<'a> {
    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn is_authorized(&self) -> bool {
        self.headers.contains_key(AUTHORIZATION)
    }

    pub fn login_status(&self) -> StatusCode {
        self.login_status
    }

    pub fn client(&self) -> &'a RestClient {
        self.client
    }

    /// Same as [`RestClient::rest_call`] with the session headers merged
    /// over the caller's.
    pub async fn rest_call(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        let options = options.headers(&self.headers);
        self.client.rest_call(method, endpoint, options).await
    }
}

impl RestClient {
    /// POST the credentials to the login endpoint and hand back the raw
    /// response.
    pub async fn login(&self, credentials: &Credentials) -> Result<Response> {
        let endpoint = self.config().endpoint(keys::LOGIN)?.to_string();
        let body = serde_json::json!({
            "username": credentials.username,
            "password": credentials.password,
        });
        let options = RequestOptions::new()
            .headers(&self.config().login_headers)
            .json(body);
        self.rest_call(Method::Post, &endpoint, options).await
    }

    pub async fn authenticate(&self, login: &Login) -> Result<Session<'_>> {
        let credentials = login.identity.resolve(self.config())?;
        let response = self.login(&credentials).await?;
        let status = response.status();
        let token = response
            .headers()
            .get(reqwest::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let succeeded = status.as_u16() == self.config().rest.success_status;

        let mut headers = HeaderSet::new();
        match (login.authorized, succeeded, token) {
            (_, true, Some(token)) | (false, _, Some(token)) => {
                headers.insert(AUTHORIZATION.to_string(), token);
            }
            (true, _, _) => {
                let message = response.text().await.unwrap_or_default();
                tracing::error!(
                    username = %credentials.username,
                    status = %status,
                    "Login failed"
                );
                return Err(CtError::Authentication {
                    status: status.as_u16(),
                    message,
                });
            }
            (false, _, _) => {
                tracing::debug!(
                    username = %credentials.username,
                    status = %status,
                    "Login did not succeed, continuing without a token"
                );
            }
        }

        Ok(Session {
            client: self,
            headers,
            login_status: status,
        })
    }
}
