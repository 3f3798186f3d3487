use super::{Created, array_at, join_path, json_body};
use crate::auth::Login;
use crate::client::{Method, RequestOptions, RestClient};
use crate::config::keys;
use crate::error::{CtError, Result};
use crate::naming;
use crate::verify::{Verdict, count_matching, expect_status, sorted_by};
use reqwest::Response;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_PASSWORD: &str = "Seagate@1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsmRole {
    Manage,
    Monitor,
}

impl CsmRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CsmRole::Manage => "manage",
            CsmRole::Monitor => "monitor",
        }
    }
}

impl std::str::FromStr for CsmRole {
    type Err = CtError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "manage" => Ok(CsmRole::Manage),
            "monitor" => Ok(CsmRole::Monitor),
            other => Err(CtError::RequestConstruction(format!("unknown role '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsmUserPayload {
    Valid(CsmRole),
    Duplicate(CsmRole),
    MissingRole,
    InvalidPassword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCsmUser {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<CsmRole>,
    pub alert_notification: bool,
}

impl CsmUserPayload {
    pub fn build(&self) -> NewCsmUser {
        let username = naming::unique("csm");
        match *self {
            CsmUserPayload::Valid(role) | CsmUserPayload::Duplicate(role) => NewCsmUser {
                username,
                password: DEFAULT_PASSWORD.into(),
                roles: vec![role],
                alert_notification: true,
            },
            CsmUserPayload::MissingRole => NewCsmUser {
                username,
                password: DEFAULT_PASSWORD.into(),
                roles: Vec::new(),
                alert_notification: true,
            },
            CsmUserPayload::InvalidPassword => NewCsmUser {
                username,
                password: "password".into(),
                roles: vec![CsmRole::Monitor],
                alert_notification: true,
            },
        }
    }

    fn is_duplicate(&self) -> bool {
        matches!(self, CsmUserPayload::Duplicate(_))
    }
}

/// Fields accepted by the user PATCH call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EditCsmUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<CsmRole>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<SortDir>,
}

impl ListQuery {
    fn apply(&self, mut options: RequestOptions) -> RequestOptions {
        if let Some(offset) = self.offset {
            options = options.query("offset", offset);
        }
        if let Some(limit) = self.limit {
            options = options.query("limit", limit);
        }
        if let Some(ref sort_by) = self.sort_by {
            options = options.query("sortby", sort_by);
        }
        if let Some(dir) = self.sort_dir {
            let dir = match dir {
                SortDir::Asc => "asc",
                SortDir::Desc => "desc",
            };
            options = options.query("dir", dir);
        }
        options
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsmUserInfo {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<CsmRole>,
}

pub struct CsmUserHelper {
    rest: RestClient,
}

impl CsmUserHelper {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn rest_mut(&mut self) -> &mut RestClient {
        &mut self.rest
    }

    fn endpoint(&self) -> Result<String> {
        Ok(self.rest.config().endpoint(keys::CSM_USERS)?.to_string())
    }

    pub async fn create_csm_user(&self, login: &Login, user: &NewCsmUser) -> Result<Response> {
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
        variant: &CsmUserPayload,
    ) -> Result<Created<NewCsmUser>> {
        let payload = variant.build();
        if variant.is_duplicate() {
            let first = self.create_csm_user(login, &payload).await?;
            tracing::debug!(status = %first.status(), "First create of duplicate CSM user");
        }
        let response = self.create_csm_user(login, &payload).await?;
        Ok(Created { payload, response })
    }

    pub async fn list_csm_users(&self, login: &Login, query: &ListQuery) -> Result<Response> {
        let endpoint = self.endpoint()?;
        let session = self.rest.authenticate(login).await?;
        session
            .rest_call(Method::Get, &endpoint, query.apply(RequestOptions::new()))
            .await
    }

    pub async fn list_user_entries(&self, login: &Login, query: &ListQuery) -> Result<Vec<Value>> {
        let response = self.list_csm_users(login, query).await?;
        if !response.status().is_success() {
            return Err(CtError::Verification(format!(
                "listing CSM users returned {}",
                response.status()
            )));
        }
        let body: Value = json_body(response).await?;
        Ok(array_at(&body, "users").to_vec())
    }

    pub async fn get_csm_user(&self, login: &Login, user_id: &str) -> Result<Response> {
        let endpoint = join_path(&self.endpoint()?, user_id);
        let session = self.rest.authenticate(login).await?;
        session
            .rest_call(Method::Get, &endpoint, RequestOptions::new())
            .await
    }

    pub async fn edit_csm_user(
        &self,
        login: &Login,
        user_id: &str,
        edit: &EditCsmUser,
    ) -> Result<Response> {
        let endpoint = join_path(&self.endpoint()?, user_id);
        let body = serde_json::to_value(edit).map_err(CtError::construction)?;
        let session = self.rest.authenticate(login).await?;
        session
            .rest_call(Method::Patch, &endpoint, RequestOptions::new().json(body))
            .await
    }

    pub async fn delete_csm_user(&self, login: &Login, user_id: &str) -> Result<Response> {
        let endpoint = join_path(&self.endpoint()?, user_id);
        let session = self.rest.authenticate(login).await?;
        session
            .rest_call(Method::Delete, &endpoint, RequestOptions::new())
            .await
    }

    pub async fn create_and_verify_csm_user(
        &self,
        login: &Login,
        expected_status: u16,
        variant: &CsmUserPayload,
    ) -> Result<Verdict> {
        let created = self.create_variant(login, variant).await?;
        let name = created.payload.username.clone();
        let verdict = expect_status(created.response.status(), expected_status);
        if !verdict.is_pass() {
            return Ok(verdict);
        }
        let users = self.list_user_entries(login, &ListQuery::default()).await?;
        let listed = count_matching(&users, "username", &name);
        if created.response.status().is_success() {
            let info: CsmUserInfo = json_body(created.response).await?;
            Ok(Verdict::check(info.username == name, || {
                format!("created user {} != requested {}", info.username, name)
            })
            .and(Verdict::check(info.roles == created.payload.roles, || {
                format!("roles {:?} != requested {:?}", info.roles, created.payload.roles)
            }))
            .and(Verdict::check(listed == 1, || {
                format!("user {} listed {} times", name, listed)
            })))
        } else {
            let expected = usize::from(variant.is_duplicate());
            Ok(Verdict::check(listed == expected, || {
                format!("user {} listed {} times, expected {}", name, listed, expected)
            }))
        }
    }

    /// Create a user and add it to this helper's identities under `identity`.
    pub async fn create_and_register(
        &mut self,
        login: &Login,
        role: CsmRole,
        identity: &str,
    ) -> Result<CsmUserInfo> {
        let user = CsmUserPayload::Valid(role).build();
        let response = self.create_csm_user(login, &user).await?;
        if !response.status().is_success() {
            return Err(CtError::Verification(format!(
                "creating CSM user {} returned {}",
                user.username,
                response.status()
            )));
        }
        let info: CsmUserInfo = json_body(response).await?;
        self.rest.config_mut().register_identity(
            identity,
            crate::config::Credentials::new(&user.username, &user.password),
        );
        Ok(info)
    }

    pub async fn verify_list_sorted(
        &self,
        login: &Login,
        sort_by: &str,
        dir: SortDir,
    ) -> Result<Verdict> {
        let query = ListQuery {
            sort_by: Some(sort_by.to_string()),
            sort_dir: Some(dir),
            ..Default::default()
        };
        let users = self.list_user_entries(login, &query).await?;
        Ok(Verdict::check(
            sorted_by(&users, sort_by, dir == SortDir::Desc),
            || format!("users not sorted by {} {:?}", sort_by, dir),
        ))
    }

    pub async fn verify_list_limit(&self, login: &Login, limit: u32) -> Result<Verdict> {
        let query = ListQuery {
            limit: Some(limit),
            ..Default::default()
        };
        let users = self.list_user_entries(login, &query).await?;
        Ok(Verdict::check(users.len() <= limit as usize, || {
            format!("limit {} returned {} users", limit, users.len())
        }))
    }
}
