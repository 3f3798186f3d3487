//! In-process stand-in for the management API and S3 data path, just
//! enough for the helpers' round trips to mean something.

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, Query, Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use csmrest_core::s3::sigv4::{Signer, canonical_query};
use md5::{Digest, Md5};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "Seagate@1";

#[derive(Debug, Clone, PartialEq)]
enum Principal {
    Csm { username: String, role: Role },
    Account(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Role {
    Admin,
    Manage,
    Monitor,
}

impl Role {
    fn can_write(self) -> bool {
        matches!(self, Role::Admin | Role::Manage)
    }
}

struct CsmUser {
    id: String,
    username: String,
    password: String,
    roles: Vec<String>,
    created_time: String,
}

impl CsmUser {
    fn role(&self) -> Role {
        if self.roles.iter().any(|r| r == "manage") {
            Role::Manage
        } else {
            Role::Monitor
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "roles": self.roles,
            "created_time": self.created_time,
        })
    }
}

struct Account {
    email: String,
    password: String,
    access_key: String,
    secret_key: String,
    iam_users: BTreeMap<String, Value>,
}

struct Bucket {
    owner: String,
    objects: BTreeMap<String, Vec<u8>>,
    policy: Option<Value>,
}

#[derive(Default)]
struct Inner {
    tokens: HashMap<String, Principal>,
    users: Vec<CsmUser>,
    accounts: BTreeMap<String, Account>,
    buckets: BTreeMap<String, Bucket>,
    audit: Vec<(&'static str, Value)>,
}

#[derive(Default)]
pub struct StubState {
    inner: Mutex<Inner>,
}

type Shared = Arc<StubState>;

impl StubState {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    fn principal(&self, headers: &HeaderMap) -> Option<Principal> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        self.lock().tokens.get(token).cloned()
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error_code": status.as_u16(), "message": message })),
    )
        .into_response()
}

fn unauthorized() -> Response {
    error(StatusCode::UNAUTHORIZED, "Invalid auth token")
}

fn forbidden() -> Response {
    error(StatusCode::FORBIDDEN, "Access denied")
}

fn strong_password(p: &str) -> bool {
    p.len() >= 8
        && p.chars().any(|c| c.is_ascii_uppercase())
        && p.chars().any(|c| c.is_ascii_lowercase())
        && p.chars().any(|c| c.is_ascii_digit())
        && p.chars().any(|c| !c.is_ascii_alphanumeric())
}

fn valid_name(name: &str, min: usize, max: usize, extra: &str) -> bool {
    (min..=max).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || extra.contains(c))
}

fn valid_bucket_name(name: &str) -> bool {
    (3..=63).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        && name.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
        && name.parse::<std::net::Ipv4Addr>().is_err()
}

fn new_key(len: usize) -> String {
    let raw = format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    );
    raw[..len].to_uppercase()
}

fn str_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str)
}

// --- audit trail ---

async fn audit_csm(State(state): State<Shared>, request: Request, next: Next) -> Response {
    record(state, "CSM", request, next).await
}

async fn audit_s3(State(state): State<Shared>, request: Request, next: Next) -> Response {
    record(state, "S3", request, next).await
}

async fn record(state: Shared, component: &'static str, request: Request, next: Next) -> Response {
    let user = match state.principal(request.headers()) {
        Some(Principal::Csm { username, .. }) => username,
        Some(Principal::Account(name)) => name,
        None => "-".to_string(),
    };
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    let entry = json!({
        "timestamp": Utc::now().timestamp(),
        "user": user,
        "method": method,
        "path": path,
        "status": response.status().as_u16(),
    });
    state.lock().audit.push((component, entry));
    response
}

// --- login ---

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let username = str_field(&body, "username").unwrap_or_default();
    let password = str_field(&body, "password").unwrap_or_default();

    let mut inner = state.lock();
    let principal = if username == ADMIN_USER && password == ADMIN_PASSWORD {
        Some(Principal::Csm {
            username: username.to_string(),
            role: Role::Admin,
        })
    } else if let Some(user) = inner
        .users
        .iter()
        .find(|u| u.username == username && u.password == password)
    {
        Some(Principal::Csm {
            username: user.username.clone(),
            role: user.role(),
        })
    } else if inner
        .accounts
        .get(username)
        .is_some_and(|a| a.password == password)
    {
        Some(Principal::Account(username.to_string()))
    } else {
        None
    };

    match principal {
        Some(principal) => {
            let token = uuid::Uuid::new_v4().simple().to_string();
            inner.tokens.insert(token.clone(), principal);
            (
                StatusCode::OK,
                [(header::AUTHORIZATION, format!("Bearer {}", token))],
                Json(json!({ "reset_password": false })),
            )
                .into_response()
        }
        None => error(StatusCode::UNAUTHORIZED, "Invalid username or password"),
    }
}

// --- S3 accounts ---

async fn list_accounts(State(state): State<Shared>, headers: HeaderMap) -> Response {
    match state.principal(&headers) {
        Some(Principal::Csm { .. }) => {}
        Some(Principal::Account(_)) => return forbidden(),
        None => return unauthorized(),
    }
    let inner = state.lock();
    let accounts: Vec<Value> = inner
        .accounts
        .iter()
        .map(|(name, a)| json!({ "account_name": name, "account_email": a.email }))
        .collect();
    Json(json!({ "s3_accounts": accounts })).into_response()
}

async fn create_account(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    match state.principal(&headers) {
        Some(Principal::Csm { role, .. }) if role.can_write() => {}
        Some(_) => return forbidden(),
        None => return unauthorized(),
    }
    let (Some(name), Some(email), Some(password)) = (
        str_field(&body, "account_name"),
        str_field(&body, "account_email"),
        str_field(&body, "password"),
    ) else {
        return error(StatusCode::BAD_REQUEST, "Missing required field");
    };
    if !valid_name(name, 4, 64, "_-") || !email.contains('@') || !strong_password(password) {
        return error(StatusCode::BAD_REQUEST, "Invalid account parameters");
    }
    let mut inner = state.lock();
    if inner.accounts.contains_key(name) {
        return error(StatusCode::CONFLICT, "The request was rejected because it attempted to create an account that already exists.");
    }
    let account = Account {
        email: email.to_string(),
        password: password.to_string(),
        access_key: format!("AKIA{}", new_key(16)),
        secret_key: new_key(40),
        iam_users: BTreeMap::new(),
    };
    let reply = json!({
        "account_name": name,
        "account_email": email,
        "access_key": account.access_key,
        "secret_key": account.secret_key,
        "canonical_id": uuid::Uuid::new_v4().simple().to_string(),
    });
    inner.accounts.insert(name.to_string(), account);
    Json(reply).into_response()
}

async fn edit_account(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    match state.principal(&headers) {
        Some(Principal::Account(ref acc)) if *acc == name => {}
        Some(Principal::Csm { role: Role::Admin, .. }) => {}
        Some(_) => return forbidden(),
        None => return unauthorized(),
    }
    let mut inner = state.lock();
    let Some(account) = inner.accounts.get_mut(&name) else {
        return error(StatusCode::NOT_FOUND, "No such account");
    };
    if let Some(password) = str_field(&body, "password") {
        if !strong_password(password) {
            return error(StatusCode::BAD_REQUEST, "Weak password");
        }
        account.password = password.to_string();
    }
    let mut reply = json!({ "account_name": name, "account_email": account.email });
    if body.get("reset_access_key").and_then(Value::as_bool) == Some(true) {
        account.access_key = format!("AKIA{}", new_key(16));
        account.secret_key = new_key(40);
        reply["access_key"] = json!(account.access_key);
        reply["secret_key"] = json!(account.secret_key);
    }
    Json(reply).into_response()
}

async fn delete_account(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    match state.principal(&headers) {
        Some(Principal::Account(ref acc)) if *acc == name => {}
        Some(Principal::Csm { role, .. }) if role.can_write() => {}
        Some(_) => return forbidden(),
        None => return unauthorized(),
    }
    let mut inner = state.lock();
    if !inner.accounts.contains_key(&name) {
        return error(StatusCode::NOT_FOUND, "No such account");
    }
    if inner.buckets.values().any(|b| b.owner == name) {
        return error(StatusCode::CONFLICT, "Account owns buckets");
    }
    inner.accounts.remove(&name);
    inner
        .tokens
        .retain(|_, p| *p != Principal::Account(name.clone()));
    Json(json!({ "message": "Account Deleted Successfully." })).into_response()
}

// --- IAM users ---

fn account_principal(state: &StubState, headers: &HeaderMap) -> Result<String, Response> {
    match state.principal(headers) {
        Some(Principal::Account(name)) => Ok(name),
        Some(_) => Err(forbidden()),
        None => Err(unauthorized()),
    }
}

async fn list_iam_users(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let owner = match account_principal(&state, &headers) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };
    let inner = state.lock();
    let users: Vec<Value> = inner
        .accounts
        .get(&owner)
        .map(|a| a.iam_users.values().cloned().collect())
        .unwrap_or_default();
    Json(json!({ "iam_users": users })).into_response()
}

async fn create_iam_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let owner = match account_principal(&state, &headers) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };
    let (Some(name), Some(password)) = (str_field(&body, "user_name"), str_field(&body, "password"))
    else {
        return error(StatusCode::BAD_REQUEST, "Missing required field");
    };
    if !valid_name(name, 1, 64, "+=,.@_-") || !strong_password(password) {
        return error(StatusCode::BAD_REQUEST, "Invalid IAM user parameters");
    }
    let mut inner = state.lock();
    let Some(account) = inner.accounts.get_mut(&owner) else {
        return unauthorized();
    };
    if account.iam_users.contains_key(name) {
        return error(StatusCode::CONFLICT, "EntityAlreadyExists");
    }
    let user = json!({
        "user_name": name,
        "user_id": uuid::Uuid::new_v4().simple().to_string(),
        "arn": format!("arn:aws:iam::{}:user/{}", owner, name),
    });
    account.iam_users.insert(name.to_string(), user.clone());
    Json(user).into_response()
}

async fn delete_iam_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    let owner = match account_principal(&state, &headers) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };
    let mut inner = state.lock();
    let removed = inner
        .accounts
        .get_mut(&owner)
        .and_then(|a| a.iam_users.remove(&name));
    match removed {
        Some(_) => Json(json!({ "message": "User deleted." })).into_response(),
        None => error(StatusCode::NOT_FOUND, "NoSuchEntity"),
    }
}

// --- buckets ---

async fn list_buckets(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let owner = match account_principal(&state, &headers) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };
    let inner = state.lock();
    let buckets: Vec<Value> = inner
        .buckets
        .iter()
        .filter(|(_, b)| b.owner == owner)
        .map(|(name, _)| json!({ "name": name }))
        .collect();
    Json(json!({ "buckets": buckets })).into_response()
}

async fn create_bucket(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let owner = match account_principal(&state, &headers) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };
    let Some(name) = str_field(&body, "bucket_name") else {
        return error(StatusCode::BAD_REQUEST, "bucket_name is required");
    };
    if !valid_bucket_name(name) {
        return error(StatusCode::BAD_REQUEST, "InvalidBucketName");
    }
    let mut inner = state.lock();
    if inner.buckets.contains_key(name) {
        return error(StatusCode::CONFLICT, "BucketAlreadyExists");
    }
    inner.buckets.insert(
        name.to_string(),
        Bucket {
            owner,
            objects: BTreeMap::new(),
            policy: None,
        },
    );
    Json(json!({ "bucket_name": name })).into_response()
}

async fn delete_bucket(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    let owner = match account_principal(&state, &headers) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };
    let mut inner = state.lock();
    match inner.buckets.get(&name) {
        None => error(StatusCode::NOT_FOUND, "NoSuchBucket"),
        Some(b) if b.owner != owner => forbidden(),
        Some(b) if !b.objects.is_empty() => error(StatusCode::CONFLICT, "BucketNotEmpty"),
        Some(_) => {
            inner.buckets.remove(&name);
            Json(json!({ "message": "Bucket Deleted Successfully." })).into_response()
        }
    }
}

async fn bucket_collection_not_allowed() -> Response {
    error(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

// --- bucket policy ---

fn policy_targets_bucket(policy: &Value, bucket: &str) -> bool {
    let Some(statements) = policy.get("Statement").and_then(Value::as_array) else {
        return false;
    };
    let prefix = format!("arn:aws:s3:::{}", bucket);
    let resource_ok = |r: &Value| {
        r.as_str()
            .is_some_and(|s| s == prefix || s.starts_with(&format!("{}/", prefix)))
    };
    !statements.is_empty()
        && statements.iter().all(|s| match s.get("Resource") {
            Some(Value::Array(rs)) => !rs.is_empty() && rs.iter().all(resource_ok),
            Some(r) => resource_ok(r),
            None => false,
        })
}

async fn bucket_policy(
    State(state): State<Shared>,
    method: Method,
    headers: HeaderMap,
    Path(bucket): Path<String>,
    body: Bytes,
) -> Response {
    let owner = match account_principal(&state, &headers) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };
    let mut inner = state.lock();
    let Some(entry) = inner.buckets.get_mut(&bucket) else {
        return error(StatusCode::NOT_FOUND, "NoSuchBucket");
    };
    if entry.owner != owner {
        return forbidden();
    }
    match method {
        Method::PUT => {
            let Ok(policy) = serde_json::from_slice::<Value>(&body) else {
                return error(StatusCode::BAD_REQUEST, "MalformedPolicy");
            };
            if !policy_targets_bucket(&policy, &bucket) {
                return error(StatusCode::BAD_REQUEST, "MalformedPolicy");
            }
            entry.policy = Some(policy);
            Json(json!({ "message": "Bucket Policy Updated Successfully." })).into_response()
        }
        Method::GET => match entry.policy {
            Some(ref policy) => Json(policy.clone()).into_response(),
            None => error(StatusCode::NOT_FOUND, "NoSuchBucketPolicy"),
        },
        Method::DELETE => match entry.policy.take() {
            Some(_) => Json(json!({ "message": "Bucket Policy Deleted Successfully." }))
                .into_response(),
            None => error(StatusCode::NOT_FOUND, "NoSuchBucketPolicy"),
        },
        _ => error(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"),
    }
}

// --- CSM users ---

fn csm_principal(state: &StubState, headers: &HeaderMap) -> Result<(String, Role), Response> {
    match state.principal(headers) {
        Some(Principal::Csm { username, role }) => Ok((username, role)),
        Some(_) => Err(forbidden()),
        None => Err(unauthorized()),
    }
}

async fn list_csm_users(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(resp) = csm_principal(&state, &headers) {
        return resp;
    }
    let parse = |key: &str| params.get(key).map(|v| v.parse::<usize>());
    let offset = match parse("offset") {
        None => 0,
        Some(Ok(v)) => v,
        Some(Err(_)) => return error(StatusCode::BAD_REQUEST, "Invalid offset"),
    };
    let limit = match parse("limit") {
        None => usize::MAX,
        Some(Ok(v)) if v > 0 => v,
        Some(_) => return error(StatusCode::BAD_REQUEST, "Invalid limit"),
    };
    let sort_by = params.get("sortby").map(String::as_str).unwrap_or("username");
    if !["username", "created_time"].contains(&sort_by) {
        return error(StatusCode::BAD_REQUEST, "Invalid sortby");
    }
    let descending = match params.get("dir").map(String::as_str) {
        None | Some("asc") => false,
        Some("desc") => true,
        Some(_) => return error(StatusCode::BAD_REQUEST, "Invalid dir"),
    };

    let inner = state.lock();
    let mut users: Vec<Value> = inner.users.iter().map(CsmUser::to_json).collect();
    users.sort_by(|a, b| {
        let key = |v: &Value| v[sort_by].as_str().unwrap_or_default().to_lowercase();
        key(a).cmp(&key(b))
    });
    if descending {
        users.reverse();
    }
    let users: Vec<Value> = users.into_iter().skip(offset).take(limit).collect();
    Json(json!({ "users": users })).into_response()
}

async fn create_csm_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    match csm_principal(&state, &headers) {
        Ok((_, role)) if role.can_write() => {}
        Ok(_) => return forbidden(),
        Err(resp) => return resp,
    }
    let (Some(username), Some(password)) =
        (str_field(&body, "username"), str_field(&body, "password"))
    else {
        return error(StatusCode::BAD_REQUEST, "Missing required field");
    };
    let roles: Vec<String> = body
        .get("roles")
        .and_then(Value::as_array)
        .map(|rs| rs.iter().filter_map(|r| r.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    if roles.is_empty()
        || !roles.iter().all(|r| r == "manage" || r == "monitor")
        || !valid_name(username, 4, 64, "_-")
        || !strong_password(password)
    {
        return error(StatusCode::BAD_REQUEST, "Invalid user parameters");
    }
    let mut inner = state.lock();
    if username == ADMIN_USER || inner.users.iter().any(|u| u.username == username) {
        return error(StatusCode::CONFLICT, "User already exists");
    }
    let user = CsmUser {
        id: uuid::Uuid::new_v4().simple().to_string(),
        username: username.to_string(),
        password: password.to_string(),
        roles,
        created_time: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    };
    let reply = user.to_json();
    inner.users.push(user);
    (StatusCode::CREATED, Json(reply)).into_response()
}

async fn get_csm_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = csm_principal(&state, &headers) {
        return resp;
    }
    let inner = state.lock();
    match inner.users.iter().find(|u| u.id == id) {
        Some(user) => Json(user.to_json()).into_response(),
        None => error(StatusCode::NOT_FOUND, "User does not exist"),
    }
}

async fn edit_csm_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let (caller, role) = match csm_principal(&state, &headers) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let mut inner = state.lock();
    let Some(user) = inner.users.iter_mut().find(|u| u.id == id) else {
        return error(StatusCode::NOT_FOUND, "User does not exist");
    };
    let is_self = user.username == caller;
    if !is_self && !role.can_write() {
        return forbidden();
    }
    if let Some(roles) = body.get("roles").and_then(Value::as_array) {
        if is_self && !role.can_write() {
            return forbidden();
        }
        let roles: Vec<String> = roles
            .iter()
            .filter_map(|r| r.as_str().map(str::to_string))
            .collect();
        if roles.is_empty() || !roles.iter().all(|r| r == "manage" || r == "monitor") {
            return error(StatusCode::BAD_REQUEST, "Invalid roles");
        }
        user.roles = roles;
    }
    if let Some(password) = str_field(&body, "password") {
        if is_self && str_field(&body, "current_password") != Some(user.password.as_str()) {
            return error(StatusCode::BAD_REQUEST, "Current password is incorrect");
        }
        if !strong_password(password) {
            return error(StatusCode::BAD_REQUEST, "Weak password");
        }
        user.password = password.to_string();
    }
    Json(user.to_json()).into_response()
}

async fn delete_csm_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    match csm_principal(&state, &headers) {
        Ok((_, role)) if role.can_write() => {}
        Ok(_) => return forbidden(),
        Err(resp) => return resp,
    }
    let mut inner = state.lock();
    let before = inner.users.len();
    inner.users.retain(|u| u.id != id);
    if inner.users.len() == before {
        return error(StatusCode::NOT_FOUND, "User does not exist");
    }
    Json(json!({ "message": "User Deleted Successfully." })).into_response()
}

// --- audit logs ---

fn audit_entries(
    state: &StubState,
    headers: &HeaderMap,
    component: &str,
    params: &HashMap<String, String>,
) -> Result<Vec<Value>, Response> {
    csm_principal(state, headers)?;
    let component = match component {
        "CSM" => "CSM",
        "S3" => "S3",
        _ => return Err(error(StatusCode::BAD_REQUEST, "Invalid component")),
    };
    let bound = |key: &str| params.get(key).and_then(|v| v.parse::<i64>().ok());
    let (Some(start), Some(end)) = (bound("start_date"), bound("end_date")) else {
        return Err(error(StatusCode::BAD_REQUEST, "start_date and end_date are required"));
    };
    if end < start {
        return Err(error(StatusCode::BAD_REQUEST, "end_date is before start_date"));
    }
    let inner = state.lock();
    Ok(inner
        .audit
        .iter()
        .filter(|(c, e)| {
            let ts = e["timestamp"].as_i64().unwrap_or_default();
            *c == component && ts >= start && ts <= end
        })
        .map(|(_, e)| e.clone())
        .collect())
}

async fn show_audit_logs(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(component): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match audit_entries(&state, &headers, &component, &params) {
        Ok(entries) => Json(Value::Array(entries)).into_response(),
        Err(resp) => resp,
    }
}

async fn download_audit_logs(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(component): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let entries = match audit_entries(&state, &headers, &component, &params) {
        Ok(entries) => entries,
        Err(resp) => return resp,
    };
    let mut body = String::from("timestamp,user,method,path,status\n");
    for e in entries {
        body.push_str(&format!(
            "{},{},{},{},{}\n",
            e["timestamp"], e["user"], e["method"], e["path"], e["status"]
        ));
    }
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}_audit.log\"", component),
            ),
        ],
        body,
    )
        .into_response()
}

// --- S3 data path ---

fn s3_error(status: StatusCode, code: &str) -> Response {
    let body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Error><Code>{}</Code><Message>{}</Message></Error>",
        code, code
    );
    (status, [(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

/// Resolve the signing account and check the SigV4 signature.
fn s3_account(state: &StubState, method: &Method, uri: &axum::http::Uri, headers: &HeaderMap) -> Result<String, Response> {
    let denied = || s3_error(StatusCode::FORBIDDEN, "AccessDenied");
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(denied)?;
    let field = |name: &str| {
        auth.split(|c| c == ' ' || c == ',')
            .find_map(|part| part.strip_prefix(name))
            .map(str::to_string)
    };
    let credential = field("Credential=").ok_or_else(denied)?;
    let signed_headers = field("SignedHeaders=").ok_or_else(denied)?;
    let access_key = credential.split('/').next().unwrap_or_default().to_string();
    let region = credential.split('/').nth(2).unwrap_or_default().to_string();

    let inner = state.lock();
    let Some((name, account)) = inner
        .accounts
        .iter()
        .find(|(_, a)| a.access_key == access_key)
    else {
        return Err(s3_error(StatusCode::FORBIDDEN, "InvalidAccessKeyId"));
    };

    let signed: BTreeMap<String, String> = signed_headers
        .split(';')
        .map(|h| {
            let value = headers
                .get(h)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            (h.to_string(), value)
        })
        .collect();
    let query: Vec<(String, String)> = uri
        .query()
        .map(|q| {
            q.split('&')
                .filter(|p| !p.is_empty())
                .map(|p| {
                    let (k, v) = p.split_once('=').unwrap_or((p, ""));
                    (k.to_string(), v.to_string())
                })
                .collect()
        })
        .unwrap_or_default();
    let payload_hash = signed
        .get("x-amz-content-sha256")
        .cloned()
        .unwrap_or_default();
    let expected = Signer::new(&account.access_key, &account.secret_key, region).authorization(
        method.as_str(),
        uri.path(),
        &canonical_query(&query),
        &signed,
        &payload_hash,
    );
    if expected != auth {
        return Err(s3_error(StatusCode::FORBIDDEN, "SignatureDoesNotMatch"));
    }
    Ok(name.clone())
}

async fn s3_root(State(state): State<Shared>, method: Method, request: Request) -> Response {
    let owner = match s3_account(&state, &method, request.uri(), request.headers()) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };
    let inner = state.lock();
    let buckets: String = inner
        .buckets
        .iter()
        .filter(|(_, b)| b.owner == owner)
        .map(|(name, _)| {
            format!(
                "<Bucket><Name>{}</Name><CreationDate>2024-01-01T00:00:00.000Z</CreationDate></Bucket>",
                name
            )
        })
        .collect();
    let body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><ListAllMyBucketsResult><Owner><ID>{0}</ID><DisplayName>{0}</DisplayName></Owner><Buckets>{1}</Buckets></ListAllMyBucketsResult>",
        owner, buckets
    );
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

async fn s3_bucket(
    State(state): State<Shared>,
    Path(bucket): Path<String>,
    request: Request,
) -> Response {
    let method = request.method().clone();
    let owner = match s3_account(&state, &method, request.uri(), request.headers()) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };
    let mut inner = state.lock();
    match method {
        Method::PUT => {
            if !valid_bucket_name(&bucket) {
                return s3_error(StatusCode::BAD_REQUEST, "InvalidBucketName");
            }
            match inner.buckets.get(&bucket) {
                Some(b) if b.owner == owner => {
                    s3_error(StatusCode::CONFLICT, "BucketAlreadyOwnedByYou")
                }
                Some(_) => s3_error(StatusCode::CONFLICT, "BucketAlreadyExists"),
                None => {
                    inner.buckets.insert(
                        bucket,
                        Bucket {
                            owner,
                            objects: BTreeMap::new(),
                            policy: None,
                        },
                    );
                    StatusCode::OK.into_response()
                }
            }
        }
        Method::DELETE => match inner.buckets.get(&bucket) {
            None => s3_error(StatusCode::NOT_FOUND, "NoSuchBucket"),
            Some(b) if b.owner != owner => s3_error(StatusCode::FORBIDDEN, "AccessDenied"),
            Some(b) if !b.objects.is_empty() => s3_error(StatusCode::CONFLICT, "BucketNotEmpty"),
            Some(_) => {
                inner.buckets.remove(&bucket);
                StatusCode::NO_CONTENT.into_response()
            }
        },
        _ => s3_error(StatusCode::METHOD_NOT_ALLOWED, "MethodNotAllowed"),
    }
}

async fn s3_object(
    State(state): State<Shared>,
    Path((bucket, key)): Path<(String, String)>,
    request: Request,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = request.headers().clone();
    let owner = match s3_account(&state, &method, &uri, &headers) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };
    let body = match axum::body::to_bytes(request.into_body(), usize::MAX).await {
        Ok(body) => body,
        Err(_) => return s3_error(StatusCode::BAD_REQUEST, "IncompleteBody"),
    };

    let mut inner = state.lock();
    let Some(entry) = inner.buckets.get_mut(&bucket) else {
        return s3_error(StatusCode::NOT_FOUND, "NoSuchBucket");
    };
    if entry.owner != owner {
        return s3_error(StatusCode::FORBIDDEN, "AccessDenied");
    }
    match method {
        Method::PUT => {
            let digest = Md5::digest(&body);
            if let Some(md5) = headers.get("content-md5").and_then(|v| v.to_str().ok()) {
                if base64::engine::general_purpose::STANDARD.encode(digest) != md5 {
                    return s3_error(StatusCode::BAD_REQUEST, "BadDigest");
                }
            }
            entry.objects.insert(key, body.to_vec());
            (
                StatusCode::OK,
                [(header::ETAG, format!("\"{}\"", hex::encode(digest)))],
            )
                .into_response()
        }
        Method::GET => match entry.objects.get(&key) {
            Some(data) => Body::from(data.clone()).into_response(),
            None => s3_error(StatusCode::NOT_FOUND, "NoSuchKey"),
        },
        Method::DELETE => {
            entry.objects.remove(&key);
            StatusCode::NO_CONTENT.into_response()
        }
        _ => s3_error(StatusCode::METHOD_NOT_ALLOWED, "MethodNotAllowed"),
    }
}

pub fn management_router(state: Shared) -> Router {
    Router::new()
        .route("/api/v1/login", post(login))
        .route("/api/v1/s3_accounts", get(list_accounts).post(create_account))
        .route(
            "/api/v1/s3_accounts/{name}",
            axum::routing::patch(edit_account).delete(delete_account),
        )
        .route("/api/v1/iam_users", get(list_iam_users).post(create_iam_user))
        .route("/api/v1/iam_users/{name}", axum::routing::delete(delete_iam_user))
        .route("/api/v1/s3/bucket", get(list_buckets).post(create_bucket))
        .route(
            "/api/v1/s3/bucket/",
            axum::routing::delete(bucket_collection_not_allowed),
        )
        .route("/api/v1/s3/bucket/{name}", axum::routing::delete(delete_bucket))
        .route(
            "/api/v1/s3/bucket_policy/{bucket}",
            put(bucket_policy).get(bucket_policy).delete(bucket_policy),
        )
        .route("/api/v1/csm/users", get(list_csm_users).post(create_csm_user))
        .route(
            "/api/v1/csm/users/{id}",
            get(get_csm_user).patch(edit_csm_user).delete(delete_csm_user),
        )
        .route("/api/v1/auditlogs/show/{component}", get(show_audit_logs))
        .route("/api/v1/auditlogs/download/{component}", get(download_audit_logs))
        .layer(middleware::from_fn_with_state(state.clone(), audit_csm))
        .with_state(state)
}

pub fn s3_router(state: Shared) -> Router {
    Router::new()
        .route("/", get(s3_root))
        .route("/{bucket}", put(s3_bucket).delete(s3_bucket))
        .route(
            "/{bucket}/{*key}",
            put(s3_object).get(s3_object).delete(s3_object),
        )
        .layer(middleware::from_fn_with_state(state.clone(), audit_s3))
        .with_state(state)
}
