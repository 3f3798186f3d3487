use crate::error::{CtError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Names of the endpoint entries the helpers look up.
pub mod keys {
    pub const LOGIN: &str = "login";
    pub const S3_ACCOUNTS: &str = "s3accounts_endpoint";
    pub const IAM_USERS: &str = "iamuser_endpoint";
    pub const BUCKETS: &str = "bucket_endpoint";
    pub const BUCKET_POLICY: &str = "bucket_policy_endpoint";
    pub const CSM_USERS: &str = "csmuser_endpoint";
    pub const AUDIT_LOGS_SHOW: &str = "audit_logs_show_endpoint";
    pub const AUDIT_LOGS_DOWNLOAD: &str = "audit_logs_download_endpoint";

    /// Identity used when a call does not name one.
    pub const ADMIN_IDENTITY: &str = "csm_admin_user";
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub accept_invalid_certs: bool,
    /// Status a login must return to count as successful.
    pub success_status: u16,
}

impl Default for RestSettings {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:28100".into(),
            timeout_secs: 30,
            accept_invalid_certs: true,
            success_status: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Settings {
    pub endpoint: String,
    pub region: String,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            endpoint: "https://s3.seagate.com".into(),
            region: "us-east-1".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub delete_account_timeout_secs: u64,
    pub interval_secs: u64,
}

impl PollingSettings {
    pub fn delete_account_timeout(&self) -> Duration {
        Duration::from_secs(self.delete_account_timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            delete_account_timeout_secs: 25,
            interval_secs: 1,
        }
    }
}

/// Per-client view of the cluster under test: endpoints, known identities
/// and expected-response fixtures.
///
/// Every [`RestClient`](crate::client::RestClient) owns its own copy, so a
/// test that registers a freshly created user only affects itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub rest: RestSettings,
    pub endpoints: BTreeMap<String, String>,
    pub identities: BTreeMap<String, Credentials>,
    pub login_headers: BTreeMap<String, String>,
    pub fixtures: BTreeMap<String, serde_json::Value>,
    pub s3: S3Settings,
    pub polling: PollingSettings,
    pub log_level: String,
}

fn default_endpoints() -> BTreeMap<String, String> {
    [
        (keys::LOGIN, "/api/v1/login"),
        (keys::S3_ACCOUNTS, "/api/v1/s3_accounts"),
        (keys::IAM_USERS, "/api/v1/iam_users"),
        (keys::BUCKETS, "/api/v1/s3/bucket"),
        (keys::BUCKET_POLICY, "/api/v1/s3/bucket_policy"),
        (keys::CSM_USERS, "/api/v1/csm/users"),
        (keys::AUDIT_LOGS_SHOW, "/api/v1/auditlogs/show"),
        (keys::AUDIT_LOGS_DOWNLOAD, "/api/v1/auditlogs/download"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_login_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())])
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rest: RestSettings::default(),
            endpoints: default_endpoints(),
            identities: BTreeMap::from([(
                keys::ADMIN_IDENTITY.to_string(),
                Credentials::new("admin", "Seagate@1"),
            )]),
            login_headers: default_login_headers(),
            fixtures: BTreeMap::new(),
            s3: S3Settings::default(),
            polling: PollingSettings::default(),
            log_level: "info".into(),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    /// Read a TOML or JSON (by extension) config file, fill in default
    /// endpoints it does not mention, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CtError::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let mut config = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
        .map_err(|e| CtError::Config(format!("failed to parse '{}': {}", path.display(), e)))?;
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| CtError::Config(e.to_string()))?;
        Ok(config.with_defaults())
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| CtError::Config(e.to_string()))?;
        Ok(config.with_defaults())
    }

    fn with_defaults(mut self) -> Self {
        for (key, value) in default_endpoints() {
            self.endpoints.entry(key).or_insert(value);
        }
        if self.login_headers.is_empty() {
            self.login_headers = default_login_headers();
        }
        self
    }

    /// Overlay `CSMREST_*` variables resolved through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("CSMREST_BASE_URL") {
            self.rest.base_url = url;
        }
        if let Some(endpoint) = lookup("CSMREST_S3_ENDPOINT") {
            self.s3.endpoint = endpoint;
        }
        if let Some(level) = lookup("CSMREST_LOG_LEVEL") {
            self.log_level = level;
        }
        let user = lookup("CSMREST_ADMIN_USER");
        let password = lookup("CSMREST_ADMIN_PASSWORD");
        if user.is_some() || password.is_some() {
            let admin = self
                .identities
                .entry(keys::ADMIN_IDENTITY.to_string())
                .or_insert_with(|| Credentials::new("admin", ""));
            if let Some(user) = user {
                admin.username = user;
            }
            if let Some(password) = password {
                admin.password = password;
            }
        }
    }

    pub fn endpoint(&self, key: &str) -> Result<&str> {
        self.endpoints
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| CtError::MissingConfig(key.to_string()))
    }

    pub fn identity(&self, name: &str) -> Result<&Credentials> {
        self.identities
            .get(name)
            .ok_or_else(|| CtError::MissingConfig(name.to_string()))
    }

    /// Make a newly created user available to later `login_as` calls.
    pub fn register_identity(&mut self, name: impl Into<String>, credentials: Credentials) {
        let name = name.into();
        tracing::debug!(identity = %name, username = %credentials.username, "Registered identity");
        self.identities.insert(name, credentials);
    }

    pub fn fixture(&self, name: &str) -> Result<&serde_json::Value> {
        self.fixtures
            .get(name)
            .ok_or_else(|| CtError::MissingConfig(name.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.rest.timeout_secs)
    }
}
