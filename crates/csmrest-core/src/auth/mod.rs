pub mod session;

pub use session::Session;

use crate::config::{Credentials, SessionConfig, keys};
use crate::error::{CtError, Result};

/// Who a call logs in as: a name resolved through the session config, or
/// an explicit username/password pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Named(String),
    Explicit(Credentials),
}

impl Identity {
    pub fn named(name: impl Into<String>) -> Self {
        Identity::Named(name.into())
    }

    pub fn explicit(username: impl Into<String>, password: impl Into<String>) -> Self {
        Identity::Explicit(Credentials::new(username, password))
    }

    pub fn resolve(&self, config: &SessionConfig) -> Result<Credentials> {
        match self {
            Identity::Explicit(creds) => Ok(creds.clone()),
            Identity::Named(name) => config.identity(name).cloned().map_err(|_| {
                CtError::RequestConstruction(format!("identity '{}' is not configured", name))
            }),
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Identity::Named(keys::ADMIN_IDENTITY.to_string())
    }
}

impl From<&str> for Identity {
    fn from(name: &str) -> Self {
        Identity::Named(name.to_string())
    }
}

impl From<Credentials> for Identity {
    fn from(creds: Credentials) -> Self {
        Identity::Explicit(creds)
    }
}

/// Login options for one authenticated call.
///
/// With `authorized` set, a failed login aborts the call with
/// [`CtError::Authentication`]. Without it the call proceeds with whatever
/// token (if any) the login produced, which is how negative paths are
/// exercised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    pub identity: Identity,
    pub authorized: bool,
}

impl Login {
    pub fn as_identity(identity: impl Into<Identity>) -> Self {
        Self {
            identity: identity.into(),
            authorized: true,
        }
    }

    pub fn unauthorized(identity: impl Into<Identity>) -> Self {
        Self {
            identity: identity.into(),
            authorized: false,
        }
    }
}

impl Default for Login {
    fn default() -> Self {
        Self {
            identity: Identity::default(),
            authorized: true,
        }
    }
}
