pub mod auth;
pub mod client;
pub mod concurrency;
pub mod config;
pub mod csm;
pub mod error;
pub mod naming;
pub mod poll;
pub mod s3;
pub mod tools;
pub mod verify;

pub use auth::{Identity, Login, Session};
pub use client::{Method, RequestBody, RequestOptions, RestClient};
pub use config::{Credentials, SessionConfig};
pub use error::{CtError, ErrorCode};
pub use verify::Verdict;
