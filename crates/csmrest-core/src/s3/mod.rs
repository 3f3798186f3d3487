//! Data-path access to the cluster under test, signed with the keys of an
//! S3 account created through the management API.

pub mod client;
pub mod sigv4;
pub mod xml;

pub use client::S3Client;
pub use sigv4::Signer;

use crate::config::SessionConfig;
use crate::csm::s3_account::S3AccountInfo;
use crate::error::Result;

/// Client for `account` against the configured S3 endpoint.
pub fn client_for(config: &SessionConfig, account: &S3AccountInfo) -> Result<S3Client> {
    let signer = Signer::new(&account.access_key, &account.secret_key, &config.s3.region);
    S3Client::from_config(config, signer)
}
