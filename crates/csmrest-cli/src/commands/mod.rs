use clap::ValueEnum;
use csmrest_core::csm::{AuditComponent, CsmRole, PolicyPayload, SortDir};
use csmrest_core::error::Result;
use reqwest::Response;

pub mod audit_log;
pub mod bucket;
pub mod bucket_policy;
pub mod csm_user;
pub mod iam_user;
pub mod s3;
pub mod s3_account;
pub mod session;

pub fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", err);
    std::process::exit(1);
}

/// Hand back a 2xx response; print anything else and exit.
pub async fn expect_success(result: Result<Response>) -> Response {
    match result {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            eprintln!("Error: server returned {}", r.status());
            if let Ok(body) = r.text().await {
                if !body.is_empty() {
                    eprintln!("{}", body);
                }
            }
            std::process::exit(1);
        }
        Err(e) => fail(e),
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Manage,
    Monitor,
}

impl From<RoleArg> for CsmRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Manage => CsmRole::Manage,
            RoleArg::Monitor => CsmRole::Monitor,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SortDirArg {
    Asc,
    Desc,
}

impl From<SortDirArg> for SortDir {
    fn from(dir: SortDirArg) -> Self {
        match dir {
            SortDirArg::Asc => SortDir::Asc,
            SortDirArg::Desc => SortDir::Desc,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ComponentArg {
    Csm,
    S3,
}

impl From<ComponentArg> for AuditComponent {
    fn from(component: ComponentArg) -> Self {
        match component {
            ComponentArg::Csm => AuditComponent::Csm,
            ComponentArg::S3 => AuditComponent::S3,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PolicyPreset {
    AllowGet,
    DenyAll,
}

impl From<PolicyPreset> for PolicyPayload {
    fn from(preset: PolicyPreset) -> Self {
        match preset {
            PolicyPreset::AllowGet => PolicyPayload::AllowGetObject,
            PolicyPreset::DenyAll => PolicyPayload::DenyAll,
        }
    }
}
