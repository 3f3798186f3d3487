use super::{ComponentArg, expect_success, fail};
use csmrest_core::csm::{AuditComponent, AuditLogHelper, AuditWindow};
use csmrest_core::{Login, RestClient};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;

pub async fn show(rest: &RestClient, login: &Login, component: ComponentArg, hours: i64) {
    let component = AuditComponent::from(component);
    let helper = AuditLogHelper::new(rest.clone());
    let response = expect_success(
        helper
            .show_audit_logs(login, component, AuditWindow::last_hours(hours))
            .await,
    )
    .await;
    let entries: Vec<Value> = response.json().await.unwrap_or_else(|e| fail(e));
    if entries.is_empty() {
        println!("No {} audit entries in the last {} hour(s).", component.as_str(), hours);
        return;
    }
    for entry in entries {
        println!("{}", entry);
    }
}

pub async fn download(
    rest: &RestClient,
    login: &Login,
    component: ComponentArg,
    hours: i64,
    output: Option<PathBuf>,
) {
    let component = AuditComponent::from(component);
    let helper = AuditLogHelper::new(rest.clone());
    let response = expect_success(
        helper
            .download_audit_logs(login, component, AuditWindow::last_hours(hours))
            .await,
    )
    .await;
    let body = response.bytes().await.unwrap_or_else(|e| fail(e));
    match output {
        Some(path) => {
            std::fs::write(&path, &body).unwrap_or_else(|e| fail(e));
            println!("Wrote {} bytes to {}.", body.len(), path.display());
        }
        None => std::io::stdout().write_all(&body).unwrap_or_else(|e| fail(e)),
    }
}
