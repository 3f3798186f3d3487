use super::{expect_success, fail};
use csmrest_core::csm::s3_account::{DEFAULT_PASSWORD, EditS3Account, NewS3Account, S3AccountInfo};
use csmrest_core::csm::{S3AccountHelper, S3AccountPayload};
use csmrest_core::{Login, RestClient, naming};
use serde::Deserialize;
use tabled::{Table, Tabled};

#[derive(Tabled, Deserialize)]
struct AccountRow {
    #[tabled(rename = "Name")]
    account_name: String,
    #[tabled(rename = "Email")]
    #[serde(default)]
    account_email: String,
}

#[derive(Tabled)]
struct CreatedRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Access Key")]
    access_key: String,
    #[tabled(rename = "Secret Key")]
    secret_key: String,
}

pub async fn create(
    rest: &RestClient,
    login: &Login,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) {
    let account = match name {
        Some(name) => NewS3Account {
            account_email: Some(email.unwrap_or_else(|| naming::email_for(&name))),
            account_name: name,
            password: password.unwrap_or_else(|| DEFAULT_PASSWORD.to_string()),
        },
        None => {
            let mut account = S3AccountPayload::Valid.build();
            if let Some(email) = email {
                account.account_email = Some(email);
            }
            if let Some(password) = password {
                account.password = password;
            }
            account
        }
    };
    let helper = S3AccountHelper::new(rest.clone());
    let response = expect_success(helper.create_s3_account(login, &account).await).await;
    let info: S3AccountInfo = response.json().await.unwrap_or_else(|e| fail(e));
    let row = CreatedRow {
        name: info.account_name,
        email: info.account_email,
        access_key: info.access_key,
        secret_key: info.secret_key,
    };
    println!("{}", Table::new([row]));
}

pub async fn list(rest: &RestClient, login: &Login) {
    let helper = S3AccountHelper::new(rest.clone());
    let accounts = helper.list_account_entries(login).await.unwrap_or_else(|e| fail(e));
    if accounts.is_empty() {
        println!("No S3 accounts found.");
        return;
    }
    let rows: Vec<AccountRow> = accounts
        .into_iter()
        .filter_map(|a| serde_json::from_value(a).ok())
        .collect();
    println!("{}", Table::new(rows));
}

pub async fn edit(
    rest: &RestClient,
    login: &Login,
    name: &str,
    password: Option<String>,
    reset_access_key: bool,
) {
    let edit = EditS3Account {
        password,
        reset_access_key: reset_access_key.then_some(true),
    };
    let helper = S3AccountHelper::new(rest.clone());
    let response = expect_success(helper.edit_s3_account(login, name, &edit).await).await;
    let body: serde_json::Value = response.json().await.unwrap_or_default();
    match body.get("access_key").and_then(|v| v.as_str()) {
        Some(key) if reset_access_key => println!("Account '{}' updated, new access key {}.", name, key),
        _ => println!("Account '{}' updated.", name),
    }
}

pub async fn delete(rest: &RestClient, login: &Login, name: &str) {
    let helper = S3AccountHelper::new(rest.clone());
    expect_success(helper.delete_s3_account(login, name).await).await;
    println!("Account '{}' deleted.", name);
}
