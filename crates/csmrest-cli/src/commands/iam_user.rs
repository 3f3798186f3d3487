use super::{expect_success, fail};
use csmrest_core::csm::IamUserHelper;
use csmrest_core::csm::iam_user::NewIamUser;
use csmrest_core::{Login, RestClient};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "User Name")]
    name: String,
}

pub async fn create(rest: &RestClient, login: &Login, name: &str, password: &str, require_reset: bool) {
    let user = NewIamUser {
        user_name: name.to_string(),
        password: Some(password.to_string()),
        require_reset,
    };
    let helper = IamUserHelper::new(rest.clone());
    expect_success(helper.create_iam_user(login, &user).await).await;
    println!("IAM user '{}' created.", name);
}

pub async fn list(rest: &RestClient, login: &Login) {
    let helper = IamUserHelper::new(rest.clone());
    let names = helper.list_user_names(login).await.unwrap_or_else(|e| fail(e));
    if names.is_empty() {
        println!("No IAM users found.");
        return;
    }
    let rows: Vec<UserRow> = names.into_iter().map(|name| UserRow { name }).collect();
    println!("{}", Table::new(rows));
}

pub async fn delete(rest: &RestClient, login: &Login, name: &str) {
    let helper = IamUserHelper::new(rest.clone());
    expect_success(helper.delete_iam_user(login, name).await).await;
    println!("IAM user '{}' deleted.", name);
}
