use super::{RoleArg, SortDirArg, expect_success, fail};
use csmrest_core::csm::csm_user::{CsmUserInfo, EditCsmUser, NewCsmUser};
use csmrest_core::csm::{CsmRole, CsmUserHelper, ListQuery};
use csmrest_core::{Login, RestClient};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Roles")]
    roles: String,
}

impl From<CsmUserInfo> for UserRow {
    fn from(user: CsmUserInfo) -> Self {
        Self {
            id: user.id,
            username: user.username,
            roles: user
                .roles
                .iter()
                .map(CsmRole::as_str)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

pub fn query(
    offset: Option<u32>,
    limit: Option<u32>,
    sort_by: Option<String>,
    dir: Option<SortDirArg>,
) -> ListQuery {
    ListQuery {
        offset,
        limit,
        sort_by,
        sort_dir: dir.map(Into::into),
    }
}

pub async fn create(rest: &RestClient, login: &Login, username: &str, role: RoleArg, password: &str) {
    let user = NewCsmUser {
        username: username.to_string(),
        password: password.to_string(),
        roles: vec![role.into()],
        alert_notification: true,
    };
    let helper = CsmUserHelper::new(rest.clone());
    let response = expect_success(helper.create_csm_user(login, &user).await).await;
    let info: CsmUserInfo = response.json().await.unwrap_or_else(|e| fail(e));
    println!("{}", Table::new([UserRow::from(info)]));
}

pub async fn list(rest: &RestClient, login: &Login, query: &ListQuery) {
    let helper = CsmUserHelper::new(rest.clone());
    let users = helper
        .list_user_entries(login, query)
        .await
        .unwrap_or_else(|e| fail(e));
    let rows: Vec<UserRow> = users
        .into_iter()
        .filter_map(|u| serde_json::from_value::<CsmUserInfo>(u).ok())
        .map(UserRow::from)
        .collect();
    if rows.is_empty() {
        println!("No CSM users found.");
        return;
    }
    println!("{}", Table::new(rows));
}

pub async fn get(rest: &RestClient, login: &Login, id: &str) {
    let helper = CsmUserHelper::new(rest.clone());
    let response = expect_success(helper.get_csm_user(login, id).await).await;
    let info: CsmUserInfo = response.json().await.unwrap_or_else(|e| fail(e));
    println!("{}", Table::new([UserRow::from(info)]));
}

pub async fn edit(
    rest: &RestClient,
    login: &Login,
    id: &str,
    role: Option<RoleArg>,
    password: Option<String>,
    current_password: Option<String>,
) {
    let edit = EditCsmUser {
        roles: role.map(|r| vec![r.into()]),
        password,
        current_password,
    };
    let helper = CsmUserHelper::new(rest.clone());
    expect_success(helper.edit_csm_user(login, id, &edit).await).await;
    println!("User '{}' updated.", id);
}

pub async fn delete(rest: &RestClient, login: &Login, id: &str) {
    let helper = CsmUserHelper::new(rest.clone());
    expect_success(helper.delete_csm_user(login, id).await).await;
    println!("User '{}' deleted.", id);
}
