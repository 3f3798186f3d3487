use super::{expect_success, fail};
use csmrest_core::csm::BucketHelper;
use csmrest_core::csm::bucket::NewBucket;
use csmrest_core::{Login, RestClient};
use serde::Deserialize;
use tabled::{Table, Tabled};

#[derive(Tabled, Deserialize)]
struct BucketRow {
    #[tabled(rename = "Name")]
    name: String,
}

pub async fn create(rest: &RestClient, login: &Login, name: &str) {
    let helper = BucketHelper::new(rest.clone());
    let bucket = NewBucket {
        bucket_name: Some(name.to_string()),
    };
    expect_success(helper.create_bucket(login, &bucket).await).await;
    println!("Bucket '{}' created.", name);
}

pub async fn list(rest: &RestClient, login: &Login) {
    let helper = BucketHelper::new(rest.clone());
    let buckets = helper
        .list_all_created_buckets(login)
        .await
        .unwrap_or_else(|e| fail(e));
    let rows: Vec<BucketRow> = buckets
        .into_iter()
        .filter_map(|b| serde_json::from_value(b).ok())
        .collect();
    if rows.is_empty() {
        println!("No buckets found.");
        return;
    }
    println!("{}", Table::new(rows));
}

pub async fn delete(rest: &RestClient, login: &Login, name: &str) {
    let helper = BucketHelper::new(rest.clone());
    expect_success(helper.delete_bucket(login, name).await).await;
    println!("Bucket '{}' deleted.", name);
}
