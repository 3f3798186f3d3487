use super::{PolicyPreset, expect_success, fail};
use csmrest_core::csm::{BucketPolicyHelper, PolicyPayload};
use csmrest_core::{Login, RestClient};
use serde_json::Value;
use std::path::PathBuf;

pub async fn put(
    rest: &RestClient,
    login: &Login,
    bucket: &str,
    file: Option<PathBuf>,
    preset: Option<PolicyPreset>,
) {
    let policy: Value = match (file, preset) {
        (Some(path), _) => {
            let content = std::fs::read_to_string(&path).unwrap_or_else(|e| fail(e));
            serde_json::from_str(&content).unwrap_or_else(|e| fail(e))
        }
        (None, Some(preset)) => PolicyPayload::from(preset).build(bucket),
        (None, None) => fail("either --file or --preset is required"),
    };
    let helper = BucketPolicyHelper::new(rest.clone());
    expect_success(helper.put_bucket_policy(login, bucket, &policy).await).await;
    println!("Policy of '{}' updated.", bucket);
}

pub async fn get(rest: &RestClient, login: &Login, bucket: &str) {
    let helper = BucketPolicyHelper::new(rest.clone());
    let response = expect_success(helper.get_bucket_policy(login, bucket).await).await;
    let policy: Value = response.json().await.unwrap_or_else(|e| fail(e));
    match serde_json::to_string_pretty(&policy) {
        Ok(text) => println!("{}", text),
        Err(e) => fail(e),
    }
}

pub async fn delete(rest: &RestClient, login: &Login, bucket: &str) {
    let helper = BucketPolicyHelper::new(rest.clone());
    expect_success(helper.delete_bucket_policy(login, bucket).await).await;
    println!("Policy of '{}' deleted.", bucket);
}
