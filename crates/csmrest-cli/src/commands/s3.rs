use super::fail;
use csmrest_core::SessionConfig;
use csmrest_core::s3::{S3Client, Signer};
use std::io::Write;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct BucketRow {
    #[tabled(rename = "Name")]
    name: String,
}

pub fn client(config: &SessionConfig, access_key: &str, secret_key: &str) -> S3Client {
    let signer = Signer::new(access_key, secret_key, &config.s3.region);
    S3Client::from_config(config, signer).unwrap_or_else(|e| fail(e))
}

pub async fn list_buckets(client: &S3Client) {
    let names = client.list_buckets().await.unwrap_or_else(|e| fail(e));
    if names.is_empty() {
        println!("No buckets found.");
        return;
    }
    let rows: Vec<BucketRow> = names.into_iter().map(|name| BucketRow { name }).collect();
    println!("{}", Table::new(rows));
}

pub async fn make_bucket(client: &S3Client, bucket: &str) {
    client.create_bucket(bucket).await.unwrap_or_else(|e| fail(e));
    println!("Bucket 's3://{}' created.", bucket);
}

pub async fn remove_bucket(client: &S3Client, bucket: &str) {
    client.delete_bucket(bucket).await.unwrap_or_else(|e| fail(e));
    println!("Bucket 's3://{}' removed.", bucket);
}

pub async fn put(client: &S3Client, bucket: &str, key: &str, file: &Path) {
    let data = std::fs::read(file).unwrap_or_else(|e| fail(e));
    let etag = client
        .put_object(bucket, key, data)
        .await
        .unwrap_or_else(|e| fail(e));
    println!("Uploaded s3://{}/{} (etag {}).", bucket, key, etag);
}

pub async fn get(client: &S3Client, bucket: &str, key: &str, output: Option<PathBuf>) {
    let data = client.get_object(bucket, key).await.unwrap_or_else(|e| fail(e));
    match output {
        Some(path) => {
            std::fs::write(&path, &data).unwrap_or_else(|e| fail(e));
            println!("Wrote {} bytes to {}.", data.len(), path.display());
        }
        None => std::io::stdout().write_all(&data).unwrap_or_else(|e| fail(e)),
    }
}

pub async fn remove(client: &S3Client, bucket: &str, key: &str) {
    client.delete_object(bucket, key).await.unwrap_or_else(|e| fail(e));
    println!("Deleted s3://{}/{}.", bucket, key);
}
