//! Invocation of third-party S3 clients (s3cmd, minio `mc`, s3fs, the
//! jclient/jcloudclient jars). Only the command lines are assembled here;
//! their grammar belongs to the tools.

use crate::error::{CtError, Result};
use std::path::Path;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    secrets: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Argument whose value must not show up in logs.
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        let arg = arg.into();
        self.secrets.push(arg.clone());
        self.args.push(arg);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn argv(&self) -> &[String] {
        &self.args
    }

    /// Command line with secret arguments masked.
    pub fn display(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| {
                if self.secrets.contains(a) {
                    "********".to_string()
                } else {
                    a.clone()
                }
            }))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub async fn run(&self) -> Result<ToolOutput> {
        tracing::info!(command = %self.display(), "Running external tool");
        let output = Command::new(&self.program)
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .output()
            .await
            .map_err(|e| CtError::Tool {
                program: self.program.clone(),
                message: e.to_string(),
            })?;
        let result = ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(
            program = %self.program,
            status = ?result.status,
            stderr = %result.stderr,
            "External tool finished"
        );
        Ok(result)
    }
}

/// `s3cmd` against a path-style endpoint with explicit keys.
pub fn s3cmd(host: &str, access_key: &str, secret_key: &str) -> ToolCommand {
    ToolCommand::new("s3cmd")
        .arg(format!("--access_key={}", access_key))
        .secret_arg(format!("--secret_key={}", secret_key))
        .arg(format!("--host={}", host))
        .arg(format!("--host-bucket={}", host))
        .arg("--no-check-certificate")
}

/// `mc alias set` registering the cluster under `alias`.
pub fn mc_alias_set(alias: &str, endpoint: &str, access_key: &str, secret_key: &str) -> ToolCommand {
    ToolCommand::new("mc")
        .args(["--insecure", "alias", "set", alias, endpoint, access_key])
        .secret_arg(secret_key)
}

pub fn mc<I, S>(args: I) -> ToolCommand
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ToolCommand::new("mc").arg("--insecure").args(args)
}

/// Mount `bucket` at `mountpoint` with s3fs, reading keys from `passwd_file`.
pub fn s3fs_mount(bucket: &str, mountpoint: &Path, passwd_file: &Path, url: &str) -> ToolCommand {
    ToolCommand::new("s3fs")
        .arg(bucket)
        .arg(mountpoint.display().to_string())
        .args([
            "-o".to_string(),
            format!("passwd_file={}", passwd_file.display()),
            "-o".to_string(),
            format!("url={}", url),
            "-o".to_string(),
            "use_path_request_style".to_string(),
        ])
}

/// `java -jar <jar> <args> --access_key .. --secret_key ..` for the
/// jclient/jcloudclient jars.
pub fn java_client<I, S>(jar: &Path, args: I, access_key: &str, secret_key: &str) -> ToolCommand
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ToolCommand::new("java")
        .arg("-jar")
        .arg(jar.display().to_string())
        .args(args)
        .args(["--access_key", access_key, "--secret_key"])
        .secret_arg(secret_key)
}
