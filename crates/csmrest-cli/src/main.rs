use clap::{Parser, Subcommand};
use csmrest_core::config::keys;
use csmrest_core::{Identity, Login, RestClient, SessionConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ComponentArg, PolicyPreset, RoleArg, SortDirArg, fail};

#[derive(Parser)]
#[command(name = "csmrest", about = "CSM management REST client")]
struct Cli {
    /// Session config file, TOML or JSON by extension
    #[arg(long, env = "CSMREST_CONFIG")]
    config: Option<PathBuf>,

    /// Management API base URL (overrides the config file)
    #[arg(long)]
    base_url: Option<String>,

    /// Configured identity to log in as
    #[arg(long, default_value = keys::ADMIN_IDENTITY)]
    login_as: String,

    /// Log in with these credentials instead of a configured identity
    #[arg(long, env = "CSMREST_USERNAME", requires = "password")]
    username: Option<String>,

    #[arg(long, env = "CSMREST_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and report whether a token was issued
    Login,
    /// S3 account management
    S3Account {
        #[command(subcommand)]
        action: S3AccountAction,
    },
    /// IAM users of the logged-in S3 account
    IamUser {
        #[command(subcommand)]
        action: IamUserAction,
    },
    /// Buckets of the logged-in S3 account
    Bucket {
        #[command(subcommand)]
        action: BucketAction,
    },
    /// Bucket policy management
    BucketPolicy {
        #[command(subcommand)]
        action: BucketPolicyAction,
    },
    /// CSM user management
    CsmUser {
        #[command(subcommand)]
        action: CsmUserAction,
    },
    /// Audit log retrieval
    AuditLog {
        #[command(subcommand)]
        action: AuditLogAction,
    },
    /// Signed S3 data-path requests
    S3 {
        /// Access key of the account to sign with
        #[arg(long, env = "CSMREST_ACCESS_KEY")]
        access_key: String,
        #[arg(long, env = "CSMREST_SECRET_KEY", hide_env_values = true)]
        secret_key: String,
        #[command(subcommand)]
        action: S3Action,
    },
}

#[derive(Subcommand)]
enum S3AccountAction {
    /// Create an account; a unique name is generated when none is given
    Create {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        account_password: Option<String>,
    },
    /// List all accounts
    List,
    /// Change an account's password or regenerate its access key
    Edit {
        name: String,
        #[arg(long)]
        account_password: Option<String>,
        #[arg(long)]
        reset_access_key: bool,
    },
    /// Delete an account
    Delete { name: String },
}

#[derive(Subcommand)]
enum IamUserAction {
    /// Create an IAM user
    Create {
        name: String,
        #[arg(long, default_value = "Seagate@1")]
        user_password: String,
        #[arg(long)]
        require_reset: bool,
    },
    /// List IAM users
    List,
    /// Delete an IAM user
    Delete { name: String },
}

#[derive(Subcommand)]
enum BucketAction {
    /// Create a new bucket
    Create { name: String },
    /// List all buckets
    List,
    /// Delete a bucket
    Delete { name: String },
}

#[derive(Subcommand)]
enum BucketPolicyAction {
    /// Attach a policy from a JSON file or a preset
    Put {
        bucket: String,
        #[arg(long, conflicts_with = "preset", required_unless_present = "preset")]
        file: Option<PathBuf>,
        #[arg(long, value_enum)]
        preset: Option<PolicyPreset>,
    },
    /// Print the attached policy
    Get { bucket: String },
    /// Remove the attached policy
    Delete { bucket: String },
}

#[derive(Subcommand)]
enum CsmUserAction {
    /// Create a CSM user
    Create {
        username: String,
        #[arg(long, value_enum)]
        role: RoleArg,
        #[arg(long, default_value = "Seagate@1")]
        user_password: String,
    },
    /// List CSM users
    List {
        #[arg(long)]
        offset: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        sort_by: Option<String>,
        #[arg(long, value_enum)]
        dir: Option<SortDirArg>,
    },
    /// Show one user
    Get { id: String },
    /// Change a user's role or password
    Edit {
        id: String,
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
        #[arg(long)]
        user_password: Option<String>,
        #[arg(long)]
        current_password: Option<String>,
    },
    /// Delete a user
    Delete { id: String },
}

#[derive(Subcommand)]
enum AuditLogAction {
    /// Print audit entries of the last hours
    Show {
        #[arg(value_enum)]
        component: ComponentArg,
        #[arg(long, default_value_t = 1)]
        hours: i64,
    },
    /// Download audit entries of the last hours
    Download {
        #[arg(value_enum)]
        component: ComponentArg,
        #[arg(long, default_value_t = 1)]
        hours: i64,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum S3Action {
    /// List buckets owned by the signing account
    Ls,
    /// Make a bucket
    Mb { bucket: String },
    /// Remove an empty bucket
    Rb { bucket: String },
    /// Upload a file
    Put {
        bucket: String,
        key: String,
        file: PathBuf,
    },
    /// Download an object
    Get {
        bucket: String,
        key: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Delete an object
    Rm { bucket: String, key: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => SessionConfig::load(path).unwrap_or_else(|e| fail(e)),
        None => SessionConfig::from_env(),
    };
    if let Some(base_url) = cli.base_url {
        config.rest.base_url = base_url;
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let login = match (cli.username, cli.password) {
        (Some(username), Some(password)) => {
            Login::as_identity(Identity::explicit(username, password))
        }
        _ => Login::as_identity(cli.login_as.as_str()),
    };
    let rest = RestClient::new(config).unwrap_or_else(|e| fail(e));

    match cli.command {
        Commands::Login => commands::session::login(&rest, &login).await,
        Commands::S3Account { action } => match action {
            S3AccountAction::Create {
                name,
                email,
                account_password,
            } => commands::s3_account::create(&rest, &login, name, email, account_password).await,
            S3AccountAction::List => commands::s3_account::list(&rest, &login).await,
            S3AccountAction::Edit {
                name,
                account_password,
                reset_access_key,
            } => {
                commands::s3_account::edit(&rest, &login, &name, account_password, reset_access_key)
                    .await
            }
            S3AccountAction::Delete { name } => {
                commands::s3_account::delete(&rest, &login, &name).await
            }
        },
        Commands::IamUser { action } => match action {
            IamUserAction::Create {
                name,
                user_password,
                require_reset,
            } => {
                commands::iam_user::create(&rest, &login, &name, &user_password, require_reset)
                    .await
            }
            IamUserAction::List => commands::iam_user::list(&rest, &login).await,
            IamUserAction::Delete { name } => commands::iam_user::delete(&rest, &login, &name).await,
        },
        Commands::Bucket { action } => match action {
            BucketAction::Create { name } => commands::bucket::create(&rest, &login, &name).await,
            BucketAction::List => commands::bucket::list(&rest, &login).await,
            BucketAction::Delete { name } => commands::bucket::delete(&rest, &login, &name).await,
        },
        Commands::BucketPolicy { action } => match action {
            BucketPolicyAction::Put {
                bucket,
                file,
                preset,
            } => commands::bucket_policy::put(&rest, &login, &bucket, file, preset).await,
            BucketPolicyAction::Get { bucket } => {
                commands::bucket_policy::get(&rest, &login, &bucket).await
            }
            BucketPolicyAction::Delete { bucket } => {
                commands::bucket_policy::delete(&rest, &login, &bucket).await
            }
        },
        Commands::CsmUser { action } => match action {
            CsmUserAction::Create {
                username,
                role,
                user_password,
            } => commands::csm_user::create(&rest, &login, &username, role, &user_password).await,
            CsmUserAction::List {
                offset,
                limit,
                sort_by,
                dir,
            } => {
                let query = commands::csm_user::query(offset, limit, sort_by, dir);
                commands::csm_user::list(&rest, &login, &query).await
            }
            CsmUserAction::Get { id } => commands::csm_user::get(&rest, &login, &id).await,
            CsmUserAction::Edit {
                id,
                role,
                user_password,
                current_password,
            } => {
                commands::csm_user::edit(&rest, &login, &id, role, user_password, current_password)
                    .await
            }
            CsmUserAction::Delete { id } => commands::csm_user::delete(&rest, &login, &id).await,
        },
        Commands::AuditLog { action } => match action {
            AuditLogAction::Show { component, hours } => {
                commands::audit_log::show(&rest, &login, component, hours).await
            }
            AuditLogAction::Download {
                component,
                hours,
                output,
            } => commands::audit_log::download(&rest, &login, component, hours, output).await,
        },
        Commands::S3 {
            access_key,
            secret_key,
            action,
        } => {
            let client = commands::s3::client(rest.config(), &access_key, &secret_key);
            match action {
                S3Action::Ls => commands::s3::list_buckets(&client).await,
                S3Action::Mb { bucket } => commands::s3::make_bucket(&client, &bucket).await,
                S3Action::Rb { bucket } => commands::s3::remove_bucket(&client, &bucket).await,
                S3Action::Put { bucket, key, file } => {
                    commands::s3::put(&client, &bucket, &key, &file).await
                }
                S3Action::Get {
                    bucket,
                    key,
                    output,
                } => commands::s3::get(&client, &bucket, &key, output).await,
                S3Action::Rm { bucket, key } => commands::s3::remove(&client, &bucket, &key).await,
            }
        }
    }
}
