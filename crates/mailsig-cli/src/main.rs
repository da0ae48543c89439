use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use mailsig::{
    Authentication, Config, GoogleClient, MailSignatureNode, Operation, Resource,
    ServiceAccountCredentials, SignatureApi, StaticCredentialStore,
};

#[derive(Parser, Debug)]
#[command(name = "mailsig", version, about = "Set Gmail send-as signatures")]
struct Args {
    /// Config file (default: ~/.mailsig/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// oauth2 or service-account
    #[arg(long, global = true)]
    auth: Option<String>,

    /// Service account JSON key file
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    /// OAuth2 access token for the mailbox
    #[arg(long, global = true, env = "MAILSIG_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// User to impersonate with domain-wide delegation
    #[arg(long, global = true)]
    delegated_email: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Set the signature of a mailbox
    Set {
        #[arg(long)]
        email: String,
        #[arg(long)]
        signature: String,
    },
    /// Show the send-as settings of a mailbox
    Get {
        #[arg(long)]
        email: String,
    },
    /// Run an operation over a JSON array of items ({"email", "sigValue"})
    Batch {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "set")]
        operation: String,
        #[arg(long)]
        continue_on_fail: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(auth) = &args.auth {
        config.authentication = auth.parse()?;
    }
    if let Some(path) = &args.credentials {
        config.credentials_path = Some(path.clone());
    }
    if let Some(delegated) = &args.delegated_email {
        config.delegated_email = Some(delegated.clone());
    }

    let store = credential_store(&config, args.access_token.as_deref())?;
    let client = GoogleClient::with_store(&config, config.authentication, Arc::new(store))?;

    let (operation, items, continue_on_fail) = match &args.command {
        Command::Set { email, signature } => (
            Operation::Set,
            vec![json!({ "email": email, "sigValue": signature })],
            false,
        ),
        Command::Get { email } => (Operation::Get, vec![json!({ "email": email })], false),
        Command::Batch {
            input,
            operation,
            continue_on_fail,
        } => (operation.parse::<Operation>()?, read_items(input)?, *continue_on_fail),
    };

    debug!(
        "Running {:?} over {} item(s) with {:?}",
        operation,
        items.len(),
        config.authentication
    );

    let node = MailSignatureNode::new(SignatureApi::new(client), Resource::Signature, operation)
        .continue_on_fail(continue_on_fail);

    let output = match node.execute(&items).await {
        Ok(output) => output,
        Err(err) => {
            if let Some(description) = &err.description {
                error!("{}", description);
            }
            anyhow::bail!("{}", err.message);
        }
    };

    let rendered = match &args.command {
        Command::Batch { .. } => serde_json::to_string_pretty(&output)?,
        _ => {
            let records: Vec<&Value> = output.iter().map(|o| &o.json).collect();
            match records.as_slice() {
                [single] => serde_json::to_string_pretty(single)?,
                many => serde_json::to_string_pretty(many)?,
            }
        }
    };
    println!("{}", rendered);

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "mailsig=debug" } else { "mailsig=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn credential_store(
    config: &Config,
    access_token: Option<&str>,
) -> anyhow::Result<StaticCredentialStore> {
    let mut store = StaticCredentialStore::new();

    if let Some(token) = access_token {
        store = store.with_oauth2_token(token);
    }

    if let Some(path) = &config.credentials_path {
        let mut credentials = ServiceAccountCredentials::from_file(path)?;
        if let Some(delegated) = &config.delegated_email {
            credentials = credentials.with_delegated_email(delegated.clone());
        }
        store = store.with_service_account(credentials);
    } else if config.authentication == Authentication::ServiceAccount {
        anyhow::bail!("service account authentication needs --credentials or credentialsPath in config");
    }

    Ok(store)
}

fn read_items(path: &Path) -> anyhow::Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(match parsed {
        Value::Array(items) => items,
        single => vec![single],
    })
}
