//! FriendGrid command line runner.
//!
//! ## Commands
//!
//! - `describe` - Print the node and credential type descriptions
//! - `test-credential` - Check the configured API key against SendGrid
//! - `run` - Create one contact per item of a JSON array file
//!
//! The API key is read from `FRIENDGRID_API_KEY` (a `.env` file is honoured).

mod config;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use friendgrid_core::{
    CredentialTypeRegistry, DecryptedCredentialData, HttpRequestHelper, MemoryCredentialStore,
    NodeExecutorRegistry, RequestHelper,
};
use friendgrid_nodes::{friend_grid_description, FRIEND_GRID, FRIEND_GRID_API};
use friendgrid_workflow::{
    ExecutionError, Node, NodeExecutionData, NodeParameterValue, NodeTypeDescription,
};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "friendgrid", version, about = "Create SendGrid marketing contacts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print node and credential descriptions as JSON
    Describe,
    /// Test the configured API key
    TestCredential,
    /// Create a contact for every item in a JSON array file
    Run {
        /// Path to a JSON array of item objects
        #[arg(long)]
        items: PathBuf,
        /// Email value or expression, e.g. `={{ $json.email }}`
        #[arg(long, default_value = "={{ $json.email }}")]
        email: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
}

struct Runtime {
    nodes: NodeExecutorRegistry,
    credential_types: Arc<CredentialTypeRegistry>,
    helper: Arc<HttpRequestHelper>,
}

impl Runtime {
    async fn new(config: &Config) -> Result<Self> {
        let mut nodes = NodeExecutorRegistry::new();
        let mut credential_types = CredentialTypeRegistry::new();
        friendgrid_nodes::register(&mut nodes, &mut credential_types);
        let credential_types = Arc::new(credential_types);

        let store = MemoryCredentialStore::new();
        store
            .insert(
                FRIEND_GRID_API,
                DecryptedCredentialData::from_value(json!({ "apiKey": config.api_key })),
            )
            .await;

        let helper = HttpRequestHelper::new(
            &config.runtime(),
            credential_types.clone(),
            Arc::new(store),
        )
        .context("failed to build HTTP client")?;

        Ok(Self {
            nodes,
            credential_types,
            helper: Arc::new(helper),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "friendgrid=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();
    let cli = Cli::parse();
    let runtime = Runtime::new(&config).await?;

    match cli.command {
        Command::Describe => describe(&runtime),
        Command::TestCredential => test_credential(&runtime).await,
        Command::Run {
            items,
            email,
            first_name,
            last_name,
        } => {
            let node = contact_node(&friend_grid_description(), email, first_name, last_name);
            run(&runtime, &node, &items).await
        }
    }
}

fn describe(runtime: &Runtime) -> Result<()> {
    let output = json!({
        "nodes": runtime.nodes.descriptions(),
        "credentials": runtime.credential_types.descriptions(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn test_credential(runtime: &Runtime) -> Result<()> {
    let (valid, line) = check_credential(runtime.helper.as_ref()).await?;
    println!("{line}");
    if !valid {
        bail!("credential test failed");
    }
    Ok(())
}

/// Run the `friendGridApi` test request and render the outcome as one line.
async fn check_credential(helper: &dyn RequestHelper) -> Result<(bool, String)> {
    let result = helper.test_credential(FRIEND_GRID_API).await?;
    Ok(if result.is_ok() {
        (true, "credential valid".to_string())
    } else {
        (false, format!("credential invalid: {}", result.message))
    })
}

async fn run(runtime: &Runtime, node: &Node, items_path: &Path) -> Result<()> {
    let items = load_items(items_path)?;
    info!(items = items.len(), "creating contacts");

    match runtime.nodes.run_node(node, items, runtime.helper.clone()).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            let report = ExecutionError::from(&e);
            println!("{}", serde_json::to_string_pretty(&json!({ "error": report }))?);
            bail!("contact creation failed: {report}");
        }
    }
}

/// Build a `contact`/`create` node from command line values, on top of the
/// node type's declared defaults.
fn contact_node(
    description: &NodeTypeDescription,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
) -> Node {
    let mut additional_fields = HashMap::new();
    if let Some(first_name) = first_name {
        additional_fields.insert("firstName".to_string(), NodeParameterValue::String(first_name));
    }
    if let Some(last_name) = last_name {
        additional_fields.insert("lastName".to_string(), NodeParameterValue::String(last_name));
    }

    let mut node = Node::new(description.defaults.name.clone(), FRIEND_GRID);
    node.parameters = description.default_parameters();
    node.with_parameter("email", NodeParameterValue::String(email))
        .with_parameter("additionalFields", NodeParameterValue::Object(additional_fields))
}

fn load_items(path: &Path) -> Result<Vec<NodeExecutionData>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_items(&raw).with_context(|| format!("invalid items file {}", path.display()))
}

fn parse_items(raw: &str) -> Result<Vec<NodeExecutionData>> {
    let values: Vec<Value> = serde_json::from_str(raw).context("expected a JSON array")?;
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            NodeExecutionData::from_json_value(value)
                .with_context(|| format!("item {index} is not a JSON object"))
        })
        .collect()
}
