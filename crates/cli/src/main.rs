//! Green Scheduler Extender CLI
//!
//! A command-line tool for preparing nodes for renewable-aware scheduling
//! and for querying a running extender by hand.

mod client;
mod cluster;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{extender, nodes};
use extender_lib::filter::{DEFAULT_LABEL_KEY, DEFAULT_LABEL_VALUE};

/// Green Scheduler Extender CLI
#[derive(Parser)]
#[command(name = "gsx")]
#[command(author, version, about = "CLI for the green scheduler extender", long_about = None)]
pub struct Cli {
    /// Extender base URL (can also be set via GSX_EXTENDER_URL env var)
    #[arg(long, env = "GSX_EXTENDER_URL", default_value = "http://localhost:8080")]
    pub extender_url: String,

    /// Path to kubeconfig file (uses default if not specified)
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect and prepare cluster nodes
    #[command(subcommand)]
    Nodes(NodesCommands),

    /// Ask the extender to score nodes for a pod
    Prioritize(RequestArgs),

    /// Ask the extender which nodes a pod may land on
    Filter(RequestArgs),

    /// Show the extender's version
    Version,
}

#[derive(Subcommand)]
pub enum NodesCommands {
    /// Add the scheduling label to nodes
    Label {
        /// Label key
        #[arg(long, default_value = DEFAULT_LABEL_KEY)]
        key: String,

        /// Label value
        #[arg(long, default_value = DEFAULT_LABEL_VALUE)]
        value: String,

        /// Only label these nodes (all nodes if omitted)
        #[arg(long = "node")]
        nodes: Vec<String>,
    },

    /// Set renewable telemetry annotations on a node
    Annotate {
        /// Node name
        node: String,

        /// Renewable shares per window, e.g. "0.4;0.6"
        #[arg(long)]
        renewables: Option<String>,

        /// Nominal power in watts
        #[arg(long)]
        rated_power: Option<f64>,

        /// Current CPU usage quantity, for the annotation metrics backend
        #[arg(long)]
        cpu_usage: Option<String>,
    },

    /// List nodes with their scheduling label and telemetry
    Show {
        /// Label key to display
        #[arg(long, default_value = DEFAULT_LABEL_KEY)]
        key: String,
    },
}

#[derive(clap::Args)]
pub struct RequestArgs {
    /// Pod to schedule (format: namespace/name or just name)
    #[arg(long, default_value = "default/gsx-probe")]
    pub pod: String,

    /// Read the extender request from a JSON file instead of the cluster
    #[arg(long)]
    pub file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let kubeconfig = cli.kubeconfig.as_deref();

    match cli.command {
        Commands::Nodes(nodes_cmd) => {
            let kube_client = cluster::connect(kubeconfig).await?;
            match nodes_cmd {
                NodesCommands::Label { key, value, nodes } => {
                    nodes::label_nodes(&kube_client, &key, &value, &nodes, cli.format).await?;
                }
                NodesCommands::Annotate {
                    node,
                    renewables,
                    rated_power,
                    cpu_usage,
                } => {
                    let telemetry = nodes::TelemetryUpdate {
                        renewables,
                        rated_power,
                        cpu_usage,
                    };
                    nodes::annotate_node(&kube_client, &node, telemetry, cli.format).await?;
                }
                NodesCommands::Show { key } => {
                    nodes::show_nodes(&kube_client, &key, cli.format).await?;
                }
            }
        }
        Commands::Prioritize(request) => {
            let client = client::ExtenderClient::new(&cli.extender_url)?;
            let args = cluster::extender_args(kubeconfig, &request.pod, request.file.as_deref()).await?;
            extender::prioritize(&client, &args, cli.format).await?;
        }
        Commands::Filter(request) => {
            let client = client::ExtenderClient::new(&cli.extender_url)?;
            let args = cluster::extender_args(kubeconfig, &request.pod, request.file.as_deref()).await?;
            extender::filter(&client, &args, cli.format).await?;
        }
        Commands::Version => {
            let client = client::ExtenderClient::new(&cli.extender_url)?;
            extender::version(&client).await?;
        }
    }

    Ok(())
}
