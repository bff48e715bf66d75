//! Kubernetes access and extender request assembly

use anyhow::{Context, Result};
use extender_lib::{ExtenderArgs, Node, NodeList, Pod};
use k8s_openapi::api::core::v1::Node as ClusterNode;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;

/// Connect using an explicit kubeconfig, or in-cluster / default config
pub async fn connect(kubeconfig: Option<&str>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path))?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("Invalid kubeconfig")?
        }
        None => kube::Config::infer()
            .await
            .context("Could not find a Kubernetes configuration")?,
    };

    Client::try_from(config).context("Failed to create Kubernetes client")
}

pub async fn list_nodes(client: &Client) -> Result<Vec<ClusterNode>> {
    let api: Api<ClusterNode> = Api::all(client.clone());
    let nodes = api
        .list(&ListParams::default())
        .await
        .context("Failed to list nodes")?;
    Ok(nodes.items)
}

/// `namespace/name` or bare `name` in the default namespace
pub fn parse_pod_ref(reference: &str) -> Pod {
    let (namespace, name) = match reference.split_once('/') {
        Some((namespace, name)) => (namespace, name),
        None => ("default", reference),
    };

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Re-encode API server nodes into the scheduler's wire form
pub fn to_wire_nodes(nodes: Vec<ClusterNode>) -> Result<NodeList> {
    let items = nodes
        .into_iter()
        .map(|node| {
            let value = serde_json::to_value(node).context("Failed to encode node")?;
            serde_json::from_value::<Node>(value).context("Failed to decode node")
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(NodeList::new(items))
}

pub fn load_args_file(path: &str) -> Result<ExtenderArgs> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file {}", path))?;
    serde_json::from_str(&content).context("Failed to parse extender request")
}

/// Request from a file when given, otherwise from the cluster's current nodes
pub async fn extender_args(
    kubeconfig: Option<&str>,
    pod: &str,
    file: Option<&str>,
) -> Result<ExtenderArgs> {
    if let Some(path) = file {
        return load_args_file(path);
    }

    let client = connect(kubeconfig).await?;
    let nodes = to_wire_nodes(list_nodes(&client).await?)?;

    Ok(ExtenderArgs {
        pod: Some(parse_pod_ref(pod)),
        nodes: Some(nodes),
        node_names: None,
    })
}
