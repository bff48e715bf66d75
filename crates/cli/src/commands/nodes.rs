//! Node preparation commands

use anyhow::{bail, Context, Result};
use colored::Colorize;
use extender_lib::collector::{parse_cpu_quantity, CPU_USAGE_ANNOTATION};
use extender_lib::telemetry::{RATED_POWER_ANNOTATION, RENEWABLES_ANNOTATION, SHARE_DELIMITER};
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use tabled::Tabled;

use crate::cluster::list_nodes;
use crate::output::{format_watts, print_info, print_json, print_success, print_table, OutputFormat};

#[derive(Tabled, Serialize)]
struct LabelRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Label")]
    label: String,
}

#[derive(Tabled, Serialize)]
struct NodeRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Renewables")]
    renewables: String,
    #[tabled(rename = "Rated Power")]
    rated_power: String,
    #[tabled(rename = "CPU")]
    allocatable_cpu: String,
}

/// Annotation values to set on one node
#[derive(Debug, Default)]
pub struct TelemetryUpdate {
    pub renewables: Option<String>,
    pub rated_power: Option<f64>,
    pub cpu_usage: Option<String>,
}

impl TelemetryUpdate {
    /// Validated annotation map; rejects values the extender would ignore
    pub fn annotations(&self) -> Result<BTreeMap<String, String>> {
        let mut annotations = BTreeMap::new();

        if let Some(renewables) = &self.renewables {
            for token in renewables.trim().trim_end_matches(SHARE_DELIMITER).split(SHARE_DELIMITER) {
                let share: f64 = token
                    .trim()
                    .parse()
                    .with_context(|| format!("Renewable share '{}' is not a number", token))?;
                if !(0.0..=1.0).contains(&share) {
                    bail!("Renewable share {} is outside [0, 1]", share);
                }
            }
            annotations.insert(RENEWABLES_ANNOTATION.to_string(), renewables.trim().to_string());
        }

        if let Some(watts) = self.rated_power {
            if !watts.is_finite() || watts <= 0.0 {
                bail!("Rated power must be a positive number of watts");
            }
            annotations.insert(RATED_POWER_ANNOTATION.to_string(), watts.to_string());
        }

        if let Some(usage) = &self.cpu_usage {
            if parse_cpu_quantity(usage).is_none() {
                bail!("CPU usage '{}' is not a valid quantity", usage);
            }
            annotations.insert(CPU_USAGE_ANNOTATION.to_string(), usage.clone());
        }

        if annotations.is_empty() {
            bail!("Nothing to annotate: pass --renewables, --rated-power or --cpu-usage");
        }
        Ok(annotations)
    }
}

/// Label the given nodes, or every node in the cluster
pub async fn label_nodes(
    client: &Client,
    key: &str,
    value: &str,
    names: &[String],
    format: OutputFormat,
) -> Result<()> {
    let targets: Vec<String> = if names.is_empty() {
        list_nodes(client)
            .await?
            .into_iter()
            .filter_map(|node| node.metadata.name)
            .collect()
    } else {
        names.to_vec()
    };

    let api: Api<Node> = Api::all(client.clone());
    let patch = json!({ "metadata": { "labels": { key: value } } });

    let mut rows = Vec::with_capacity(targets.len());
    for name in targets {
        api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .with_context(|| format!("Failed to label node {}", name))?;
        rows.push(LabelRow {
            node: name,
            label: format!("{}={}", key, value),
        });
    }

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table => {
            let count = rows.len();
            print_table(rows);
            print_success(&format!("Labelled {} node(s)", count));
        }
    }
    Ok(())
}

pub async fn annotate_node(
    client: &Client,
    name: &str,
    update: TelemetryUpdate,
    format: OutputFormat,
) -> Result<()> {
    let annotations = update.annotations()?;
    let api: Api<Node> = Api::all(client.clone());
    let patch = json!({ "metadata": { "annotations": annotations } });

    api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .with_context(|| format!("Failed to annotate node {}", name))?;

    match format {
        OutputFormat::Json => print_json(&json!({ "node": name, "annotations": annotations }))?,
        OutputFormat::Table => {
            for (key, value) in &annotations {
                print_info(&format!("{} = {}", key.cyan(), value));
            }
            print_success(&format!("Annotated node {}", name));
        }
    }
    Ok(())
}

fn node_row(node: Node, key: &str) -> NodeRow {
    let labels = node.metadata.labels.unwrap_or_default();
    let annotations = node.metadata.annotations.unwrap_or_default();
    let allocatable_cpu = node
        .status
        .and_then(|status| status.allocatable)
        .and_then(|allocatable| allocatable.get("cpu").map(|q| q.0.clone()));

    NodeRow {
        node: node.metadata.name.unwrap_or_default(),
        label: labels.get(key).cloned().unwrap_or_else(|| "-".to_string()),
        renewables: annotations
            .get(RENEWABLES_ANNOTATION)
            .cloned()
            .unwrap_or_else(|| "-".to_string()),
        rated_power: annotations
            .get(RATED_POWER_ANNOTATION)
            .map(|raw| format_watts(raw))
            .unwrap_or_else(|| "default".to_string()),
        allocatable_cpu: allocatable_cpu.unwrap_or_else(|| "-".to_string()),
    }
}

pub async fn show_nodes(client: &Client, key: &str, format: OutputFormat) -> Result<()> {
    let rows: Vec<NodeRow> = list_nodes(client)
        .await?
        .into_iter()
        .map(|node| node_row(node, key))
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table => print_table(rows),
    }
    Ok(())
}
