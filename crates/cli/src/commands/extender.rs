//! Commands that call a running extender

use anyhow::Result;
use colored::Colorize;
use extender_lib::{ExtenderArgs, ExtenderFilterResult, HostPriorityList};
use tabled::Tabled;

use crate::client::ExtenderClient;
use crate::output::{
    color_score, color_verdict, print_info, print_json, print_table, print_warning, OutputFormat,
};

#[derive(Tabled)]
struct ScoreRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Score")]
    score: String,
}

#[derive(Tabled)]
struct FilterRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Rank by score, keeping request order among ties
fn score_rows(priorities: &HostPriorityList) -> Vec<ScoreRow> {
    let mut ranked: Vec<_> = priorities.iter().collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, p)| ScoreRow {
            rank: i + 1,
            node: p.host.clone(),
            score: color_score(p.score),
        })
        .collect()
}

fn filter_rows(result: &ExtenderFilterResult) -> Vec<FilterRow> {
    let passed = result
        .nodes
        .iter()
        .flat_map(|list| list.items.iter())
        .map(|node| FilterRow {
            node: node.name().to_string(),
            result: color_verdict(true),
            reason: String::new(),
        })
        .chain(result.node_names.iter().flatten().map(|name| FilterRow {
            node: name.clone(),
            result: color_verdict(true),
            reason: String::new(),
        }));

    let failed = result
        .failed_nodes
        .iter()
        .chain(&result.failed_and_unresolvable_nodes)
        .map(|(node, reason)| FilterRow {
            node: node.clone(),
            result: color_verdict(false),
            reason: reason.clone(),
        });

    passed.chain(failed).collect()
}

pub async fn prioritize(
    client: &ExtenderClient,
    args: &ExtenderArgs,
    format: OutputFormat,
) -> Result<()> {
    let priorities = client.prioritize(args).await?;

    match format {
        OutputFormat::Json => print_json(&priorities)?,
        OutputFormat::Table => {
            println!("{}", "Node Priorities".bold());
            print_table(score_rows(&priorities));
        }
    }
    Ok(())
}

pub async fn filter(client: &ExtenderClient, args: &ExtenderArgs, format: OutputFormat) -> Result<()> {
    let result = client.filter(args).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            if !result.error.is_empty() {
                print_warning(&format!("Extender reported: {}", result.error));
            }
            println!("{}", "Filter Result".bold());
            print_table(filter_rows(&result));
        }
    }
    Ok(())
}

pub async fn version(client: &ExtenderClient) -> Result<()> {
    let version = client.version().await?;
    print_info(&format!("green-extender {}", version.cyan()));
    Ok(())
}
