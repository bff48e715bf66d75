//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

pub fn print_table<T: Tabled>(rows: Vec<T>) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    println!("{}", Table::new(rows).with(Style::rounded()));
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Scores run from 0 to 10
pub fn color_score(score: i64) -> String {
    let formatted = score.to_string();
    if score >= 7 {
        formatted.green().to_string()
    } else if score >= 4 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

pub fn color_verdict(passed: bool) -> String {
    if passed {
        "passed".green().to_string()
    } else {
        "rejected".red().to_string()
    }
}

/// Render watts with a kW suffix past 1000
pub fn format_watts(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(watts) if watts >= 1000.0 => format!("{:.1} kW", watts / 1000.0),
        Ok(watts) => format!("{} W", watts),
        Err(_) => raw.to_string(),
    }
}
