//! Diagnostics command handlers

use crate::config::Config;
use crate::services::{CheckReport, Diagnostics};
use crate::store::RecordStore;

pub async fn cmd_check(config: &Config, store: &RecordStore) -> anyhow::Result<()> {
    if config.backend.url.trim().is_empty() {
        println!("Warning: backend.url is not set");
    }
    if config.backend.api_key.trim().is_empty() {
        println!("Warning: backend.api_key is not set");
    }

    println!("Testing backend connection...");
    let report = Diagnostics::new(store.clone()).connection_check().await;
    print_report(&report)
}

pub async fn cmd_selftest(store: &RecordStore) -> anyhow::Result<()> {
    println!("Running storage tests...");
    let report = Diagnostics::new(store.clone()).storage_self_test().await;
    print_report(&report)
}

fn print_report(report: &CheckReport) -> anyhow::Result<()> {
    println!("{:-<60}", "");
    for step in &report.steps {
        let mark = if step.passed { "✓" } else { "✗" };
        println!("{mark} {:<20} {}", step.name, step.detail);
    }
    println!("{:-<60}", "");

    if report.passed() {
        println!("All checks passed.");
        Ok(())
    } else {
        anyhow::bail!("Backend checks failed")
    }
}
