//! `kiosko load`: open modules one after another.

use anyhow::{Result, bail};
use kiosko_core::RuntimeStats;
use kiosko_loader::{LoadOptions, LoadOutcome};
use serde::Serialize;
use std::time::{Duration, Instant};

use super::Session;
use crate::output;

#[derive(Debug, Serialize)]
struct LoadReport {
    module: String,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    markup_bytes: Option<usize>,
    elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoadSummary {
    modules: Vec<LoadReport>,
    /// Modules whose stylesheet is still attached.
    stylesheets: Vec<String>,
    stats: RuntimeStats,
}

/// Opens each module in turn, closing the previous one first, the way a
/// kiosk navigates between screens.
pub async fn execute(session: &Session, modules: &[String], timeout_ms: Option<u64>, settle_ms: u64) -> Result<()> {
    let (runtime, document) = session.runtime()?;
    let options = timeout_ms.map(|ms| LoadOptions::with_timeout(Duration::from_millis(ms))).unwrap_or_default();

    let mut reports = Vec::with_capacity(modules.len());
    let mut current: Option<&str> = None;
    for module in modules {
        if let Some(previous) = current.take() {
            runtime.close(previous).await;
        }

        let started = Instant::now();
        let result = runtime.open_with(module, options).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let report = match result {
            Ok(LoadOutcome::Instance(_)) => {
                current = Some(module.as_str());
                LoadReport { module: module.clone(), outcome: "instance", markup_bytes: None, elapsed_ms, error: None }
            }
            Ok(LoadOutcome::Markup { html, .. }) => {
                current = Some(module.as_str());
                LoadReport {
                    module: module.clone(),
                    outcome: "markup",
                    markup_bytes: Some(html.len()),
                    elapsed_ms,
                    error: None,
                }
            }
            Err(e) => LoadReport {
                module: module.clone(),
                outcome: "failed",
                markup_bytes: None,
                elapsed_ms,
                error: Some(e.to_string()),
            },
        };
        reports.push(report);
    }

    if settle_ms > 0 {
        tokio::time::sleep(Duration::from_millis(settle_ms)).await;
    }

    let stats = runtime.stats().await;
    let stylesheets = document.stylesheet_modules().await;
    let failed = reports.iter().filter(|r| r.error.is_some()).count();

    if session.json {
        output::print_json(&LoadSummary { modules: reports, stylesheets, stats })?;
    } else {
        output::section("Modules");
        for report in &reports {
            match (&report.error, report.markup_bytes) {
                (Some(error), _) => output::failure(&report.module, error),
                (None, Some(bytes)) => {
                    output::success(&report.module, &format!("markup, {bytes} bytes in {}ms", report.elapsed_ms));
                }
                (None, None) => output::success(&report.module, &format!("instance in {}ms", report.elapsed_ms)),
            }
        }
        if !stylesheets.is_empty() {
            println!("  {:<12} {}", "Styles:", stylesheets.join(", "));
        }
        output::cache_summary(&stats.cache);
    }

    if failed > 0 {
        bail!("{failed} of {} module(s) failed to load", modules.len());
    }
    Ok(())
}
