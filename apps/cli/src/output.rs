//! Terminal output helpers.

use colored::Colorize;
use kiosko_preload::CacheStats;
use serde::Serialize;

/// Prints `value` as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn section(title: &str) {
    println!();
    println!("{}", title.bold().cyan());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

pub fn success(label: &str, detail: &str) {
    println!("  {} {} {}", "✓".green(), label.bold(), detail.dimmed());
}

pub fn failure(label: &str, detail: &str) {
    println!("  {} {} {}", "✗".red(), label.bold(), detail.red());
}

/// Prints a human-readable summary of the preload cache.
pub fn cache_summary(stats: &CacheStats) {
    section("Cache");
    println!("  {:<12} {}/{}", "Size:", stats.size, stats.max_size);
    println!("  {:<12} {} hits, {} misses, {} evictions", "Lookups:", stats.hits, stats.misses, stats.evictions);
    if !stats.active.is_empty() {
        println!("  {:<12} {}", "Active:", stats.active.join(", "));
    }
    if !stats.history.is_empty() {
        println!("  {:<12} {}", "History:", stats.history.join(" → "));
    }
    for module in &stats.modules {
        println!(
            "    {:<16} accessed {:>3}  score {:>8.2}  age {:>6.1}s",
            module.name, module.access_count, module.score, module.age_secs
        );
    }
    if stats.pending_retries > 0 {
        println!("  {:<12} {}", "Retrying:", stats.pending_retries);
    }
}
