//! `kiosko predict`: show which modules would be warmed next.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use super::Session;
use crate::output;

#[derive(Debug, Serialize)]
struct Prediction {
    history: Vec<String>,
    next: Option<String>,
    candidates: Vec<String>,
}

/// Replays `history` as navigation and prints the predictions that follow.
pub async fn execute(session: &Session, history: &[String]) -> Result<()> {
    let (runtime, _) = session.runtime()?;
    let preloader = runtime.preloader();

    let mut previous: Option<&str> = None;
    for module in history {
        if let Some(previous) = previous.replace(module.as_str()) {
            preloader.mark_module_inactive(previous).await;
        }
        preloader.mark_module_active(module).await;
    }

    let prediction = Prediction {
        history: history.to_vec(),
        next: preloader.predict_next_module().await,
        candidates: preloader.predict_multiple().await,
    };

    if session.json {
        output::print_json(&prediction)?;
    } else {
        output::section("Prediction");
        let after = if history.is_empty() { "(start)".to_string() } else { history.join(" → ") };
        println!("  {:<12} {}", "After:", after);
        match &prediction.next {
            Some(next) => println!("  {:<12} {}", "Next:", next.green().bold()),
            None => println!("  {:<12} {}", "Next:", "nothing to warm".dimmed()),
        }
        if !prediction.candidates.is_empty() {
            println!("  {:<12} {}", "Candidates:", prediction.candidates.join(", "));
        }
    }
    Ok(())
}
