//! Output formatting for run summaries

use owo_colors::OwoColorize;
use trice_core::{Config, Outcome, Policy};

/// Render the summary printed to stderr after a run
pub fn render_outcome(outcome: &Outcome, config: &Config) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{} {}: scanned {} files\n",
        "->".blue().bold(),
        outcome.policy.as_str().bold(),
        outcome.files_visited.to_string().green()
    ));

    if outcome.policy.writes_sources() {
        let verb = if config.dry_run { "Would rewrite" } else { "Rewrote" };
        output.push_str(&format!(
            "   {} {} files\n",
            verb,
            outcome.files_modified.len().to_string().green()
        ));
        for path in &outcome.files_modified {
            output.push_str(&format!("     {}\n", path.display().dimmed()));
        }
    }

    if outcome.policy != Policy::Zero {
        let state = if outcome.list_written {
            format!("written to {}", config.id_list.display())
        } else if outcome.list_modified {
            "not written (dry run)".to_string()
        } else {
            "unchanged".to_string()
        };
        output.push_str(&format!(
            "   ID list: {} -> {} entries, {}\n",
            outcome.list_len_before,
            outcome.list_len_after.to_string().green(),
            state
        ));
    }

    if !outcome.warnings.is_empty() {
        output.push_str(&format!(
            "{} {} warnings:\n",
            "!".yellow().bold(),
            outcome.warnings.len()
        ));
        for warning in &outcome.warnings {
            output.push_str(&format!("   {}\n", warning));
        }
    }

    output
}
