//! CLI output formatting

use crate::core::context::CleanupReport;
use crate::core::models::{Agent, Build, Project};
use crate::core::state::BuildLifecycleState;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a spinner for an open-ended wait
pub fn create_spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format a raw build state for display
pub fn format_state(state: &str) -> String {
    match state.parse::<BuildLifecycleState>() {
        Ok(BuildLifecycleState::Queued) => style("QUEUED").dim().to_string(),
        Ok(BuildLifecycleState::Running) => style("RUNNING").yellow().to_string(),
        Ok(BuildLifecycleState::Finished) => style("FINISHED").green().to_string(),
        Err(_) => style(state.to_uppercase()).red().to_string(),
    }
}

/// Format a build status (`SUCCESS`, `FAILURE`, ...) for display
pub fn format_status(status: Option<&str>) -> String {
    match status {
        Some("SUCCESS") => style("SUCCESS").green().to_string(),
        Some("FAILURE") | Some("ERROR") => style(status.unwrap_or_default()).red().to_string(),
        Some(other) => style(other).yellow().to_string(),
        None => style("-").dim().to_string(),
    }
}

/// One-line build summary
pub fn format_build(build: &Build) -> String {
    let icon = match build.status.as_deref() {
        _ if !build.is_finished() => SPINNER,
        Some("SUCCESS") => CHECK,
        _ => CROSS,
    };
    let mut line = format!(
        "{} Build {} ({}) {} {}",
        icon,
        style(build.id).bold(),
        style(&build.build_type_id).cyan(),
        format_state(&build.state),
        format_status(build.status.as_deref())
    );
    if let Some(text) = &build.status_text {
        line.push_str(&format!(" - {}", style(text).dim()));
    }
    line
}

pub fn format_project(project: &Project) -> String {
    format!(
        "{} Project {} ({})",
        CHECK,
        style(&project.id).bold(),
        style(&project.name).dim()
    )
}

pub fn format_agent(agent: &Agent) -> String {
    let flag = |on: bool, label: &str| {
        if on {
            style(label.to_string()).green().to_string()
        } else {
            style(format!("not {}", label)).dim().to_string()
        }
    };
    format!(
        "{:>5}  {}  {}, {}, {}",
        agent.id,
        style(&agent.name).bold(),
        flag(agent.connected, "connected"),
        flag(agent.authorized, "authorized"),
        flag(agent.enabled, "enabled")
    )
}

pub fn format_cleanup_report(report: &CleanupReport) -> String {
    let icon = if report.is_clean() { CHECK } else { WARN };
    let mut text = format!(
        "{} Deleted {}, already gone {}, failed {}",
        icon,
        style(report.deleted).green(),
        style(report.already_gone).dim(),
        style(report.failed.len()).red()
    );
    for (object, reason) in &report.failed {
        text.push_str(&format!("\n  {} {}: {}", CROSS, object, style(reason).dim()));
    }
    text
}
