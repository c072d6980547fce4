//! UI helpers for the deployer CLI.
//!
//! Provides consistent formatting for console summaries. Progress detail
//! goes through `tracing`; these helpers only print end-of-command reports.

use colored::{ColoredString, Colorize};

use crate::components::ComponentResult;
use crate::stage::DeployStage;
use crate::status::StatusMap;

/// Print the banner.
pub fn print_banner() {
    println!();
    println!("{}", "IUDX Platform Deployer".cyan().bold());
    println!("  {}", "Rancher + Kubernetes + IUDX services".bright_black());
    println!();
}

const RULE_WIDTH: usize = 60;

#[derive(Clone, Copy)]
enum Tone {
    Good,
    Caution,
    Bad,
    Note,
}

impl Tone {
    fn mark(self) -> ColoredString {
        match self {
            Self::Good => "✓".green().bold(),
            Self::Caution => "!".yellow().bold(),
            Self::Bad => "✗".red().bold(),
            Self::Note => "•".blue().bold(),
        }
    }

    fn paint(self, text: &str) -> ColoredString {
        match self {
            Self::Good => text.green(),
            Self::Caution => text.yellow(),
            Self::Bad => text.red(),
            Self::Note => text.normal(),
        }
    }
}

fn say(tone: Tone, message: &str) {
    println!("{} {}", tone.mark(), tone.paint(message));
}

/// Print an underlined section title.
pub fn print_section(title: &str) {
    println!();
    println!("{}", title.to_uppercase().cyan().bold());
    println!("{}", "─".repeat(RULE_WIDTH).bright_black());
}

pub fn print_success(message: &str) {
    say(Tone::Good, message);
}

pub fn print_warning(message: &str) {
    say(Tone::Caution, message);
}

pub fn print_error(message: &str) {
    say(Tone::Bad, message);
}

pub fn print_info(message: &str) {
    say(Tone::Note, message);
}

/// `name` or `name: detail`.
fn check_text(name: &str, detail: Option<&str>) -> String {
    detail.map_or_else(|| name.to_string(), |d| format!("{name}: {d}"))
}

/// Print an indented pass/fail line.
pub fn print_check_result(name: &str, passed: bool, detail: Option<&str>) {
    let tone = if passed { Tone::Good } else { Tone::Bad };
    println!("  {} {}", tone.mark(), check_text(name, detail));
}

/// Print a key-value pair.
pub fn print_kv(key: &str, value: &str) {
    println!("  {} {}", format!("{key}:").bright_black(), value.green());
}

/// Print the reached stage.
pub fn print_stage(stage: DeployStage) {
    print_kv(
        "Stage",
        &format!(
            "[{}/{}] {stage}",
            stage.step_number(),
            DeployStage::TOTAL_STEPS
        ),
    );
}

/// Print one line per component result.
pub fn print_component_results(results: &[ComponentResult]) {
    for result in results {
        print_check_result(&result.name, result.success, Some(&result.message));
    }
}

/// Print a status map as an aligned table.
pub fn print_status(status: &StatusMap) {
    let width = status.keys().map(String::len).max().unwrap_or(0);
    for (name, state) in status {
        let state = match state.as_str() {
            "Running" | "Ready" => state.green(),
            "Unknown" => state.bright_black(),
            _ => state.yellow(),
        };
        println!("  {name:<width$}  {state}");
    }
}
