use std::time::Duration;

use excerpta_core::{DomainConfig, ExtractedDocument, Field};
use owo_colors::OwoColorize;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!(
        "\n{} {} {}",
        "Excerpta".bold().bright_blue(),
        "v".dimmed(),
        VERSION.dimmed()
    );
    eprintln!("{}", "Selector-driven article extraction\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print a dimmed label with a value
pub fn print_detail(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{}:", label).dimmed(), value.bright_white());
}

/// Lists resolved fields and warns about configured fields that matched nothing.
pub fn print_field_report(config: &DomainConfig, extracted: &ExtractedDocument) {
    for field in Field::ALL {
        if config.field(field).is_none() {
            continue;
        }
        match extracted.get(field) {
            Some(value) => eprintln!(
                "  {} {}",
                format!("{}:", field).dimmed(),
                format!("{} value(s)", value.len()).bright_white()
            ),
            None => print_warning(&format!("{} matched nothing", field)),
        }
    }
}

/// Print timing summary, colored by duration
pub fn print_timing_summary(total: Duration, timings: &[(&str, Duration)]) {
    eprintln!("{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Timing Summary".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());

    for (label, duration) in timings {
        let ms = duration.as_secs_f64() * 1000.0;
        let label = format!("{}:", label);
        if ms < 50.0 {
            eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "fast".dimmed());
        } else if ms < 100.0 {
            eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "moderate".bright_yellow());
        } else {
            eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "slow".bright_red());
        }
    }

    eprintln!(
        "  {} {:>8.2}ms\n",
        "Total:".bold().dimmed(),
        total.as_secs_f64() * 1000.0
    );
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
