//! UI utilities for pretty printing

use colored::Colorize;
use tagdb_core::{LabelOperationInfo, LabelSnapshot, OperationKind, Visibility};

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".bright_red(), msg.red());
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".bright_green(), msg.bright_green());
}

pub fn print_info(msg: &str) {
    println!("{} {}", "ℹ".bright_blue(), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", "⚠".bright_yellow(), msg.yellow());
}

/// One entry per line, or a note when the list is empty
pub fn print_list<T: std::fmt::Display>(title: &str, items: &[T]) {
    if items.is_empty() {
        print_info(&format!("No {}", title));
        return;
    }
    println!("{}", format!("{} ({}):", title, items.len()).bright_cyan().bold());
    for item in items {
        println!("  {}", item);
    }
}

fn kind_label(kind: OperationKind) -> colored::ColoredString {
    match kind {
        OperationKind::Add => "add".bright_green(),
        OperationKind::Remove => "remove".bright_red(),
    }
}

pub fn print_label(label: &LabelSnapshot, operations: &[LabelOperationInfo]) {
    let visibility = match label.visibility {
        Visibility::Visible => "visible".bright_green(),
        Visibility::Suggested => "suggested".bright_yellow(),
        Visibility::Hidden => "hidden".bright_black(),
    };

    println!("{} {} on {}", "Label:".bright_cyan().bold(), label.tag, label.content_hash.to_hex());
    println!("  {:<16} {}", "added".bright_green(), label.added_count);
    println!("  {:<16} {}", "removed".bright_green(), label.removed_count);
    println!("  {:<16} {}", "score".bright_green(), label.score);
    println!("  {:<16} {}", "visibility".bright_green(), visibility);
    match label.local_override {
        Some(kind) => println!("  {:<16} {}", "local decision".bright_green(), kind_label(kind)),
        None => println!("  {:<16} {}", "local decision".bright_green(), "none".bright_black()),
    }

    if operations.is_empty() {
        return;
    }
    println!();
    println!("{}", "Votes:".bright_cyan().bold());
    for info in operations {
        let op = &info.operation;
        let updated = chrono::DateTime::from_timestamp_millis(info.updated_at_ms as i64)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}  {:<7} clock {:<6} {}",
            op.creator,
            kind_label(op.kind),
            op.clock,
            updated.bright_black()
        );
    }
}
