use std::time::Duration;

use colored::*;
use tracing::info;

use crate::terminal::logging::PRINT_TARGET;

pub const TOTAL_WIDTH: usize = 64;

const PRIMARY: Color = Color::BrightGreen;
const SEPARATOR: Color = Color::BrightBlack;
const TEXT_DEFAULT: Color = Color::White;

pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

pub fn header(msg: &str) {
    let formatted: String = format!("⟦ {} ⟧", msg);
    let msg_len: usize = formatted.chars().count();

    let dash_count: usize = TOTAL_WIDTH.saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: ColoredString = format!(
        "{}{}{}",
        "─".repeat(left),
        formatted.to_uppercase().bright_green(),
        "─".repeat(right)
    )
    .bright_black();

    print(&format!("{}", line));
}

pub fn fat_separator() {
    let sep: ColoredString = "═".repeat(TOTAL_WIDTH).color(SEPARATOR);
    print(&format!("{}", sep));
}

/// One discovered host, printed the moment its reply arrives.
pub fn host(addr: &str) {
    let prefix: ColoredString = "[+]".green().bold();
    print(&format!("{} {}", prefix, addr.color(PRIMARY)));
}

/// A numbered entry in a selection list.
pub fn list_entry(idx: usize, name: &str, value: &str) {
    let idx_str: String = format!("[{}]", idx.to_string().color(Color::Cyan));
    print(&format!(
        "{} {}{} {}",
        idx_str.color(SEPARATOR),
        name.color(PRIMARY),
        ":".color(SEPARATOR),
        value.color(TEXT_DEFAULT)
    ));
}

pub fn summary(alive: usize, targets: usize, total_time: Duration, cancelled: bool) {
    let active_hosts: ColoredString = format!("{alive} active hosts").bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let verb: &str = if cancelled { "Discovery Aborted" } else { "Discovery Complete" };
    let output: String = format!("{verb}: {active_hosts} of {targets} identified in {total_time}")
        .color(TEXT_DEFAULT)
        .to_string();

    fat_separator();
    centerln(&output);
}

pub fn no_results() {
    print(&format!("{}", "No host answered the sweep".red().bold()));
}

pub fn centerln(msg: &str) {
    let space = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(msg)) / 2);
    print(&format!("{}{}", space, msg));
}
