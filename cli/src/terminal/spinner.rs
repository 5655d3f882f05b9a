use std::io::Write;
use std::sync::OnceLock;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

static SPINNER: OnceLock<ProgressBar> = OnceLock::new();

/// Shows the discovery spinner. Later calls return the same bar.
pub fn start() -> &'static ProgressBar {
    SPINNER.get_or_init(init_spinner)
}

fn init_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ]);

    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("{}", "Press Ctrl-C to finish early".italic().white()));
    pb
}

pub fn report_discovery_progress(count: usize) {
    if let Some(pb) = active() {
        pb.set_message(format!(
            "Identified {} hosts so far...",
            count.to_string().green().bold()
        ));
    }
}

pub fn finish() {
    if let Some(pb) = active() {
        pb.finish_and_clear();
    }
}

fn active() -> Option<&'static ProgressBar> {
    SPINNER
        .get()
        .filter(|pb| !pb.is_finished() && !pb.is_hidden())
}

/// Log sink that prints above a running spinner instead of through it.
pub struct SpinnerWriter;

impl Write for SpinnerWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match active() {
            Some(pb) => {
                let msg = String::from_utf8_lossy(buf);
                pb.println(msg.trim_end());
                Ok(buf.len())
            }
            None => std::io::stdout().write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stdout().flush()
    }
}
