use std::io::{self, Write};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::app::{Outcome, ProgressEvent, ProgressSink, RunSummary};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    /// No bar at all in non-interactive mode, so nothing draws over JSON output.
    pub fn for_mode(mode: OutputMode, total: usize) -> Option<Self> {
        match mode {
            OutputMode::Interactive => Some(Self::new(total)),
            OutputMode::NonInteractive => None,
        }
    }

    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message("Fetching CNPJ data");
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for ConsoleProgress {
    fn event(&self, event: ProgressEvent) {
        self.bar.set_length(event.total as u64);
        self.bar.set_position(event.position as u64);
        let label = match event.outcome {
            Outcome::Fetched => "ok",
            Outcome::AlreadySaved => "already saved",
            Outcome::Rejected => "rejected",
            Outcome::TransportFailed => "unreachable",
            Outcome::Malformed => "malformed",
        };
        self.bar.set_message(format!("Fetching CNPJ data ({} {label})", event.cnpj));
    }
}

pub fn print_summary(summary: &RunSummary, output: &str) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}CNPJ enrichment summary{reset}");
    if summary.resumed > 0 {
        println!("{cyan}   resumed with {} saved records{reset}", summary.resumed);
    }
    println!("{green}   fetched: {}{reset}", summary.fetched);
    println!(
        "{yellow}   skipped: {} (rejected {}, unreachable {}, malformed {}){reset}",
        summary.skipped(),
        summary.rejected,
        summary.transport_failed,
        summary.malformed
    );
    if summary.interrupted {
        println!("{yellow}Interrupted. Progress saved up to the last checkpoint in {output}{reset}");
    } else {
        println!("{green}Done. {} records written to {output}{reset}", summary.records.len());
    }
}
