//! Console glue: progress lines and interactive prompts
//!
//! Output helpers are plain functions with no state; every line is prefixed
//! with a short marker so runs are easy to scan:
//!
//! ```text
//!  .    info
//!  /!\  warning
//!  [.]  in progress
//!  [-]  negative / farewell
//!  [+]  done
//! ```

use crate::workflow::{PipelineEvent, ProgressReporter};
use async_trait::async_trait;
use std::fmt::Display;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Line category, selects the marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Warning,
    Progress,
    Negative,
    Positive,
}

impl Tone {
    pub fn marker(&self) -> &'static str {
        match self {
            Tone::Info => ".",
            Tone::Warning => "/!\\",
            Tone::Progress => "[.]",
            Tone::Negative => "[-]",
            Tone::Positive => "[+]",
        }
    }
}

pub fn format_line(tone: Tone, message: impl Display) -> String {
    format!(" {} {}", tone.marker(), message)
}

pub fn nl() {
    println!();
}

pub fn info(message: impl Display) {
    println!("{}", format_line(Tone::Info, message));
}

pub fn warning(message: impl Display) {
    println!("{}", format_line(Tone::Warning, message));
}

pub fn progress(message: impl Display) {
    println!("{}", format_line(Tone::Progress, message));
}

pub fn negative(message: impl Display) {
    println!("{}", format_line(Tone::Negative, message));
}

pub fn positive(message: impl Display) {
    println!("{}", format_line(Tone::Positive, message));
}

/// Console line(s) for a pipeline event; empty when the event is silent
pub fn render_event(event: &PipelineEvent) -> Vec<(Tone, String)> {
    match event {
        PipelineEvent::Loading { .. } => vec![(Tone::Progress, "Loading...".to_string())],
        PipelineEvent::ScoreResolved { id, metadata } => vec![
            (
                Tone::Positive,
                format!("Processing {} (id : {})", metadata.title, id),
            ),
            (
                Tone::Info,
                format!("{} pages to download...", metadata.page_count),
            ),
        ],
        PipelineEvent::OutputReady { folder } => {
            vec![(Tone::Info, format!("Output folder : {}", folder.display()))]
        }
        PipelineEvent::SeedAcquired { strategy } => {
            vec![(Tone::Info, format!("Encryption seed ready ({})", strategy))]
        }
        PipelineEvent::AssetStarted { format } => {
            vec![(Tone::Progress, format!("Downloading {}...", format.label()))]
        }
        PipelineEvent::PageDownloaded { .. } => Vec::new(),
        PipelineEvent::AssetCompleted { format } => {
            vec![(Tone::Positive, format!("Downloaded {} !", format.label()))]
        }
        PipelineEvent::AssemblyStarted { .. } => {
            vec![(Tone::Progress, "Merging into PDF...".to_string())]
        }
        PipelineEvent::Finished { summary } => vec![(
            Tone::Positive,
            format!("Process finished : {}", summary.document.display()),
        )],
    }
}

/// Prints pipeline events to stdout as they happen
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn report(&self, event: &PipelineEvent) {
        for (tone, message) in render_event(event) {
            println!("{}", format_line(tone, message));
        }
    }
}

/// Source of answers for the run's questions (URL, name, folder)
#[async_trait]
pub trait Prompter: Send {
    /// Ask a question; `None` means "keep the default" (empty answer or EOF)
    async fn ask(&mut self, question: &str, default: Option<&str>) -> std::io::Result<Option<String>>;
}

/// Interactive prompts on stdin
///
/// Reads asynchronously so Ctrl+C stays responsive while waiting for input.
pub struct ConsolePrompter {
    lines: Lines<BufReader<Stdin>>,
}

impl ConsolePrompter {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for ConsolePrompter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prompter for ConsolePrompter {
    async fn ask(&mut self, question: &str, default: Option<&str>) -> std::io::Result<Option<String>> {
        nl();
        info(question);
        if let Some(default) = default {
            info(format!("Default : {}", default));
            info("Press enter to keep it, or type a new value");
        }
        print!(" > ");
        std::io::stdout().flush()?;

        let answer = self.lines.next_line().await?;
        Ok(answer
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty()))
    }
}

/// Accepts every default without asking
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

#[async_trait]
impl Prompter for NoPrompt {
    async fn ask(&mut self, _question: &str, _default: Option<&str>) -> std::io::Result<Option<String>> {
        Ok(None)
    }
}
