//! Terminal Progress Renderer
//!
//! Renders progress events to stderr so the binary is usable stand-alone.
//! stdout stays reserved for the final report.

use async_trait::async_trait;
use console::style;

use super::{ProgressSink, ProgressUpdate};
use crate::types::Result;

/// Console renderer for progress events
#[derive(Default)]
pub struct ConsoleSink {
    /// Suppress plain narration, keep decisions and errors
    pub quiet: bool,
}

impl ConsoleSink {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

#[async_trait]
impl ProgressSink for ConsoleSink {
    async fn send(&self, event: &ProgressUpdate) -> Result<()> {
        match event {
            ProgressUpdate::Progress { content } => {
                if !self.quiet {
                    eprintln!("  {}", style(content).dim());
                }
            }
            ProgressUpdate::PlanRevision { content, plan } => {
                eprintln!("{} {}", style("plan").cyan().bold(), content);
                for name in &plan.sequencing {
                    eprintln!("    {} {}", style("·").cyan(), name);
                }
            }
            ProgressUpdate::MidComponentResults {
                content,
                learnings,
                urls,
                ..
            } => {
                eprintln!(
                    "{} {} ({} learnings, {} sources)",
                    style("done").green().bold(),
                    content,
                    learnings,
                    urls
                );
            }
            ProgressUpdate::ResearchSaturation {
                content,
                coverage,
                saturated,
                ..
            } => {
                let marker = if *saturated {
                    style("saturated").yellow()
                } else {
                    style("coverage").dim()
                };
                eprintln!("  {} {}% - {}", marker, coverage, content);
            }
            ProgressUpdate::ComponentTiming {
                content,
                remaining_ms,
                ..
            } => {
                if !self.quiet {
                    eprintln!(
                        "  {} {} ({}s left)",
                        style("time").dim(),
                        content,
                        remaining_ms / 1000
                    );
                }
            }
            ProgressUpdate::TimeDecision {
                content, continued, ..
            } => {
                let marker = if *continued {
                    style("continue").green()
                } else {
                    style("skip").yellow().bold()
                };
                eprintln!("{} {}", marker, content);
            }
            ProgressUpdate::Result { content } => {
                eprintln!("{} {}", style("result").green().bold(), content);
            }
            ProgressUpdate::Error { content } => {
                eprintln!("{} {}", style("error").red().bold(), content);
            }
        }
        Ok(())
    }
}
