//! Output formatting for the CLI.
//!
//! This module provides human-readable and JSON renderings of the verdict.

use colored::Colorize;
use serde::Serialize;
use std::io::Write;

use codeowners_approval_core::ApprovalCheckResult;

/// JSON report written in `--json` mode.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    /// The full verdict, flattened into the report.
    #[serde(flatten)]
    pub result: &'a ApprovalCheckResult,
    /// Changed files matching no CODEOWNERS rule.
    pub orphaned_files: &'a [String],
}

impl<'a> JsonReport<'a> {
    /// Creates a report over a computed verdict.
    pub fn new(result: &'a ApprovalCheckResult, orphaned_files: &'a [String]) -> Self {
        Self {
            result,
            orphaned_files,
        }
    }

    /// Writes the report as pretty-printed JSON.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        writeln!(writer, "{}", json)
    }
}

/// Output formatter for human-readable console output.
pub struct HumanOutput<W: Write> {
    writer: W,
    use_colors: bool,
}

impl<W: Write> HumanOutput<W> {
    /// Creates a new human output formatter.
    pub fn new(writer: W, use_colors: bool) -> Self {
        Self { writer, use_colors }
    }

    /// Writes the full verdict: per-owner lines, orphans, and a summary.
    pub fn write_result(
        &mut self,
        result: &ApprovalCheckResult,
        orphaned_files: &[String],
    ) -> std::io::Result<()> {
        if result.total_required == 0 {
            let message = "✓ no code owners are required for this PR";
            if self.use_colors {
                writeln!(self.writer, "{}", message.green().bold())?;
            } else {
                writeln!(self.writer, "{}", message)?;
            }
        } else {
            self.write_header("required approvals")?;
            for status in &result.statuses {
                let marker = if status.is_approved { "[x]" } else { "[ ]" };
                let detail = if status.is_approved {
                    format!("approved by {}", status.approved_by.join(", "))
                } else {
                    "pending".to_string()
                };
                let line = format!(
                    "  {} {} — {} ({} files)",
                    marker,
                    status.owner,
                    detail,
                    status.files.len()
                );
                if self.use_colors {
                    let colored_line = if status.is_approved {
                        line.green()
                    } else {
                        line.yellow()
                    };
                    writeln!(self.writer, "{}", colored_line)?;
                } else {
                    writeln!(self.writer, "{}", line)?;
                }
            }

            self.write_summary(result)?;
        }

        if !orphaned_files.is_empty() {
            self.write_header("files with no code owners")?;
            for file in orphaned_files {
                writeln!(self.writer, "  {}", file)?;
            }
        }

        Ok(())
    }

    /// Writes a section header.
    fn write_header(&mut self, name: &str) -> std::io::Result<()> {
        let header = format!("==> {}", name);
        if self.use_colors {
            writeln!(self.writer, "\n{}", header.cyan().bold())?;
        } else {
            writeln!(self.writer, "\n{}", header)?;
        }
        Ok(())
    }

    fn write_summary(&mut self, result: &ApprovalCheckResult) -> std::io::Result<()> {
        writeln!(self.writer)?;

        if result.all_approved {
            let message = format!(
                "✓ all {} required owner group(s) have approved",
                result.total_required
            );
            if self.use_colors {
                writeln!(self.writer, "{}", message.green().bold())?;
            } else {
                writeln!(self.writer, "{}", message)?;
            }
        } else {
            let message = format!(
                "✗ {}/{} owner group(s) approved; missing: {}",
                result.total_approved,
                result.total_required,
                result.missing.join(", ")
            );
            if self.use_colors {
                writeln!(self.writer, "{}", message.red().bold())?;
            } else {
                writeln!(self.writer, "{}", message)?;
            }
        }

        Ok(())
    }

    /// Writes a startup error.
    pub fn write_error(&mut self, message: &str) -> std::io::Result<()> {
        if self.use_colors {
            writeln!(self.writer, "{} {}", "Error:".red().bold(), message)?;
        } else {
            writeln!(self.writer, "Error: {}", message)?;
        }
        Ok(())
    }
}
