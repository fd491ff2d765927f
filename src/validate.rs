//! Sequential validation of candidate commands with checkpoint/resume.
//!
//! Candidates run strictly in list order, one at a time, each through the
//! [`BoundedExecutor`]. Exit status zero accepts a candidate; anything else
//! (non-zero, signal, timeout, spawn failure) rejects it and is logged. Every
//! `checkpoint_interval` processed candidates the accepted set and the resume
//! index are rewritten to the checkpoint file, so a killed run loses at most
//! one interval of work.
//!
//! Checkpoint format: accepted commands one per line, then a final line with
//! the resume index (the number of candidates already processed).
//!
//! Resuming relies on the candidate list being identical between runs.
use crate::exec::{BoundedExecutor, ExecOutcome};
use crate::persist::{write_atomic, write_lines};
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Checkpoint {
    pub accepted: Vec<String>,
    /// Index of the first candidate not yet processed.
    pub next_index: usize,
}

impl Checkpoint {
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("read checkpoint {}", path.display()))?;
        let mut lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
        let index_line = lines
            .pop()
            .ok_or_else(|| anyhow!("checkpoint {} is empty", path.display()))?;
        let next_index = index_line.trim().parse().with_context(|| {
            format!(
                "checkpoint {} has no trailing index (got {index_line:?})",
                path.display()
            )
        })?;
        Ok(Self {
            accepted: lines.into_iter().map(str::to_string).collect(),
            next_index,
        })
    }

    /// Rewrite the whole file; never appended.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut text = String::new();
        for command in &self.accepted {
            text.push_str(command);
            text.push('\n');
        }
        text.push_str(&self.next_index.to_string());
        write_atomic(path, text.as_bytes())
            .with_context(|| format!("write checkpoint {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct ValidationOptions {
    pub timeout: Duration,
    pub checkpoint_interval: usize,
    pub checkpoint: Option<PathBuf>,
    /// Final accepted set, written on normal completion.
    pub output: Option<PathBuf>,
    pub resume_from: usize,
    pub excluded_utilities: Vec<String>,
    /// Prepended to each executed command when set, e.g. `sudo`.
    pub elevation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    pub accepted: Vec<String>,
    pub resumed_from: usize,
    pub evaluated: usize,
    pub rejected: usize,
    pub timed_out: usize,
    pub excluded: usize,
}

impl std::fmt::Display for ValidationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "accepted {} of {} evaluated ({} rejected, {} timed out, {} excluded, resumed at {})",
            self.accepted.len(),
            self.evaluated,
            self.rejected,
            self.timed_out,
            self.excluded,
            self.resumed_from
        )
    }
}

pub struct Validator<'a> {
    executor: &'a BoundedExecutor,
    options: ValidationOptions,
}

impl<'a> Validator<'a> {
    pub fn new(executor: &'a BoundedExecutor, options: ValidationOptions) -> Self {
        Self { executor, options }
    }

    pub fn validate(&self, candidates: &[String]) -> Result<ValidationSummary> {
        let options = &self.options;
        let interval = options.checkpoint_interval.max(1);
        let resume_from = options.resume_from.min(candidates.len());
        let mut summary = ValidationSummary {
            accepted: self.restore(resume_from)?,
            resumed_from: resume_from,
            ..ValidationSummary::default()
        };

        for (index, candidate) in candidates.iter().enumerate().skip(resume_from) {
            if self.is_excluded(candidate) {
                tracing::debug!(index, command = %candidate, "excluded, not executed");
                summary.excluded += 1;
            } else {
                self.evaluate(index, candidate, &mut summary);
            }

            let processed = index + 1;
            if processed % interval == 0 {
                tracing::info!(
                    processed,
                    total = candidates.len(),
                    accepted = summary.accepted.len(),
                    "validation progress"
                );
                self.flush(&summary.accepted, processed)?;
            }
        }

        self.flush(&summary.accepted, candidates.len())?;
        if let Some(output) = &options.output {
            write_lines(output, &summary.accepted)
                .with_context(|| format!("write validated commands {}", output.display()))?;
        }
        Ok(summary)
    }

    fn restore(&self, resume_from: usize) -> Result<Vec<String>> {
        if resume_from == 0 {
            return Ok(Vec::new());
        }
        let Some(path) = self.options.checkpoint.as_deref().filter(|path| path.is_file()) else {
            tracing::warn!(
                resume_from,
                "resuming without a checkpoint file, earlier accepted commands are not included"
            );
            return Ok(Vec::new());
        };
        let checkpoint = Checkpoint::load(path)?;
        if resume_from < checkpoint.next_index {
            return Err(anyhow!(
                "resume index {resume_from} is before checkpoint {} index {}; \
                 accepted commands from that range would be repeated",
                path.display(),
                checkpoint.next_index
            ));
        }
        if checkpoint.next_index != resume_from {
            tracing::warn!(
                saved = checkpoint.next_index,
                resume_from,
                "resume index differs from checkpoint"
            );
        }
        tracing::info!(
            resume_from,
            restored = checkpoint.accepted.len(),
            "resuming from checkpoint"
        );
        Ok(checkpoint.accepted)
    }

    fn is_excluded(&self, candidate: &str) -> bool {
        candidate.split_whitespace().next().is_some_and(|utility| {
            self.options
                .excluded_utilities
                .iter()
                .any(|excluded| excluded == utility)
        })
    }

    fn evaluate(&self, index: usize, candidate: &str, summary: &mut ValidationSummary) {
        let command = match &self.options.elevation {
            Some(prefix) => format!("{prefix} {candidate}"),
            None => candidate.to_string(),
        };
        let execution = self.executor.run(&command, self.options.timeout);
        summary.evaluated += 1;
        if execution.outcome.is_success() {
            tracing::info!(index, command = %candidate, "accepted");
            summary.accepted.push(candidate.to_string());
            return;
        }
        if execution.outcome == ExecOutcome::TimedOut {
            summary.timed_out += 1;
        } else {
            summary.rejected += 1;
        }
        tracing::warn!(
            index,
            command = %candidate,
            pid = ?execution.pid,
            reason = %execution.describe(),
            stderr = %execution.stderr,
            "rejected"
        );
    }

    fn flush(&self, accepted: &[String], next_index: usize) -> Result<()> {
        let Some(path) = &self.options.checkpoint else {
            return Ok(());
        };
        Checkpoint {
            accepted: accepted.to_vec(),
            next_index,
        }
        .save(path)
    }
}
