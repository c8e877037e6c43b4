//! Runs the backup of every configured section.
//!
//! Each section goes through validate → dump → compress → chmod/chown on
//! its own. Whatever happens to one section is recorded in its
//! [`TargetOutcome`] and the next section is processed regardless.

use crate::backup::backup_config::{BackupConfig, RunDefaults, SectionConfig};
use crate::backup::dump::{dump_database, DumpTools};
use crate::backup::pipeline::{post_process, CompressedArtifact};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::target::BackupTarget;
use bon::Builder;
use chrono::{DateTime, Local, TimeZone};
use derive_more::Display;
use getset::Getters;
use tracing::{error, info};

/// Terminal state of one section in a run.
#[derive(Debug)]
pub enum TargetState {
    /// Dumped, compressed and secured
    Compressed(CompressedArtifact),
    /// Validation never completed; nothing was written
    Rejected(Error),
    /// The dump tool failed; its partial output was removed
    DumpFailed(Error),
    /// The dump succeeded but compressing or securing it did not
    PostProcessFailed(Error),
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Stage {
    #[display("validation")]
    Validation,
    #[display("dump")]
    Dump,
    #[display("post-processing")]
    PostProcess,
}

impl TargetState {
    pub fn is_success(&self) -> bool {
        matches!(self, TargetState::Compressed(_))
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            TargetState::Compressed(_) => None,
            TargetState::Rejected(e)
            | TargetState::DumpFailed(e)
            | TargetState::PostProcessFailed(e) => Some(e),
        }
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            TargetState::Compressed(_) => None,
            TargetState::Rejected(_) => Some(Stage::Validation),
            TargetState::DumpFailed(_) => Some(Stage::Dump),
            TargetState::PostProcessFailed(_) => Some(Stage::PostProcess),
        }
    }
}

#[derive(Debug, Getters)]
#[getset(get = "pub")]
pub struct TargetOutcome {
    section: String,
    state: TargetState,
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }
}

/// Per-section results of one run, in configuration order.
#[derive(Debug, Default, Getters)]
#[getset(get = "pub")]
pub struct RunReport {
    outcomes: Vec<TargetOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// True when every section was backed up. An empty run counts as success.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(TargetOutcome::is_success)
    }
}

#[derive(Clone, Debug, Builder, Getters)]
#[getset(get = "pub")]
pub struct BackupRunner {
    #[builder(default)]
    tools: DumpTools,
    run_defaults: RunDefaults,
}

impl BackupRunner {
    /// Backs up every section, taking the weekday slot from the local clock
    /// at the moment each section starts.
    pub fn run(&self, config: BackupConfig) -> RunReport {
        self.run_with_clock(config, Local::now)
    }

    /// Backs up every section into the weekday slot of `now`.
    pub fn run_at<T: TimeZone>(&self, config: BackupConfig, now: &DateTime<T>) -> RunReport {
        self.run_with_clock(config, || now.clone())
    }

    fn run_with_clock<T, F>(&self, config: BackupConfig, clock: F) -> RunReport
    where
        T: TimeZone,
        F: Fn() -> DateTime<T>,
    {
        info!("Starting backup of {} section(s)", config.len());
        let outcomes = config
            .into_sections(&self.run_defaults)
            .map(|(section, raw)| {
                let state = self.run_section(&section, raw, &clock());
                match state.error() {
                    None => info!("Backup of section {:?} finished", section),
                    Some(e) => error!(
                        "Backup of section {:?} failed during {}: {}",
                        section,
                        state.failed_stage().map(|s| s.to_string()).unwrap_or_default(),
                        e
                    ),
                }
                TargetOutcome { section, state }
            })
            .collect();

        RunReport { outcomes }
    }

    fn run_section<T: TimeZone>(
        &self,
        section: &str,
        raw: Result<SectionConfig>,
        now: &DateTime<T>,
    ) -> TargetState {
        let target = match raw.and_then(|c| BackupTarget::from_section(section, c)) {
            Ok(target) => target,
            Err(e) => return TargetState::Rejected(e),
        };
        info!("Section {:?} validated", section);

        let dump = match dump_database(&target, &self.tools, now) {
            Ok(dump) => dump,
            Err(e) => return TargetState::DumpFailed(e),
        };
        info!("Section {:?} dumped into {:?}", section, dump.path());

        match post_process(&target, dump) {
            Ok(compressed) => TargetState::Compressed(compressed),
            Err(e) => TargetState::PostProcessFailed(e),
        }
    }
}
