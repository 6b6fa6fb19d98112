//! # Commit pipeline
//!
//! Drives one archive creation from validated settings to a finished file:
//!
//! 1. re-check the settings;
//! 2. acquire an [`OutputTarget`] (engine writer with properties already applied);
//! 3. run the engine over the items;
//! 4. translate the engine's result code;
//! 5. finalize: flush, and for an update close the prior archive and rename
//!    `<dest>.tmp` over `<dest>`.
//!
//! ## Known gap
//!
//! If the final rename fails, the engine has already succeeded: `<dest>.tmp` holds the
//! complete new archive and `<dest>` still holds the old one. The error is reported as
//! [`CreatorError::Io`] and recovery is left to the caller; nothing is rolled back.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::callback::{CompressCallback, ItemSet};
use crate::engine::{check_update_result, Engine, OutStream};
use crate::fsx;
use crate::settings::CompressionSettings;
use crate::target::{AcquiredTarget, OutputTarget, OutputTargetFactory, TargetKind};
use crate::CreatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitState {
    Idle,
    Validated,
    TargetAcquired,
    EngineInvoked,
    /// New output written.
    Committed,
    /// Existing archive replaced by its updated copy.
    Finalized,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub state: CommitState,
    pub target: TargetKind,
    /// Files holding the archive: the destination, or every volume.
    pub paths: Vec<PathBuf>,
}

pub struct CommitPipeline<'s, E: Engine> {
    settings: &'s CompressionSettings,
    engine: E,
    state: CommitState,
}

impl<'s, E: Engine> CommitPipeline<'s, E> {
    pub fn new(settings: &'s CompressionSettings, engine: E) -> Self {
        Self { settings, engine, state: CommitState::Idle }
    }

    /// State reached by the last commit.
    pub fn state(&self) -> CommitState {
        self.state
    }

    pub fn settings(&self) -> &CompressionSettings {
        self.settings
    }

    /// Writes `items` to `dest`: a new file, volumes, or an update of an existing archive.
    pub fn commit_to_path(
        &mut self,
        dest: impl AsRef<Path>,
        items: &ItemSet,
    ) -> Result<CommitReport, CreatorError> {
        let dest = dest.as_ref();
        self.run(items, |factory| factory.for_path(dest))
    }

    /// Writes `items` into `buffer`, replacing its contents.
    pub fn commit_to_buffer(
        &mut self,
        buffer: &mut Vec<u8>,
        items: &ItemSet,
    ) -> Result<CommitReport, CreatorError> {
        self.run(items, |factory| factory.for_buffer(buffer))
    }

    pub fn commit_to_stream(
        &mut self,
        stream: &mut dyn OutStream,
        items: &ItemSet,
    ) -> Result<CommitReport, CreatorError> {
        self.run(items, |factory| factory.for_stream(stream))
    }

    fn run<'a, F>(&mut self, items: &ItemSet, acquire: F) -> Result<CommitReport, CreatorError>
    where
        F: FnOnce(&OutputTargetFactory<'s, &E>) -> Result<AcquiredTarget<'a>, CreatorError>,
    {
        self.state = CommitState::Idle;
        let result = self.run_steps(items, acquire);
        match &result {
            Ok(report) => info!(state = ?report.state, target = ?report.target, "commit finished"),
            Err(e) => {
                warn!(error = %e, reached = ?self.state, "commit failed");
                self.state = CommitState::Failed;
            }
        }
        result
    }

    fn run_steps<'a, F>(
        &mut self,
        items: &ItemSet,
        acquire: F,
    ) -> Result<CommitReport, CreatorError>
    where
        F: FnOnce(&OutputTargetFactory<'s, &E>) -> Result<AcquiredTarget<'a>, CreatorError>,
    {
        let settings = self.settings;
        settings.validate()?;
        let items_count = items.items_count()?;
        self.state = CommitState::Validated;

        let factory = OutputTargetFactory::new(settings, &self.engine);
        let AcquiredTarget { mut writer, mut target } = acquire(&factory)?;
        self.state = CommitState::TargetAcquired;
        info!(
            format = %settings.format(),
            target = ?target.kind(),
            items = items.len(),
            properties = %factory.properties(),
            "invoking engine"
        );

        let password = Some(settings.password());
        let mut callback = CompressCallback::new(items, password);
        let code = writer.update_items(target.stream(), items_count, &mut callback);
        self.state = CommitState::EngineInvoked;
        // The writer may still hold the prior archive open.
        drop(writer);

        if let Err(e) = check_update_result(code, &callback) {
            target.discard();
            return Err(e);
        }

        let report = finalize(target)?;
        self.state = report.state;
        Ok(report)
    }
}

fn finalize(target: OutputTarget<'_>) -> Result<CommitReport, CreatorError> {
    let kind = target.kind();
    match target {
        OutputTarget::SingleFile { path, mut stream } => {
            stream.flush().map_err(|e| CreatorError::io(e, &path))?;
            Ok(CommitReport { state: CommitState::Committed, target: kind, paths: vec![path] })
        }
        OutputTarget::MultiVolume { path, mut stream, .. } => {
            stream.flush().map_err(|e| CreatorError::io(e, &path))?;
            Ok(CommitReport { state: CommitState::Committed, target: kind, paths: stream.paths() })
        }
        OutputTarget::InPlaceUpdate { path, temp_path, mut stream, mut prior } => {
            prior.close()?;
            stream.flush().map_err(|e| CreatorError::io(e, &temp_path))?;
            drop(stream);
            fsx::rename_overwrite(&temp_path, &path).map_err(|e| {
                warn!(
                    temp = %temp_path.display(),
                    dest = %path.display(),
                    error = %e,
                    "updated archive left in temp file"
                );
                CreatorError::io(e, &path)
            })?;
            Ok(CommitReport { state: CommitState::Finalized, target: kind, paths: vec![path] })
        }
        OutputTarget::Buffer(_) => {
            Ok(CommitReport { state: CommitState::Committed, target: kind, paths: Vec::new() })
        }
        OutputTarget::Stream(stream) => {
            stream.flush()?;
            Ok(CommitReport { state: CommitState::Committed, target: kind, paths: Vec::new() })
        }
    }
}
