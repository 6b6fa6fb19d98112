//! # Output targets
//!
//! Decides where the engine writes and opens whatever that needs: a fresh file, a set of
//! volumes, an in-memory buffer, or (when the destination already exists and update mode
//! is on) a `.tmp` file beside it plus a handle on the prior archive.

use std::fs::File;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::engine::{ArchiveWriter, Engine, OutStream, PriorArchive};
use crate::format::FormatFeatures;
use crate::fsx;
use crate::props::PropertyBag;
use crate::settings::CompressionSettings;
use crate::volume::VolumeWriter;
use crate::CreatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    SingleFile,
    MultiVolume,
    InPlaceUpdate,
    Buffer,
    Stream,
}

/// Where the engine's output goes for one commit. Consumed by the commit that created it.
pub enum OutputTarget<'a> {
    SingleFile {
        path: PathBuf,
        stream: File,
    },
    MultiVolume {
        path: PathBuf,
        volume_size: u64,
        stream: VolumeWriter,
    },
    InPlaceUpdate {
        path: PathBuf,
        temp_path: PathBuf,
        stream: File,
        prior: Box<dyn PriorArchive>,
    },
    Buffer(Cursor<&'a mut Vec<u8>>),
    Stream(&'a mut dyn OutStream),
}

impl<'a> OutputTarget<'a> {
    pub fn kind(&self) -> TargetKind {
        match self {
            OutputTarget::SingleFile { .. } => TargetKind::SingleFile,
            OutputTarget::MultiVolume { .. } => TargetKind::MultiVolume,
            OutputTarget::InPlaceUpdate { .. } => TargetKind::InPlaceUpdate,
            OutputTarget::Buffer(_) => TargetKind::Buffer,
            OutputTarget::Stream(_) => TargetKind::Stream,
        }
    }

    /// The stream the engine writes into.
    pub fn stream(&mut self) -> &mut dyn OutStream {
        match self {
            OutputTarget::SingleFile { stream, .. } => stream,
            OutputTarget::MultiVolume { stream, .. } => stream,
            OutputTarget::InPlaceUpdate { stream, .. } => stream,
            OutputTarget::Buffer(cursor) => cursor,
            OutputTarget::Stream(stream) => &mut **stream,
        }
    }

    /// Destination path, if the target is on disk.
    pub fn path(&self) -> Option<&Path> {
        match self {
            OutputTarget::SingleFile { path, .. }
            | OutputTarget::MultiVolume { path, .. }
            | OutputTarget::InPlaceUpdate { path, .. } => Some(path),
            OutputTarget::Buffer(_) | OutputTarget::Stream(_) => None,
        }
    }

    /// Drops the target after a failed commit.
    ///
    /// Files this commit created from scratch are removed so the destination is left as
    /// it was. The temp file of an update is kept: it is never removed once the engine
    /// has run.
    pub fn discard(self) {
        match self {
            OutputTarget::SingleFile { path, stream } => {
                drop(stream);
                if let Err(e) = fsx::remove_if_exists(&path) {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "could not remove incomplete archive"
                    );
                }
            }
            OutputTarget::MultiVolume { stream, .. } => {
                let paths = stream.paths();
                drop(stream);
                for p in paths {
                    if let Err(e) = fsx::remove_if_exists(&p) {
                        warn!(
                            path = %p.display(),
                            error = %e,
                            "could not remove incomplete volume"
                        );
                    }
                }
            }
            OutputTarget::InPlaceUpdate { temp_path, mut prior, .. } => {
                if let Err(e) = prior.close() {
                    warn!(error = %e, "could not close prior archive");
                }
                debug!(temp = %temp_path.display(), "leaving temp archive in place");
            }
            OutputTarget::Buffer(_) | OutputTarget::Stream(_) => {}
        }
    }
}

/// An engine writer configured with the session's properties, paired with its output.
pub struct AcquiredTarget<'a> {
    pub writer: Box<dyn ArchiveWriter>,
    pub target: OutputTarget<'a>,
}

pub struct OutputTargetFactory<'s, E: Engine> {
    settings: &'s CompressionSettings,
    engine: E,
    properties: PropertyBag,
}

impl<'s, E: Engine> OutputTargetFactory<'s, E> {
    pub fn new(settings: &'s CompressionSettings, engine: E) -> Self {
        let properties = PropertyBag::from_settings(settings);
        Self { settings, engine, properties }
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    fn new_writer(&self) -> Result<Box<dyn ArchiveWriter>, CreatorError> {
        let mut writer = self.engine.create_writer(self.settings.format())?;
        self.properties.apply(writer.as_mut())?;
        Ok(writer)
    }

    /// Target for a filesystem destination.
    pub fn for_path(&self, dest: &Path) -> Result<AcquiredTarget<'static>, CreatorError> {
        let writer = self.new_writer()?;

        let volume_size = self.settings.volume_size();
        if volume_size > 0 {
            info!(dest = %dest.display(), volume_size, "writing multi-volume archive");
            let stream = VolumeWriter::new(dest, volume_size)
                .map_err(|e| CreatorError::io(e, VolumeWriter::volume_path(dest, 0)))?;
            return Ok(AcquiredTarget {
                writer,
                target: OutputTarget::MultiVolume { path: dest.to_path_buf(), volume_size, stream },
            });
        }

        match fsx::create_new(dest) {
            Ok(stream) => {
                info!(dest = %dest.display(), "writing new archive");
                let target = OutputTarget::SingleFile { path: dest.to_path_buf(), stream };
                Ok(AcquiredTarget { writer, target })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                // The fresh writer is replaced by one initialised from the prior archive.
                drop(writer);
                self.update_target(dest)
            }
            Err(e) => Err(CreatorError::Io { source: e, path: dest.to_path_buf() }),
        }
    }

    fn update_target(&self, dest: &Path) -> Result<AcquiredTarget<'static>, CreatorError> {
        if !self.settings.update_mode() {
            return Err(CreatorError::State(format!(
                "Cannot update existing archive file '{}' without update mode",
                dest.display()
            )));
        }
        let format = self.settings.format();
        if !format.has_feature(FormatFeatures::MULTIPLE_FILES) {
            return Err(CreatorError::Configuration(format!(
                "The {} format does not support updating existing archive files",
                format
            )));
        }

        let temp_path = fsx::temp_path_for(dest);
        let stream = fsx::create_new(&temp_path).map_err(|e| CreatorError::io(e, &temp_path))?;

        match self.open_prior(dest) {
            Ok((writer, prior)) => {
                info!(
                    dest = %dest.display(),
                    temp = %temp_path.display(),
                    "updating existing archive"
                );
                let path = dest.to_path_buf();
                let target = OutputTarget::InPlaceUpdate { path, temp_path, stream, prior };
                Ok(AcquiredTarget { writer, target })
            }
            Err(err) => {
                drop(stream);
                if let Err(e) = fsx::remove_if_exists(&temp_path) {
                    warn!(temp = %temp_path.display(), error = %e, "could not remove temp archive");
                }
                Err(err)
            }
        }
    }

    fn open_prior(
        &self,
        dest: &Path,
    ) -> Result<(Box<dyn ArchiveWriter>, Box<dyn PriorArchive>), CreatorError> {
        let mut prior = self.engine.open_archive(self.settings.format(), dest)?;
        let mut writer = prior.updatable_writer()?;
        self.properties.apply(writer.as_mut())?;
        Ok((writer, prior))
    }

    /// Target over an in-memory buffer. The buffer is cleared first; no update applies.
    pub fn for_buffer<'a>(
        &self,
        buffer: &'a mut Vec<u8>,
    ) -> Result<AcquiredTarget<'a>, CreatorError> {
        let writer = self.new_writer()?;
        buffer.clear();
        Ok(AcquiredTarget { writer, target: OutputTarget::Buffer(Cursor::new(buffer)) })
    }

    /// Target over a caller-supplied stream; no update applies.
    pub fn for_stream<'a>(
        &self,
        stream: &'a mut dyn OutStream,
    ) -> Result<AcquiredTarget<'a>, CreatorError> {
        let writer = self.new_writer()?;
        Ok(AcquiredTarget { writer, target: OutputTarget::Stream(stream) })
    }
}
