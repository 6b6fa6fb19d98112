//! # arcforge
//!
//! Archive-creation configuration and commit pipeline.
//!
//! This crate turns user-chosen compression parameters into validated settings, projects
//! them onto the name/value property protocol of a compression engine, and drives the
//! engine to produce an archive: a new file, a set of fixed-size volumes, an in-memory
//! buffer, or a safe in-place update of an existing archive.
//!
//! ## Key Modules
//!
//! - [`settings`]: [`CompressionSettings`], validated on every mutation.
//! - [`validate`]: format/method/dictionary compatibility tables.
//! - [`props`]: the engine property bag.
//! - [`target`]: where the output goes and what must be opened for it.
//! - [`commit`]: the commit pipeline tying it all together.
//! - [`engine`]: the traits an engine implements; [`native`] is a reference engine.
//!
//! ## Examples
//!
//! ```no_run
//! use arcforge::{ArchiveFormat, CommitPipeline, CompressionSettings, ItemSet, NativeEngine};
//!
//! # fn main() -> Result<(), arcforge::CreatorError> {
//! let mut settings = CompressionSettings::new(ArchiveFormat::Zip);
//! settings.set_update_mode(true);
//!
//! let mut items = ItemSet::new();
//! items.add_path("docs")?;
//!
//! let report =
//!     CommitPipeline::new(&settings, NativeEngine::new()).commit_to_path("docs.zip", &items)?;
//! println!("{:?}", report.state);
//! # Ok(())
//! # }
//! ```

pub mod callback;
pub mod commit;
pub mod engine;
pub mod error;
pub mod format;
pub mod native;
pub mod profile;
pub mod props;
pub mod settings;
pub mod target;
pub mod validate;
pub mod volume;

// Filesystem helpers for temp paths and rename-with-overwrite
pub mod fsx;

pub use callback::{ArchiveItem, CompressCallback, ItemSet, UpdateCallback};
pub use commit::{CommitPipeline, CommitReport, CommitState};
pub use engine::{ArchiveWriter, Engine, OutStream, PriorArchive, ResultCode, SetProperties};
pub use error::{CreatorError, ErrorKind};
pub use format::{ArchiveFormat, CompressionLevel, CompressionMethod, FormatFeatures};
pub use native::NativeEngine;
pub use profile::CreatorProfile;
pub use props::{PropertyBag, PropertyValue};
pub use settings::CompressionSettings;
pub use target::{OutputTarget, OutputTargetFactory, TargetKind};
