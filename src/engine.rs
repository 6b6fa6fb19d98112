//! # Engine boundary
//!
//! The compression engine is an external collaborator: this crate never compresses
//! anything itself. These traits are the whole contract with it. Handles are owned boxes
//! released when dropped, and every numeric outcome is turned into a [`CreatorError`] in
//! [`check_update_result`].

use std::io::{Seek, Write};
use std::path::Path;

use crate::callback::UpdateCallback;
use crate::format::ArchiveFormat;
use crate::props::PropertyValue;
use crate::CreatorError;

/// Seekable sink the engine writes the archive into.
pub trait OutStream: Write + Seek {}

impl<T: Write + Seek + ?Sized> OutStream for T {}

/// Outcome of an engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Ok,
    /// The operation is not implemented for this format/method combination.
    NotImplemented,
    /// Unspecified failure; details, if any, were reported through the callback.
    Fail,
    InvalidArgument,
    Aborted,
    Other(i32),
}

/// Accepts the property bag; obtained from a writer handle when supported.
pub trait SetProperties {
    fn set_properties(&mut self, names: &[&str], values: &[PropertyValue]) -> ResultCode;
}

/// Handle able to produce an archive of one format.
pub trait ArchiveWriter {
    /// The property-setting capability of this handle, if it has one.
    fn property_setter(&mut self) -> Option<&mut dyn SetProperties>;

    /// Writes `items_count` items enumerated by `callback` into `out`.
    ///
    /// A handle obtained from [`PriorArchive::updatable_writer`] also carries over the
    /// prior archive's items that the callback does not replace.
    fn update_items(
        &mut self,
        out: &mut dyn OutStream,
        items_count: u32,
        callback: &mut dyn UpdateCallback,
    ) -> ResultCode;
}

/// An existing archive opened for update.
pub trait PriorArchive {
    /// A writer initialised from this archive's contents.
    fn updatable_writer(&mut self) -> Result<Box<dyn ArchiveWriter>, CreatorError>;

    /// Releases the underlying file so it can be replaced.
    fn close(&mut self) -> Result<(), CreatorError>;
}

pub trait Engine {
    fn create_writer(&self, format: ArchiveFormat) -> Result<Box<dyn ArchiveWriter>, CreatorError>;

    fn open_archive(
        &self,
        format: ArchiveFormat,
        path: &Path,
    ) -> Result<Box<dyn PriorArchive>, CreatorError>;
}

impl<E: Engine + ?Sized> Engine for &E {
    fn create_writer(&self, format: ArchiveFormat) -> Result<Box<dyn ArchiveWriter>, CreatorError> {
        (**self).create_writer(format)
    }

    fn open_archive(
        &self,
        format: ArchiveFormat,
        path: &Path,
    ) -> Result<Box<dyn PriorArchive>, CreatorError> {
        (**self).open_archive(format, path)
    }
}

/// Maps the result of [`ArchiveWriter::update_items`] onto the crate error taxonomy.
pub fn check_update_result(
    code: ResultCode,
    callback: &dyn UpdateCallback,
) -> Result<(), CreatorError> {
    let message = callback.error_message();
    match code {
        ResultCode::Ok => Ok(()),
        ResultCode::NotImplemented => Err(CreatorError::Engine("Unsupported operation".into())),
        ResultCode::Fail if message.is_empty() => {
            Err(CreatorError::Engine("Failed operation (unknown error)".into()))
        }
        _ if message.is_empty() => {
            Err(CreatorError::Engine(format!("Failed operation ({:?})", code)))
        }
        _ => Err(CreatorError::Engine(message.to_string())),
    }
}
