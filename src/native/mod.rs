//! # Native engine
//!
//! A reference [`Engine`] built on the `zip`, `tar` and `xz2` crates. It understands the
//! same property protocol an external engine would, which makes it useful both for
//! real archives in the supported formats and for exercising the pipeline end to end.
//!
//! | Format | Methods | Update |
//! |---|---|---|
//! | zip | Copy, Deflate, BZip2 | yes |
//! | tar | Copy | yes |
//! | xz | LZMA2 (one item) | no |
//!
//! Any other method answers [`ResultCode::NotImplemented`], as does encrypted output.

use std::collections::HashSet;
use std::fmt::Display;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::callback::UpdateCallback;
use crate::engine::{ArchiveWriter, Engine, OutStream, PriorArchive, ResultCode, SetProperties};
use crate::format::ArchiveFormat;
use crate::props::PropertyValue;
use crate::CreatorError;

mod tar_writer;
mod xz_writer;
mod zip_writer;

const SUPPORTED_FORMATS: [ArchiveFormat; 3] =
    [ArchiveFormat::Zip, ArchiveFormat::Tar, ArchiveFormat::Xz];

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

impl NativeEngine {
    pub fn new() -> Self {
        NativeEngine
    }

    pub fn supports(format: ArchiveFormat) -> bool {
        SUPPORTED_FORMATS.contains(&format)
    }

    fn check_format(format: ArchiveFormat) -> Result<(), CreatorError> {
        if Self::supports(format) {
            Ok(())
        } else {
            Err(CreatorError::Engine(format!(
                "The {} format is not supported by the native engine",
                format
            )))
        }
    }
}

impl Engine for NativeEngine {
    fn create_writer(&self, format: ArchiveFormat) -> Result<Box<dyn ArchiveWriter>, CreatorError> {
        Self::check_format(format)?;
        Ok(Box::new(NativeWriter::new(format, None)))
    }

    fn open_archive(
        &self,
        format: ArchiveFormat,
        path: &Path,
    ) -> Result<Box<dyn PriorArchive>, CreatorError> {
        Self::check_format(format)?;
        let file = File::open(path).map_err(|e| CreatorError::io(e, path))?;
        debug!(path = %path.display(), %format, "opened prior archive");
        Ok(Box::new(NativePriorArchive { format, path: path.to_path_buf(), file: Some(file) }))
    }
}

struct NativePriorArchive {
    format: ArchiveFormat,
    path: PathBuf,
    file: Option<File>,
}

impl PriorArchive for NativePriorArchive {
    fn updatable_writer(&mut self) -> Result<Box<dyn ArchiveWriter>, CreatorError> {
        let file = self.file.as_ref().ok_or_else(|| {
            CreatorError::State(format!(
                "Prior archive '{}' is already closed",
                self.path.display()
            ))
        })?;
        let handle = file.try_clone().map_err(|e| CreatorError::io(e, &self.path))?;
        Ok(Box::new(NativeWriter::new(self.format, Some(handle))))
    }

    fn close(&mut self) -> Result<(), CreatorError> {
        self.file = None;
        Ok(())
    }
}

/// Settings decoded from the property bag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NativeProps {
    pub level: Option<u32>,
    pub method: Option<String>,
    pub solid: Option<bool>,
    pub dictionary: Option<u32>,
    pub header_encryption: bool,
}

impl NativeProps {
    fn apply(&mut self, name: &str, value: &PropertyValue) -> bool {
        match (name, value) {
            ("x", PropertyValue::UInt(level)) => self.level = Some(*level),
            ("0" | "m", PropertyValue::Str(method)) => self.method = Some(method.clone()),
            ("s", PropertyValue::Bool(solid)) => self.solid = Some(*solid),
            ("he", PropertyValue::Bool(he)) => self.header_encryption = *he,
            ("d" | "0d" | "mem" | "0mem", PropertyValue::Str(size)) => match parse_size(size) {
                Some(bytes) => self.dictionary = Some(bytes),
                None => return false,
            },
            _ => return false,
        }
        true
    }
}

/// Parses `"<n>b"` as used for dictionary sizes.
fn parse_size(value: &str) -> Option<u32> {
    value.strip_suffix('b').unwrap_or(value).parse().ok()
}

/// Why a backend gave up.
pub(crate) enum NativeFailure {
    NotImplemented,
    Failed(String),
}

pub(crate) fn failed<E: Display>(context: &'static str) -> impl FnOnce(E) -> NativeFailure {
    move |e| NativeFailure::Failed(format!("{}: {}", context, e))
}

/// Names of the incoming items; prior entries with one of these names are replaced.
pub(crate) fn incoming_names(items_count: u32, callback: &dyn UpdateCallback) -> HashSet<String> {
    (0..items_count)
        .filter_map(|i| callback.item(i))
        .map(|item| item.name.trim_end_matches('/').to_string())
        .collect()
}

struct NativeWriter {
    format: ArchiveFormat,
    props: NativeProps,
    prior: Option<File>,
}

impl NativeWriter {
    fn new(format: ArchiveFormat, prior: Option<File>) -> Self {
        Self { format, props: NativeProps::default(), prior }
    }
}

impl SetProperties for NativeWriter {
    fn set_properties(&mut self, names: &[&str], values: &[PropertyValue]) -> ResultCode {
        if names.len() != values.len() {
            return ResultCode::InvalidArgument;
        }
        let mut props = self.props.clone();
        for (name, value) in names.iter().zip(values) {
            if !props.apply(name, value) {
                debug!(%name, %value, "unknown property");
                return ResultCode::InvalidArgument;
            }
        }
        self.props = props;
        ResultCode::Ok
    }
}

impl ArchiveWriter for NativeWriter {
    fn property_setter(&mut self) -> Option<&mut dyn SetProperties> {
        Some(self)
    }

    fn update_items(
        &mut self,
        out: &mut dyn OutStream,
        items_count: u32,
        callback: &mut dyn UpdateCallback,
    ) -> ResultCode {
        if self.props.header_encryption || callback.password().is_some() {
            return ResultCode::NotImplemented;
        }
        let prior = self.prior.as_mut();
        let outcome = match self.format {
            ArchiveFormat::Zip => zip_writer::write(out, &self.props, prior, items_count, callback),
            ArchiveFormat::Tar => tar_writer::write(out, prior, items_count, callback),
            ArchiveFormat::Xz => xz_writer::write(out, &self.props, prior, items_count, callback),
            _ => Err(NativeFailure::NotImplemented),
        };
        match outcome {
            Ok(()) => ResultCode::Ok,
            Err(NativeFailure::NotImplemented) => ResultCode::NotImplemented,
            Err(NativeFailure::Failed(message)) => {
                callback.report_error(message);
                ResultCode::Fail
            }
        }
    }
}
