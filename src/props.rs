//! # Engine property bag
//!
//! Projects [`CompressionSettings`] onto the name/value protocol the engine understands.
//! Names are static protocol tokens and values are owned by the bag, so both parallel
//! arrays outlive any call made with them.

use std::fmt;

use tracing::debug;

use crate::engine::{ArchiveWriter, ResultCode};
use crate::format::{ArchiveFormat, CompressionMethod, FormatFeatures};
use crate::settings::{CompressionSettings, DEFAULT_DICTIONARY_SIZE};
use crate::CreatorError;

pub const HEADER_ENCRYPTION: &str = "he";
pub const LEVEL: &str = "x";
pub const SOLID: &str = "s";

/// A tagged property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Bool(bool),
    UInt(u32),
    Str(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::UInt(n) => write!(f, "{}", n),
            PropertyValue::Str(s) => f.write_str(s),
        }
    }
}

/// Ordered properties stored as two parallel arrays of equal length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyBag {
    names: Vec<&'static str>,
    values: Vec<PropertyValue>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the bag for `settings`.
    ///
    /// Order is header encryption, level, method, solid, dictionary; each entry is only
    /// present when the format advertises the matching capability (the dictionary entry
    /// only when an explicit size is set).
    pub fn from_settings(settings: &CompressionSettings) -> Self {
        let format = settings.format();
        let method = settings.compression_method();
        let mut bag = PropertyBag::new();

        if settings.crypt_headers() && format.has_feature(FormatFeatures::HEADER_ENCRYPTION) {
            bag.push(HEADER_ENCRYPTION, PropertyValue::Bool(true));
        }
        if format.has_feature(FormatFeatures::COMPRESSION_LEVEL) {
            bag.push(LEVEL, PropertyValue::UInt(settings.compression_level().ordinal()));

            if format.has_feature(FormatFeatures::MULTIPLE_METHODS)
                && method != format.default_method()
            {
                let name = method.engine_name().to_string();
                bag.push(method_token(format), PropertyValue::Str(name));
            }
        }
        if format.has_feature(FormatFeatures::SOLID_ARCHIVE) {
            bag.push(SOLID, PropertyValue::Bool(settings.solid_mode()));
        }
        if settings.dictionary_size() != DEFAULT_DICTIONARY_SIZE {
            bag.push(
                dictionary_token(format, method),
                PropertyValue::Str(format!("{}b", settings.dictionary_size())),
            );
        }
        bag
    }

    fn push(&mut self, name: &'static str, value: PropertyValue) {
        self.names.push(name);
        self.values.push(value);
    }

    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    pub fn values(&self) -> &[PropertyValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.names.iter().position(|n| *n == name).map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &PropertyValue)> + '_ {
        self.names.iter().copied().zip(self.values.iter())
    }

    /// Hands the bag to `writer`. An empty bag issues no call at all.
    pub fn apply(&self, writer: &mut dyn ArchiveWriter) -> Result<(), CreatorError> {
        if self.is_empty() {
            debug!("no archive properties to set");
            return Ok(());
        }
        let setter = writer
            .property_setter()
            .ok_or_else(|| {
                CreatorError::Engine("Archive properties are unsupported by the engine".into())
            })?;
        match setter.set_properties(&self.names, &self.values) {
            ResultCode::Ok => {
                debug!(properties = %self, "archive properties set");
                Ok(())
            }
            code => Err(CreatorError::Engine(format!(
                "Cannot set properties of the archive ({:?})",
                code
            ))),
        }
    }
}

impl fmt::Display for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}

fn method_token(format: ArchiveFormat) -> &'static str {
    if format == ArchiveFormat::SevenZip {
        "0"
    } else {
        "m"
    }
}

fn dictionary_token(format: ArchiveFormat, method: CompressionMethod) -> &'static str {
    match (format == ArchiveFormat::SevenZip, method == CompressionMethod::Ppmd) {
        (true, true) => "0mem",
        (true, false) => "0d",
        (false, true) => "mem",
        (false, false) => "d",
    }
}
