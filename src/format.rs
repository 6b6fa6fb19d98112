//! # Formats, methods and levels
//!
//! Identifiers for the archive containers the engine can produce, the capabilities each
//! container advertises, and the compression methods/levels that can be requested.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CreatorError;

/// Capability set advertised by an archive format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatFeatures(u8);

impl FormatFeatures {
    /// The archive can hold more than one item (and can therefore be updated).
    pub const MULTIPLE_FILES: FormatFeatures = FormatFeatures(1 << 0);
    pub const SOLID_ARCHIVE: FormatFeatures = FormatFeatures(1 << 1);
    pub const COMPRESSION_LEVEL: FormatFeatures = FormatFeatures(1 << 2);
    pub const ENCRYPTION: FormatFeatures = FormatFeatures(1 << 3);
    pub const HEADER_ENCRYPTION: FormatFeatures = FormatFeatures(1 << 4);
    /// More than one compression method can be selected.
    pub const MULTIPLE_METHODS: FormatFeatures = FormatFeatures(1 << 5);

    pub const fn empty() -> Self {
        FormatFeatures(0)
    }

    pub const fn union(self, other: FormatFeatures) -> Self {
        FormatFeatures(self.0 | other.0)
    }

    pub const fn contains(self, other: FormatFeatures) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for FormatFeatures {
    type Output = FormatFeatures;

    fn bitor(self, rhs: FormatFeatures) -> FormatFeatures {
        self.union(rhs)
    }
}

/// Archive container types that can be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    /// The umbrella 7-zip format; supports every capability.
    #[serde(rename = "7z")]
    SevenZip,
    Zip,
    Tar,
    Wim,
    Xz,
    BZip2,
    GZip,
}

impl ArchiveFormat {
    pub const ALL: [ArchiveFormat; 7] = [
        ArchiveFormat::SevenZip,
        ArchiveFormat::Zip,
        ArchiveFormat::Tar,
        ArchiveFormat::Wim,
        ArchiveFormat::Xz,
        ArchiveFormat::BZip2,
        ArchiveFormat::GZip,
    ];

    pub fn features(self) -> FormatFeatures {
        use FormatFeatures as F;
        match self {
            ArchiveFormat::SevenZip => {
                F::MULTIPLE_FILES
                    | F::SOLID_ARCHIVE
                    | F::COMPRESSION_LEVEL
                    | F::ENCRYPTION
                    | F::HEADER_ENCRYPTION
                    | F::MULTIPLE_METHODS
            }
            ArchiveFormat::Zip => {
                F::MULTIPLE_FILES | F::COMPRESSION_LEVEL | F::ENCRYPTION | F::MULTIPLE_METHODS
            }
            ArchiveFormat::Tar | ArchiveFormat::Wim => F::MULTIPLE_FILES,
            ArchiveFormat::Xz | ArchiveFormat::BZip2 | ArchiveFormat::GZip => F::COMPRESSION_LEVEL,
        }
    }

    pub fn has_feature(self, feature: FormatFeatures) -> bool {
        self.features().contains(feature)
    }

    /// The method in effect when none has been chosen, and the only one for single-method formats.
    pub fn default_method(self) -> CompressionMethod {
        match self {
            ArchiveFormat::SevenZip | ArchiveFormat::Xz => CompressionMethod::Lzma2,
            ArchiveFormat::Zip | ArchiveFormat::GZip => CompressionMethod::Deflate,
            ArchiveFormat::Tar | ArchiveFormat::Wim => CompressionMethod::Copy,
            ArchiveFormat::BZip2 => CompressionMethod::BZip2,
        }
    }

    /// Class identifier handed to the engine when asking for a writer handle.
    pub fn class_id(self) -> u8 {
        match self {
            ArchiveFormat::Zip => 0x01,
            ArchiveFormat::BZip2 => 0x02,
            ArchiveFormat::SevenZip => 0x07,
            ArchiveFormat::Xz => 0x0C,
            ArchiveFormat::Wim => 0xE6,
            ArchiveFormat::Tar => 0xEE,
            ArchiveFormat::GZip => 0xEF,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::SevenZip => "7z",
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::Wim => "wim",
            ArchiveFormat::Xz => "xz",
            ArchiveFormat::BZip2 => "bz2",
            ArchiveFormat::GZip => "gz",
        }
    }

    fn name(self) -> &'static str {
        match self {
            ArchiveFormat::SevenZip => "7z",
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::Wim => "wim",
            ArchiveFormat::Xz => "xz",
            ArchiveFormat::BZip2 => "bzip2",
            ArchiveFormat::GZip => "gzip",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ArchiveFormat {
    type Err = CreatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        ArchiveFormat::ALL
            .into_iter()
            .find(|f| f.name() == lower || f.extension() == lower)
            .ok_or_else(|| CreatorError::Configuration(format!("Unknown archive format '{}'", s)))
    }
}

/// Compression algorithms that can be requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    Copy,
    Deflate,
    Deflate64,
    BZip2,
    Lzma,
    Lzma2,
    Ppmd,
}

impl CompressionMethod {
    pub const ALL: [CompressionMethod; 7] = [
        CompressionMethod::Copy,
        CompressionMethod::Deflate,
        CompressionMethod::Deflate64,
        CompressionMethod::BZip2,
        CompressionMethod::Lzma,
        CompressionMethod::Lzma2,
        CompressionMethod::Ppmd,
    ];

    /// Name understood by the engine's method property.
    pub fn engine_name(self) -> &'static str {
        match self {
            CompressionMethod::Copy => "Copy",
            CompressionMethod::Deflate => "Deflate",
            CompressionMethod::Deflate64 => "Deflate64",
            CompressionMethod::BZip2 => "BZip2",
            CompressionMethod::Lzma => "LZMA",
            CompressionMethod::Lzma2 => "LZMA2",
            CompressionMethod::Ppmd => "PPMd",
        }
    }

    /// Methods whose dictionary is fixed (or absent); an explicit size is never stored for them.
    pub fn has_fixed_dictionary(self) -> bool {
        matches!(
            self,
            CompressionMethod::Copy | CompressionMethod::Deflate | CompressionMethod::Deflate64
        )
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.engine_name())
    }
}

impl FromStr for CompressionMethod {
    type Err = CreatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompressionMethod::ALL
            .into_iter()
            .find(|m| m.engine_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                CreatorError::Configuration(format!("Unknown compression method '{}'", s))
            })
    }
}

/// Ordinal compression intensity; the discriminant is the value sent to the engine.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    None = 0,
    Fastest = 1,
    Fast = 3,
    #[default]
    Normal = 5,
    Max = 7,
    Ultra = 9,
}

impl CompressionLevel {
    pub fn ordinal(self) -> u32 {
        self as u32
    }

    /// Maps a raw engine value back to a level; only the defined ordinals are accepted.
    pub fn from_ordinal(value: u32) -> Option<Self> {
        match value {
            0 => Some(CompressionLevel::None),
            1 => Some(CompressionLevel::Fastest),
            3 => Some(CompressionLevel::Fast),
            5 => Some(CompressionLevel::Normal),
            7 => Some(CompressionLevel::Max),
            9 => Some(CompressionLevel::Ultra),
            _ => None,
        }
    }
}

impl FromStr for CompressionLevel {
    type Err = CreatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CompressionLevel::None),
            "fastest" => Ok(CompressionLevel::Fastest),
            "fast" => Ok(CompressionLevel::Fast),
            "normal" => Ok(CompressionLevel::Normal),
            "max" => Ok(CompressionLevel::Max),
            "ultra" => Ok(CompressionLevel::Ultra),
            other => other
                .parse::<u32>()
                .ok()
                .and_then(CompressionLevel::from_ordinal)
                .ok_or_else(|| {
                    CreatorError::Configuration(format!("Unknown compression level '{}'", s))
                }),
        }
    }
}
