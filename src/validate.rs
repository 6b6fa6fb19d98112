//! Compatibility policy between formats, methods and dictionary sizes.
//!
//! Both checks are plain table lookups with no I/O so the policy can be audited and
//! tested on its own.

use crate::format::{ArchiveFormat, CompressionMethod};

/// Formats accepting each restricted method. Methods missing from the table are valid everywhere.
const METHOD_FORMATS: &[(CompressionMethod, &[ArchiveFormat])] = &[
    (
        CompressionMethod::Copy,
        &[ArchiveFormat::SevenZip, ArchiveFormat::Zip, ArchiveFormat::Tar, ArchiveFormat::Wim],
    ),
    (CompressionMethod::Ppmd, &[ArchiveFormat::SevenZip, ArchiveFormat::Zip]),
    (CompressionMethod::Lzma, &[ArchiveFormat::SevenZip, ArchiveFormat::Zip]),
    (CompressionMethod::Lzma2, &[ArchiveFormat::SevenZip, ArchiveFormat::Xz]),
    (
        CompressionMethod::BZip2,
        &[ArchiveFormat::SevenZip, ArchiveFormat::BZip2, ArchiveFormat::Zip],
    ),
    (CompressionMethod::Deflate, &[ArchiveFormat::GZip, ArchiveFormat::Zip]),
    (CompressionMethod::Deflate64, &[ArchiveFormat::Zip]),
];

const MIB: u32 = 1 << 20;
const KIB: u32 = 1 << 10;

#[derive(Debug, Clone, Copy)]
enum DictionaryRule {
    AtMost(u32),
    Exactly(u32),
}

const DICTIONARY_RULES: &[(CompressionMethod, DictionaryRule)] = &[
    (CompressionMethod::Lzma, DictionaryRule::AtMost(1536 * MIB)),
    (CompressionMethod::Lzma2, DictionaryRule::AtMost(1536 * MIB)),
    (CompressionMethod::Ppmd, DictionaryRule::AtMost(1 << 30)),
    (CompressionMethod::BZip2, DictionaryRule::AtMost(900 * KIB)),
    (CompressionMethod::Deflate64, DictionaryRule::Exactly(64 * KIB)),
    (CompressionMethod::Deflate, DictionaryRule::Exactly(32 * KIB)),
];

/// Whether `method` can be used inside a `format` archive.
pub fn is_method_compatible(format: ArchiveFormat, method: CompressionMethod) -> bool {
    METHOD_FORMATS
        .iter()
        .find(|(m, _)| *m == method)
        .map_or(true, |(_, formats)| formats.contains(&format))
}

/// Whether `size` bytes is an acceptable dictionary for `method`.
pub fn is_dictionary_size_valid(method: CompressionMethod, size: u32) -> bool {
    match DICTIONARY_RULES.iter().find(|(m, _)| *m == method) {
        Some((_, DictionaryRule::AtMost(max))) => size <= *max,
        Some((_, DictionaryRule::Exactly(required))) => size == *required,
        None => true,
    }
}
