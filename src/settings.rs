//! # Compression settings
//!
//! One [`CompressionSettings`] value describes a single archive-creation session. Every
//! setter validates its input before touching state, so a rejected call leaves the
//! previous value in place and the invariants below always hold:
//!
//! - `method` is valid for `format`;
//! - `dictionary_size` is either `0` (engine default) or valid for `method`;
//! - `crypt_headers` is only `true` when a non-empty password is set.
//!
//! ## Single-method formats
//!
//! Calling [`CompressionSettings::set_compression_method`] on a format that does not
//! advertise [`FormatFeatures::MULTIPLE_METHODS`] checks the method against the format but
//! then **keeps the format's own method** without reporting anything. Callers depend on
//! this being a silent no-op rather than an error.

use tracing::debug;

use crate::format::{ArchiveFormat, CompressionLevel, CompressionMethod, FormatFeatures};
use crate::validate::{is_dictionary_size_valid, is_method_compatible};
use crate::CreatorError;

/// Dictionary size value meaning "let the engine pick one for the level".
pub const DEFAULT_DICTIONARY_SIZE: u32 = 0;

#[derive(Clone)]
pub struct CompressionSettings {
    format: ArchiveFormat,
    method: CompressionMethod,
    level: CompressionLevel,
    dictionary_size: u32,
    solid_mode: bool,
    update_mode: bool,
    crypt_headers: bool,
    volume_size: u64,
    password: String,
}

impl CompressionSettings {
    pub fn new(format: ArchiveFormat) -> Self {
        Self {
            format,
            method: format.default_method(),
            level: CompressionLevel::Normal,
            dictionary_size: DEFAULT_DICTIONARY_SIZE,
            solid_mode: false,
            update_mode: false,
            crypt_headers: false,
            volume_size: 0,
            password: String::new(),
        }
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    pub fn compression_method(&self) -> CompressionMethod {
        self.method
    }

    pub fn compression_level(&self) -> CompressionLevel {
        self.level
    }

    pub fn dictionary_size(&self) -> u32 {
        self.dictionary_size
    }

    pub fn solid_mode(&self) -> bool {
        self.solid_mode
    }

    pub fn update_mode(&self) -> bool {
        self.update_mode
    }

    pub fn crypt_headers(&self) -> bool {
        self.crypt_headers
    }

    pub fn volume_size(&self) -> u64 {
        self.volume_size
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn is_password_defined(&self) -> bool {
        !self.password.is_empty()
    }

    /// Sets the password, keeping header encryption only if it was requested and `password`
    /// is non-empty.
    pub fn set_password(&mut self, password: impl Into<String>) {
        let crypt = self.crypt_headers;
        self.set_password_with_headers(password, crypt);
    }

    pub fn set_password_with_headers(&mut self, password: impl Into<String>, crypt_headers: bool) {
        self.password = password.into();
        self.crypt_headers = self.is_password_defined() && crypt_headers;
        debug!(crypt_headers = self.crypt_headers, "password updated");
    }

    /// Requests header encryption; resolves to `false` while no password is set.
    pub fn set_crypt_headers(&mut self, crypt_headers: bool) {
        self.crypt_headers = self.is_password_defined() && crypt_headers;
        debug!(
            requested = crypt_headers,
            crypt_headers = self.crypt_headers,
            "crypt headers updated"
        );
    }

    /// Sets the level and resets the dictionary size to the engine default for that level.
    pub fn set_compression_level(&mut self, level: CompressionLevel) {
        self.level = level;
        self.dictionary_size = DEFAULT_DICTIONARY_SIZE;
        debug!(?level, "compression level updated");
    }

    pub fn set_compression_method(
        &mut self,
        method: CompressionMethod,
    ) -> Result<(), CreatorError> {
        if !is_method_compatible(self.format, method) {
            return Err(CreatorError::Configuration(format!(
                "Invalid compression method {} for the {} archive format",
                method, self.format
            )));
        }
        if self.format.has_feature(FormatFeatures::MULTIPLE_METHODS) {
            self.method = method;
            self.dictionary_size = DEFAULT_DICTIONARY_SIZE;
            debug!(%method, "compression method updated");
        } else {
            debug!(
                %method,
                kept = %self.method,
                format = %self.format,
                "format has a single method; method change ignored"
            );
        }
        Ok(())
    }

    pub fn set_dictionary_size(&mut self, dictionary_size: u32) -> Result<(), CreatorError> {
        if !is_dictionary_size_valid(self.method, dictionary_size) {
            return Err(CreatorError::Configuration(format!(
                "Invalid dictionary size {} for the {} compression method",
                dictionary_size, self.method
            )));
        }
        if self.method.has_fixed_dictionary() {
            debug!(method = %self.method, "method has a fixed dictionary; size not stored");
        } else {
            self.dictionary_size = dictionary_size;
            debug!(dictionary_size, "dictionary size updated");
        }
        Ok(())
    }

    pub fn set_solid_mode(&mut self, solid_mode: bool) {
        self.solid_mode = solid_mode;
    }

    pub fn set_update_mode(&mut self, update_mode: bool) {
        self.update_mode = update_mode;
    }

    /// `0` writes a single file; any other value splits the output into volumes of that many bytes.
    pub fn set_volume_size(&mut self, volume_size: u64) {
        self.volume_size = volume_size;
    }

    /// Re-checks the invariants the setters maintain.
    pub fn validate(&self) -> Result<(), CreatorError> {
        if !is_method_compatible(self.format, self.method) {
            return Err(CreatorError::Configuration(format!(
                "Compression method {} is not valid for the {} archive format",
                self.method, self.format
            )));
        }
        if self.dictionary_size != DEFAULT_DICTIONARY_SIZE
            && !is_dictionary_size_valid(self.method, self.dictionary_size)
        {
            return Err(CreatorError::Configuration(format!(
                "Dictionary size {} is not valid for the {} compression method",
                self.dictionary_size, self.method
            )));
        }
        if self.crypt_headers && !self.is_password_defined() {
            return Err(CreatorError::Configuration(
                "Header encryption requires a password".into(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for CompressionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionSettings")
            .field("format", &self.format)
            .field("method", &self.method)
            .field("level", &self.level)
            .field("dictionary_size", &self.dictionary_size)
            .field("solid_mode", &self.solid_mode)
            .field("update_mode", &self.update_mode)
            .field("crypt_headers", &self.crypt_headers)
            .field("volume_size", &self.volume_size)
            .field("password", &if self.password.is_empty() { "<none>" } else { "<set>" })
            .finish()
    }
}
