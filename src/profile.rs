//! Session profiles: a serializable description of [`CompressionSettings`].
//!
//! A profile is applied through the validating setters, so loading one can never produce
//! settings that break their invariants. The password never lives in a profile; it is
//! resolved separately with [`resolve_password`].

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::format::{ArchiveFormat, CompressionLevel, CompressionMethod};
use crate::settings::CompressionSettings;
use crate::CreatorError;

/// Environment variable consulted for the archive password.
pub const PASSWORD_ENV: &str = "ARCFORGE_PASSWORD";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CreatorProfile {
    pub format: ArchiveFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<CompressionMethod>,
    #[serde(default)]
    pub level: CompressionLevel,
    /// Bytes; `0` lets the engine choose.
    #[serde(default)]
    pub dictionary_size: u32,
    #[serde(default)]
    pub solid: bool,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub volume_size: u64,
    #[serde(default)]
    pub crypt_headers: bool,
}

impl CreatorProfile {
    pub fn new(format: ArchiveFormat) -> Self {
        Self {
            format,
            method: None,
            level: CompressionLevel::Normal,
            dictionary_size: 0,
            solid: false,
            update: false,
            volume_size: 0,
            crypt_headers: false,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CreatorError> {
        serde_json::from_str(json)
            .map_err(|e| CreatorError::Configuration(format!("Invalid profile: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self, CreatorError> {
        let text = std::fs::read_to_string(path).map_err(|e| CreatorError::io(e, path))?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, CreatorError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CreatorError::Configuration(format!("Cannot serialize profile: {}", e)))
    }

    /// Builds settings, applying level before method before dictionary size since each
    /// of the first two resets the dictionary.
    pub fn into_settings(
        &self,
        password: Option<String>,
    ) -> Result<CompressionSettings, CreatorError> {
        let mut settings = CompressionSettings::new(self.format);
        settings.set_compression_level(self.level);
        if let Some(method) = self.method {
            settings.set_compression_method(method)?;
        }
        if self.dictionary_size != 0 {
            settings.set_dictionary_size(self.dictionary_size)?;
        }
        settings.set_solid_mode(self.solid);
        settings.set_update_mode(self.update);
        settings.set_volume_size(self.volume_size);
        settings.set_password_with_headers(password.unwrap_or_default(), self.crypt_headers);
        Ok(settings)
    }
}

/// Password precedence: explicit value, then [`PASSWORD_ENV`], then none.
pub fn resolve_password(explicit: Option<String>) -> Option<String> {
    if let Some(pass) = explicit {
        return Some(pass);
    }
    std::env::var(PASSWORD_ENV).ok().filter(|p| !p.is_empty())
}
