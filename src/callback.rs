//! Items handed to the engine and the callback it pulls them through.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt; // mode() helper

use tracing::warn;
use walkdir::WalkDir;

use crate::CreatorError;

/// Where an item's bytes come from.
#[derive(Debug, Clone)]
pub enum ItemSource {
    File(PathBuf),
    Buffer(Vec<u8>),
    Directory,
}

/// A single entry to be written to the archive.
#[derive(Debug, Clone)]
pub struct ArchiveItem {
    /// Path inside the archive, always `/`-separated.
    pub name: String,
    pub source: ItemSource,
    pub size: u64,
    pub modified_time: u64, // Unix timestamp
    pub permissions: Option<u32>,
}

impl ArchiveItem {
    pub fn from_buffer(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: data.len() as u64,
            source: ItemSource::Buffer(data),
            modified_time: 0,
            permissions: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.source, ItemSource::Directory)
    }

    fn from_disk(path: &Path, name: String) -> Result<Self, CreatorError> {
        let metadata = std::fs::metadata(path).map_err(|e| CreatorError::io(e, path))?;
        let modified_time = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs());
        let permissions = {
            #[cfg(unix)]
            {
                Some(metadata.permissions().mode())
            }
            #[cfg(not(unix))]
            {
                None
            }
        };
        let (source, size) = if metadata.is_dir() {
            (ItemSource::Directory, 0)
        } else {
            (ItemSource::File(path.to_path_buf()), metadata.len())
        };
        Ok(Self { name, source, size, modified_time, permissions })
    }
}

/// The ordered set of items a commit writes.
#[derive(Debug, Clone, Default)]
pub struct ItemSet {
    items: Vec<ArchiveItem>,
}

impl ItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, or a directory and everything below it.
    ///
    /// Names are relative to the parent of `path`, so adding `/data/logs` yields
    /// `logs`, `logs/a.txt`, ... Only normal components make up a name: adding `.`
    /// yields `a.txt`, not `./a.txt`. Symlinks are skipped.
    pub fn add_path(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, CreatorError> {
        let path = path.as_ref();
        let base = path.parent().unwrap_or_else(|| Path::new(""));

        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let at = e.path().unwrap_or(path).to_path_buf();
                CreatorError::io(e.into(), at)
            })?;
            if entry.file_type().is_symlink() {
                continue;
            }
            let relative = entry.path().strip_prefix(base).unwrap_or(entry.path());
            let name = archive_name(relative);
            if name.is_empty() {
                continue;
            }
            self.items.push(ArchiveItem::from_disk(entry.path(), name)?);
        }
        Ok(self)
    }

    /// Adds a file under an explicit archive name.
    pub fn add_file_as(
        &mut self,
        path: impl AsRef<Path>,
        name: impl Into<String>,
    ) -> Result<&mut Self, CreatorError> {
        let item = ArchiveItem::from_disk(path.as_ref(), name.into())?;
        self.items.push(item);
        Ok(self)
    }

    pub fn add_buffer(&mut self, name: impl Into<String>, data: Vec<u8>) -> &mut Self {
        self.items.push(ArchiveItem::from_buffer(name, data));
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item count as the engine protocol carries it.
    pub fn items_count(&self) -> Result<u32, CreatorError> {
        checked_count(self.items.len())
    }

    pub fn items(&self) -> &[ArchiveItem] {
        &self.items
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.items.iter().any(|i| i.name == name)
    }
}

fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn checked_count(len: usize) -> Result<u32, CreatorError> {
    u32::try_from(len).map_err(|_| {
        CreatorError::Configuration(format!(
            "Too many items for one archive: {} (at most {})",
            len,
            u32::MAX
        ))
    })
}

/// What the engine calls back into while writing: item enumeration, item data,
/// the password, and error reporting.
pub trait UpdateCallback {
    fn items_count(&self) -> u32;

    fn item(&self, index: u32) -> Option<&ArchiveItem>;

    /// Opens a reader over the item's content. Directories yield an empty reader.
    fn open_item(&mut self, index: u32) -> io::Result<Box<dyn Read + '_>>;

    fn password(&self) -> Option<&str>;

    /// Records a failure; the first message reported is kept.
    fn report_error(&mut self, message: String);

    fn error_message(&self) -> &str;
}

/// [`UpdateCallback`] over an [`ItemSet`].
pub struct CompressCallback<'a> {
    items: &'a ItemSet,
    password: Option<&'a str>,
    error_message: String,
}

impl<'a> CompressCallback<'a> {
    pub fn new(items: &'a ItemSet, password: Option<&'a str>) -> Self {
        Self { items, password: password.filter(|p| !p.is_empty()), error_message: String::new() }
    }
}

impl<'a> UpdateCallback for CompressCallback<'a> {
    /// Saturates at `u32::MAX`; [`ItemSet::items_count`] reports larger sets as an error
    /// and the commit pipeline checks it before the engine runs.
    fn items_count(&self) -> u32 {
        self.items.items_count().unwrap_or(u32::MAX)
    }

    fn item(&self, index: u32) -> Option<&ArchiveItem> {
        self.items.items.get(index as usize)
    }

    fn open_item(&mut self, index: u32) -> io::Result<Box<dyn Read + '_>> {
        let items: &'a ItemSet = self.items;
        let item = items.items.get(index as usize).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no item at index {}", index))
        })?;
        match &item.source {
            ItemSource::File(path) => match File::open(path) {
                Ok(file) => Ok(Box::new(file)),
                Err(e) => {
                    self.report_error(format!("Cannot open '{}': {}", path.display(), e));
                    Err(e)
                }
            },
            ItemSource::Buffer(data) => Ok(Box::new(data.as_slice())),
            ItemSource::Directory => Ok(Box::new(io::empty())),
        }
    }

    fn password(&self) -> Option<&str> {
        self.password
    }

    fn report_error(&mut self, message: String) {
        warn!(%message, "engine reported an error");
        if self.error_message.is_empty() {
            self.error_message = message;
        }
    }

    fn error_message(&self) -> &str {
        &self.error_message
    }
}
