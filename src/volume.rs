//! Output stream split across fixed-size volume files.
//!
//! Volumes are named `<base>.001`, `<base>.002`, ... The first is created up front and
//! the rest on demand as the write position crosses each boundary. Every volume is
//! created exclusively: an existing file at a volume path is an `AlreadyExists` error,
//! never overwritten. The stream is seekable across boundaries so engines that patch
//! headers after writing still work.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::fsx;

pub struct VolumeWriter {
    base: PathBuf,
    volume_size: u64,
    volumes: Vec<File>,
    position: u64,
    length: u64,
}

impl VolumeWriter {
    /// Creates `<base>.001`. `volume_size` must be non-zero.
    pub fn new(base: impl Into<PathBuf>, volume_size: u64) -> io::Result<Self> {
        if volume_size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "volume size must be greater than zero",
            ));
        }
        let mut writer =
            Self { base: base.into(), volume_size, volumes: Vec::new(), position: 0, length: 0 };
        writer.volume(0)?;
        Ok(writer)
    }

    /// Path of the volume at zero-based `index`.
    pub fn volume_path(base: &Path, index: usize) -> PathBuf {
        let mut name = base.as_os_str().to_os_string();
        name.push(format!(".{:03}", index + 1));
        PathBuf::from(name)
    }

    pub fn volume_size(&self) -> u64 {
        self.volume_size
    }

    pub fn volume_count(&self) -> usize {
        self.volumes.len()
    }

    /// Paths of every volume created so far, in order.
    pub fn paths(&self) -> Vec<PathBuf> {
        (0..self.volumes.len()).map(|i| Self::volume_path(&self.base, i)).collect()
    }

    /// Total bytes written across all volumes.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn volume(&mut self, index: usize) -> io::Result<&mut File> {
        while self.volumes.len() <= index {
            let path = Self::volume_path(&self.base, self.volumes.len());
            let file = fsx::create_new(&path)?;
            debug!(volume = %path.display(), "created volume");
            self.volumes.push(file);
        }
        Ok(&mut self.volumes[index])
    }
}

impl Write for VolumeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let index = (self.position / self.volume_size) as usize;
        let offset = self.position % self.volume_size;
        let room = (self.volume_size - offset).min(buf.len() as u64) as usize;

        let file = self.volume(index)?;
        file.seek(SeekFrom::Start(offset))?;
        let written = file.write(&buf[..room])?;

        self.position += written as u64;
        self.length = self.length.max(self.position);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        for file in &mut self.volumes {
            file.flush()?;
        }
        Ok(())
    }
}

impl Seek for VolumeWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => self.length.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        match target {
            Some(n) => {
                self.position = n;
                Ok(n)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}
