use std::fs::File;
use std::io;

use zip::write::FileOptions;
use zip::{CompressionMethod as ZipMethod, ZipArchive, ZipWriter};

use super::{failed, incoming_names, NativeFailure, NativeProps};
use crate::callback::UpdateCallback;
use crate::engine::OutStream;

const DEFAULT_LEVEL: u32 = 5;

/// Picks the zip method and level for the requested engine method and level.
///
/// Level 0 stores regardless of method, matching how the level property is read by
/// zip engines.
fn method_and_level(props: &NativeProps) -> Result<(ZipMethod, Option<i32>), NativeFailure> {
    let level = props.level.unwrap_or(DEFAULT_LEVEL) as i32;
    if level == 0 {
        return Ok((ZipMethod::Stored, None));
    }
    match props.method.as_deref() {
        None | Some("Deflate") => Ok((ZipMethod::Deflated, Some(level.clamp(0, 9)))),
        Some("BZip2") => Ok((ZipMethod::Bzip2, Some(level.clamp(1, 9)))),
        Some("Copy") => Ok((ZipMethod::Stored, None)),
        Some(_) => Err(NativeFailure::NotImplemented),
    }
}

pub(super) fn write(
    out: &mut dyn OutStream,
    props: &NativeProps,
    prior: Option<&mut File>,
    items_count: u32,
    callback: &mut dyn UpdateCallback,
) -> Result<(), NativeFailure> {
    let (method, level) = method_and_level(props)?;
    let mut zip = ZipWriter::new(out);

    if let Some(file) = prior {
        let replaced = incoming_names(items_count, callback);
        let mut old =
            ZipArchive::new(file).map_err(failed("Cannot read the existing zip archive"))?;
        for i in 0..old.len() {
            let entry = old.by_index_raw(i).map_err(failed("Cannot read an existing zip entry"))?;
            if replaced.contains(entry.name().trim_end_matches('/')) {
                continue;
            }
            zip.raw_copy_file(entry).map_err(failed("Cannot copy an existing zip entry"))?;
        }
    }

    for index in 0..items_count {
        let (name, is_dir, permissions) = match callback.item(index) {
            Some(item) => (item.name.clone(), item.is_dir(), item.permissions),
            None => return Err(NativeFailure::Failed(format!("Missing item {}", index))),
        };
        let mut options =
            FileOptions::default().compression_method(method).compression_level(level);
        if let Some(mode) = permissions {
            options = options.unix_permissions(mode & 0o7777);
        }

        if is_dir {
            zip.add_directory(name, options).map_err(failed("Cannot add a directory"))?;
            continue;
        }
        zip.start_file(name.as_str(), options).map_err(failed("Cannot start a zip entry"))?;
        let copied = {
            let mut reader = callback.open_item(index).map_err(failed("Cannot open an item"))?;
            io::copy(&mut reader, &mut zip)
        };
        copied.map_err(|e| NativeFailure::Failed(format!("Cannot write '{}': {}", name, e)))?;
    }

    zip.finish().map_err(failed("Cannot finish the zip archive"))?;
    Ok(())
}
