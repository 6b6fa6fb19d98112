use std::fs::File;
use std::io::{self, Seek, SeekFrom};

use tar::{Archive, Builder, EntryType, Header};

use super::{failed, incoming_names, NativeFailure};
use crate::callback::UpdateCallback;
use crate::engine::OutStream;

pub(super) fn write(
    out: &mut dyn OutStream,
    prior: Option<&mut File>,
    items_count: u32,
    callback: &mut dyn UpdateCallback,
) -> Result<(), NativeFailure> {
    let mut builder = Builder::new(out);

    if let Some(file) = prior {
        let replaced = incoming_names(items_count, callback);
        file.seek(SeekFrom::Start(0)).map_err(failed("Cannot rewind the existing tar archive"))?;
        let mut old = Archive::new(file);
        let entries = old.entries().map_err(failed("Cannot read the existing tar archive"))?;
        for entry in entries {
            let mut entry = entry.map_err(failed("Cannot read an existing tar entry"))?;
            let path = entry
                .path()
                .map_err(failed("Invalid path in the existing tar archive"))?
                .into_owned();
            let name = path.to_string_lossy().trim_end_matches('/').to_string();
            if replaced.contains(&name) {
                continue;
            }
            let mut header = entry.header().clone();
            builder
                .append_data(&mut header, &path, &mut entry)
                .map_err(failed("Cannot copy an existing tar entry"))?;
        }
    }

    for index in 0..items_count {
        let (name, is_dir, size, mtime, permissions) = match callback.item(index) {
            Some(item) => (
                item.name.clone(),
                item.is_dir(),
                item.size,
                item.modified_time,
                item.permissions,
            ),
            None => return Err(NativeFailure::Failed(format!("Missing item {}", index))),
        };
        let mut header = Header::new_gnu();
        header.set_mtime(mtime);

        if is_dir {
            header.set_entry_type(EntryType::Directory);
            header.set_mode(permissions.unwrap_or(0o755) & 0o7777);
            header.set_size(0);
            builder
                .append_data(&mut header, format!("{}/", name), io::empty())
                .map_err(failed("Cannot add a directory"))?;
            continue;
        }

        header.set_entry_type(EntryType::Regular);
        header.set_mode(permissions.unwrap_or(0o644) & 0o7777);
        header.set_size(size);
        let appended = {
            let reader = callback.open_item(index).map_err(failed("Cannot open an item"))?;
            builder.append_data(&mut header, &name, reader)
        };
        appended.map_err(|e| NativeFailure::Failed(format!("Cannot write '{}': {}", name, e)))?;
    }

    builder.finish().map_err(failed("Cannot finish the tar archive"))?;
    Ok(())
}
