use std::fs::File;
use std::io;

use xz2::stream::{Check, Filters, LzmaOptions, Stream};
use xz2::write::XzEncoder;

use super::{failed, NativeFailure, NativeProps};
use crate::callback::UpdateCallback;
use crate::engine::OutStream;

const DEFAULT_PRESET: u32 = 6;

/// xz holds a single stream: exactly one non-directory item, never updated in place.
pub(super) fn write(
    out: &mut dyn OutStream,
    props: &NativeProps,
    prior: Option<&mut File>,
    items_count: u32,
    callback: &mut dyn UpdateCallback,
) -> Result<(), NativeFailure> {
    if prior.is_some() {
        return Err(NativeFailure::NotImplemented);
    }
    if items_count != 1 || callback.item(0).map_or(true, |item| item.is_dir()) {
        return Err(NativeFailure::Failed(format!(
            "An xz archive holds exactly one file, got {} item(s)",
            items_count
        )));
    }
    if matches!(props.method.as_deref(), Some(m) if m != "LZMA2") {
        return Err(NativeFailure::NotImplemented);
    }

    let preset = props.level.unwrap_or(DEFAULT_PRESET).min(9);
    let mut options = LzmaOptions::new_preset(preset).map_err(failed("Invalid LZMA2 preset"))?;
    if let Some(dictionary) = props.dictionary {
        options.dict_size(dictionary);
    }
    let mut filters = Filters::new();
    filters.lzma2(&options);
    let stream = Stream::new_stream_encoder(&filters, Check::Crc64)
        .map_err(failed("Cannot start the LZMA2 encoder"))?;

    let mut encoder = XzEncoder::new_stream(out, stream);
    let copied = {
        let mut reader = callback.open_item(0).map_err(failed("Cannot open an item"))?;
        io::copy(&mut reader, &mut encoder)
    };
    copied.map_err(failed("Cannot compress the item"))?;
    encoder.finish().map_err(failed("Cannot finish the xz stream"))?;
    Ok(())
}
