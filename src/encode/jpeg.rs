use std::{
    ffi::OsString,
    fs::File,
    io::{self, Write as _},
    path::Path,
};

use image::codecs::jpeg::{JpegEncoder, PixelDensity};

use crate::{
    foundation::error::{MergeError, MergeResult},
    render::composite::ComposedPage,
};

/// Encode a page as baseline JPEG, tagging the JFIF header with the page dpi.
pub fn encode_jpeg(page: &ComposedPage, quality: u8) -> MergeResult<Vec<u8>> {
    let dpi = u16::try_from(page.canvas.dpi).map_err(|_| {
        MergeError::encode(format!("{}dpi does not fit a JFIF header", page.canvas.dpi))
    })?;

    let mut buf = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
        encoder.set_pixel_density(PixelDensity::dpi(dpi));
        encoder
            .encode_image(&page.pixels)
            .map_err(|e| MergeError::encode(format!("jpeg: {e}")))?;
    }
    Ok(buf)
}

/// Encode and write `page` to `path`. The file appears only once complete.
pub fn write_jpeg(page: &ComposedPage, quality: u8, path: &Path) -> MergeResult<()> {
    let bytes = encode_jpeg(page, quality)?;
    write_atomic(path, &bytes)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> MergeResult<()> {
    write_atomic_with(path, |f| f.write_all(bytes))
}

/// Run `fill` against a hidden temp file next to `path`, then rename it into
/// place. The temp file is removed whenever either step fails.
fn write_atomic_with(
    path: &Path,
    fill: impl FnOnce(&mut File) -> io::Result<()>,
) -> MergeResult<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| MergeError::encode(format!("'{}' is not a file path", path.display())))?;
    let mut tmp_name = OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".partial");
    let tmp = path.with_file_name(tmp_name);

    if let Err(e) = File::create(&tmp).and_then(|mut f| fill(&mut f)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(MergeError::encode(format!(
            "write '{}': {e}",
            tmp.display()
        )));
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(MergeError::encode(format!(
            "move output into '{}': {e}",
            path.display()
        )));
    }
    Ok(())
}
