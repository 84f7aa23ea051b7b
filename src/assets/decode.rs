use std::{
    io::{BufRead, Cursor, Seek},
    path::{Path, PathBuf},
};

use image::{DynamicImage, ImageDecoder, ImageReader, metadata::Orientation as ExifOrientation};
use tracing::debug;

use crate::foundation::{
    core::Orientation,
    error::{MergeError, MergeResult},
};

/// One decoded input photo, already turned upright according to its EXIF tag.
#[derive(Clone, Debug)]
pub struct SourceImage {
    path: PathBuf,
    image: DynamicImage,
}

impl SourceImage {
    /// Wrap an already-decoded image. `path` is only used for diagnostics.
    pub fn new(path: impl Into<PathBuf>, image: DynamicImage) -> MergeResult<Self> {
        let path = path.into();
        if image.width() == 0 || image.height() == 0 {
            return Err(MergeError::image_load(&path, "image has no pixels"));
        }
        Ok(Self { path, image })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::of(self.width(), self.height())
    }
}

/// Header-level facts about a file, gathered without decoding pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub path: PathBuf,
    /// Width after EXIF orientation is applied.
    pub width: u32,
    /// Height after EXIF orientation is applied.
    pub height: u32,
}

impl ImageInfo {
    pub fn orientation(&self) -> Orientation {
        Orientation::of(self.width, self.height)
    }
}

/// Load and decode one file from disk.
pub fn load_image(path: &Path) -> MergeResult<SourceImage> {
    let reader = ImageReader::open(path).map_err(|e| MergeError::image_load(path, e))?;
    let image = decode_reader(reader, path)?;
    debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "loaded image"
    );
    SourceImage::new(path, image)
}

/// Decode an in-memory encoded image. `label` names it in errors.
pub fn decode_image(bytes: &[u8], label: &Path) -> MergeResult<SourceImage> {
    let image = decode_reader(ImageReader::new(Cursor::new(bytes)), label)?;
    SourceImage::new(label, image)
}

/// Read only the header of `path`: format, dimensions and EXIF orientation.
pub fn probe_image(path: &Path) -> MergeResult<ImageInfo> {
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| MergeError::image_load(path, e))?;
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| MergeError::image_load(path, e))?;
    let (w, h) = decoder.dimensions();
    let orientation = decoder
        .orientation()
        .map_err(|e| MergeError::image_load(path, e))?;
    if w == 0 || h == 0 {
        return Err(MergeError::image_load(path, "image has no pixels"));
    }
    let (width, height) = if swaps_axes(orientation) { (h, w) } else { (w, h) };
    Ok(ImageInfo {
        path: path.to_path_buf(),
        width,
        height,
    })
}

fn decode_reader<R: BufRead + Seek>(reader: ImageReader<R>, path: &Path) -> MergeResult<DynamicImage> {
    let reader = reader
        .with_guessed_format()
        .map_err(|e| MergeError::image_load(path, e))?;
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| MergeError::image_load(path, e))?;
    let orientation = decoder
        .orientation()
        .map_err(|e| MergeError::image_load(path, e))?;
    let mut image = DynamicImage::from_decoder(decoder).map_err(|e| MergeError::image_load(path, e))?;
    image.apply_orientation(orientation);
    Ok(image)
}

fn swaps_axes(orientation: ExifOrientation) -> bool {
    matches!(
        orientation,
        ExifOrientation::Rotate90
            | ExifOrientation::Rotate270
            | ExifOrientation::Rotate90FlipH
            | ExifOrientation::Rotate270FlipH
    )
}
