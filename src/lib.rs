//! image-merge combines 2-4 photos into a single printable page (4"×6" at
//! 300dpi by default).
//!
//! # Pipeline overview
//!
//! 1. **Load**: decode each file into a [`SourceImage`], turned upright per EXIF.
//! 2. **Lay out**: pick a [`Template`], derive its [`Slot`]s for the page
//!    [`Canvas`], and plan one [`Placement`] per image (rotation, scale, target).
//! 3. **Composite**: resize and paste every image into its slot ([`compose`]).
//! 4. **Encode**: write the page as JPEG tagged with the page dpi ([`write_jpeg`]).
//!
//! [`merge_files`] runs all four steps for one page; [`run_batch`] walks a
//! directory and writes numbered pages.
//!
//! Composition is pure and deterministic: the same inputs and options always
//! produce the same bytes. Nothing is written until every input has decoded.
#![forbid(unsafe_code)]

mod assets;
mod encode;
mod foundation;
mod layout;
mod pipeline;
mod render;

pub use assets::decode::{ImageInfo, SourceImage, decode_image, load_image, probe_image};
pub use assets::finder::ImageFinder;
pub use encode::jpeg::{encode_jpeg, write_jpeg};
pub use foundation::core::{Canvas, Orientation, PageSpec, Rect};
pub use foundation::error::{MergeError, MergeResult};
pub use layout::placement::{Placement, Rotation, plan_placement};
pub use layout::template::{FitRule, Slot, Template};
pub use pipeline::{BatchOptions, merge_files, page_file_name, resolve_template, run_batch};
pub use render::composite::{ComposeOptions, ComposedPage, compose};
