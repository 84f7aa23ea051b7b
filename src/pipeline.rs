use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    assets::{
        decode::{load_image, probe_image},
        finder::ImageFinder,
    },
    encode::jpeg::write_jpeg,
    foundation::{
        core::PageSpec,
        error::{MergeError, MergeResult},
    },
    layout::template::{FitRule, Template},
    render::composite::{ComposeOptions, ComposedPage, compose, compose_slots},
};

/// Turn the CLI's template name and max height (in cm) into a template.
///
/// A max height on its own selects `landscape-max-height`; combined with any
/// other template it is rejected.
pub fn resolve_template(
    name: Option<&str>,
    max_height_cm: Option<f64>,
    spec: &PageSpec,
) -> MergeResult<Option<Template>> {
    let template = name.map(str::parse::<Template>).transpose()?;
    let max_height_px = max_height_cm.map(|cm| spec.cm_to_px(cm)).transpose()?;

    match (template, max_height_px) {
        (None, None) => Ok(None),
        (None | Some(Template::LandscapeMaxHeight { .. }), Some(px)) => {
            Ok(Some(Template::LandscapeMaxHeight {
                max_height_px: Some(px),
            }))
        }
        (Some(t), Some(_)) => Err(MergeError::validation(format!(
            "max height only applies to landscape-max-height, not {t}"
        ))),
        (Some(t), None) => Ok(Some(t)),
    }
}

/// Load `paths`, compose them onto one page and write it to `out` as JPEG.
///
/// Every input is decoded and composed before anything is written, so a bad
/// input leaves no output behind. Missing parent directories of `out` are
/// created just before the write.
#[tracing::instrument(skip(paths, out, spec), fields(count = paths.len(), out = %out.display()))]
pub fn merge_files(
    paths: &[PathBuf],
    out: &Path,
    spec: &PageSpec,
    opts: &ComposeOptions,
) -> MergeResult<ComposedPage> {
    if !(2..=4).contains(&paths.len()) {
        return Err(MergeError::invalid_count(paths.len(), "2, 3 or 4"));
    }
    let images = paths
        .iter()
        .map(|p| load_image(p))
        .collect::<MergeResult<Vec<_>>>()?;

    let page = compose(spec, &images, opts)?;
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            MergeError::validation(format!("create output dir '{}': {e}", parent.display()))
        })?;
    }
    write_jpeg(&page, spec.quality, out)?;
    info!(template = %page.template, "wrote {}", out.display());
    Ok(page)
}

/// Settings for turning a directory of photos into numbered pages.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchOptions {
    pub template: Template,
    pub fit: FitRule,
    /// File name prefix, e.g. `img-` gives `img-0001.jpg`.
    pub prefix: String,
    /// Number of the first page.
    pub start: u32,
    /// Compose a short last page instead of failing.
    pub allow_partial: bool,
}

impl BatchOptions {
    pub fn new(template: Template) -> Self {
        Self {
            template,
            fit: FitRule::Fit,
            prefix: "img-".to_string(),
            start: 1,
            allow_partial: false,
        }
    }
}

pub fn page_file_name(prefix: &str, number: u32) -> String {
    format!("{prefix}{number:04}.jpg")
}

/// Compose every photo in `source` onto pages written to `dest`.
///
/// All files are probed and the page plan is checked before the first page is
/// written. Returns the written paths in page order.
#[tracing::instrument(skip(source, dest, spec, opts), fields(source = %source.display(), dest = %dest.display()))]
pub fn run_batch(
    source: &Path,
    dest: &Path,
    spec: &PageSpec,
    opts: &BatchOptions,
) -> MergeResult<Vec<PathBuf>> {
    spec.validate()?;
    let finder = ImageFinder::new(source)?;
    info!(
        count = finder.image_count(),
        "found photos in '{}'",
        finder.root().display()
    );
    if finder.image_count() == 0 {
        return Err(MergeError::validation(format!(
            "no images found in '{}'",
            source.display()
        )));
    }

    let infos = finder
        .paths()
        .iter()
        .map(|p| probe_image(p))
        .collect::<MergeResult<Vec<_>>>()?;
    let sizes: Vec<(u32, u32)> = infos.iter().map(|i| (i.width, i.height)).collect();
    let canvas = opts.template.canvas(spec);
    let pages = opts
        .template
        .paginate(&canvas, spec.border_px, &sizes, opts.allow_partial)?;
    let last = u32::try_from(pages.len().saturating_sub(1))
        .ok()
        .and_then(|n| opts.start.checked_add(n))
        .ok_or_else(|| {
            MergeError::validation(format!(
                "{} pages starting at {} run past page number {}",
                pages.len(),
                opts.start,
                u32::MAX
            ))
        })?;
    debug!(pages = pages.len(), first = opts.start, last, "page plan");

    if dest.exists() && !dest.is_dir() {
        return Err(MergeError::validation(format!(
            "'{}' exists, but is not a folder",
            dest.display()
        )));
    }
    std::fs::create_dir_all(dest).map_err(|e| {
        MergeError::validation(format!("create output dir '{}': {e}", dest.display()))
    })?;

    let mut written = Vec::with_capacity(pages.len());
    for (n, range) in pages.into_iter().enumerate() {
        let images = infos[range]
            .iter()
            .map(|info| load_image(&info.path))
            .collect::<MergeResult<Vec<_>>>()?;
        let page = compose_slots(spec, opts.template, &images, opts.fit)?;

        // `last` bounds every page number, so this cannot overflow.
        let number = opts.start + n as u32;
        let out = dest.join(page_file_name(&opts.prefix, number));
        write_jpeg(&page, spec.quality, &out)?;
        info!(images = images.len(), "wrote {}", out.display());
        written.push(out);
    }
    Ok(written)
}
