use image::{DynamicImage, Rgba, RgbImage, RgbaImage, imageops::FilterType};
use tracing::debug;

use crate::{
    assets::decode::SourceImage,
    foundation::{
        core::{Canvas, PageSpec},
        error::{MergeError, MergeResult},
    },
    layout::{
        placement::{Placement, Rotation, plan_placement},
        template::{FitRule, Template},
    },
};

/// Caller choices for a single composite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Explicit template; `None` picks the default for the image count.
    pub template: Option<Template>,
    pub fit: FitRule,
}

/// A finished page: geometry, where every source went, and the RGB pixels.
#[derive(Clone, Debug)]
pub struct ComposedPage {
    pub canvas: Canvas,
    pub template: Template,
    pub placements: Vec<Placement>,
    pub pixels: RgbImage,
}

/// Lay out 2-4 images on one page.
///
/// Fails with [`MergeError::InvalidImageCount`] when the count is outside
/// 2..=4 or does not match the slot count of an explicit fixed template.
#[tracing::instrument(skip(spec, images), fields(count = images.len()))]
pub fn compose(
    spec: &PageSpec,
    images: &[SourceImage],
    opts: &ComposeOptions,
) -> MergeResult<ComposedPage> {
    let count = images.len();
    if !(2..=4).contains(&count) {
        return Err(MergeError::invalid_count(count, "2, 3 or 4"));
    }
    let template = match opts.template {
        Some(t) => t,
        None => Template::default_for_count(count)?,
    };
    match template.slot_count() {
        Some(n) if n != count => Err(MergeError::invalid_count(
            count,
            format!("{n} for template {template}"),
        )),
        _ => compose_slots(spec, template, images, opts.fit),
    }
}

/// Paste `images` into the first slots of `template`. Unused slots stay blank.
pub(crate) fn compose_slots(
    spec: &PageSpec,
    template: Template,
    images: &[SourceImage],
    fit: FitRule,
) -> MergeResult<ComposedPage> {
    spec.validate()?;
    let canvas = template.canvas(spec);
    let sizes: Vec<(u32, u32)> = images.iter().map(|i| (i.width(), i.height())).collect();
    let slots = template.slots(&canvas, spec.border_px, &sizes, fit)?;
    if images.len() > slots.len() {
        return Err(MergeError::invalid_count(
            images.len(),
            format!("at most {} for template {template}", slots.len()),
        ));
    }

    let placements: Vec<Placement> = images
        .iter()
        .zip(&slots)
        .enumerate()
        .map(|(i, (img, slot))| plan_placement(i, img.width(), img.height(), slot))
        .collect();

    let [r, g, b] = canvas.background;
    let mut pixels = RgbaImage::from_pixel(canvas.width, canvas.height, Rgba([r, g, b, 255]));
    for (img, p) in images.iter().zip(&placements) {
        let tile = render_tile(img.image(), p);
        image::imageops::overlay(
            &mut pixels,
            &tile,
            i64::from(p.target.x),
            i64::from(p.target.y),
        );
        debug!(path = %img.path().display(), x = p.target.x, y = p.target.y, "pasted image");
    }

    Ok(ComposedPage {
        canvas,
        template,
        placements,
        pixels: DynamicImage::ImageRgba8(pixels).to_rgb8(),
    })
}

/// Rotate, crop and resize one source to its target size.
fn render_tile(img: &DynamicImage, p: &Placement) -> RgbaImage {
    let turned;
    let src = match p.rotation {
        Rotation::None => img,
        Rotation::Quarter => {
            turned = img.rotate90();
            &turned
        }
    };

    let cropped;
    let src = match p.crop {
        Some(c) if (c.width, c.height) != (src.width(), src.height()) => {
            cropped = src.crop_imm(c.x, c.y, c.width, c.height);
            &cropped
        }
        _ => src,
    };

    if (src.width(), src.height()) == (p.target.width, p.target.height) {
        return src.to_rgba8();
    }
    src.resize_exact(p.target.width, p.target.height, FilterType::Lanczos3)
        .to_rgba8()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rect;
    use image::Rgb;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn solid(width: u32, height: u32, color: [u8; 3]) -> SourceImage {
        SourceImage::new(
            format!("solid-{width}x{height}"),
            DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color))),
        )
        .unwrap()
    }

    fn close_to(px: Rgb<u8>, want: [u8; 3]) -> bool {
        px.0.iter()
            .zip(want)
            .all(|(&a, b)| (i16::from(a) - i16::from(b)).abs() <= 2)
    }

    #[test]
    fn rejects_one_and_five_images() {
        let spec = PageSpec::default();
        let opts = ComposeOptions::default();
        for n in [0usize, 1, 5] {
            let images: Vec<_> = (0..n).map(|_| solid(4, 3, [0, 0, 0])).collect();
            let err = compose(&spec, &images, &opts).unwrap_err();
            assert!(
                matches!(err, MergeError::InvalidImageCount { count, .. } if count == n),
                "{n}: {err}"
            );
        }
    }

    #[test]
    fn oversized_page_is_rejected_before_allocating() {
        let spec = PageSpec {
            dpi: 70_000,
            ..PageSpec::default()
        };
        let images = vec![solid(4, 3, [0, 0, 0]); 2];
        assert!(matches!(
            compose(&spec, &images, &ComposeOptions::default()),
            Err(MergeError::Validation(_))
        ));
    }

    #[test]
    fn explicit_template_must_match_count() {
        let spec = PageSpec::default();
        let images = vec![solid(4, 3, [0, 0, 0]); 2];
        let opts = ComposeOptions {
            template: Some(Template::FourUp),
            ..ComposeOptions::default()
        };
        assert!(matches!(
            compose(&spec, &images, &opts),
            Err(MergeError::InvalidImageCount { count: 2, .. })
        ));
    }

    #[test]
    fn two_landscape_images_stack_in_portrait_page() {
        let spec = PageSpec::default();
        let images = [solid(400, 300, [200, 0, 0]), solid(400, 300, [0, 0, 200])];
        let page = compose(&spec, &images, &ComposeOptions::default()).unwrap();

        assert_eq!(page.template, Template::TwoUp);
        assert_eq!(page.pixels.dimensions(), (1200, 1800));
        assert_eq!((page.canvas.width, page.canvas.height), (1200, 1800));

        for p in &page.placements {
            assert_eq!(p.rotation, Rotation::None);
            assert!(p.slot.rect.contains(&p.target));
            assert!(p.crop.is_none());
        }
        // 400x300 into 1180x885 is an exact 4:3 fit.
        assert_eq!(page.placements[0].target, Rect::new(10, 10, 1180, 885));
        assert_eq!(page.placements[1].target, Rect::new(10, 905, 1180, 885));

        assert!(close_to(*page.pixels.get_pixel(600, 400), [200, 0, 0]));
        assert!(close_to(*page.pixels.get_pixel(600, 1300), [0, 0, 200]));
        // border and gap keep the background
        assert_eq!(*page.pixels.get_pixel(5, 5), WHITE);
        assert_eq!(*page.pixels.get_pixel(600, 899), WHITE);
    }

    #[test]
    fn mismatched_aspect_is_letterboxed_not_cropped() {
        let spec = PageSpec::default();
        let images = [solid(100, 100, [0, 150, 0]), solid(100, 100, [0, 150, 0])];
        let page = compose(&spec, &images, &ComposeOptions::default()).unwrap();

        let t = page.placements[0].target;
        assert_eq!((t.width, t.height), (885, 885));
        assert_eq!(t.x, 10 + (1180 - 885) / 2);
        assert!(close_to(*page.pixels.get_pixel(600, 400), [0, 150, 0]));
        assert_eq!(*page.pixels.get_pixel(50, 400), WHITE);
        assert_eq!(*page.pixels.get_pixel(1150, 400), WHITE);
    }

    #[test]
    fn portrait_sources_are_turned_for_wide_slots() {
        let spec = PageSpec::default();
        let images = vec![solid(300, 400, [10, 10, 10]); 3];
        let page = compose(&spec, &images, &ComposeOptions::default()).unwrap();
        assert_eq!(page.template, Template::ThreeUp);
        assert!(
            page.placements
                .iter()
                .all(|p| p.rotation == Rotation::Quarter)
        );
    }

    #[test]
    fn four_up_fills_every_slot_once() {
        let spec = PageSpec::default();
        let images = [
            solid(10, 20, [255, 0, 0]),
            solid(20, 10, [0, 255, 0]),
            solid(30, 30, [0, 0, 255]),
            solid(4032, 3024, [0, 0, 0]),
        ];
        let page = compose(&spec, &images, &ComposeOptions::default()).unwrap();
        assert_eq!(page.template, Template::FourUp);
        assert_eq!(page.placements.len(), 4);
        for (i, p) in page.placements.iter().enumerate() {
            assert_eq!(p.index, i);
            assert!(p.slot.rect.contains(&p.target));
            for q in &page.placements[i + 1..] {
                assert!(!p.slot.rect.intersects(&q.slot.rect));
            }
        }
    }

    #[test]
    fn fill_covers_whole_slot() {
        let spec = PageSpec::default();
        let images = [solid(100, 100, [0, 0, 90]), solid(100, 100, [0, 0, 90])];
        let opts = ComposeOptions {
            fit: FitRule::Fill,
            ..ComposeOptions::default()
        };
        let page = compose(&spec, &images, &opts).unwrap();
        let p = page.placements[0];
        assert_eq!(p.target, p.slot.rect);
        assert!(close_to(*page.pixels.get_pixel(15, 400), [0, 0, 90]));
        assert!(close_to(*page.pixels.get_pixel(1185, 400), [0, 0, 90]));
    }

    #[test]
    fn landscape_template_uses_turned_page() {
        let spec = PageSpec::default();
        let images = [solid(400, 300, [1, 2, 3]), solid(300, 400, [1, 2, 3])];
        let opts = ComposeOptions {
            template: Some(Template::LandscapeMaxHeight {
                max_height_px: Some(600),
            }),
            ..ComposeOptions::default()
        };
        let page = compose(&spec, &images, &opts).unwrap();
        assert_eq!(page.pixels.dimensions(), (1800, 1200));
        for p in &page.placements {
            assert_eq!(p.rotation, Rotation::None);
            assert_eq!(p.target.height, 600);
        }
        assert_eq!(page.placements[0].target.width, 800);
        assert_eq!(page.placements[1].target.width, 450);
    }

    #[test]
    fn transparent_pixels_show_background() {
        let spec = PageSpec {
            background: [10, 20, 30],
            ..PageSpec::default()
        };
        let clear = SourceImage::new(
            "clear",
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 30, Rgba([255, 0, 0, 0]))),
        )
        .unwrap();
        let page = compose(&spec, &[clear.clone(), clear], &ComposeOptions::default()).unwrap();
        assert_eq!(*page.pixels.get_pixel(600, 400), Rgb([10, 20, 30]));
    }

    #[test]
    fn partial_pages_leave_trailing_slots_blank() {
        let spec = PageSpec::default();
        let page = compose_slots(
            &spec,
            Template::FourUp,
            &[solid(30, 30, [0, 0, 0])],
            FitRule::Fit,
        )
        .unwrap();
        assert_eq!(page.placements.len(), 1);
        assert_eq!(*page.pixels.get_pixel(900, 1300), WHITE);
    }
}
