use std::{fmt, ops::Range, str::FromStr};

use crate::foundation::{
    core::{Canvas, Orientation, PageSpec, Rect},
    error::{MergeError, MergeResult},
};

/// How an image is sized into its slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FitRule {
    /// Whole image visible, letterboxed inside the slot.
    #[default]
    Fit,
    /// Slot fully covered, overflow cropped around the center.
    Fill,
}

/// A rectangle on the canvas reserved for exactly one image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Slot {
    pub rect: Rect,
    pub fit: FitRule,
    pub allow_rotation: bool,
}

/// Named page layouts.
///
/// | name                   | page      | slots                                  |
/// |------------------------|-----------|----------------------------------------|
/// | `2-up`                 | portrait  | 2 rows stacked vertically              |
/// | `3-up`                 | portrait  | 3 rows stacked vertically              |
/// | `4-up`                 | portrait  | 2×2 grid, row-major                    |
/// | `landscape-max-height` | landscape | one per image, left to right, same height |
///
/// Every slot is inset by the page border and separated from its neighbours by
/// the same border.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Template {
    TwoUp,
    ThreeUp,
    FourUp,
    /// Images share one row at a fixed height. `None` uses the full printable height.
    LandscapeMaxHeight { max_height_px: Option<u32> },
}

impl Template {
    pub const NAMES: [&'static str; 4] = ["2-up", "3-up", "4-up", "landscape-max-height"];

    /// Template used when none is requested explicitly.
    pub fn default_for_count(count: usize) -> MergeResult<Self> {
        match count {
            2 => Ok(Self::TwoUp),
            3 => Ok(Self::ThreeUp),
            4 => Ok(Self::FourUp),
            n => Err(MergeError::invalid_count(n, "2, 3 or 4")),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TwoUp => "2-up",
            Self::ThreeUp => "3-up",
            Self::FourUp => "4-up",
            Self::LandscapeMaxHeight { .. } => "landscape-max-height",
        }
    }

    /// Number of slots, or `None` for the parametric landscape row.
    pub fn slot_count(&self) -> Option<usize> {
        match self {
            Self::TwoUp => Some(2),
            Self::ThreeUp => Some(3),
            Self::FourUp => Some(4),
            Self::LandscapeMaxHeight { .. } => None,
        }
    }

    pub fn page_orientation(&self) -> Orientation {
        match self {
            Self::LandscapeMaxHeight { .. } => Orientation::Landscape,
            _ => Orientation::Portrait,
        }
    }

    pub fn canvas(&self, spec: &PageSpec) -> Canvas {
        spec.canvas(self.page_orientation())
    }

    /// Slots for images of the given (upright) sizes, in template order.
    ///
    /// Fixed templates ignore `sizes` beyond their length; the landscape row
    /// derives one slot per entry.
    pub fn slots(
        &self,
        canvas: &Canvas,
        border: u32,
        sizes: &[(u32, u32)],
        fit: FitRule,
    ) -> MergeResult<Vec<Slot>> {
        let (rects, allow_rotation) = match *self {
            Self::TwoUp => (grid(canvas, border, 1, 2), true),
            Self::ThreeUp => (grid(canvas, border, 1, 3), true),
            Self::FourUp => (grid(canvas, border, 2, 2), true),
            Self::LandscapeMaxHeight { max_height_px } => {
                let height = row_height(canvas, border, max_height_px)?;
                (landscape_row(canvas, border, height, sizes)?, false)
            }
        };

        if let Some(r) = rects.iter().find(|r| r.width == 0 || r.height == 0) {
            return Err(MergeError::validation(format!(
                "{} leaves an empty slot at ({}, {}) on a {}x{} canvas",
                self.name(),
                r.x,
                r.y,
                canvas.width,
                canvas.height
            )));
        }

        Ok(rects
            .into_iter()
            .map(|rect| Slot {
                rect,
                fit,
                allow_rotation,
            })
            .collect())
    }

    /// Split `sizes` into consecutive page groups.
    ///
    /// Fixed templates take `slot_count` images per page; a short last group is
    /// an error unless `allow_partial`. The landscape row starts a new page
    /// whenever the next image would cross the right border.
    pub fn paginate(
        &self,
        canvas: &Canvas,
        border: u32,
        sizes: &[(u32, u32)],
        allow_partial: bool,
    ) -> MergeResult<Vec<Range<usize>>> {
        let count = sizes.len();
        let per_page = match *self {
            Self::TwoUp => 2,
            Self::ThreeUp => 3,
            Self::FourUp => 4,
            Self::LandscapeMaxHeight { max_height_px } => {
                let height = row_height(canvas, border, max_height_px)?;
                return Ok(paginate_row(canvas, border, height, sizes));
            }
        };
        if count % per_page != 0 && !allow_partial {
            return Err(MergeError::IncompletePage { count, per_page });
        }
        Ok((0..count)
            .step_by(per_page)
            .map(|start| start..(start + per_page).min(count))
            .collect())
    }
}

impl FromStr for Template {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "2-up" => Ok(Self::TwoUp),
            "3-up" => Ok(Self::ThreeUp),
            "4-up" => Ok(Self::FourUp),
            "landscape-max-height" => Ok(Self::LandscapeMaxHeight {
                max_height_px: None,
            }),
            _ => Err(MergeError::TemplateNotFound(s.to_string())),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn grid(canvas: &Canvas, border: u32, cols: u32, rows: u32) -> Vec<Rect> {
    let cell_w = canvas.width.saturating_sub((cols + 1) * border) / cols;
    let cell_h = canvas.height.saturating_sub((rows + 1) * border) / rows;

    let mut rects = Vec::with_capacity((cols * rows) as usize);
    for row in 0..rows {
        for col in 0..cols {
            rects.push(Rect::new(
                border + col * (cell_w + border),
                border + row * (cell_h + border),
                cell_w,
                cell_h,
            ));
        }
    }
    rects
}

fn row_height(canvas: &Canvas, border: u32, max_height_px: Option<u32>) -> MergeResult<u32> {
    let avail_h = canvas.height.saturating_sub(2 * border);
    match max_height_px {
        None => Ok(avail_h),
        Some(0) => Err(MergeError::image_size("max-height must be > 0")),
        Some(h) if h > avail_h => Err(MergeError::image_size(format!(
            "max-height of {h}px is larger than the paper size ({avail_h}px printable)"
        ))),
        Some(h) => Ok(h),
    }
}

fn width_at_height(w: u32, h: u32, height: u32) -> u32 {
    if h == 0 {
        return 0;
    }
    ((f64::from(w) * f64::from(height) / f64::from(h)).floor() as u32).max(1)
}

fn paginate_row(canvas: &Canvas, border: u32, height: u32, sizes: &[(u32, u32)]) -> Vec<Range<usize>> {
    let right_edge = canvas.width.saturating_sub(border);
    let avail_w = canvas.width.saturating_sub(2 * border);

    let mut pages = Vec::new();
    let mut start = 0usize;
    let mut x = border;
    for (i, &(w, h)) in sizes.iter().enumerate() {
        let slot_w = width_at_height(w, h, height).min(avail_w);
        if i > start && x + slot_w > right_edge {
            pages.push(start..i);
            start = i;
            x = border;
        }
        x += slot_w + border;
    }
    if start < sizes.len() {
        pages.push(start..sizes.len());
    }
    pages
}

fn landscape_row(
    canvas: &Canvas,
    border: u32,
    height: u32,
    sizes: &[(u32, u32)],
) -> MergeResult<Vec<Rect>> {
    if sizes.is_empty() {
        return Ok(Vec::new());
    }
    let avail_w = canvas.width.saturating_sub(2 * border);
    let avail_h = canvas.height.saturating_sub(2 * border);
    let gaps = border * (sizes.len() as u32 - 1);
    if gaps >= avail_w {
        return Err(MergeError::validation(format!(
            "{} images do not fit side by side on a {}px wide page",
            sizes.len(),
            canvas.width
        )));
    }

    let exact: Vec<f64> = sizes
        .iter()
        .map(|&(w, h)| f64::from(w) * f64::from(height) / f64::from(h.max(1)))
        .collect();
    let total: f64 = exact.iter().sum();
    let room = f64::from(avail_w - gaps);
    let factor = if total > room { room / total } else { 1.0 };

    let slot_h = ((f64::from(height) * factor).floor() as u32).max(1);
    let y = border + (avail_h - slot_h.min(avail_h)) / 2;

    let mut x = border;
    let mut rects = Vec::with_capacity(sizes.len());
    for w in exact {
        let slot_w = ((w * factor).floor() as u32).max(1);
        rects.push(Rect::new(x, y, slot_w, slot_h));
        x += slot_w + border;
    }
    Ok(rects)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portrait() -> Canvas {
        PageSpec::default().canvas(Orientation::Portrait)
    }

    fn landscape() -> Canvas {
        PageSpec::default().canvas(Orientation::Landscape)
    }

    fn assert_disjoint_and_inside(canvas: &Canvas, slots: &[Slot]) {
        for (i, a) in slots.iter().enumerate() {
            assert!(canvas.rect().contains(&a.rect), "slot {i} escapes canvas");
            for b in &slots[i + 1..] {
                assert!(!a.rect.intersects(&b.rect), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn default_template_per_count() {
        assert_eq!(Template::default_for_count(2).unwrap(), Template::TwoUp);
        assert_eq!(Template::default_for_count(3).unwrap(), Template::ThreeUp);
        assert_eq!(Template::default_for_count(4).unwrap(), Template::FourUp);
        for bad in [0, 1, 5] {
            assert!(matches!(
                Template::default_for_count(bad),
                Err(MergeError::InvalidImageCount { count, .. }) if count == bad
            ));
        }
    }

    #[test]
    fn names_round_trip_and_unknown_is_not_found() {
        for name in Template::NAMES {
            let t: Template = name.parse().unwrap();
            assert_eq!(t.name(), name);
            assert_eq!(t.to_string(), name);
        }
        assert_eq!("4-UP".parse::<Template>().unwrap(), Template::FourUp);
        assert!(matches!(
            "6-up".parse::<Template>(),
            Err(MergeError::TemplateNotFound(name)) if name == "6-up"
        ));
    }

    #[test]
    fn two_up_stacks_two_wide_rows() {
        let canvas = portrait();
        let slots = Template::TwoUp
            .slots(&canvas, 10, &[], FitRule::Fit)
            .unwrap();
        let rects: Vec<_> = slots.iter().map(|s| s.rect).collect();
        assert_eq!(
            rects,
            [Rect::new(10, 10, 1180, 885), Rect::new(10, 905, 1180, 885)]
        );
        assert!(slots.iter().all(|s| s.allow_rotation && s.fit == FitRule::Fit));
        assert_disjoint_and_inside(&canvas, &slots);
    }

    #[test]
    fn three_up_stacks_three_rows() {
        let canvas = portrait();
        let slots = Template::ThreeUp
            .slots(&canvas, 10, &[], FitRule::Fit)
            .unwrap();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].rect, Rect::new(10, 10, 1180, 586));
        assert_eq!(slots[2].rect, Rect::new(10, 1202, 1180, 586));
        assert_disjoint_and_inside(&canvas, &slots);
    }

    #[test]
    fn four_up_is_row_major_grid() {
        let canvas = portrait();
        let slots = Template::FourUp
            .slots(&canvas, 10, &[], FitRule::Fill)
            .unwrap();
        let rects: Vec<_> = slots.iter().map(|s| s.rect).collect();
        assert_eq!(
            rects,
            [
                Rect::new(10, 10, 585, 885),
                Rect::new(605, 10, 585, 885),
                Rect::new(10, 905, 585, 885),
                Rect::new(605, 905, 585, 885),
            ]
        );
        assert!(slots.iter().all(|s| s.fit == FitRule::Fill));
        assert_disjoint_and_inside(&canvas, &slots);
    }

    #[test]
    fn landscape_row_keeps_height_and_centers_vertically() {
        let canvas = landscape();
        let t = Template::LandscapeMaxHeight {
            max_height_px: Some(500),
        };
        let slots = t
            .slots(&canvas, 10, &[(400, 200), (300, 600)], FitRule::Fit)
            .unwrap();
        assert_eq!(slots[0].rect, Rect::new(10, 350, 1000, 500));
        assert_eq!(slots[1].rect, Rect::new(1020, 350, 250, 500));
        assert!(slots.iter().all(|s| !s.allow_rotation));
        assert_disjoint_and_inside(&canvas, &slots);
    }

    #[test]
    fn landscape_row_shrinks_uniformly_when_too_wide() {
        let canvas = landscape();
        let t = Template::LandscapeMaxHeight {
            max_height_px: None,
        };
        let sizes = [(3000, 1000), (3000, 1000), (3000, 1000)];
        let slots = t.slots(&canvas, 10, &sizes, FitRule::Fit).unwrap();
        let heights: Vec<_> = slots.iter().map(|s| s.rect.height).collect();
        assert!(heights.windows(2).all(|w| w[0] == w[1]));
        assert!(heights[0] < 1180);
        assert!(slots.last().unwrap().rect.right() <= canvas.width - 10);
        assert_disjoint_and_inside(&canvas, &slots);
    }

    #[test]
    fn landscape_max_height_larger_than_page_is_image_size_error() {
        let t = Template::LandscapeMaxHeight {
            max_height_px: Some(1181),
        };
        assert!(matches!(
            t.slots(&landscape(), 10, &[(10, 10)], FitRule::Fit),
            Err(MergeError::ImageSize(_))
        ));
    }

    #[test]
    fn paginate_fixed_templates_requires_full_pages() {
        let canvas = portrait();
        let sizes = vec![(10, 10); 5];
        assert!(matches!(
            Template::TwoUp.paginate(&canvas, 10, &sizes, false),
            Err(MergeError::IncompletePage {
                count: 5,
                per_page: 2
            })
        ));
        let pages = Template::TwoUp.paginate(&canvas, 10, &sizes, true).unwrap();
        assert_eq!(pages, [0..2, 2..4, 4..5]);

        let pages = Template::FourUp
            .paginate(&canvas, 10, &sizes[..4], false)
            .unwrap();
        assert_eq!(pages, [0..4]);
    }

    #[test]
    fn paginate_landscape_breaks_when_row_is_full() {
        let canvas = landscape();
        let t = Template::LandscapeMaxHeight {
            max_height_px: Some(600),
        };
        // Each image is 900px wide at 600px high; two need 10+900+10+900+10 > 1800.
        let sizes = vec![(1500, 1000); 3];
        let pages = t.paginate(&canvas, 10, &sizes, false).unwrap();
        assert_eq!(pages, [0..1, 1..2, 2..3]);

        // 600px wide each: two fit (10+600+10+600+10 <= 1800), the third does not.
        let sizes = vec![(1000, 1000); 3];
        let pages = t.paginate(&canvas, 10, &sizes, false).unwrap();
        assert_eq!(pages, [0..2, 2..3]);
    }
}
