use std::{fs::File, io::BufReader, path::Path};

use crate::foundation::error::{MergeError, MergeResult};

const CM_PER_INCH: f64 = 2.54;

/// Largest page the compositor will allocate (about 40"×60" at 300dpi).
pub const MAX_CANVAS_PIXELS: u64 = 216_000_000;

/// Physical page description. Defaults to a 4"×6" photo print at 300dpi.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageSpec {
    /// Short edge in inches.
    pub width_in: f64,
    /// Long edge in inches.
    pub height_in: f64,
    pub dpi: u32,
    /// Gap around and between slots, in pixels.
    pub border_px: u32,
    pub background: [u8; 3],
    /// JPEG quality, 1..=100.
    pub quality: u8,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            width_in: 4.0,
            height_in: 6.0,
            dpi: 300,
            border_px: 10,
            background: [0xFF, 0xFF, 0xFF],
            quality: 95,
        }
    }
}

impl PageSpec {
    /// Read a page description from a JSON file. Missing fields take their defaults.
    pub fn from_path(path: &Path) -> MergeResult<Self> {
        let f = File::open(path).map_err(|e| {
            MergeError::validation(format!("open page config '{}': {e}", path.display()))
        })?;
        let spec: Self = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            MergeError::validation(format!("parse page config '{}': {e}", path.display()))
        })?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> MergeResult<()> {
        for (name, v) in [("width_in", self.width_in), ("height_in", self.height_in)] {
            if !v.is_finite() || v <= 0.0 {
                return Err(MergeError::validation(format!(
                    "{name} must be a positive number, got {v}"
                )));
            }
        }
        if self.dpi == 0 {
            return Err(MergeError::validation("dpi must be > 0"));
        }
        // JFIF stores the density in 16 bits.
        if self.dpi > u32::from(u16::MAX) {
            return Err(MergeError::validation(format!(
                "dpi must be at most {}, got {}",
                u16::MAX,
                self.dpi
            )));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(MergeError::validation(format!(
                "quality must be in 1..=100, got {}",
                self.quality
            )));
        }
        let portrait = self.canvas(Orientation::Portrait);
        let pixels = portrait.rect().area();
        if pixels > MAX_CANVAS_PIXELS {
            return Err(MergeError::validation(format!(
                "a {}x{} page is larger than the {MAX_CANVAS_PIXELS} pixel limit",
                portrait.width, portrait.height
            )));
        }
        let short = portrait.width.min(portrait.height);
        if u64::from(self.border_px) * 4 + 4 > u64::from(short) {
            return Err(MergeError::validation(format!(
                "border of {}px leaves no room for images on a {}x{} page",
                self.border_px, portrait.width, portrait.height
            )));
        }
        Ok(())
    }

    /// Pixel canvas for this page. `Square` is treated as portrait.
    pub fn canvas(&self, orientation: Orientation) -> Canvas {
        let a = inches_to_px(self.width_in, self.dpi);
        let b = inches_to_px(self.height_in, self.dpi);
        let (short, long) = (a.min(b), a.max(b));
        let (width, height) = match orientation {
            Orientation::Landscape => (long, short),
            Orientation::Portrait | Orientation::Square => (short, long),
        };
        Canvas {
            width,
            height,
            dpi: self.dpi,
            background: self.background,
        }
    }

    /// Convert a length in centimeters to pixels at this page's resolution.
    pub fn cm_to_px(&self, cm: f64) -> MergeResult<u32> {
        if !cm.is_finite() || cm <= 0.0 {
            return Err(MergeError::image_size(format!(
                "height must be a positive number of centimeters, got {cm}"
            )));
        }
        let px = (cm / CM_PER_INCH * f64::from(self.dpi)).round();
        if px < 1.0 || px > f64::from(u32::MAX) {
            return Err(MergeError::image_size(format!(
                "{cm}cm is out of range at {}dpi",
                self.dpi
            )));
        }
        Ok(px as u32)
    }
}

fn inches_to_px(inches: f64, dpi: u32) -> u32 {
    (inches * f64::from(dpi)).round().max(1.0) as u32
}

/// Output surface geometry. Pixels live in the composed page, not here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
    pub background: [u8; 3],
}

impl Canvas {
    pub fn rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::of(self.width, self.height)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Orientation {
    Portrait,
    Landscape,
    Square,
}

impl Orientation {
    pub fn of(width: u32, height: u32) -> Self {
        match width.cmp(&height) {
            std::cmp::Ordering::Greater => Self::Landscape,
            std::cmp::Ordering::Less => Self::Portrait,
            std::cmp::Ordering::Equal => Self::Square,
        }
    }
}

/// Integer pixel rectangle; `x`/`y` is the top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}
