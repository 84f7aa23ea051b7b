use tracing::debug;

use crate::{
    foundation::core::Rect,
    layout::template::{FitRule, Slot},
};

/// Quarter turns applied to a source before scaling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Rotation {
    #[default]
    None,
    /// 90° clockwise.
    Quarter,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Quarter => 90,
        }
    }

    /// Source dimensions after this rotation.
    pub fn apply(self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Self::None => (width, height),
            Self::Quarter => (height, width),
        }
    }
}

/// Where and how one source image lands on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Placement {
    /// Position of the source in the input list.
    pub index: usize,
    pub slot: Slot,
    pub rotation: Rotation,
    /// Output pixels per (rotated) source pixel.
    pub scale: f64,
    /// Region of the rotated source that is drawn; `None` draws all of it.
    pub crop: Option<Rect>,
    /// Canvas rectangle the drawn region is resized into. Always inside `slot.rect`.
    pub target: Rect,
}

/// Decide rotation, scale and target rectangle for a `width`×`height` source.
///
/// Under [`FitRule::Fit`] the source is rotated only when that lets it be drawn
/// strictly larger; under [`FitRule::Fill`] only when that crops strictly less.
/// Ties keep the source as-is, so the choice is stable for identical input.
pub fn plan_placement(index: usize, width: u32, height: u32, slot: &Slot) -> Placement {
    let sw = f64::from(slot.rect.width);
    let sh = f64::from(slot.rect.height);
    let (w, h) = (f64::from(width.max(1)), f64::from(height.max(1)));

    let placement = match slot.fit {
        FitRule::Fit => {
            let straight = (sw / w).min(sh / h);
            let turned = (sw / h).min(sh / w);
            let rotation = if slot.allow_rotation && turned > straight {
                Rotation::Quarter
            } else {
                Rotation::None
            };
            let scale = if rotation == Rotation::Quarter { turned } else { straight };

            let (rw, rh) = rotation.apply(width.max(1), height.max(1));
            let tw = scaled(rw, scale, slot.rect.width);
            let th = scaled(rh, scale, slot.rect.height);
            Placement {
                index,
                slot: *slot,
                rotation,
                scale,
                crop: None,
                target: Rect::new(
                    slot.rect.x + (slot.rect.width - tw) / 2,
                    slot.rect.y + (slot.rect.height - th) / 2,
                    tw,
                    th,
                ),
            }
        }
        FitRule::Fill => {
            let straight = (sw / w).max(sh / h);
            let turned = (sw / h).max(sh / w);
            let rotation = if slot.allow_rotation && turned < straight {
                Rotation::Quarter
            } else {
                Rotation::None
            };
            let scale = if rotation == Rotation::Quarter { turned } else { straight };

            let (rw, rh) = rotation.apply(width.max(1), height.max(1));
            let cw = scaled(slot.rect.width, 1.0 / scale, rw);
            let ch = scaled(slot.rect.height, 1.0 / scale, rh);
            Placement {
                index,
                slot: *slot,
                rotation,
                scale,
                crop: Some(Rect::new((rw - cw) / 2, (rh - ch) / 2, cw, ch)),
                target: slot.rect,
            }
        }
    };

    debug!(
        index,
        width,
        height,
        rotation = placement.rotation.degrees(),
        scale = placement.scale,
        target_w = placement.target.width,
        target_h = placement.target.height,
        "planned placement"
    );
    placement
}

fn scaled(len: u32, scale: f64, limit: u32) -> u32 {
    ((f64::from(len) * scale).round() as u32).clamp(1, limit.max(1))
}
