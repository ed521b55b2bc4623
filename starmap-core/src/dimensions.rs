//! Output size selection.
//!
//! Paper presets and the aspect-ratio lock are two modes of one controller.
//! Choosing a preset releases the lock; locking the ratio leaves preset mode.
//! Every change recalculates both edges synchronously.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::request::MAX_OUTPUT_PX;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperPreset {
    /// 8.5×11 in at 300 dpi
    Letter,
    /// 210×297 mm at 300 dpi
    A4,
    /// 10×10 in at 300 dpi
    Square,
    /// 18×24 in at 300 dpi
    Poster,
}

impl PaperPreset {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            PaperPreset::Letter => (2550, 3300),
            PaperPreset::A4 => (2480, 3508),
            PaperPreset::Square => (3000, 3000),
            PaperPreset::Poster => (5400, 7200),
        }
    }
}

impl FromStr for PaperPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "letter" => Ok(PaperPreset::Letter),
            "a4" => Ok(PaperPreset::A4),
            "square" => Ok(PaperPreset::Square),
            "poster" | "18x24" => Ok(PaperPreset::Poster),
            other => Err(format!("unknown paper preset: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DimensionMode {
    Free,
    Preset(PaperPreset),
    AspectLock { ratio: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct DimensionController {
    mode: DimensionMode,
    width: u32,
    height: u32,
}

fn clamp_edge(v: u32) -> u32 {
    v.clamp(1, MAX_OUTPUT_PX)
}

impl Default for DimensionController {
    fn default() -> Self {
        Self::with_preset(PaperPreset::Square)
    }
}

impl DimensionController {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            mode: DimensionMode::Free,
            width: clamp_edge(width),
            height: clamp_edge(height),
        }
    }

    pub fn with_preset(preset: PaperPreset) -> Self {
        let (width, height) = preset.dimensions();
        Self {
            mode: DimensionMode::Preset(preset),
            width,
            height,
        }
    }

    pub fn mode(&self) -> DimensionMode {
        self.mode
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.mode, DimensionMode::AspectLock { .. })
    }

    pub fn select_preset(&mut self, preset: PaperPreset) -> (u32, u32) {
        *self = Self::with_preset(preset);
        self.dimensions()
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.mode = if locked {
            DimensionMode::AspectLock {
                ratio: self.width as f64 / self.height as f64,
            }
        } else {
            DimensionMode::Free
        };
    }

    /// New width from the form. A locked ratio drags the height along.
    pub fn set_width(&mut self, width: u32) -> (u32, u32) {
        self.width = clamp_edge(width);
        match self.mode {
            DimensionMode::AspectLock { ratio } => {
                self.height = clamp_edge((self.width as f64 / ratio).round() as u32);
            }
            DimensionMode::Preset(_) => self.mode = DimensionMode::Free,
            DimensionMode::Free => {}
        }
        self.dimensions()
    }

    pub fn set_height(&mut self, height: u32) -> (u32, u32) {
        self.height = clamp_edge(height);
        match self.mode {
            DimensionMode::AspectLock { ratio } => {
                self.width = clamp_edge((self.height as f64 * ratio).round() as u32);
            }
            DimensionMode::Preset(_) => self.mode = DimensionMode::Free,
            DimensionMode::Free => {}
        }
        self.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_then_edit_leaves_preset_mode() {
        let mut d = DimensionController::with_preset(PaperPreset::Letter);
        assert_eq!(d.dimensions(), (2550, 3300));
        d.set_width(3000);
        assert_eq!(d.dimensions(), (3000, 3300));
        assert_eq!(d.mode(), DimensionMode::Free);
    }

    #[test]
    fn lock_keeps_ratio() {
        let mut d = DimensionController::new(3000, 2400);
        d.set_locked(true);
        assert_eq!(d.set_width(1500), (1500, 1200));
        assert_eq!(d.set_height(2400), (3000, 2400));
    }

    #[test]
    fn preset_releases_lock() {
        let mut d = DimensionController::new(1000, 500);
        d.set_locked(true);
        d.select_preset(PaperPreset::Square);
        assert!(!d.is_locked());
        assert_eq!(d.dimensions(), (3000, 3000));
    }

    #[test]
    fn edges_are_clamped() {
        let mut d = DimensionController::new(0, 50_000);
        assert_eq!(d.dimensions(), (1, MAX_OUTPUT_PX));
        d.set_locked(true);
        d.set_width(MAX_OUTPUT_PX);
        assert_eq!(d.dimensions().1, MAX_OUTPUT_PX);
    }

    #[test]
    fn preset_names() {
        assert_eq!("A4".parse::<PaperPreset>(), Ok(PaperPreset::A4));
        assert_eq!("18x24".parse::<PaperPreset>(), Ok(PaperPreset::Poster));
        assert!("tabloid".parse::<PaperPreset>().is_err());
    }
}
