//! Backend-independent geometry of one star map composite.
//!
//! A [`CompositePlan`] fixes everything a backend needs: background fill, the
//! clip ellipse, the border stroke and the position of every text layer. The
//! browser canvas and the native renderer both execute the same plan, so the
//! preview and any export are proportionally identical.

use log::warn;

use crate::model::{ImageFormat, RenderTarget, StyledTextLayer, TextPosition};

/// Width the preview canvas is authored at; font sizes refer to this width.
pub const PREVIEW_WIDTH_PX: u32 = 800;
/// Line advance as a multiple of the scaled font size.
pub const LINE_HEIGHT: f64 = 1.2;
/// Gap between circle and text, and text and canvas edge, relative to radiusY.
pub const MARGIN_RATIO: f64 = 0.10;

/// Tallest preview canvas. Targets taller than this shrink the preview width.
pub const PREVIEW_MAX_HEIGHT_PX: u32 = 1600;

/// Preview canvas size for a target, keeping the target aspect ratio inside a
/// `PREVIEW_WIDTH_PX` x `PREVIEW_MAX_HEIGHT_PX` box.
pub fn preview_size(target_width: u32, target_height: u32) -> (u32, u32) {
    if target_width == 0 || target_height == 0 {
        return (PREVIEW_WIDTH_PX, PREVIEW_WIDTH_PX);
    }
    let aspect = target_height as f64 / target_width as f64;
    let h = PREVIEW_WIDTH_PX as f64 * aspect;
    if h <= PREVIEW_MAX_HEIGHT_PX as f64 {
        return (PREVIEW_WIDTH_PX, (h.round() as u32).max(1));
    }
    let w = (PREVIEW_MAX_HEIGHT_PX as f64 / aspect).round() as u32;
    (w.max(1), PREVIEW_MAX_HEIGHT_PX)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipEllipse {
    pub cx: f64,
    pub cy: f64,
    pub rx: f64,
    pub ry: f64,
}

impl ClipEllipse {
    /// Ellipse inscribed in the canvas. Only the radius along the longer axis
    /// is stretched by the aspect ratio.
    pub fn for_canvas(width: u32, height: u32, radius_percent: u32) -> Self {
        let w = width as f64;
        let h = height as f64;
        let base = w.min(h) * radius_percent.min(100) as f64 / 100.0 / 2.0;
        let (rx, ry) = if w > h && h > 0.0 {
            (base * w / h, base)
        } else if h > w && w > 0.0 {
            (base, base * h / w)
        } else {
            (base, base)
        };
        Self {
            cx: w / 2.0,
            cy: h * 0.5,
            rx,
            ry,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Baseline {
    Top,
    Bottom,
}

impl Baseline {
    /// Value for `CanvasRenderingContext2d.textBaseline`.
    pub fn as_canvas(self) -> &'static str {
        match self {
            Baseline::Top => "top",
            Baseline::Bottom => "bottom",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BorderStroke {
    pub width: f64,
    pub color: String,
}

/// A text layer with its final size and anchor. `x` is the horizontal centre.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedText {
    pub layer: StyledTextLayer,
    pub font_px: u32,
    pub x: f64,
    pub y: f64,
    pub baseline: Baseline,
}

impl PlacedText {
    pub fn css_font(&self) -> String {
        self.layer.css_font(self.font_px)
    }
}

/// Everything a backend needs to composite one image.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    pub target: RenderTarget,
    pub format: ImageFormat,
    pub layers: Vec<StyledTextLayer>,
    /// Canvas width the font sizes were chosen at.
    pub authoring_width: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompositePlan {
    pub width: u32,
    pub height: u32,
    /// `None` leaves the canvas transparent.
    pub background: Option<String>,
    pub clip: ClipEllipse,
    pub border: Option<BorderStroke>,
    pub texts: Vec<PlacedText>,
    /// Ids of layers that did not fit and were not drawn.
    pub overflow: Vec<String>,
    pub scale: f64,
}

impl CompositePlan {
    pub fn warnings(&self) -> Vec<String> {
        self.overflow
            .iter()
            .map(|id| format!("text \"{id}\" does not fit on the canvas and was skipped"))
            .collect()
    }
}

fn scaled_font(base: u32, scale: f64) -> u32 {
    ((base as f64 * scale).round() as u32).max(1)
}

/// Compute the full layout for one composite.
pub fn plan_composite(config: &RenderConfig) -> CompositePlan {
    let t = &config.target;
    let scale = if config.authoring_width == 0 {
        1.0
    } else {
        t.width as f64 / config.authoring_width as f64
    };
    let width = t.width as f64;
    let height = t.height as f64;

    let background = if t.effective_transparent(config.format) {
        None
    } else {
        Some(t.background_color.clone())
    };
    let clip = ClipEllipse::for_canvas(t.width, t.height, t.circle_radius_percent);
    let border = (t.border_width_px > 0).then(|| BorderStroke {
        width: t.border_width_px as f64 * scale,
        color: t.border_color.clone(),
    });
    let half_border = border.as_ref().map(|b| b.width / 2.0).unwrap_or(0.0);
    let margin = clip.ry * MARGIN_RATIO;

    let mut above: Vec<&StyledTextLayer> = Vec::new();
    let mut below: Vec<&StyledTextLayer> = Vec::new();
    for layer in config.layers.iter().filter(|l| l.is_visible()) {
        match layer.position {
            TextPosition::Above => above.push(layer),
            TextPosition::Below => below.push(layer),
        }
    }
    // stable: equal orders keep source order
    above.sort_by_key(|l| l.order);
    below.sort_by_key(|l| l.order);

    let mut texts = Vec::new();
    let mut overflow = Vec::new();

    let mut y = clip.cy + clip.ry + half_border + margin;
    for (i, layer) in below.iter().enumerate() {
        let font_px = scaled_font(layer.font_size_px, scale);
        if y + font_px as f64 > height - margin {
            warn!("text layer {} overflows the bottom edge", layer.id);
            overflow.extend(below[i..].iter().map(|l| l.id.clone()));
            break;
        }
        texts.push(PlacedText {
            layer: (*layer).clone(),
            font_px,
            x: width / 2.0,
            y,
            baseline: Baseline::Top,
        });
        y += font_px as f64 * LINE_HEIGHT;
    }

    let mut y = clip.cy - clip.ry - half_border - margin;
    let reversed: Vec<&StyledTextLayer> = above.iter().rev().copied().collect();
    for (i, layer) in reversed.iter().enumerate() {
        let font_px = scaled_font(layer.font_size_px, scale);
        if y - (font_px as f64) < margin {
            warn!("text layer {} overflows the top edge", layer.id);
            overflow.extend(reversed[i..].iter().map(|l| l.id.clone()));
            break;
        }
        texts.push(PlacedText {
            layer: (*layer).clone(),
            font_px,
            x: width / 2.0,
            y,
            baseline: Baseline::Bottom,
        });
        y -= font_px as f64 * LINE_HEIGHT;
    }

    CompositePlan {
        width: t.width,
        height: t.height,
        background,
        clip,
        border,
        texts,
        overflow,
        scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn layer(id: &str, text: &str, order: i32, position: TextPosition) -> StyledTextLayer {
        StyledTextLayer {
            id: id.to_string(),
            text: text.to_string(),
            order,
            position,
            ..Default::default()
        }
    }

    fn target(width: u32, height: u32) -> RenderTarget {
        RenderTarget {
            width,
            height,
            circle_radius_percent: 60,
            border_width_px: 4,
            ..Default::default()
        }
    }

    fn config(width: u32, height: u32, layers: Vec<StyledTextLayer>) -> RenderConfig {
        RenderConfig {
            target: target(width, height),
            format: ImageFormat::Png,
            layers,
            authoring_width: PREVIEW_WIDTH_PX,
        }
    }

    #[test]
    fn square_canvas_is_a_circle() {
        let c = ClipEllipse::for_canvas(1000, 1000, 60);
        assert_abs_diff_eq!(c.rx, 300.0);
        assert_abs_diff_eq!(c.ry, 300.0);
        assert_abs_diff_eq!(c.cx, 500.0);
        assert_abs_diff_eq!(c.cy, 500.0);
    }

    #[test]
    fn portrait_stretches_only_vertical_radius() {
        let c = ClipEllipse::for_canvas(1000, 1250, 60);
        assert_abs_diff_eq!(c.rx, 300.0);
        assert_abs_diff_eq!(c.ry, 375.0);
        assert_abs_diff_eq!(c.ry / c.rx, 1250.0 / 1000.0);
        let l = ClipEllipse::for_canvas(1250, 1000, 60);
        assert_abs_diff_eq!(l.ry, 300.0);
        assert_abs_diff_eq!(l.rx, 375.0);
    }

    #[test]
    fn preview_fits_the_box() {
        assert_eq!(preview_size(3000, 3000), (800, 800));
        assert_eq!(preview_size(1000, 2000), (800, 1600));
        assert_eq!(preview_size(500, 7000), (114, 1600));
        assert_eq!(preview_size(1, 10000), (1, 1600));
        assert_eq!(preview_size(10000, 1), (800, 1));
    }

    #[test]
    fn fonts_and_border_follow_width_ratio() {
        let layers = vec![layer("title", "Our Night", 0, TextPosition::Below)];
        let preview = plan_composite(&config(800, 800, layers.clone()));
        let export = plan_composite(&config(2400, 2400, layers));
        assert_eq!(preview.texts[0].font_px, 16);
        assert_eq!(export.texts[0].font_px, 48);
        assert_abs_diff_eq!(preview.border.as_ref().unwrap().width, 4.0);
        assert_abs_diff_eq!(export.border.as_ref().unwrap().width, 12.0);
        // the layout is the same picture, just bigger
        assert_abs_diff_eq!(export.texts[0].y, preview.texts[0].y * 3.0, epsilon = 1e-9);
    }

    #[test]
    fn sixteen_px_becomes_sixty_at_3000() {
        let layers = vec![layer("title", "Hello", 0, TextPosition::Above)];
        let mut cfg = config(3000, 2400, layers);
        cfg.target.circle_radius_percent = 50;
        let plan = plan_composite(&cfg);
        assert_eq!((plan.width, plan.height), (3000, 2400));
        assert_eq!(plan.texts[0].font_px, 60);
        assert_eq!(preview_size(3000, 2400), (800, 640));
    }

    #[test]
    fn empty_layers_take_no_space() {
        let with_gap = vec![
            layer("a", "First", 0, TextPosition::Below),
            layer("b", "   ", 1, TextPosition::Below),
            layer("c", "Third", 2, TextPosition::Below),
        ];
        let without = vec![
            layer("a", "First", 0, TextPosition::Below),
            layer("c", "Third", 2, TextPosition::Below),
        ];
        let p1 = plan_composite(&config(800, 1000, with_gap));
        let p2 = plan_composite(&config(800, 1000, without));
        assert_eq!(p1.texts, p2.texts);
        assert_eq!(p1.texts.len(), 2);
    }

    #[test]
    fn order_then_source_order() {
        let layers = vec![
            layer("late", "L", 5, TextPosition::Below),
            layer("tie1", "T1", 1, TextPosition::Below),
            layer("tie2", "T2", 1, TextPosition::Below),
        ];
        let plan = plan_composite(&config(800, 1400, layers));
        let ids: Vec<_> = plan.texts.iter().map(|t| t.layer.id.as_str()).collect();
        assert_eq!(ids, ["tie1", "tie2", "late"]);
        assert!(plan.texts[0].y < plan.texts[1].y);
        assert_abs_diff_eq!(
            plan.texts[1].y - plan.texts[0].y,
            16.0 * LINE_HEIGHT,
            epsilon = 1e-9
        );
    }

    #[test]
    fn above_stacks_upward_lowest_order_on_top() {
        let layers = vec![
            layer("first", "1", 0, TextPosition::Above),
            layer("second", "2", 1, TextPosition::Above),
        ];
        let plan = plan_composite(&config(800, 1400, layers));
        let first = plan.texts.iter().find(|t| t.layer.id == "first").unwrap();
        let second = plan.texts.iter().find(|t| t.layer.id == "second").unwrap();
        assert_eq!(first.baseline, Baseline::Bottom);
        assert!(first.y < second.y);
        // nearest to the circle sits just above it
        let c = plan.clip;
        let margin = c.ry * MARGIN_RATIO;
        assert_abs_diff_eq!(second.y, c.cy - c.ry - 2.0 - margin);
    }

    #[test]
    fn overflow_stops_and_reports() {
        let layers: Vec<_> = (0..10)
            .map(|i| {
                let mut l = layer(&format!("l{i}"), "text", i, TextPosition::Below);
                l.font_size_px = 40;
                l
            })
            .collect();
        let plan = plan_composite(&config(800, 800, layers));
        assert!(!plan.overflow.is_empty());
        assert_eq!(plan.texts.len() + plan.overflow.len(), 10);
        for t in &plan.texts {
            assert!(t.y + t.font_px as f64 <= 800.0 - plan.clip.ry * MARGIN_RATIO);
        }
        assert_eq!(plan.warnings().len(), plan.overflow.len());
    }

    #[test]
    fn above_overflow_stops_at_top_margin() {
        let layers: Vec<_> = (0..10)
            .map(|i| {
                let mut l = layer(&format!("a{i}"), "text", i, TextPosition::Above);
                l.font_size_px = 40;
                l
            })
            .collect();
        let plan = plan_composite(&config(800, 800, layers));
        let margin = plan.clip.ry * MARGIN_RATIO;
        assert!(!plan.overflow.is_empty());
        assert_eq!(plan.texts.len() + plan.overflow.len(), 10);
        for t in &plan.texts {
            assert_eq!(t.baseline, Baseline::Bottom);
            assert!(t.y - t.font_px as f64 >= margin);
        }
        // highest order sits next to the circle and is kept; the top of the stack is dropped
        let kept: Vec<_> = plan.texts.iter().map(|t| t.layer.id.as_str()).collect();
        assert_eq!(kept[0], "a9");
        assert!(plan.overflow.contains(&"a0".to_string()));
        assert_eq!(plan.warnings().len(), plan.overflow.len());
    }

    #[test]
    fn jpeg_always_has_background() {
        let mut cfg = config(800, 800, vec![]);
        cfg.target.transparent = true;
        assert_eq!(plan_composite(&cfg).background, None);
        cfg.format = ImageFormat::Jpg;
        cfg.target.background_color = "#123456".into();
        assert_eq!(plan_composite(&cfg).background.as_deref(), Some("#123456"));
    }

    #[test]
    fn no_border_when_zero() {
        let mut cfg = config(800, 800, vec![]);
        cfg.target.border_width_px = 0;
        assert!(plan_composite(&cfg).border.is_none());
    }
}
