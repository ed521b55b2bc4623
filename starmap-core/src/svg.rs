use std::fmt::Write as _;

use crate::layout::{Baseline, CompositePlan, PlacedText};

/// Ascent and descent of a typical text face, as fractions of the em size.
/// SVG positions text on the alphabetic baseline; canvas plans use top/bottom.
const ASCENT: f64 = 0.8;
const DESCENT: f64 = 0.2;

pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn alphabetic_y(t: &PlacedText) -> f64 {
    match t.baseline {
        Baseline::Top => t.y + t.font_px as f64 * ASCENT,
        Baseline::Bottom => t.y - t.font_px as f64 * DESCENT,
    }
}

/// Transparent SVG holding only the plan's text layers, sized to the canvas.
pub fn text_overlay_svg(plan: &CompositePlan) -> String {
    let (w, h) = (plan.width, plan.height);
    let mut s = String::new();
    s.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        s,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">"
    );
    for t in &plan.texts {
        let l = &t.layer;
        let _ = writeln!(
            s,
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" font-weight=\"{}\" font-style=\"{}\" fill=\"{}\">{}</text>",
            t.x,
            alphabetic_y(t),
            escape(&l.font_family),
            t.font_px,
            if l.bold { "bold" } else { "normal" },
            if l.italic { "italic" } else { "normal" },
            escape(&l.color),
            escape(l.text.trim()),
        );
    }
    s.push_str("</svg>\n");
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{PREVIEW_WIDTH_PX, RenderConfig, plan_composite};
    use crate::model::{ImageFormat, RenderTarget, StyledTextLayer, TextPosition};

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("a<b & \"c\">"), "a&lt;b &amp; &quot;c&quot;&gt;");
    }

    #[test]
    fn overlay_contains_each_placed_layer() {
        let layers = vec![
            StyledTextLayer {
                id: "t1".into(),
                text: "Tom & Ann".into(),
                bold: true,
                position: TextPosition::Below,
                ..Default::default()
            },
            StyledTextLayer {
                id: "t2".into(),
                text: "Above".into(),
                italic: true,
                position: TextPosition::Above,
                ..Default::default()
            },
        ];
        let plan = plan_composite(&RenderConfig {
            target: RenderTarget {
                width: 1600,
                height: 2000,
                circle_radius_percent: 70,
                ..Default::default()
            },
            format: ImageFormat::Png,
            layers,
            authoring_width: PREVIEW_WIDTH_PX,
        });
        let svg = text_overlay_svg(&plan);
        assert!(svg.contains("width=\"1600\" height=\"2000\""));
        assert!(svg.contains(">Tom &amp; Ann</text>"));
        assert!(svg.contains("font-weight=\"bold\""));
        assert!(svg.contains("font-style=\"italic\""));
        assert!(svg.contains("font-size=\"32\""));
        assert_eq!(svg.matches("<text").count(), 2);
    }
}
