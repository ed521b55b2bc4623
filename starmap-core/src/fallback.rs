//! Offline stand-in for the star chart API.
//!
//! When the proxy cannot be reached (for example a page opened from
//! `file://`) a deterministic synthetic sky is drawn instead, so the composite
//! and download still work. The same location and date always give the same
//! sky.

use std::fmt::Write as _;

use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;

use crate::request::StarMapRequest;

fn seed_for(request: &StarMapRequest) -> u64 {
    let lat = (request.location.latitude * 1e5).round() as i64 as u64;
    let lon = (request.location.longitude * 1e5).round() as i64 as u64;
    let ra = (request.lst_hours * 1e6).round() as i64 as u64;
    lat.rotate_left(17) ^ lon.rotate_left(41) ^ ra ^ 0x9E37_79B9_7F4A_7C15
}

/// Number of stars drawn for a canvas of the given size.
pub fn star_count(width: u32, height: u32) -> usize {
    ((width as usize * height as usize) / 2_500).clamp(200, 4_000)
}

/// Synthetic sky for the request's size and background, as an SVG document.
pub fn synthetic_sky_svg(request: &StarMapRequest) -> String {
    let out = &request.body.output;
    let params = &request.body.view.parameters;
    let (w, h) = (out.width.max(1), out.height.max(1));
    let scale = w.min(h) as f64 / 800.0;
    let mut rng = StdRng::seed_from_u64(seed_for(request));
    let x_dist = Uniform::from(0.0..w as f64);
    let y_dist = Uniform::from(0.0..h as f64);
    let unit = Uniform::from(0.0..1.0f64);

    let mut s = String::new();
    let _ = writeln!(
        s,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">"
    );
    if let Some(bg) = &params.background_color {
        let _ = writeln!(
            s,
            "<rect x=\"0\" y=\"0\" width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            crate::svg::escape(bg)
        );
    }
    if params.toggles.grid {
        let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
        let max_r = (w.max(h) as f64) * 0.75;
        let mut r = max_r / 6.0;
        while r <= max_r {
            let _ = writeln!(
                s,
                "<circle cx=\"{cx:.1}\" cy=\"{cy:.1}\" r=\"{r:.1}\" fill=\"none\" stroke=\"#4a5a80\" stroke-opacity=\"0.5\" stroke-width=\"{:.2}\"/>",
                scale.max(0.5)
            );
            r += max_r / 6.0;
        }
    }
    for _ in 0..star_count(w, h) {
        let x = x_dist.sample(&mut rng);
        let y = y_dist.sample(&mut rng);
        // Few bright stars, many faint ones.
        let mag = unit.sample(&mut rng).powi(3);
        let r = (0.4 + mag * 2.2) * scale;
        let opacity = 0.35 + mag * 0.65;
        let _ = writeln!(
            s,
            "<circle cx=\"{x:.1}\" cy=\"{y:.1}\" r=\"{r:.2}\" fill=\"#ffffff\" fill-opacity=\"{opacity:.2}\"/>"
        );
    }
    s.push_str("</svg>\n");
    s
}
