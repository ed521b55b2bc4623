use std::sync::Arc;

use anyhow::{Context, Result, bail};
use png::{BitDepth, ColorType, Compression, Encoder, FilterType};
use starmap_core::layout::{ClipEllipse, CompositePlan};
use starmap_core::svg::text_overlay_svg;
use starmap_core::{ImageFormat, StarMapImage};
use tiny_skia::{
    Color, FillRule, FilterQuality, IntSize, Mask, Paint, Path, PathBuilder, Pixmap, PixmapPaint,
    Rect, Stroke, Transform,
};
use tracing::warn;

const JPEG_QUALITY: u8 = 92;

/// SVG options with the embedded font mapped to the generic families.
pub fn svg_options() -> usvg::Options<'static> {
    let mut opt = usvg::Options::default();
    let mut fontdb = usvg::fontdb::Database::new();
    if fonts::is_embedded() {
        fontdb.load_font_data(fonts::FONT_BYTES.to_vec());
        let family_name = fontdb
            .faces()
            .next()
            .and_then(|face| face.families.first().map(|(n, _)| n.clone()));
        if let Some(name) = family_name {
            fontdb.set_serif_family(name.clone());
            fontdb.set_sans_serif_family(name);
        }
    } else {
        warn!("no embedded font, text uses system fonts");
        fontdb.load_system_fonts();
    }
    opt.fontdb = Arc::new(fontdb);
    opt
}

/// Any CSS color the browser canvas would take: hex, names, `rgb()`, `hsl()`.
pub fn parse_color(s: &str) -> Result<Color> {
    let c: svgtypes::Color = s
        .trim()
        .parse()
        .with_context(|| format!("unsupported color {s:?}"))?;
    Ok(Color::from_rgba8(c.red, c.green, c.blue, c.alpha))
}

fn decode_raster(format: ImageFormat, bytes: &[u8]) -> Result<Pixmap> {
    if format == ImageFormat::Png {
        return Pixmap::decode_png(bytes).context("star chart PNG decode failed");
    }
    let rgba = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)
        .context("star chart JPEG decode failed")?
        .to_rgba8();
    let size = IntSize::from_wh(rgba.width(), rgba.height()).context("empty JPEG")?;
    Pixmap::from_vec(rgba.into_raw(), size).context("JPEG pixel buffer mismatch")
}

/// Chart image scaled to exactly cover a `width`×`height` canvas.
pub fn chart_pixmap(
    image: &StarMapImage,
    width: u32,
    height: u32,
    opt: &usvg::Options,
) -> Result<Pixmap> {
    let mut out = Pixmap::new(width, height).context("pixmap alloc failed")?;
    match image.format {
        ImageFormat::Svg => {
            let tree = usvg::Tree::from_data(&image.bytes, opt)
                .map_err(|e| anyhow::anyhow!("star chart SVG parse error: {e:?}"))?;
            let size = tree.size();
            let ts = Transform::from_scale(
                width as f32 / size.width(),
                height as f32 / size.height(),
            );
            resvg::render(&tree, ts, &mut out.as_mut());
        }
        raster => {
            let src = decode_raster(raster, &image.bytes)?;
            let ts = Transform::from_scale(
                width as f32 / src.width() as f32,
                height as f32 / src.height() as f32,
            );
            let paint = PixmapPaint {
                quality: FilterQuality::Bicubic,
                ..Default::default()
            };
            out.draw_pixmap(0, 0, src.as_ref(), &paint, ts, None);
        }
    }
    Ok(out)
}

fn ellipse_path(c: &ClipEllipse) -> Option<Path> {
    let rect = Rect::from_xywh(
        (c.cx - c.rx) as f32,
        (c.cy - c.ry) as f32,
        (c.rx * 2.0) as f32,
        (c.ry * 2.0) as f32,
    )?;
    PathBuilder::from_oval(rect)
}

/// Execute a composite plan: background, clipped chart, border, then text.
pub fn composite(plan: &CompositePlan, chart: &Pixmap, opt: &usvg::Options) -> Result<Pixmap> {
    let mut canvas = Pixmap::new(plan.width, plan.height).context("pixmap alloc failed")?;
    if let Some(bg) = &plan.background {
        canvas.fill(parse_color(bg)?);
    }

    if let Some(oval) = ellipse_path(&plan.clip) {
        let mut mask = Mask::new(plan.width, plan.height).context("mask alloc failed")?;
        mask.fill_path(&oval, FillRule::Winding, true, Transform::identity());
        let ts = Transform::from_scale(
            plan.width as f32 / chart.width() as f32,
            plan.height as f32 / chart.height() as f32,
        );
        canvas.draw_pixmap(0, 0, chart.as_ref(), &PixmapPaint::default(), ts, Some(&mask));

        if let Some(border) = &plan.border {
            let mut paint = Paint::default();
            paint.set_color(parse_color(&border.color)?);
            paint.anti_alias = true;
            let stroke = Stroke {
                width: border.width as f32,
                ..Default::default()
            };
            canvas.stroke_path(&oval, &paint, &stroke, Transform::identity(), None);
        }
    } else {
        warn!("clip ellipse is empty, chart not drawn");
    }

    if !plan.texts.is_empty() {
        let tree = usvg::Tree::from_str(&text_overlay_svg(plan), opt)
            .map_err(|e| anyhow::anyhow!("text overlay SVG parse error: {e:?}"))?;
        resvg::render(&tree, Transform::identity(), &mut canvas.as_mut());
    }
    Ok(canvas)
}

/// Straight (non-premultiplied) RGBA bytes.
fn rgba_bytes(pixmap: &Pixmap) -> Vec<u8> {
    pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect()
}

fn encode_png_deterministic_to_vec(pixmap: &Pixmap) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut enc = Encoder::new(&mut out, pixmap.width(), pixmap.height());
        enc.set_color(ColorType::Rgba);
        enc.set_depth(BitDepth::Eight);
        enc.set_filter(FilterType::NoFilter);
        enc.set_compression(Compression::Default);
        let mut writer = enc.write_header()?;
        writer.write_image_data(&rgba_bytes(pixmap))?;
        writer.finish()?;
    }
    Ok(out)
}

fn encode_jpeg(pixmap: &Pixmap) -> Result<Vec<u8>> {
    let rgb: Vec<u8> = rgba_bytes(pixmap)
        .chunks_exact(4)
        .flat_map(|p| [p[0], p[1], p[2]])
        .collect();
    let img = image::RgbImage::from_raw(pixmap.width(), pixmap.height(), rgb)
        .context("RGB buffer size mismatch")?;
    let mut out = Vec::new();
    let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    enc.encode_image(&img).context("JPEG encode failed")?;
    Ok(out)
}

pub fn encode(pixmap: &Pixmap, format: ImageFormat) -> Result<Vec<u8>> {
    match format {
        ImageFormat::Png => encode_png_deterministic_to_vec(pixmap),
        ImageFormat::Jpg => encode_jpeg(pixmap),
        ImageFormat::Svg => bail!("a composited raster cannot be encoded as SVG"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starmap_core::layout::{PREVIEW_WIDTH_PX, RenderConfig, plan_composite};
    use starmap_core::model::RenderTarget;

    fn plan(format: ImageFormat, transparent: bool, border: u32) -> CompositePlan {
        plan_composite(&RenderConfig {
            target: RenderTarget {
                width: 200,
                height: 200,
                circle_radius_percent: 50,
                border_width_px: border,
                border_color: "#00ff00".into(),
                background_color: "#ff0000".into(),
                transparent,
            },
            format,
            layers: Vec::new(),
            authoring_width: PREVIEW_WIDTH_PX,
        })
    }

    fn blue_chart() -> Pixmap {
        let mut p = Pixmap::new(50, 50).unwrap();
        p.fill(Color::from_rgba8(0, 0, 255, 255));
        p
    }

    fn rgba_at(p: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let c = p.pixel(x, y).unwrap().demultiply();
        [c.red(), c.green(), c.blue(), c.alpha()]
    }

    #[test]
    fn colors() {
        assert_eq!(parse_color("#fff").unwrap(), Color::WHITE);
        assert_eq!(parse_color(" #000000 ").unwrap(), Color::BLACK);
        assert_eq!(parse_color("red").unwrap(), Color::from_rgba8(255, 0, 0, 255));
        assert_eq!(
            parse_color("rgb(0, 128, 255)").unwrap(),
            Color::from_rgba8(0, 128, 255, 255)
        );
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("not-a-colour").is_err());
    }

    #[test]
    fn chart_clipped_inside_background() {
        let opt = usvg::Options::default();
        let out = composite(&plan(ImageFormat::Png, false, 0), &blue_chart(), &opt).unwrap();
        assert_eq!(rgba_at(&out, 100, 100), [0, 0, 255, 255]);
        assert_eq!(rgba_at(&out, 2, 2), [255, 0, 0, 255]);
    }

    #[test]
    fn named_background_matches_hex() {
        let opt = usvg::Options::default();
        let mut p = plan(ImageFormat::Png, false, 0);
        p.background = Some("navy".into());
        let out = composite(&p, &blue_chart(), &opt).unwrap();
        assert_eq!(rgba_at(&out, 2, 2), [0, 0, 128, 255]);

        p.background = Some("no-such-colour".into());
        assert!(composite(&p, &blue_chart(), &opt).is_err());
    }

    #[test]
    fn transparent_png_keeps_alpha() {
        let opt = usvg::Options::default();
        let out = composite(&plan(ImageFormat::Png, true, 0), &blue_chart(), &opt).unwrap();
        assert_eq!(rgba_at(&out, 2, 2)[3], 0);
        let jpeg = composite(&plan(ImageFormat::Jpg, true, 0), &blue_chart(), &opt).unwrap();
        assert_eq!(rgba_at(&jpeg, 2, 2), [255, 0, 0, 255]);
    }

    #[test]
    fn border_is_stroked_on_the_ellipse() {
        let opt = usvg::Options::default();
        let p = plan(ImageFormat::Png, false, 16);
        let out = composite(&p, &blue_chart(), &opt).unwrap();
        // border width 16 * 200/800 = 4 px, centred on the ellipse edge
        let x = (p.clip.cx + p.clip.rx) as u32;
        assert_eq!(rgba_at(&out, x, 100), [0, 255, 0, 255]);
    }

    #[test]
    fn encodes_png_and_jpeg() {
        let opt = usvg::Options::default();
        let out = composite(&plan(ImageFormat::Png, false, 0), &blue_chart(), &opt).unwrap();
        let png = encode(&out, ImageFormat::Png).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let jpg = encode(&out, ImageFormat::Jpg).unwrap();
        assert_eq!(&jpg[..2], [0xFF, 0xD8]);
        assert!(encode(&out, ImageFormat::Svg).is_err());
    }

    #[test]
    fn svg_chart_is_scaled_to_canvas() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10" fill="#0000ff"/></svg>"##;
        let image = StarMapImage {
            format: ImageFormat::Svg,
            bytes: svg.as_bytes().to_vec(),
        };
        let opt = usvg::Options::default();
        let p = chart_pixmap(&image, 120, 80, &opt).unwrap();
        assert_eq!((p.width(), p.height()), (120, 80));
        assert_eq!(rgba_at(&p, 119, 79), [0, 0, 255, 255]);
    }

    #[test]
    fn png_chart_round_trips_through_decode() {
        let png = encode(&blue_chart(), ImageFormat::Png).unwrap();
        let image = StarMapImage {
            format: ImageFormat::Png,
            bytes: png,
        };
        let p = chart_pixmap(&image, 100, 100, &usvg::Options::default()).unwrap();
        assert_eq!(rgba_at(&p, 50, 50), [0, 0, 255, 255]);
    }
}
