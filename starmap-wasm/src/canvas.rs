use std::f64::consts::TAU;

use starmap_core::layout::{ClipEllipse, CompositePlan};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

// Non-deprecated helpers to set canvas styles via property assignment.
pub fn set_fill_style(ctx: &CanvasRenderingContext2d, color: &str) {
    let _ = js_sys::Reflect::set(
        ctx.as_ref(),
        &JsValue::from_str("fillStyle"),
        &JsValue::from_str(color),
    );
}

pub fn set_stroke_style(ctx: &CanvasRenderingContext2d, color: &str) {
    let _ = js_sys::Reflect::set(
        ctx.as_ref(),
        &JsValue::from_str("strokeStyle"),
        &JsValue::from_str(color),
    );
}

pub fn resize(canvas: &HtmlCanvasElement, width: u32, height: u32) {
    if canvas.width() != width {
        canvas.set_width(width);
    }
    if canvas.height() != height {
        canvas.set_height(height);
    }
}

fn ellipse_path(ctx: &CanvasRenderingContext2d, c: &ClipEllipse) -> Result<(), JsValue> {
    ctx.begin_path();
    ctx.ellipse(c.cx, c.cy, c.rx.max(0.0), c.ry.max(0.0), 0.0, 0.0, TAU)
}

/// Execute a composite plan onto a canvas already sized to the plan.
pub fn draw_plan(
    ctx: &CanvasRenderingContext2d,
    plan: &CompositePlan,
    chart: &HtmlImageElement,
) -> Result<(), JsValue> {
    let (w, h) = (plan.width as f64, plan.height as f64);
    ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, w, h);
    if let Some(bg) = &plan.background {
        set_fill_style(ctx, bg);
        ctx.fill_rect(0.0, 0.0, w, h);
    }

    ctx.save();
    ellipse_path(ctx, &plan.clip)?;
    ctx.clip();
    let drawn = ctx.draw_image_with_html_image_element_and_dw_and_dh(chart, 0.0, 0.0, w, h);
    ctx.restore();
    drawn?;

    if let Some(border) = &plan.border {
        ellipse_path(ctx, &plan.clip)?;
        set_stroke_style(ctx, &border.color);
        ctx.set_line_width(border.width);
        ctx.stroke();
    }

    ctx.set_text_align("center");
    for t in &plan.texts {
        ctx.set_font(&t.css_font());
        ctx.set_text_baseline(t.baseline.as_canvas());
        set_fill_style(ctx, &t.layer.color);
        ctx.fill_text(t.layer.text.trim(), t.x, t.y)?;
    }
    Ok(())
}

/// Hatched placeholder so a failed render is never mistaken for a chart.
pub fn draw_failure(ctx: &CanvasRenderingContext2d, width: u32, height: u32) {
    let (w, h) = (width as f64, height as f64);
    let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    set_fill_style(ctx, "#1d1d24");
    ctx.fill_rect(0.0, 0.0, w, h);

    set_stroke_style(ctx, "#3a3a46");
    ctx.set_line_width(6.0);
    ctx.begin_path();
    let step = 24.0;
    let mut x = -h;
    while x < w {
        ctx.move_to(x, h);
        ctx.line_to(x + h, 0.0);
        x += step;
    }
    ctx.stroke();

    set_fill_style(ctx, "#ff6b6b");
    ctx.set_font("bold 24px sans-serif");
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    let _ = ctx.fill_text("render failed", w / 2.0, h / 2.0);
}
