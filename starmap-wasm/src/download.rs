use std::cell::RefCell;
use std::rc::Rc;

use log::info;
use starmap_core::{ImageFormat, Result, StarMapError, plan_composite};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Document, HtmlAnchorElement, HtmlCanvasElement, Url};

use crate::canvas;
use crate::dom::{self, StatusKind};
use crate::fetch;
use crate::state::{InFlight, State, Trigger};
use crate::utils::js_error_text;

const JPEG_QUALITY: f64 = 0.92;

fn canvas_err(e: JsValue) -> StarMapError {
    StarMapError::Canvas(js_error_text(&e))
}

/// Detached canvas the size of the export; the preview is never touched.
fn offscreen_canvas(
    document: &Document,
    width: u32,
    height: u32,
) -> Result<(HtmlCanvasElement, CanvasRenderingContext2d)> {
    let cv = document
        .create_element("canvas")
        .map_err(canvas_err)?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| StarMapError::Canvas("not a canvas".to_string()))?;
    cv.set_width(width);
    cv.set_height(height);
    let ctx = cv
        .get_context("2d")
        .map_err(canvas_err)?
        .ok_or_else(|| StarMapError::Canvas("2D context not available".to_string()))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| StarMapError::Canvas("2D context not available".to_string()))?;
    Ok((cv, ctx))
}

fn save_href(document: &Document, href: &str, filename: &str) -> Result<()> {
    let a = document
        .create_element("a")
        .map_err(canvas_err)?
        .dyn_into::<HtmlAnchorElement>()
        .map_err(|_| StarMapError::Canvas("not an anchor".to_string()))?;
    a.set_href(href);
    a.set_download(filename);
    a.click();
    Ok(())
}

fn data_url(cv: &HtmlCanvasElement, format: ImageFormat) -> Result<String> {
    let url = match format {
        ImageFormat::Jpg => cv.to_data_url_with_type_and_encoder_options(
            format.mime(),
            &JsValue::from_f64(JPEG_QUALITY),
        ),
        _ => cv.to_data_url_with_type(format.mime()),
    };
    url.map_err(|e| StarMapError::Serialization(js_error_text(&e)))
}

/// Fetch at the target size, composite offscreen and save.
async fn run(state: &Rc<RefCell<State>>) -> Result<String> {
    let (window, document, proxy_url, preview_ok) = {
        let s = state.borrow();
        (
            s.window.clone(),
            s.document.clone(),
            s.proxy_url.clone(),
            s.preview_ok,
        )
    };
    if !preview_ok {
        return Err(StarMapError::NoPreview);
    }
    let form = dom::read_form(&document);
    let filename = form.download_filename();
    let request = form.download_request()?;
    let format = request.format();
    dom::set_status(&document, "Preparing download…", StatusKind::Info);

    let (image, offline) = fetch::fetch_or_fallback(&window, &proxy_url, &request).await?;

    if format == ImageFormat::Svg {
        image.svg_text()?;
        let blob = fetch::image_blob(&image)?;
        let url = Url::create_object_url_with_blob(&blob).map_err(canvas_err)?;
        let saved = save_href(&document, &url, &filename);
        let _ = Url::revoke_object_url(&url);
        saved?;
        return Ok(format!(
            "Saved {filename}. SVG downloads contain the chart only, without border or text."
        ));
    }

    let (width, height) = (request.body.output.width, request.body.output.height);
    let img = fetch::decode_image(&image).await?;
    let (cv, ctx) = offscreen_canvas(&document, width, height)?;
    let plan = plan_composite(&form.render_config(width, height, format, &request.location));
    canvas::draw_plan(&ctx, &plan, &img).map_err(canvas_err)?;
    let href = data_url(&cv, format)?;
    save_href(&document, &href, &filename)?;
    info!("downloaded {filename} ({width}x{height})");

    let mut msg = format!("Saved {filename} ({width}×{height}).");
    if offline {
        msg.push_str(" The star chart service was unreachable; an offline approximation was used.");
    }
    for w in plan.warnings() {
        msg.push(' ');
        msg.push_str(&w);
    }
    Ok(msg)
}

/// Download entry point. One download at a time; the loader is hidden when
/// the guard drops, on success and on failure alike.
pub async fn download_star_map(state: Rc<RefCell<State>>) {
    let document = state.borrow().document.clone();
    let Some(_guard) = InFlight::begin(&state, Trigger::Download) else {
        dom::set_status(&document, Trigger::Download.busy_message(), StatusKind::Warn);
        return;
    };
    match run(&state).await {
        Ok(msg) => dom::set_status(&document, &msg, StatusKind::Info),
        Err(e) => {
            log::error!("download failed: {e}");
            dom::set_status(
                &document,
                &format!("Download failed: {}", e.user_message()),
                StatusKind::Error,
            );
        }
    }
}
