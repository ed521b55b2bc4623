//! Star chart retrieval through the proxy.
//!
//! Every request is bounded by an `AbortController` timeout. When the proxy
//! cannot be reached at all (no server, `file://` page) a synthetic sky is
//! produced locally instead.

use std::cell::Cell;
use std::rc::Rc;

use log::{debug, warn};
use png::{BitDepth, ColorType, Compression, Encoder, FilterType};
use starmap_core::fallback::synthetic_sky_svg;
use starmap_core::{ImageFormat, Result, StarMapError, StarMapImage, StarMapRequest};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AbortController, Blob, BlobPropertyBag, Headers, HtmlImageElement, Request, RequestInit,
    Response, Url, Window,
};

use crate::utils::js_error_text;

pub const TIMEOUT_MS: i32 = 30_000;

fn network(e: JsValue) -> StarMapError {
    StarMapError::Network(js_error_text(&e))
}

fn canvas_err(e: JsValue) -> StarMapError {
    StarMapError::Canvas(js_error_text(&e))
}

/// Clears the abort timer however the fetch ends.
struct AbortTimer {
    window: Window,
    handle: i32,
    _callback: Closure<dyn FnMut()>,
}

impl AbortTimer {
    fn start(window: &Window, controller: &AbortController, fired: Rc<Cell<bool>>) -> Result<Self> {
        let ctl = controller.clone();
        let callback = Closure::<dyn FnMut()>::wrap(Box::new(move || {
            fired.set(true);
            ctl.abort();
        }));
        let handle = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                TIMEOUT_MS,
            )
            .map_err(network)?;
        Ok(Self {
            window: window.clone(),
            handle,
            _callback: callback,
        })
    }
}

impl Drop for AbortTimer {
    fn drop(&mut self) {
        self.window.clear_timeout_with_handle(self.handle);
    }
}

async fn response_text(resp: &Response) -> String {
    let Ok(p) = resp.text() else {
        return String::new();
    };
    JsFuture::from(p)
        .await
        .ok()
        .and_then(|v| v.as_string())
        .unwrap_or_default()
}

/// POST the request to the proxy and validate the response bytes.
pub async fn fetch_chart(
    window: &Window,
    proxy_url: &str,
    request: &StarMapRequest,
) -> Result<StarMapImage> {
    let body = request.to_json()?;
    let controller = AbortController::new().map_err(network)?;
    let timed_out = Rc::new(Cell::new(false));
    let _timer = AbortTimer::start(window, &controller, timed_out.clone())?;

    let headers = Headers::new().map_err(network)?;
    headers
        .set("Content-Type", "application/json")
        .map_err(network)?;
    let init = RequestInit::new();
    init.set_method("POST");
    init.set_headers(&headers);
    init.set_body(&JsValue::from_str(&body));
    init.set_signal(Some(&controller.signal()));
    let req = Request::new_with_str_and_init(proxy_url, &init).map_err(network)?;

    debug!("POST {proxy_url}");
    let timeout = || StarMapError::Timeout((TIMEOUT_MS / 1000) as u32);
    let resp_value = match JsFuture::from(window.fetch_with_request(&req)).await {
        Ok(v) => v,
        Err(_) if timed_out.get() => return Err(timeout()),
        Err(e) => return Err(network(e)),
    };
    let resp: Response = resp_value.dyn_into().map_err(network)?;

    if !resp.ok() {
        return Err(StarMapError::Server {
            status: resp.status(),
            message: response_text(&resp).await.trim().to_string(),
        });
    }
    let content_type = resp.headers().get("content-type").ok().flatten();
    let buf = match JsFuture::from(resp.array_buffer().map_err(network)?).await {
        Ok(b) => b,
        Err(_) if timed_out.get() => return Err(timeout()),
        Err(e) => return Err(network(e)),
    };
    let bytes = js_sys::Uint8Array::new(&buf).to_vec();
    StarMapImage::from_response(request.format(), content_type.as_deref(), bytes)
}

/// Straight-alpha PNG of a rendered pixmap.
fn encode_png_deterministic_to_vec(pixmap: &tiny_skia::Pixmap) -> Result<Vec<u8>> {
    let encode = || -> std::result::Result<Vec<u8>, png::EncodingError> {
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf, pixmap.width(), pixmap.height());
        enc.set_color(ColorType::Rgba);
        enc.set_depth(BitDepth::Eight);
        enc.set_filter(FilterType::NoFilter);
        enc.set_compression(Compression::Default);
        {
            let mut writer = enc.write_header()?;
            let data: Vec<u8> = pixmap
                .pixels()
                .iter()
                .flat_map(|p| {
                    let c = p.demultiply();
                    [c.red(), c.green(), c.blue(), c.alpha()]
                })
                .collect();
            writer.write_image_data(&data)?;
            writer.finish()?;
        }
        Ok(buf)
    };
    encode().map_err(|e| StarMapError::Serialization(e.to_string()))
}

/// Locally generated stand-in in the requested format.
pub fn offline_chart(request: &StarMapRequest) -> Result<StarMapImage> {
    let svg = synthetic_sky_svg(request);
    if request.format() == ImageFormat::Svg {
        return Ok(StarMapImage {
            format: ImageFormat::Svg,
            bytes: svg.into_bytes(),
        });
    }
    let out = &request.body.output;
    let opt = usvg::Options::default();
    let tree = usvg::Tree::from_str(&svg, &opt)
        .map_err(|e| StarMapError::Decode(format!("SVG parse error: {e:?}")))?;
    let mut pixmap = tiny_skia::Pixmap::new(out.width, out.height)
        .ok_or_else(|| StarMapError::Canvas("pixmap alloc failed".to_string()))?;
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());
    Ok(StarMapImage {
        format: ImageFormat::Png,
        bytes: encode_png_deterministic_to_vec(&pixmap)?,
    })
}

/// Fetch, or fall back to the synthetic sky when the proxy is unreachable.
/// The flag tells whether the fallback was used.
pub async fn fetch_or_fallback(
    window: &Window,
    proxy_url: &str,
    request: &StarMapRequest,
) -> Result<(StarMapImage, bool)> {
    match fetch_chart(window, proxy_url, request).await {
        Ok(img) => Ok((img, false)),
        Err(StarMapError::Network(e)) => {
            warn!("proxy unreachable ({e}); drawing an offline approximation");
            Ok((offline_chart(request)?, true))
        }
        Err(e) => Err(e),
    }
}

/// Blob carrying the image bytes with their MIME type.
pub fn image_blob(image: &StarMapImage) -> Result<Blob> {
    let parts = js_sys::Array::new();
    parts.push(&js_sys::Uint8Array::from(image.bytes.as_slice()));
    let opts = BlobPropertyBag::new();
    opts.set_type(image.format.mime());
    Blob::new_with_u8_array_sequence_and_options(&parts, &opts).map_err(canvas_err)
}

/// Decode the bytes into an image element. The object URL is revoked once
/// decoding has finished.
pub async fn decode_image(image: &StarMapImage) -> Result<HtmlImageElement> {
    let blob = image_blob(image)?;
    let url = Url::create_object_url_with_blob(&blob).map_err(canvas_err)?;
    let img = HtmlImageElement::new().map_err(canvas_err)?;
    img.set_src(&url);
    let decoded = JsFuture::from(img.decode()).await;
    let _ = Url::revoke_object_url(&url);
    decoded.map_err(|e| StarMapError::Decode(js_error_text(&e)))?;
    Ok(img)
}
