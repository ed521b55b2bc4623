use std::cell::RefCell;
use std::rc::Rc;

use log::{LevelFilter, info};
use starmap_core::dimensions::{DimensionController, DimensionMode, PaperPreset};
use starmap_core::geo::{LatLng, is_postal_code};
use starmap_core::sidereal::parse_iso_date;
use starmap_core::store::FieldKey;
use starmap_core::{
    Axis, ObserverLocation, Result, StarMapError, StarMapForm, parse_coordinate, plan_composite,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Document, Event, HtmlCanvasElement};

mod canvas;
mod dom;
mod download;
mod fetch;
mod maps;
mod state;
mod storage;
mod utils;

use crate::dom::StatusKind;
use crate::maps::MapLocationPicker;
use crate::state::{InFlight, STATE, State, Trigger};
use crate::storage::HistoryKind;
use crate::utils::{get_query_param, log};

/// Centre of the contiguous US, used before any location is known.
const DEFAULT_MAP_CENTER: LatLng = LatLng {
    lat: 39.8283,
    lng: -98.5795,
};

fn init_canvas(
    document: &Document,
) -> std::result::Result<(HtmlCanvasElement, CanvasRenderingContext2d), JsValue> {
    let cv = document
        .get_element_by_id(dom::PREVIEW_CANVAS)
        .ok_or_else(|| JsValue::from_str("canvas #previewCanvas not found"))?
        .dyn_into::<HtmlCanvasElement>()?;
    let ctx = cv
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2D context not available"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    Ok((cv, ctx))
}

/// Push the values shown outside the form into the store.
fn sync_displays(state: &Rc<RefCell<State>>, form: &StarMapForm) {
    let mut s = state.borrow_mut();
    let date = form
        .moment
        .display_text()
        .unwrap_or_else(|| form.moment.date.clone());
    s.store.set(FieldKey::Date, date);
    let coords = ObserverLocation::from_input(&form.location)
        .map(|l| l.display_text())
        .unwrap_or_default();
    s.store.set(FieldKey::Coordinates, coords);
    let zoom = form.output.zoom.map(|z| z.to_string()).unwrap_or_default();
    s.store.set(FieldKey::Zoom, zoom);
}

fn bind_displays(state: &Rc<RefCell<State>>) {
    let mut s = state.borrow_mut();
    for (key, id) in [
        (FieldKey::Date, dom::DATE_DISPLAY),
        (FieldKey::Coordinates, dom::COORDS_DISPLAY),
        (FieldKey::Zoom, dom::ZOOM_DISPLAY),
        (FieldKey::Place, dom::PLACE_DISPLAY),
    ] {
        let doc = s.document.clone();
        s.store.bind(key, move |v| dom::set_text(&doc, id, v));
    }
}

/// Fetch and composite the preview. Returns the status message.
async fn render_preview(state: &Rc<RefCell<State>>) -> Result<String> {
    let (window, document, cv, ctx, proxy_url) = {
        let s = state.borrow();
        (
            s.window.clone(),
            s.document.clone(),
            s.canvas.clone(),
            s.ctx.clone(),
            s.proxy_url.clone(),
        )
    };
    let form = dom::read_form(&document);
    sync_displays(state, &form);
    // invalid input never reaches the network
    let request = form.preview_request()?;
    let (w, h) = form.preview_size();
    dom::set_status(&document, "Generating star map…", StatusKind::Info);

    let drawn = async {
        let (image, offline) = fetch::fetch_or_fallback(&window, &proxy_url, &request).await?;
        let img = fetch::decode_image(&image).await?;
        let plan = plan_composite(&form.render_config(w, h, request.format(), &request.location));
        canvas::resize(&cv, w, h);
        canvas::draw_plan(&ctx, &plan, &img)
            .map_err(|e| StarMapError::Canvas(utils::js_error_text(&e)))?;
        Ok::<_, StarMapError>((plan, offline))
    }
    .await;

    let (plan, offline) = match drawn {
        Ok(v) => v,
        Err(e) => {
            canvas::resize(&cv, w, h);
            canvas::draw_failure(&ctx, w, h);
            state.borrow_mut().preview_ok = false;
            return Err(e);
        }
    };
    state.borrow_mut().preview_ok = true;

    storage::save_form(&window, &document);
    storage::remember(
        &window,
        &document,
        HistoryKind::Text,
        form.texts.iter().map(|t| t.text.trim()),
    );

    let mut msg = if offline {
        "Preview ready. The star chart service was unreachable; showing an offline approximation."
            .to_string()
    } else {
        "Preview ready.".to_string()
    };
    for warning in plan.warnings() {
        msg.push(' ');
        msg.push_str(&warning);
    }
    Ok(msg)
}

async fn generate_preview(state: Rc<RefCell<State>>) {
    let document = state.borrow().document.clone();
    let Some(_guard) = InFlight::begin(&state, Trigger::Generate) else {
        dom::set_status(&document, Trigger::Generate.busy_message(), StatusKind::Warn);
        return;
    };
    match render_preview(&state).await {
        Ok(msg) => dom::set_status(&document, &msg, StatusKind::Info),
        Err(e) => {
            log::error!("preview failed: {e}");
            dom::set_status(&document, &e.user_message(), StatusKind::Error);
        }
    }
}

fn write_dimensions(doc: &Document, dims: &DimensionController) {
    let (w, h) = dims.dimensions();
    dom::set_value(doc, dom::WIDTH, &w.to_string());
    dom::set_value(doc, dom::HEIGHT, &h.to_string());
    if !matches!(dims.mode(), DimensionMode::Preset(_)) {
        dom::set_value(doc, dom::PAPER_SIZE, "custom");
    }
}

fn init_dimensions(doc: &Document, form: &StarMapForm) -> DimensionController {
    let size = (form.output.width, form.output.height);
    let preset = dom::value(doc, dom::PAPER_SIZE).and_then(|v| v.parse::<PaperPreset>().ok());
    let mut dims = match preset {
        Some(p) if p.dimensions() == size => DimensionController::with_preset(p),
        _ => DimensionController::new(size.0, size.1),
    };
    if dom::checked(doc, dom::LOCK_ASPECT) == Some(true) {
        dims.set_locked(true);
    }
    dims
}

/// Write a picked location into the coordinate fields.
fn set_location(state: &Rc<RefCell<State>>, loc: &ObserverLocation) {
    let mut s = state.borrow_mut();
    dom::set_value(&s.document, dom::LATITUDE, &loc.raw_latitude);
    dom::set_value(&s.document, dom::LONGITUDE, &loc.raw_longitude);
    s.store.set(FieldKey::Coordinates, loc.display_text());
    storage::save_form(&s.window, &s.document);
}

async fn lookup(state: Rc<RefCell<State>>, input_id: &'static str, kind: HistoryKind) {
    let (window, document, geocoder) = {
        let s = state.borrow();
        (
            s.window.clone(),
            s.document.clone(),
            s.map.as_ref().map(MapLocationPicker::geocoder),
        )
    };
    let Some(geocoder) = geocoder else {
        dom::set_status(&document, "The map is not available.", StatusKind::Warn);
        return;
    };
    let query = dom::value(&document, input_id).unwrap_or_default();
    let query = query.trim();
    if query.is_empty() {
        dom::set_status(&document, "Enter an address or ZIP code.", StatusKind::Warn);
        return;
    }

    let results = match maps::geocode(&geocoder, query).await {
        Ok(r) => r,
        Err(e) => {
            dom::set_status(&document, &e.to_string(), StatusKind::Error);
            return;
        }
    };
    let Some(result) = results.first() else {
        dom::set_status(&document, &format!("No match for \"{query}\"."), StatusKind::Warn);
        return;
    };

    let loc = result.location();
    set_location(&state, &loc);
    let with_boundary = kind == HistoryKind::Zip || is_postal_code(query);
    let place = {
        let mut s = state.borrow_mut();
        let place = s.map.as_mut().and_then(|m| {
            m.show_result(result, with_boundary);
            m.last_place().map(ToString::to_string)
        });
        if let Some(p) = &place {
            s.store.set(FieldKey::Place, p.clone());
        }
        place
    };
    storage::remember(&window, &document, kind, [query]);

    let label = place
        .or_else(|| result.formatted_address.clone())
        .unwrap_or_else(|| loc.display_text());
    dom::set_status(&document, &format!("Location set to {label}."), StatusKind::Info);
}

/// Register one listener for one control.
fn on(
    doc: &Document,
    id: &str,
    event: &str,
    f: impl FnMut(Event) + 'static,
) -> std::result::Result<(), JsValue> {
    let Some(el) = doc.get_element_by_id(id) else {
        log(&format!("control #{id} not found"));
        return Ok(());
    };
    let cb = Closure::<dyn FnMut(Event)>::wrap(Box::new(f));
    el.add_event_listener_with_callback(event, cb.as_ref().unchecked_ref())?;
    cb.forget();
    Ok(())
}

fn attach_ui(state: Rc<RefCell<State>>) -> std::result::Result<(), JsValue> {
    let doc = state.borrow().document.clone();

    let st = state.clone();
    on(&doc, dom::GENERATE_BTN, "click", move |_| {
        wasm_bindgen_futures::spawn_local(generate_preview(st.clone()));
    })?;

    let st = state.clone();
    on(&doc, dom::DOWNLOAD_BTN, "click", move |_| {
        wasm_bindgen_futures::spawn_local(download::download_star_map(st.clone()));
    })?;

    // Paper size, aspect lock and the two edges all go through one controller
    let st = state.clone();
    on(&doc, dom::PAPER_SIZE, "change", move |_| {
        let mut s = st.borrow_mut();
        let Some(preset) = dom::value(&s.document, dom::PAPER_SIZE)
            .and_then(|v| v.parse::<PaperPreset>().ok())
        else {
            return;
        };
        s.dimensions.select_preset(preset);
        dom::set_checked(&s.document, dom::LOCK_ASPECT, s.dimensions.is_locked());
        write_dimensions(&s.document, &s.dimensions);
    })?;

    let st = state.clone();
    on(&doc, dom::LOCK_ASPECT, "change", move |_| {
        let mut s = st.borrow_mut();
        let locked = dom::checked(&s.document, dom::LOCK_ASPECT).unwrap_or(false);
        s.dimensions.set_locked(locked);
        dom::set_checked(&s.document, dom::LOCK_ASPECT, s.dimensions.is_locked());
        write_dimensions(&s.document, &s.dimensions);
    })?;

    for (id, is_width) in [(dom::WIDTH, true), (dom::HEIGHT, false)] {
        let st = state.clone();
        on(&doc, id, "input", move |_| {
            let mut s = st.borrow_mut();
            let Some(v) = dom::value(&s.document, id).and_then(|v| v.trim().parse::<u32>().ok())
            else {
                return;
            };
            let (w, h) = if is_width {
                s.dimensions.set_width(v)
            } else {
                s.dimensions.set_height(v)
            };
            // leave the edge being typed in alone
            let (other, value) = if is_width {
                (dom::HEIGHT, h)
            } else {
                (dom::WIDTH, w)
            };
            dom::set_value(&s.document, other, &value.to_string());
            if !matches!(s.dimensions.mode(), DimensionMode::Preset(_)) {
                dom::set_value(&s.document, dom::PAPER_SIZE, "custom");
            }
        })?;
    }

    for id in [dom::DATE, dom::TIME, dom::SHOW_TIME, dom::ZOOM, dom::LATITUDE, dom::LONGITUDE] {
        let st = state.clone();
        on(&doc, id, "input", move |_| {
            let form = dom::read_form(&st.borrow().document);
            sync_displays(&st, &form);
        })?;
    }

    let st = state.clone();
    on(&doc, dom::FORM, "change", move |_| {
        let s = st.borrow();
        storage::save_form(&s.window, &s.document);
    })?;

    let st = state.clone();
    on(&doc, dom::FIND_ADDRESS, "click", move |_| {
        wasm_bindgen_futures::spawn_local(lookup(st.clone(), dom::ADDRESS_INPUT, HistoryKind::Address));
    })?;

    let st = state.clone();
    on(&doc, dom::FIND_ZIP, "click", move |_| {
        wasm_bindgen_futures::spawn_local(lookup(st.clone(), dom::ZIP_INPUT, HistoryKind::Zip));
    })?;

    Ok(())
}

fn attach_map(state: &Rc<RefCell<State>>) {
    let st = state.clone();
    let cb = Closure::<dyn FnMut(JsValue)>::wrap(Box::new(move |ev: JsValue| {
        let Some(p) = maps::event_position(&ev) else {
            return;
        };
        let loc = ObserverLocation::from_decimal(p.lat, p.lng);
        if !loc.is_valid() {
            return;
        }
        set_location(&st, &loc);
        if let Some(m) = st.borrow_mut().map.as_mut() {
            m.place_marker(p);
            m.show_boundary(None);
        }
    }));
    if let Some(m) = state.borrow().map.as_ref() {
        m.on_click(cb.as_ref().unchecked_ref());
    }
    cb.forget();
}

/// Prefill from `?lat=…&lon=…&date=…`. Returns true when a location was given.
fn apply_query_params(doc: &Document, search: &str) -> bool {
    let mut have_location = true;
    for (key, id, axis) in [
        ("lat", dom::LATITUDE, Axis::Lat),
        ("lon", dom::LONGITUDE, Axis::Lon),
    ] {
        match get_query_param(search, key) {
            Some(v) if parse_coordinate(&v, axis).is_ok() => dom::set_value(doc, id, v.trim()),
            Some(v) => {
                log(&format!("ignoring invalid {axis} parameter: {v}"));
                have_location = false;
            }
            None => have_location = false,
        }
    }
    if let Some(d) = get_query_param(search, "date")
        && parse_iso_date(&d).is_some()
    {
        dom::set_value(doc, dom::DATE, d.trim());
    }
    have_location
}

fn current_state() -> Option<Rc<RefCell<State>>> {
    STATE.with(|st| st.borrow().clone())
}

/// Start a preview render from the host page.
#[wasm_bindgen(js_name = generatePreview)]
pub fn generate_preview_js() {
    if let Some(st) = current_state() {
        wasm_bindgen_futures::spawn_local(generate_preview(st));
    }
}

/// Start a download from the host page.
#[wasm_bindgen(js_name = downloadStarMap)]
pub fn download_star_map_js() {
    if let Some(st) = current_state() {
        wasm_bindgen_futures::spawn_local(download::download_star_map(st));
    }
}

#[wasm_bindgen(start)]
pub fn start() -> std::result::Result<(), JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    let search = window.location().search().unwrap_or_default();
    let level = if get_query_param(&search, "debug").is_some() {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    utils::init_logging(level);
    let (canvas, ctx) = init_canvas(&document)?;

    storage::restore_form(&window, &document);
    storage::show_histories(&window, &document);
    let from_query = apply_query_params(&document, &search);
    if dom::value(&document, dom::DATE).is_some_and(|d| d.trim().is_empty()) {
        dom::set_value(&document, dom::DATE, &utils::today_iso());
    }

    let form = dom::read_form(&document);
    let dimensions = init_dimensions(&document, &form);
    let center = ObserverLocation::from_input(&form.location)
        .map(|l| LatLng {
            lat: l.latitude,
            lng: l.longitude,
        })
        .unwrap_or(DEFAULT_MAP_CENTER);
    let map = MapLocationPicker::init(&document, center);
    let (pw, ph) = form.preview_size();
    canvas::resize(&canvas, pw, ph);

    let state = Rc::new(RefCell::new(State {
        window,
        document,
        canvas,
        ctx,
        store: Default::default(),
        dimensions,
        map,
        proxy_url: utils::proxy_url(),
        preview_ok: false,
        generating: false,
        downloading: false,
    }));
    STATE.with(|st| st.replace(Some(state.clone())));

    bind_displays(&state);
    sync_displays(&state, &form);
    attach_ui(state.clone())?;
    attach_map(&state);
    info!("star map generator ready, proxy {}", state.borrow().proxy_url);

    if from_query {
        wasm_bindgen_futures::spawn_local(generate_preview(state));
    }
    Ok(())
}
