//! Form element ids and the DOM reads/writes around them.

use starmap_core::form::{CircleStyle, DerivedLayer, MAX_TEXT_ENTRIES, StarMapForm};
use starmap_core::request::{AdvancedToggles, OutputOptions};
use starmap_core::settings::FormSnapshot;
use starmap_core::{ImageFormat, LocationInput, ObservationMoment, StyledTextLayer, TextPosition};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement};

pub const FORM: &str = "starMapForm";
pub const PREVIEW_CANVAS: &str = "previewCanvas";
pub const GENERATE_BTN: &str = "generateBtn";
pub const DOWNLOAD_BTN: &str = "downloadBtn";
pub const STATUS: &str = "status";
pub const LOADER: &str = "loader";

pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const DATE: &str = "date";
pub const TIME: &str = "time";
pub const SHOW_TIME: &str = "showTime";
pub const STYLE: &str = "chartStyle";
pub const WIDTH: &str = "outputWidth";
pub const HEIGHT: &str = "outputHeight";
pub const FORMAT: &str = "outputFormat";
pub const TRANSPARENT: &str = "transparentBg";
pub const BACKGROUND: &str = "backgroundColor";
pub const ZOOM: &str = "zoom";
pub const PAPER_SIZE: &str = "paperSize";
pub const LOCK_ASPECT: &str = "lockAspect";
pub const RADIUS: &str = "circleRadius";
pub const BORDER_WIDTH: &str = "borderWidth";
pub const BORDER_COLOR: &str = "borderColor";

pub const ADDRESS_INPUT: &str = "addressInput";
pub const ZIP_INPUT: &str = "zipInput";
pub const FIND_ADDRESS: &str = "findAddress";
pub const FIND_ZIP: &str = "findZip";
pub const MAP: &str = "map";

pub const DATE_DISPLAY: &str = "dateDisplay";
pub const COORDS_DISPLAY: &str = "coordsDisplay";
pub const ZOOM_DISPLAY: &str = "zoomDisplay";
pub const PLACE_DISPLAY: &str = "placeLabel";

pub const TEXT_HISTORY_LIST: &str = "textHistory";
pub const ZIP_HISTORY_LIST: &str = "zipHistory";
pub const ADDRESS_HISTORY_LIST: &str = "addressHistory";

pub fn element<T: JsCast>(doc: &Document, id: &str) -> Option<T> {
    doc.get_element_by_id(id)?.dyn_into::<T>().ok()
}

/// Current value of an input, select or textarea.
pub fn value(doc: &Document, id: &str) -> Option<String> {
    let el = doc.get_element_by_id(id)?;
    element_value(&el)
}

fn element_value(el: &Element) -> Option<String> {
    if let Some(i) = el.dyn_ref::<HtmlInputElement>() {
        return Some(i.value());
    }
    if let Some(s) = el.dyn_ref::<HtmlSelectElement>() {
        return Some(s.value());
    }
    el.dyn_ref::<HtmlTextAreaElement>().map(|t| t.value())
}

pub fn set_value(doc: &Document, id: &str, v: &str) {
    let Some(el) = doc.get_element_by_id(id) else {
        return;
    };
    set_element_value(&el, v);
}

fn set_element_value(el: &Element, v: &str) {
    if let Some(i) = el.dyn_ref::<HtmlInputElement>() {
        i.set_value(v);
    } else if let Some(s) = el.dyn_ref::<HtmlSelectElement>() {
        s.set_value(v);
    } else if let Some(t) = el.dyn_ref::<HtmlTextAreaElement>() {
        t.set_value(v);
    }
}

fn is_checkbox(i: &HtmlInputElement) -> bool {
    matches!(i.type_().as_str(), "checkbox" | "radio")
}

pub fn checked(doc: &Document, id: &str) -> Option<bool> {
    element::<HtmlInputElement>(doc, id).map(|i| i.checked())
}

pub fn set_checked(doc: &Document, id: &str, on: bool) {
    if let Some(i) = element::<HtmlInputElement>(doc, id) {
        i.set_checked(on);
    }
}

pub fn set_text(doc: &Document, id: &str, text: &str) {
    if let Some(el) = doc.get_element_by_id(id) {
        el.set_text_content(Some(text));
    }
}

pub fn set_disabled(doc: &Document, id: &str, disabled: bool) {
    if let Some(el) = doc.get_element_by_id(id) {
        let _ = if disabled {
            el.set_attribute("disabled", "")
        } else {
            el.remove_attribute("disabled")
        };
    }
}

pub fn set_visible(doc: &Document, id: &str, visible: bool) {
    if let Some(el) = element::<HtmlElement>(doc, id) {
        let _ = el
            .style()
            .set_property("display", if visible { "" } else { "none" });
    }
}

fn parsed<T: std::str::FromStr>(doc: &Document, id: &str) -> Option<T> {
    value(doc, id)?.trim().parse().ok()
}

fn read_layer(doc: &Document, prefix: &str, base: StyledTextLayer) -> StyledTextLayer {
    let field = |suffix: &str| value(doc, &format!("{prefix}{suffix}"));
    StyledTextLayer {
        text: field("Text").unwrap_or(base.text),
        font_family: field("Font")
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(base.font_family),
        font_size_px: field("Size")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(base.font_size_px),
        color: field("Color").unwrap_or(base.color),
        bold: checked(doc, &format!("{prefix}Bold")).unwrap_or(base.bold),
        italic: checked(doc, &format!("{prefix}Italic")).unwrap_or(base.italic),
        order: field("Order")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(base.order),
        position: match field("Position").as_deref() {
            Some("above") => TextPosition::Above,
            Some("below") => TextPosition::Below,
            _ => base.position,
        },
        ..base
    }
}

fn read_derived(doc: &Document, prefix: &str, show_id: &str, base: DerivedLayer) -> DerivedLayer {
    DerivedLayer {
        enabled: checked(doc, show_id).unwrap_or(base.enabled),
        style: read_layer(doc, prefix, base.style),
    }
}

/// Collect the whole form. Missing controls keep their defaults.
pub fn read_form(doc: &Document) -> StarMapForm {
    let d = StarMapForm::default();
    let output = OutputOptions {
        width: parsed(doc, WIDTH).unwrap_or(d.output.width),
        height: parsed(doc, HEIGHT).unwrap_or(d.output.height),
        format: parsed::<ImageFormat>(doc, FORMAT).unwrap_or(d.output.format),
        transparent: checked(doc, TRANSPARENT).unwrap_or(d.output.transparent),
        background_color: value(doc, BACKGROUND).unwrap_or(d.output.background_color),
        zoom: parsed(doc, ZOOM),
    };
    let toggles = AdvancedToggles::from_flags(
        AdvancedToggles::KEYS
            .iter()
            .filter_map(|k| checked(doc, k).map(|v| (*k, v))),
    );
    let texts = (1..=MAX_TEXT_ENTRIES)
        .map(|n| {
            read_layer(
                doc,
                &format!("text{n}"),
                StyledTextLayer {
                    id: format!("text{n}"),
                    order: n as i32 - 1,
                    ..Default::default()
                },
            )
        })
        .collect();

    StarMapForm {
        location: LocationInput::new(
            value(doc, LATITUDE).unwrap_or_default(),
            value(doc, LONGITUDE).unwrap_or_default(),
        ),
        moment: ObservationMoment {
            date: value(doc, DATE).unwrap_or_default(),
            time: value(doc, TIME).filter(|t| !t.trim().is_empty()),
            show_time: checked(doc, SHOW_TIME).unwrap_or(false),
        },
        style: parsed(doc, STYLE).unwrap_or_default(),
        output,
        toggles,
        circle: CircleStyle {
            radius_percent: parsed(doc, RADIUS).unwrap_or(d.circle.radius_percent),
            border_width_px: parsed(doc, BORDER_WIDTH).unwrap_or(d.circle.border_width_px),
            border_color: value(doc, BORDER_COLOR).unwrap_or(d.circle.border_color),
        },
        texts,
        date_layer: read_derived(doc, "dateLayer", "showDate", d.date_layer),
        coordinates_layer: read_derived(doc, "coordsLayer", "showCoordinates", d.coordinates_layer),
    }
}

fn form_controls(doc: &Document) -> Vec<Element> {
    let Ok(nodes) = doc.query_selector_all(&format!("#{FORM} [id]")) else {
        return Vec::new();
    };
    (0..nodes.length())
        .filter_map(|i| nodes.item(i))
        .filter_map(|n| n.dyn_into::<Element>().ok())
        .collect()
}

/// Every identified control inside the form.
pub fn snapshot(doc: &Document) -> FormSnapshot {
    let mut snap = FormSnapshot::default();
    for el in form_controls(doc) {
        let id = el.id();
        match el.dyn_ref::<HtmlInputElement>() {
            Some(i) if is_checkbox(i) => snap.set_check(id, i.checked()),
            Some(i) if i.type_() == "file" => {}
            _ => {
                if let Some(v) = element_value(&el) {
                    snap.set_field(id, v);
                }
            }
        }
    }
    snap
}

pub fn restore(doc: &Document, snap: &FormSnapshot) {
    for el in form_controls(doc) {
        let id = el.id();
        match el.dyn_ref::<HtmlInputElement>() {
            Some(i) if is_checkbox(i) => {
                if let Some(on) = snap.check(&id) {
                    i.set_checked(on);
                }
            }
            _ => {
                if let Some(v) = snap.field(&id) {
                    set_element_value(&el, v);
                }
            }
        }
    }
}

/// Replace a `<datalist>`'s options.
pub fn fill_datalist(doc: &Document, id: &str, entries: &[String]) {
    let Some(list) = doc.get_element_by_id(id) else {
        return;
    };
    list.set_inner_html("");
    for e in entries {
        if let Ok(opt) = doc.create_element("option") {
            let _ = opt.set_attribute("value", e);
            let _ = list.append_child(&opt);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Warn,
    Error,
}

impl StatusKind {
    fn class(self) -> &'static str {
        match self {
            StatusKind::Info => "status-info",
            StatusKind::Warn => "status-warn",
            StatusKind::Error => "status-error",
        }
    }
}

/// Show a message in the status line, or as an alert when the page has none.
pub fn set_status(doc: &Document, msg: &str, kind: StatusKind) {
    match doc.get_element_by_id(STATUS) {
        Some(el) => {
            el.set_text_content(Some(msg));
            el.set_class_name(kind.class());
        }
        None if kind == StatusKind::Error => {
            if let Some(w) = web_sys::window() {
                let _ = w.alert_with_message(msg);
            }
        }
        None => {}
    }
}
