//! Map location picker on top of the Google Maps JavaScript API.
//!
//! The API script is loaded by the host page. Geocoder results are passed
//! back through `JSON.stringify` and handled by `starmap_core::geo`.

use js_sys::{Function, Promise};
use log::{debug, warn};
use serde_json::json;
use starmap_core::geo::{Bounds, GeocodeResult, LatLng, PlaceLabel, is_postal_code, parse_geocode_results};
use starmap_core::{Result, StarMapError};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, HtmlElement};

use crate::dom;
use crate::utils::js_error_text;

#[wasm_bindgen(js_namespace = ["google", "maps"])]
extern "C" {
    #[wasm_bindgen(js_name = Map)]
    #[derive(Clone, Debug)]
    pub type GoogleMap;

    #[wasm_bindgen(constructor, js_class = "Map")]
    fn new(el: &HtmlElement, opts: &JsValue) -> GoogleMap;

    #[wasm_bindgen(method, js_class = "Map", js_name = setCenter)]
    fn set_center(this: &GoogleMap, latlng: &JsValue);

    #[wasm_bindgen(method, js_class = "Map", js_name = setZoom)]
    fn set_zoom(this: &GoogleMap, zoom: f64);

    #[wasm_bindgen(method, js_class = "Map", js_name = fitBounds)]
    fn fit_bounds(this: &GoogleMap, bounds: &JsValue);

    #[wasm_bindgen(method, js_class = "Map", js_name = addListener)]
    fn add_listener(this: &GoogleMap, event: &str, handler: &Function) -> JsValue;

    #[derive(Clone, Debug)]
    pub type Marker;

    #[wasm_bindgen(constructor)]
    fn new(opts: &JsValue) -> Marker;

    #[wasm_bindgen(method, js_name = setPosition)]
    fn set_position(this: &Marker, latlng: &JsValue);

    #[wasm_bindgen(method, js_name = setMap)]
    fn set_map(this: &Marker, map: &JsValue);

    #[derive(Clone, Debug)]
    pub type Geocoder;

    #[wasm_bindgen(constructor)]
    fn new() -> Geocoder;

    #[wasm_bindgen(method)]
    fn geocode(this: &Geocoder, request: &JsValue) -> Promise;

    #[derive(Clone, Debug)]
    pub type Rectangle;

    #[wasm_bindgen(constructor)]
    fn new(opts: &JsValue) -> Rectangle;

    #[wasm_bindgen(method, js_name = setBounds)]
    fn set_bounds(this: &Rectangle, bounds: &JsValue);

    #[wasm_bindgen(method, js_name = setMap)]
    fn set_map(this: &Rectangle, map: &JsValue);
}

fn js_object(v: serde_json::Value) -> JsValue {
    js_sys::JSON::parse(&v.to_string()).unwrap_or(JsValue::NULL)
}

fn latlng_js(p: LatLng) -> JsValue {
    js_object(json!({ "lat": p.lat, "lng": p.lng }))
}

fn bounds_js(b: &Bounds) -> JsValue {
    js_object(json!({ "south": b.south, "west": b.west, "north": b.north, "east": b.east }))
}

/// Whether the host page loaded the Maps API.
pub fn maps_available() -> bool {
    let Some(w) = web_sys::window() else {
        return false;
    };
    js_sys::Reflect::get(&w, &JsValue::from_str("google"))
        .ok()
        .and_then(|g| js_sys::Reflect::get(&g, &JsValue::from_str("maps")).ok())
        .is_some_and(|m| !m.is_undefined())
}

/// `{lat, lng}` of a map mouse event.
pub fn event_position(ev: &JsValue) -> Option<LatLng> {
    let ll = js_sys::Reflect::get(ev, &JsValue::from_str("latLng")).ok()?;
    let text = js_sys::JSON::stringify(&ll).ok()?.as_string()?;
    serde_json::from_str(&text).ok()
}

pub struct MapLocationPicker {
    map: GoogleMap,
    marker: Marker,
    geocoder: Geocoder,
    boundary: Option<Rectangle>,
    last_place: Option<PlaceLabel>,
}

impl MapLocationPicker {
    /// Create the map inside `#map`, centred on `center`.
    pub fn init(document: &Document, center: LatLng) -> Option<Self> {
        if !maps_available() {
            warn!("Google Maps API not loaded; map picker disabled");
            return None;
        }
        let el: HtmlElement = dom::element(document, dom::MAP)?;
        let map = GoogleMap::new(
            &el,
            &js_object(json!({
                "center": { "lat": center.lat, "lng": center.lng },
                "zoom": 4,
                "streetViewControl": false,
                "mapTypeControl": false,
            })),
        );
        let marker = Marker::new(&js_object(json!({
            "position": { "lat": center.lat, "lng": center.lng },
        })));
        marker.set_map(map.as_ref());
        Some(Self {
            map,
            marker,
            geocoder: Geocoder::new(),
            boundary: None,
            last_place: None,
        })
    }

    pub fn on_click(&self, handler: &Function) {
        self.map.add_listener("click", handler);
    }

    pub fn place_marker(&self, p: LatLng) {
        let pos = latlng_js(p);
        self.marker.set_position(&pos);
        self.map.set_center(&pos);
    }

    /// Show or remove the postal-boundary rectangle.
    pub fn show_boundary(&mut self, bounds: Option<Bounds>) {
        match (bounds, &self.boundary) {
            (Some(b), Some(rect)) => rect.set_bounds(&bounds_js(&b)),
            (Some(b), None) => {
                let rect = Rectangle::new(&js_object(json!({
                    "bounds": { "south": b.south, "west": b.west, "north": b.north, "east": b.east },
                    "strokeColor": "#4a7dff",
                    "strokeOpacity": 0.9,
                    "strokeWeight": 2,
                    "fillColor": "#4a7dff",
                    "fillOpacity": 0.12,
                    "clickable": false,
                })));
                rect.set_map(self.map.as_ref());
                self.boundary = Some(rect);
            }
            (None, Some(rect)) => {
                rect.set_map(&JsValue::NULL);
                self.boundary = None;
            }
            (None, None) => {}
        }
    }

    /// Move the view to a geocoder result.
    pub fn show_result(&mut self, result: &GeocodeResult, with_boundary: bool) {
        self.place_marker(result.geometry.location);
        match result.geometry.viewport {
            Some(vp) if vp.is_valid() => self.map.fit_bounds(&bounds_js(&vp)),
            _ => self.map.set_zoom(12.0),
        }
        self.show_boundary(if with_boundary { result.boundary() } else { None });
        self.last_place = Some(result.place_label()).filter(|p| !p.is_empty());
    }

    pub fn last_place(&self) -> Option<&PlaceLabel> {
        self.last_place.as_ref()
    }

    pub fn geocoder(&self) -> Geocoder {
        self.geocoder.clone()
    }
}

/// Geocode an address or a US ZIP code.
pub async fn geocode(geocoder: &Geocoder, query: &str) -> Result<Vec<GeocodeResult>> {
    let q = query.trim();
    let request = if is_postal_code(q) {
        json!({ "componentRestrictions": { "postalCode": q, "country": "US" } })
    } else {
        json!({ "address": q })
    };
    debug!("geocoding {q}");
    let resp = JsFuture::from(geocoder.geocode(&js_object(request)))
        .await
        .map_err(|e| StarMapError::Network(format!("geocoding failed: {}", js_error_text(&e))))?;
    let results = js_sys::Reflect::get(&resp, &JsValue::from_str("results"))
        .map_err(|e| StarMapError::Decode(js_error_text(&e)))?;
    let text = js_sys::JSON::stringify(&results)
        .ok()
        .and_then(|s| s.as_string())
        .unwrap_or_else(|| "[]".to_string());
    parse_geocode_results(&text).map_err(|e| StarMapError::Decode(e.to_string()))
}
