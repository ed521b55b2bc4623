//! Geocoder results as seen by the location picker.
//!
//! The browser serializes Google `GeocoderResult` objects with
//! `JSON.stringify`; `LatLng` and `LatLngBounds` turn into the plain shapes
//! below.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ObserverLocation;

/// US ZIP (`29401`) or ZIP+4 (`29401-1234`).
pub fn is_postal_code(query: &str) -> bool {
    let q = query.trim();
    let (head, tail) = match q.split_once('-') {
        Some((h, t)) => (h, Some(t)),
        None => (q, None),
    };
    let digits = |s: &str, n: usize| s.len() == n && s.chars().all(|c| c.is_ascii_digit());
    digits(head, 5) && tail.is_none_or(|t| digits(t, 4))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn is_valid(&self) -> bool {
        [self.south, self.west, self.north, self.east]
            .iter()
            .all(|v| v.is_finite())
            && self.south <= self.north
    }

    /// Whether the box wraps across the antimeridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    pub fn contains(&self, p: LatLng) -> bool {
        let in_lat = p.lat >= self.south && p.lat <= self.north;
        let in_lng = if self.crosses_antimeridian() {
            p.lng >= self.west || p.lng <= self.east
        } else {
            p.lng >= self.west && p.lng <= self.east
        };
        in_lat && in_lng
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

impl AddressComponent {
    fn has_type(&self, t: &str) -> bool {
        self.types.iter().any(|x| x == t)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
    #[serde(default)]
    pub viewport: Option<Bounds>,
    #[serde(default)]
    pub bounds: Option<Bounds>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    pub geometry: Geometry,
}

/// City / state / country shown in the status line after a lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceLabel {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

impl PlaceLabel {
    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.state.is_none() && self.country.is_none()
    }
}

impl fmt::Display for PlaceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [&self.city, &self.state, &self.country]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        f.write_str(&parts.join(", "))
    }
}

impl GeocodeResult {
    fn component(&self, t: &str) -> Option<&AddressComponent> {
        self.address_components.iter().find(|c| c.has_type(t))
    }

    pub fn place_label(&self) -> PlaceLabel {
        let city = self
            .component("locality")
            .or_else(|| self.component("postal_town"))
            .or_else(|| self.component("sublocality"))
            .map(|c| c.long_name.clone());
        PlaceLabel {
            city,
            state: self
                .component("administrative_area_level_1")
                .map(|c| c.short_name.clone())
                .filter(|s| !s.is_empty()),
            country: self.component("country").map(|c| c.long_name.clone()),
            postal_code: self.component("postal_code").map(|c| c.long_name.clone()),
        }
    }

    pub fn location(&self) -> ObserverLocation {
        ObserverLocation::from_decimal(self.geometry.location.lat, self.geometry.location.lng)
    }

    /// Box for the postal-boundary overlay: exact bounds if given, else viewport.
    /// A box that does not hold the result's own location is dropped.
    pub fn boundary(&self) -> Option<Bounds> {
        let at = self.geometry.location;
        self.geometry
            .bounds
            .or(self.geometry.viewport)
            .filter(|b| b.is_valid() && b.contains(at))
    }
}

/// Parse the JSON text of a `GeocoderResult[]`.
pub fn parse_geocode_results(json: &str) -> Result<Vec<GeocodeResult>, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHARLESTON: &str = r#"[{
        "address_components": [
            {"long_name": "29401", "short_name": "29401", "types": ["postal_code"]},
            {"long_name": "Charleston", "short_name": "Charleston", "types": ["locality", "political"]},
            {"long_name": "South Carolina", "short_name": "SC", "types": ["administrative_area_level_1", "political"]},
            {"long_name": "United States", "short_name": "US", "types": ["country", "political"]}
        ],
        "formatted_address": "Charleston, SC 29401, USA",
        "geometry": {
            "location": {"lat": 32.7795, "lng": -79.9371},
            "viewport": {"south": 32.76, "west": -79.96, "north": 32.80, "east": -79.92},
            "bounds": {"south": 32.765, "west": -79.955, "north": 32.795, "east": -79.925}
        }
    }]"#;

    #[test]
    fn postal_codes() {
        assert!(is_postal_code("29401"));
        assert!(is_postal_code(" 29401-1234 "));
        assert!(!is_postal_code("2940"));
        assert!(!is_postal_code("29401-12"));
        assert!(!is_postal_code("Charleston"));
    }

    #[test]
    fn parses_geocoder_json() {
        let results = parse_geocode_results(CHARLESTON).unwrap();
        let r = &results[0];
        let label = r.place_label();
        assert_eq!(label.to_string(), "Charleston, SC, United States");
        assert_eq!(label.postal_code.as_deref(), Some("29401"));
        let b = r.boundary().unwrap();
        assert_eq!(b.south, 32.765);
        assert!(b.contains(r.geometry.location));
        let loc = r.location();
        assert!(loc.raw_latitude.starts_with("N32°"));
        assert!(loc.raw_longitude.starts_with("W79°"));
    }

    #[test]
    fn antimeridian_box() {
        let b = Bounds {
            south: -20.0,
            west: 170.0,
            north: -10.0,
            east: -170.0,
        };
        assert!(b.crosses_antimeridian());
        assert!(b.contains(LatLng { lat: -15.0, lng: 179.0 }));
        assert!(!b.contains(LatLng { lat: -15.0, lng: 0.0 }));
    }

    #[test]
    fn boundary_must_hold_the_location() {
        let mut r = parse_geocode_results(CHARLESTON).unwrap().remove(0);
        r.geometry.location = LatLng { lat: 40.0, lng: -79.94 };
        assert_eq!(r.boundary(), None);
    }

    #[test]
    fn empty_label() {
        let r = GeocodeResult::default();
        assert!(r.place_label().is_empty());
        assert_eq!(r.place_label().to_string(), "");
    }
}
