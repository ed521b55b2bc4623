//! Request body for the star chart API.
//!
//! The view is always centred on the observer's zenith: right ascension is the
//! Local Sidereal Time and declination is the observer latitude.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{InputIssue, Result, StarMapError};
use crate::model::{ChartStyle, ImageFormat, LocationInput, ObservationMoment, ObserverLocation};
use crate::sidereal::lst_for_date;

/// Largest output edge the proxy is asked for.
pub const MAX_OUTPUT_PX: u32 = 10_000;
pub const ZOOM_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

/// Display switches passed straight through to the chart view parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvancedToggles {
    pub constellation_lines: bool,
    pub constellation_labels: bool,
    pub milky_way: bool,
    pub grid: bool,
    pub planets: bool,
    pub sun_moon: bool,
    pub ecliptic: bool,
}

impl Default for AdvancedToggles {
    fn default() -> Self {
        Self {
            constellation_lines: true,
            constellation_labels: true,
            milky_way: true,
            grid: false,
            planets: true,
            sun_moon: true,
            ecliptic: true,
        }
    }
}

impl AdvancedToggles {
    pub const KEYS: [&'static str; 7] = [
        "constellationLines",
        "constellationLabels",
        "milkyWay",
        "grid",
        "planets",
        "sunMoon",
        "ecliptic",
    ];

    /// Set one toggle by its wire name. Unknown keys are ignored.
    pub fn set(&mut self, key: &str, value: bool) -> bool {
        let slot = match key {
            "constellationLines" => &mut self.constellation_lines,
            "constellationLabels" => &mut self.constellation_labels,
            "milkyWay" => &mut self.milky_way,
            "grid" => &mut self.grid,
            "planets" => &mut self.planets,
            "sunMoon" => &mut self.sun_moon,
            "ecliptic" => &mut self.ecliptic,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Defaults overlaid with whatever flags the form supplied.
    pub fn from_flags<'a, I>(flags: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let mut t = Self::default();
        for (k, v) in flags {
            t.set(k, v);
        }
        t
    }
}

/// Output options chosen in the form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputOptions {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub transparent: bool,
    pub background_color: String,
    pub zoom: Option<u8>,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            format: ImageFormat::Png,
            transparent: false,
            background_color: "#000000".to_string(),
            zoom: None,
        }
    }
}

impl OutputOptions {
    pub fn effective_transparent(&self) -> bool {
        self.transparent && self.format.supports_alpha() && self.format.is_raster()
    }

    /// Same options at another size and format.
    pub fn at(&self, width: u32, height: u32, format: ImageFormat) -> Self {
        Self {
            width,
            height,
            format,
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    pub style: ChartStyle,
    pub output: OutputSpec,
    pub observer: Observer,
    pub view: View,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSpec {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transparent: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observer {
    pub latitude: f64,
    pub longitude: f64,
    pub date: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    #[serde(rename = "type")]
    pub type_: String,
    pub parameters: ViewParameters,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewParameters {
    pub position: Position,
    #[serde(flatten)]
    pub toggles: AdvancedToggles,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub equatorial: Equatorial,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equatorial {
    pub right_ascension: f64,
    pub declination: f64,
}

/// A built request plus the validated values it was derived from.
#[derive(Clone, Debug, PartialEq)]
pub struct StarMapRequest {
    pub body: RequestBody,
    pub location: ObserverLocation,
    pub lst_hours: f64,
}

impl StarMapRequest {
    pub fn format(&self) -> ImageFormat {
        self.body.output.format
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.body).map_err(|e| StarMapError::Serialization(e.to_string()))
    }
}

fn check_dimensions(output: &OutputOptions) -> Option<InputIssue> {
    let ok = |v: u32| (1..=MAX_OUTPUT_PX).contains(&v);
    if ok(output.width) && ok(output.height) {
        None
    } else {
        Some(InputIssue::InvalidDimensions {
            width: output.width,
            height: output.height,
        })
    }
}

/// Validate the form values and assemble the API payload.
///
/// Every problem found is reported together; nothing is defaulted.
pub fn build_request(
    location: &LocationInput,
    moment: &ObservationMoment,
    style: ChartStyle,
    output: &OutputOptions,
    toggles: &AdvancedToggles,
) -> Result<StarMapRequest> {
    let mut issues = Vec::new();
    let loc = ObserverLocation::from_input(location)
        .map_err(|mut v| issues.append(&mut v))
        .ok();
    let date = moment.parsed_date().map_err(|i| issues.push(i)).ok();
    if let Err(i) = moment.parsed_time() {
        issues.push(i);
    }
    issues.extend(check_dimensions(output));

    let (Some(loc), Some(date), true) = (loc, date, issues.is_empty()) else {
        return Err(StarMapError::Validation(issues));
    };

    let lst_hours = lst_for_date(date, loc.longitude);
    if !lst_hours.is_finite() {
        return Err(StarMapError::Validation(vec![InputIssue::InvalidDate(
            moment.date.trim().to_string(),
        )]));
    }

    let transparent = output.effective_transparent();
    let body = RequestBody {
        style,
        output: OutputSpec {
            width: output.width,
            height: output.height,
            format: output.format,
            transparent: transparent.then_some(true),
        },
        observer: Observer {
            latitude: loc.latitude,
            longitude: loc.longitude,
            date: date.format("%Y-%m-%d").to_string(),
        },
        view: View {
            type_: "area".to_string(),
            parameters: ViewParameters {
                position: Position {
                    equatorial: Equatorial {
                        right_ascension: lst_hours,
                        declination: loc.latitude,
                    },
                },
                toggles: *toggles,
                zoom: output
                    .zoom
                    .map(|z| z.clamp(*ZOOM_RANGE.start(), *ZOOM_RANGE.end())),
                background_color: (!transparent).then(|| output.background_color.clone()),
            },
        },
    };
    debug!(
        "star chart request {}x{} {} ra={:.4}h dec={:.4}",
        output.width, output.height, output.format, lst_hours, loc.latitude
    );
    Ok(StarMapRequest {
        body,
        location: loc,
        lst_hours,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sidereal::local_sidereal_time_hours;
    use approx::assert_abs_diff_eq;

    fn moment(date: &str) -> ObservationMoment {
        ObservationMoment {
            date: date.to_string(),
            time: None,
            show_time: false,
        }
    }

    #[test]
    fn zenith_centred_view() {
        let req = build_request(
            &LocationInput::new("N32°55.93211′", "W80°7.22460′"),
            &moment("2024-06-21"),
            ChartStyle::Default,
            &OutputOptions::default(),
            &AdvancedToggles::default(),
        )
        .unwrap();
        let eq = req.body.view.parameters.position.equatorial;
        let lon = -(80.0 + 7.2246 / 60.0);
        assert_abs_diff_eq!(
            eq.right_ascension,
            local_sidereal_time_hours("2024-06-21", lon),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(eq.declination, 32.0 + 55.93211 / 60.0, epsilon = 1e-12);
        assert_eq!(req.body.observer.date, "2024-06-21");
    }

    #[test]
    fn every_issue_is_reported() {
        let err = build_request(
            &LocationInput::default(),
            &moment(""),
            ChartStyle::Default,
            &OutputOptions {
                width: 0,
                ..Default::default()
            },
            &AdvancedToggles::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.issues(),
            &[
                InputIssue::MissingLatitude,
                InputIssue::MissingLongitude,
                InputIssue::MissingDate,
                InputIssue::InvalidDimensions {
                    width: 0,
                    height: 800
                },
            ]
        );
    }

    #[test]
    fn wire_shape() {
        let req = build_request(
            &LocationInput::new("40.7128", "-74.0060"),
            &moment("2023-12-31"),
            ChartStyle::Navy,
            &OutputOptions {
                transparent: true,
                zoom: Some(42),
                ..Default::default()
            },
            &AdvancedToggles::from_flags([("grid", true), ("bogus", false)]),
        )
        .unwrap();
        let v: serde_json::Value = serde_json::from_str(&req.to_json().unwrap()).unwrap();
        assert_eq!(v["style"], "navy");
        assert_eq!(v["output"]["format"], "png");
        assert_eq!(v["output"]["transparent"], true);
        assert_eq!(v["view"]["type"], "area");
        let params = &v["view"]["parameters"];
        assert!(params["position"]["equatorial"]["rightAscension"].is_number());
        assert_eq!(params["grid"], true);
        assert_eq!(params["milkyWay"], true);
        assert_eq!(params["zoom"], 10);
        assert!(params.get("backgroundColor").is_none());
        assert!(params.get("bogus").is_none());
    }

    #[test]
    fn jpeg_ignores_transparency() {
        let req = build_request(
            &LocationInput::new("10", "10"),
            &moment("2024-01-01"),
            ChartStyle::Default,
            &OutputOptions {
                format: ImageFormat::Jpg,
                transparent: true,
                background_color: "#101020".into(),
                ..Default::default()
            },
            &AdvancedToggles::default(),
        )
        .unwrap();
        assert_eq!(req.body.output.transparent, None);
        assert_eq!(
            req.body.view.parameters.background_color.as_deref(),
            Some("#101020")
        );
    }

    #[test]
    fn toggle_defaults() {
        let t = AdvancedToggles::default();
        assert!(t.constellation_lines && t.milky_way && t.ecliptic);
        assert!(!t.grid);
        let t = AdvancedToggles::from_flags([("milkyWay", false)]);
        assert!(!t.milky_way);
        assert!(t.planets);
    }
}
