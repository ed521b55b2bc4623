use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::coords::{Axis, CoordinateError, format_coordinate, parse_coordinate};
use crate::error::{InputIssue, Result, StarMapError};
use crate::sidereal::parse_iso_date;

/// Raw latitude/longitude text exactly as typed into the form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInput {
    pub latitude: String,
    pub longitude: String,
}

impl LocationInput {
    pub fn new(latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self {
            latitude: latitude.into(),
            longitude: longitude.into(),
        }
    }
}

/// A validated observer position. The raw text is kept for the coordinate layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserverLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub raw_latitude: String,
    pub raw_longitude: String,
}

impl ObserverLocation {
    pub fn from_input(input: &LocationInput) -> std::result::Result<Self, Vec<InputIssue>> {
        let mut issues = Vec::new();
        let lat = parse_coordinate(&input.latitude, Axis::Lat).map_err(|e| match e {
            CoordinateError::Empty => InputIssue::MissingLatitude,
            _ => InputIssue::InvalidLatitude(input.latitude.trim().to_string()),
        });
        let lon = parse_coordinate(&input.longitude, Axis::Lon).map_err(|e| match e {
            CoordinateError::Empty => InputIssue::MissingLongitude,
            _ => InputIssue::InvalidLongitude(input.longitude.trim().to_string()),
        });
        match (lat, lon) {
            (Ok(latitude), Ok(longitude)) => Ok(Self {
                latitude,
                longitude,
                raw_latitude: input.latitude.trim().to_string(),
                raw_longitude: input.longitude.trim().to_string(),
            }),
            (lat, lon) => {
                issues.extend(lat.err());
                issues.extend(lon.err());
                Err(issues)
            }
        }
    }

    /// Location picked on the map; raw text is the DMM display form.
    pub fn from_decimal(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            raw_latitude: format_coordinate(latitude, Axis::Lat),
            raw_longitude: format_coordinate(longitude, Axis::Lon),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= Axis::Lat.limit()
            && self.longitude.abs() <= Axis::Lon.limit()
    }

    /// Text drawn by the coordinate layer.
    pub fn display_text(&self) -> String {
        format!("{} {}", self.raw_latitude, self.raw_longitude)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationMoment {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`, optional
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub show_time: bool,
}

impl ObservationMoment {
    pub fn parsed_date(&self) -> std::result::Result<NaiveDate, InputIssue> {
        let d = self.date.trim();
        if d.is_empty() {
            return Err(InputIssue::MissingDate);
        }
        parse_iso_date(d).ok_or_else(|| InputIssue::InvalidDate(d.to_string()))
    }

    pub fn parsed_time(&self) -> std::result::Result<Option<NaiveTime>, InputIssue> {
        match self.time.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(t) => NaiveTime::parse_from_str(t, "%H:%M")
                .map(Some)
                .map_err(|_| InputIssue::InvalidTime(t.to_string())),
        }
    }

    /// Text for the date layer, e.g. `June 21, 2024` or `June 21, 2024 21:30`.
    pub fn display_text(&self) -> Option<String> {
        let date = self.parsed_date().ok()?;
        let mut s = date.format("%B %-d, %Y").to_string();
        if self.show_time
            && let Ok(Some(t)) = self.parsed_time()
        {
            s.push(' ');
            s.push_str(&t.format("%H:%M").to_string());
        }
        Some(s)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextPosition {
    Above,
    #[default]
    Below,
}

/// One text overlay drawn around the chart circle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyledTextLayer {
    pub id: String,
    pub text: String,
    pub font_family: String,
    pub font_size_px: u32,
    pub color: String,
    pub bold: bool,
    pub italic: bool,
    pub order: i32,
    pub position: TextPosition,
}

impl Default for StyledTextLayer {
    fn default() -> Self {
        Self {
            id: String::new(),
            text: String::new(),
            font_family: "Georgia, serif".to_string(),
            font_size_px: 16,
            color: "#ffffff".to_string(),
            bold: false,
            italic: false,
            order: 0,
            position: TextPosition::Below,
        }
    }
}

impl StyledTextLayer {
    pub fn is_visible(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// CSS font shorthand at a given pixel size.
    pub fn css_font(&self, size_px: u32) -> String {
        let mut s = String::new();
        if self.italic {
            s.push_str("italic ");
        }
        if self.bold {
            s.push_str("bold ");
        }
        s.push_str(&format!("{size_px}px {}", self.font_family));
        s
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    #[serde(alias = "jpeg")]
    Jpg,
    Svg,
}

impl ImageFormat {
    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpg => "image/jpeg",
            ImageFormat::Svg => "image/svg+xml",
        }
    }

    pub fn ext(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Svg => "svg",
        }
    }

    pub fn supports_alpha(self) -> bool {
        !matches!(self, ImageFormat::Jpg)
    }

    pub fn is_raster(self) -> bool {
        !matches!(self, ImageFormat::Svg)
    }

    /// Whether a response `Content-Type` header matches this format.
    pub fn accepts_content_type(self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match self {
            ImageFormat::Png => essence == "image/png",
            ImageFormat::Jpg => matches!(essence.as_str(), "image/jpeg" | "image/jpg" | "image/pjpeg"),
            ImageFormat::Svg => essence == "image/svg+xml",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ext())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpg),
            "svg" => Ok(ImageFormat::Svg),
            other => Err(format!("unsupported format: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartStyle {
    #[default]
    Default,
    Inverted,
    Navy,
    Red,
}

impl FromStr for ChartStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "default" => Ok(ChartStyle::Default),
            "inverted" => Ok(ChartStyle::Inverted),
            "navy" => Ok(ChartStyle::Navy),
            "red" => Ok(ChartStyle::Red),
            other => Err(format!("unknown chart style: {other}")),
        }
    }
}

/// Canvas geometry and styling for one composite (preview or download).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
    pub circle_radius_percent: u32,
    pub border_width_px: u32,
    pub border_color: String,
    pub background_color: String,
    pub transparent: bool,
}

impl Default for RenderTarget {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            circle_radius_percent: 80,
            border_width_px: 0,
            border_color: "#ffffff".to_string(),
            background_color: "#000000".to_string(),
            transparent: false,
        }
    }
}

impl RenderTarget {
    /// Same styling at another pixel size.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..self.clone()
        }
    }

    /// Transparency only survives for formats with an alpha channel.
    pub fn effective_transparent(&self, format: ImageFormat) -> bool {
        self.transparent && format.supports_alpha() && format.is_raster()
    }
}

/// Bytes returned by the star chart proxy, tagged with the requested format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StarMapImage {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl StarMapImage {
    /// Validate a proxy response against the format that was asked for.
    pub fn from_response(
        requested: ImageFormat,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self> {
        let ct = content_type.unwrap_or_default();
        if !requested.accepts_content_type(ct) {
            return Err(StarMapError::ContentType {
                expected: requested.mime().to_string(),
                actual: if ct.is_empty() {
                    "(none)".to_string()
                } else {
                    ct.to_string()
                },
            });
        }
        if bytes.is_empty() {
            return Err(StarMapError::Decode("empty response body".to_string()));
        }
        Ok(Self {
            format: requested,
            bytes,
        })
    }

    pub fn svg_text(&self) -> Result<&str> {
        std::str::from_utf8(&self.bytes).map_err(|e| StarMapError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_collects_both_issues() {
        let err = ObserverLocation::from_input(&LocationInput::new("", "W200°0.0′")).unwrap_err();
        assert_eq!(
            err,
            vec![
                InputIssue::MissingLatitude,
                InputIssue::InvalidLongitude("W200°0.0′".into())
            ]
        );
    }

    #[test]
    fn location_keeps_raw_text() {
        let loc =
            ObserverLocation::from_input(&LocationInput::new(" N32°55.93211′ ", "W80°7.22460′"))
                .unwrap();
        assert_eq!(loc.raw_latitude, "N32°55.93211′");
        assert_eq!(loc.display_text(), "N32°55.93211′ W80°7.22460′");
        assert!(loc.is_valid());
    }

    #[test]
    fn map_location_formats_dmm() {
        let loc = ObserverLocation::from_decimal(-33.8568, 151.2153);
        assert!(loc.raw_latitude.starts_with('S'));
        assert!(loc.raw_longitude.starts_with('E'));
    }

    #[test]
    fn moment_display() {
        let m = ObservationMoment {
            date: "2024-06-21".into(),
            time: Some("21:30".into()),
            show_time: false,
        };
        assert_eq!(m.display_text().as_deref(), Some("June 21, 2024"));
        let m = ObservationMoment {
            show_time: true,
            ..m
        };
        assert_eq!(m.display_text().as_deref(), Some("June 21, 2024 21:30"));
        let bad = ObservationMoment {
            time: Some("25:99".into()),
            ..m
        };
        assert_eq!(bad.parsed_time(), Err(InputIssue::InvalidTime("25:99".into())));
    }

    #[test]
    fn content_type_checks() {
        assert!(ImageFormat::Png.accepts_content_type("image/png"));
        assert!(ImageFormat::Svg.accepts_content_type("image/svg+xml; charset=utf-8"));
        assert!(ImageFormat::Jpg.accepts_content_type("IMAGE/JPEG"));
        assert!(!ImageFormat::Png.accepts_content_type("text/html"));

        let err = StarMapImage::from_response(ImageFormat::Png, Some("text/html"), vec![1])
            .unwrap_err();
        assert!(matches!(err, StarMapError::ContentType { .. }));
        let err = StarMapImage::from_response(ImageFormat::Png, None, vec![1]).unwrap_err();
        assert!(err.to_string().contains("(none)"));
        let err =
            StarMapImage::from_response(ImageFormat::Png, Some("image/png"), vec![]).unwrap_err();
        assert!(matches!(err, StarMapError::Decode(_)));
    }

    #[test]
    fn css_font_shorthand() {
        let layer = StyledTextLayer {
            bold: true,
            italic: true,
            font_family: "Georgia".into(),
            ..Default::default()
        };
        assert_eq!(layer.css_font(60), "italic bold 60px Georgia");
    }

    #[test]
    fn jpeg_drops_transparency() {
        let t = RenderTarget {
            transparent: true,
            ..Default::default()
        };
        assert!(t.effective_transparent(ImageFormat::Png));
        assert!(!t.effective_transparent(ImageFormat::Jpg));
    }
}
