//! Everything the user configures, collected in one value.
//!
//! The browser reads this fresh from the DOM before every render; the native
//! renderer deserializes it from a job file.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::{PREVIEW_WIDTH_PX, RenderConfig, preview_size};
use crate::model::{
    ChartStyle, ImageFormat, LocationInput, ObservationMoment, ObserverLocation, RenderTarget,
    StyledTextLayer, TextPosition,
};
use crate::request::{AdvancedToggles, OutputOptions, StarMapRequest, build_request};

pub const MAX_TEXT_ENTRIES: usize = 4;
pub const DATE_LAYER_ID: &str = "date";
pub const COORDINATES_LAYER_ID: &str = "coordinates";
const DEFAULT_SLUG: &str = "star_map";
const MAX_SLUG_LEN: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CircleStyle {
    pub radius_percent: u32,
    pub border_width_px: u32,
    pub border_color: String,
}

impl Default for CircleStyle {
    fn default() -> Self {
        Self {
            radius_percent: 70,
            border_width_px: 0,
            border_color: "#ffffff".to_string(),
        }
    }
}

/// A generated layer (date or coordinates) that can be switched off.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DerivedLayer {
    pub enabled: bool,
    pub style: StyledTextLayer,
}

impl Default for DerivedLayer {
    fn default() -> Self {
        Self {
            enabled: true,
            style: StyledTextLayer::default(),
        }
    }
}

impl DerivedLayer {
    fn new(id: &str, order: i32) -> Self {
        Self {
            enabled: true,
            style: StyledTextLayer {
                id: id.to_string(),
                order,
                ..Default::default()
            },
        }
    }

    fn with_text(&self, text: Option<String>) -> Option<StyledTextLayer> {
        if !self.enabled {
            return None;
        }
        Some(StyledTextLayer {
            text: text?,
            ..self.style.clone()
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StarMapForm {
    pub location: LocationInput,
    pub moment: ObservationMoment,
    pub style: ChartStyle,
    /// Download size, format and colours.
    pub output: OutputOptions,
    pub toggles: AdvancedToggles,
    pub circle: CircleStyle,
    pub texts: Vec<StyledTextLayer>,
    pub date_layer: DerivedLayer,
    pub coordinates_layer: DerivedLayer,
}

impl Default for StarMapForm {
    fn default() -> Self {
        Self {
            location: LocationInput::default(),
            moment: ObservationMoment::default(),
            style: ChartStyle::Default,
            output: OutputOptions {
                width: 3000,
                height: 3000,
                ..Default::default()
            },
            toggles: AdvancedToggles::default(),
            circle: CircleStyle::default(),
            texts: Vec::new(),
            date_layer: DerivedLayer::new(DATE_LAYER_ID, 100),
            coordinates_layer: DerivedLayer::new(COORDINATES_LAYER_ID, 101),
        }
    }
}

impl StarMapForm {
    pub fn preview_size(&self) -> (u32, u32) {
        preview_size(self.output.width, self.output.height)
    }

    /// The preview is always raster; SVG downloads preview as PNG.
    pub fn preview_format(&self) -> ImageFormat {
        match self.output.format {
            f if f.is_raster() => f,
            _ => ImageFormat::Png,
        }
    }

    pub fn request_at(&self, width: u32, height: u32, format: ImageFormat) -> Result<StarMapRequest> {
        build_request(
            &self.location,
            &self.moment,
            self.style,
            &self.output.at(width, height, format),
            &self.toggles,
        )
    }

    pub fn preview_request(&self) -> Result<StarMapRequest> {
        let (w, h) = self.preview_size();
        self.request_at(w, h, self.preview_format())
    }

    pub fn download_request(&self) -> Result<StarMapRequest> {
        self.request_at(self.output.width, self.output.height, self.output.format)
    }

    pub fn render_target(&self, width: u32, height: u32) -> RenderTarget {
        RenderTarget {
            width,
            height,
            circle_radius_percent: self.circle.radius_percent.min(100),
            border_width_px: self.circle.border_width_px,
            border_color: self.circle.border_color.clone(),
            background_color: self.output.background_color.clone(),
            transparent: self.output.transparent,
        }
    }

    /// Free-text entries plus the date and coordinate layers, in source order.
    pub fn text_layers(&self, location: &ObserverLocation) -> Vec<StyledTextLayer> {
        let mut layers: Vec<StyledTextLayer> = self
            .texts
            .iter()
            .take(MAX_TEXT_ENTRIES)
            .cloned()
            .collect();
        layers.extend(self.date_layer.with_text(self.moment.display_text()));
        layers.extend(
            self.coordinates_layer
                .with_text(Some(location.display_text())),
        );
        layers
    }

    pub fn render_config(
        &self,
        width: u32,
        height: u32,
        format: ImageFormat,
        location: &ObserverLocation,
    ) -> RenderConfig {
        RenderConfig {
            target: self.render_target(width, height),
            format,
            layers: self.text_layers(location),
            authoring_width: PREVIEW_WIDTH_PX,
        }
    }

    /// `<slug>_<yyyy-mm-dd>.<ext>`, slug taken from the first text entry.
    pub fn download_filename(&self) -> String {
        let title = self
            .texts
            .first()
            .map(|t| t.text.as_str())
            .unwrap_or_default();
        let mut name = slugify(title);
        if let Ok(date) = self.moment.parsed_date() {
            name.push('_');
            name.push_str(&date.format("%Y-%m-%d").to_string());
        }
        format!("{name}.{}", self.output.format.ext())
    }

    /// Add a free-text entry unless the form already holds the maximum.
    pub fn push_text(&mut self, text: impl Into<String>, position: TextPosition) -> bool {
        if self.texts.len() >= MAX_TEXT_ENTRIES {
            return false;
        }
        let n = self.texts.len();
        self.texts.push(StyledTextLayer {
            id: format!("text{}", n + 1),
            text: text.into(),
            order: n as i32,
            position,
            ..Default::default()
        });
        true
    }
}

/// Lowercase ASCII words joined by `_`. Falls back to `star_map`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut pending_sep = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    if slug.is_empty() {
        DEFAULT_SLUG.to_string()
    } else {
        slug
    }
}
