pub mod coords;
pub mod dimensions;
pub mod error;
pub mod fallback;
pub mod form;
pub mod geo;
pub mod layout;
pub mod model;
pub mod request;
pub mod settings;
pub mod sidereal;
pub mod store;
pub mod svg;

pub use coords::{Axis, CoordinateError, format_coordinate, parse_coordinate};
pub use error::{InputIssue, Result, StarMapError};
pub use form::StarMapForm;
pub use layout::{CompositePlan, RenderConfig, plan_composite};
pub use model::{
    ChartStyle, ImageFormat, LocationInput, ObservationMoment, ObserverLocation, RenderTarget,
    StarMapImage, StyledTextLayer, TextPosition,
};
pub use request::{AdvancedToggles, OutputOptions, StarMapRequest, build_request};
pub use sidereal::local_sidereal_time_hours;
