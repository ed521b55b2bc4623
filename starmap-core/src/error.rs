//! Error types shared by the browser front end and the native renderer.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StarMapError>;

/// One problem found while validating form input before a request is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputIssue {
    MissingLatitude,
    InvalidLatitude(String),
    MissingLongitude,
    InvalidLongitude(String),
    MissingDate,
    InvalidDate(String),
    InvalidTime(String),
    InvalidDimensions { width: u32, height: u32 },
}

impl InputIssue {
    pub fn is_coordinate(&self) -> bool {
        matches!(
            self,
            InputIssue::MissingLatitude
                | InputIssue::InvalidLatitude(_)
                | InputIssue::MissingLongitude
                | InputIssue::InvalidLongitude(_)
        )
    }

    fn is_missing_coordinate(&self) -> bool {
        matches!(
            self,
            InputIssue::MissingLatitude | InputIssue::MissingLongitude
        )
    }
}

impl fmt::Display for InputIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputIssue::MissingLatitude => write!(f, "latitude is empty"),
            InputIssue::InvalidLatitude(t) => write!(f, "latitude \"{t}\" is not valid"),
            InputIssue::MissingLongitude => write!(f, "longitude is empty"),
            InputIssue::InvalidLongitude(t) => write!(f, "longitude \"{t}\" is not valid"),
            InputIssue::MissingDate => write!(f, "date is required"),
            InputIssue::InvalidDate(t) => write!(f, "date \"{t}\" is not a valid YYYY-MM-DD date"),
            InputIssue::InvalidTime(t) => write!(f, "time \"{t}\" is not a valid HH:MM time"),
            InputIssue::InvalidDimensions { width, height } => {
                write!(f, "output size {width}x{height} is not allowed")
            }
        }
    }
}

fn describe_issues(issues: &[InputIssue]) -> String {
    let details = issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    if issues.iter().any(InputIssue::is_missing_coordinate) {
        format!("coordinates required: {details}")
    } else {
        format!("invalid input: {details}")
    }
}

/// Everything that can abort a preview render or a download.
#[derive(Debug, Error)]
pub enum StarMapError {
    #[error("{}", describe_issues(.0))]
    Validation(Vec<InputIssue>),

    #[error("star chart request failed (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("star chart request timed out after {0} s")]
    Timeout(u32),

    #[error("unexpected content type: expected {expected}, got {actual}")]
    ContentType { expected: String, actual: String },

    #[error("could not decode star chart image: {0}")]
    Decode(String),

    #[error("could not serialize image: {0}")]
    Serialization(String),

    #[error("canvas error: {0}")]
    Canvas(String),

    #[error("a render is already in progress")]
    Busy,

    #[error("generate a preview before downloading")]
    NoPreview,
}

impl StarMapError {
    /// Errors the user can clear by simply triggering the action again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StarMapError::Timeout(_) | StarMapError::Network(_))
    }

    /// Status-line text: the error plus a hint on what to do next.
    pub fn user_message(&self) -> String {
        let mut msg = self.to_string();
        if self.is_retryable() {
            msg.push_str(". Please try again.");
        } else if self.issues().iter().any(InputIssue::is_coordinate) {
            msg.push_str(". Pick a place on the map or enter coordinates.");
        }
        msg
    }

    pub fn issues(&self) -> &[InputIssue] {
        match self {
            StarMapError::Validation(v) => v,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_coordinates_message() {
        let err = StarMapError::Validation(vec![
            InputIssue::MissingLatitude,
            InputIssue::MissingLongitude,
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("coordinates required"), "{msg}");
        assert!(msg.contains("latitude is empty"));
        assert!(msg.contains("longitude is empty"));
    }

    #[test]
    fn date_only_message() {
        let err = StarMapError::Validation(vec![InputIssue::MissingDate]);
        assert_eq!(err.to_string(), "invalid input: date is required");
        assert!(!err.issues()[0].is_coordinate());
    }

    #[test]
    fn user_message_hints() {
        let timeout = StarMapError::Timeout(30).user_message();
        assert!(timeout.ends_with("Please try again."), "{timeout}");
        let coords = StarMapError::Validation(vec![InputIssue::MissingLatitude]).user_message();
        assert!(coords.ends_with("enter coordinates."), "{coords}");
        let date = StarMapError::Validation(vec![InputIssue::MissingDate]);
        assert_eq!(date.user_message(), date.to_string());
    }

    #[test]
    fn retryable_kinds() {
        assert!(StarMapError::Timeout(30).is_retryable());
        assert!(
            !StarMapError::Server {
                status: 500,
                message: "boom".into()
            }
            .is_retryable()
        );
    }
}
