use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use starmap_core::fallback::synthetic_sky_svg;
use starmap_core::{ImageFormat, Result, StarMapError, StarMapImage, StarMapRequest};
use tracing::{debug, warn};

pub const TIMEOUT_SECS: u32 = 30;

fn transport_error(e: reqwest::Error) -> StarMapError {
    if e.is_timeout() {
        StarMapError::Timeout(TIMEOUT_SECS)
    } else {
        StarMapError::Network(e.to_string())
    }
}

/// POST the request body to the proxy and validate the response.
pub fn fetch_chart(proxy_url: &str, request: &StarMapRequest) -> Result<StarMapImage> {
    let client = Client::builder()
        .timeout(Duration::from_secs(TIMEOUT_SECS.into()))
        .build()
        .map_err(transport_error)?;
    debug!("POST {proxy_url}");
    let resp = client
        .post(proxy_url)
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .body(request.to_json()?)
        .send()
        .map_err(transport_error)?;

    let status = resp.status();
    if !status.is_success() {
        let message = resp.text().unwrap_or_default();
        return Err(StarMapError::Server {
            status: status.as_u16(),
            message: message.trim().to_string(),
        });
    }
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let bytes = resp.bytes().map_err(transport_error)?.to_vec();
    StarMapImage::from_response(request.format(), content_type.as_deref(), bytes)
}

/// Deterministic stand-in used when no proxy can be reached.
pub fn offline_chart(request: &StarMapRequest) -> StarMapImage {
    StarMapImage {
        format: ImageFormat::Svg,
        bytes: synthetic_sky_svg(request).into_bytes(),
    }
}

/// Fetch from the proxy, falling back to the synthetic sky when it is
/// unreachable. Returns whether the fallback was used.
pub fn fetch_or_fallback(
    proxy_url: Option<&str>,
    request: &StarMapRequest,
) -> Result<(StarMapImage, bool)> {
    let Some(url) = proxy_url else {
        warn!("no proxy configured, using an offline approximation of the sky");
        return Ok((offline_chart(request), true));
    };
    match fetch_chart(url, request) {
        Ok(img) => Ok((img, false)),
        Err(StarMapError::Network(e)) => {
            warn!("proxy unreachable ({e}), using an offline approximation of the sky");
            Ok((offline_chart(request), true))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starmap_core::{
        AdvancedToggles, ChartStyle, LocationInput, ObservationMoment, OutputOptions,
        build_request,
    };

    fn request() -> StarMapRequest {
        build_request(
            &LocationInput::new("51.5", "-0.12"),
            &ObservationMoment {
                date: "2024-03-01".into(),
                ..Default::default()
            },
            ChartStyle::Inverted,
            &OutputOptions {
                width: 320,
                height: 240,
                ..Default::default()
            },
            &AdvancedToggles::default(),
        )
        .unwrap()
    }

    #[test]
    fn without_proxy_uses_fallback() {
        let (img, offline) = fetch_or_fallback(None, &request()).unwrap();
        assert!(offline);
        assert_eq!(img.format, ImageFormat::Svg);
        assert!(img.svg_text().unwrap().contains("width=\"320\" height=\"240\""));
    }

    #[test]
    fn unreachable_proxy_falls_back() {
        // port 9 on loopback refuses connections
        let (img, offline) = fetch_or_fallback(Some("http://127.0.0.1:9/proxy"), &request()).unwrap();
        assert!(offline);
        assert_eq!(img, offline_chart(&request()));
    }
}
