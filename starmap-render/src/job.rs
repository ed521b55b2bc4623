use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use starmap_core::{ImageFormat, StarMapForm};

pub const PROXY_ENV: &str = "STARMAP_PROXY_URL";

/// A render job: the same settings the browser form holds, plus where to
/// fetch the chart from.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderJob {
    #[serde(flatten)]
    pub form: StarMapForm,
    #[serde(default)]
    pub proxy_url: Option<String>,
}

impl RenderJob {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn load(path: &str) -> Result<Self> {
        let txt = fs::read_to_string(path).with_context(|| format!("reading job {path}"))?;
        Self::from_json(&txt).with_context(|| format!("parsing job {path}"))
    }

    /// Proxy endpoint; a non-empty override wins over the job file.
    pub fn proxy_url(&self, env_override: Option<String>) -> Option<String> {
        let clean = |s: Option<String>| {
            s.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        clean(env_override).or_else(|| clean(self.proxy_url.clone()))
    }
}

/// Image format implied by a file extension.
pub fn format_from_path(path: &Path) -> Option<ImageFormat> {
    path.extension()?.to_str()?.parse().ok()
}
