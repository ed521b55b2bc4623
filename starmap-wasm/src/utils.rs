use log::{Level, LevelFilter, Metadata, Record};
use wasm_bindgen::{JsCast, JsValue};

/// Log a message to the browser console.
pub fn log(s: &str) {
    web_sys::console::log_1(&JsValue::from_str(s));
}

/// `log` facade backend writing to the browser console.
pub struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            Level::Error => web_sys::console::error_1(&msg),
            Level::Warn => web_sys::console::warn_1(&msg),
            Level::Info => web_sys::console::info_1(&msg),
            Level::Debug | Level::Trace => web_sys::console::debug_1(&msg),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

pub fn init_logging(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/// Readable text for a thrown JS value.
pub fn js_error_text(e: &JsValue) -> String {
    if let Some(err) = e.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    e.as_string().unwrap_or_else(|| format!("{e:?}"))
}

fn window_string(key: &str) -> Option<String> {
    let w = web_sys::window()?;
    let v = js_sys::Reflect::get(&w, &JsValue::from_str(key)).ok()?;
    v.as_string().filter(|s| !s.trim().is_empty())
}

/// Join a relative path onto a base URL.
pub fn join_url(base: &str, path: &str) -> String {
    let p = path.trim();
    if p.starts_with("http://") || p.starts_with("https://") || p.starts_with("data:") {
        return p.to_string();
    }
    let base = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    format!("{}{}", base, p.trim_start_matches('/'))
}

/// Build an absolute URL for an asset, taking into account the optional
/// `window.__BASE_URL` which is set by the host page.
pub fn asset_url(path: &str) -> String {
    let base = window_string("__BASE_URL").unwrap_or_else(|| "/".to_string());
    join_url(&base, path)
}

/// Star chart proxy endpoint: `window.__PROXY_URL`, else `proxy.php` next to the page.
pub fn proxy_url() -> String {
    window_string("__PROXY_URL").unwrap_or_else(|| asset_url("proxy.php"))
}

/// Simple query string parser used at start-up.
pub fn get_query_param(search: &str, key: &str) -> Option<String> {
    let s = search.trim_start_matches('?');
    for pair in s.split('&') {
        let mut it = pair.splitn(2, '=');
        let k = it.next()?;
        let v = it.next().unwrap_or("");
        if k == key {
            return Some(url_decode(v));
        }
    }
    None
}

fn url_decode(s: &str) -> String {
    let s = s.replace('+', " ");
    match percent_encoding::percent_decode_str(&s).decode_utf8() {
        Ok(c) => c.into_owned(),
        Err(_) => s.clone(),
    }
}

/// Today's date in UTC as `YYYY-MM-DD`.
pub fn today_iso() -> String {
    let iso = String::from(js_sys::Date::new_0().to_iso_string());
    iso.get(..10).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params() {
        let q = "?lat=N32%C2%B055.93211%E2%80%B2&lon=-80.12&date=2024-06-21&empty";
        assert_eq!(get_query_param(q, "lat").as_deref(), Some("N32°55.93211′"));
        assert_eq!(get_query_param(q, "lon").as_deref(), Some("-80.12"));
        assert_eq!(get_query_param(q, "empty").as_deref(), Some(""));
        assert_eq!(get_query_param(q, "zoom"), None);
        assert_eq!(get_query_param("?q=a+b", "q").as_deref(), Some("a b"));
    }

    #[test]
    fn url_joining() {
        assert_eq!(join_url("/app", "proxy.php"), "/app/proxy.php");
        assert_eq!(join_url("https://x.org/", "/proxy.php"), "https://x.org/proxy.php");
        assert_eq!(join_url("/", "https://api.example/p"), "https://api.example/p");
    }
}
