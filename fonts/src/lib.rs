//! Font embedded at build time for deterministic text rendering.
//!
//! Empty when the build could not fetch it; callers then load system fonts.

pub static FONT_BYTES: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/DejaVuSans.ttf"));

pub fn is_embedded() -> bool {
    !FONT_BYTES.is_empty()
}
