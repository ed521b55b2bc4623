use std::env;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;
use zip::ZipArchive;

const FONT_FILE: &str = "DejaVuSans.ttf";
const ZIP_URL: &str =
    "https://github.com/dejavu-fonts/dejavu-fonts/releases/download/version_2_37/dejavu-fonts-ttf-2.37.zip";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=FONT_TTF");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("cargo sets OUT_DIR"));
    let target_font = out_dir.join(FONT_FILE);

    // Allow overriding via env: FONT_TTF
    if let Ok(path) = env::var("FONT_TTF") {
        match fs::copy(&path, &target_font) {
            Ok(_) => return,
            Err(e) => println!("cargo:warning=failed to copy FONT_TTF {path}: {e}"),
        }
    }

    // Non-empty file from an earlier build
    if fs::metadata(&target_font).is_ok_and(|m| m.len() > 0) {
        return;
    }

    // Offline builds still succeed; renderers fall back to system fonts.
    let bytes = match fetch_font(&out_dir) {
        Ok(b) => b,
        Err(e) => {
            println!("cargo:warning=text rendering will use system fonts: {e}");
            Vec::new()
        }
    };
    if let Err(e) = fs::write(&target_font, &bytes) {
        panic!("cannot write {}: {e}", target_font.display());
    }
}

fn download(url: &str, dest: &Path) -> bool {
    let dest = dest.to_string_lossy();
    let curl = Command::new("curl")
        .args(["-L", "-f", "-s", "--connect-timeout", "15", "-o", &dest, url])
        .status();
    if let Ok(st) = curl
        && st.success()
    {
        return true;
    }
    let wget = Command::new("wget")
        .args(["-q", "-T", "15", "-O", &dest, url])
        .status();
    matches!(wget, Ok(st) if st.success())
}

fn fetch_font(out_dir: &Path) -> Result<Vec<u8>, String> {
    let zip_path = out_dir.join("dejavu-fonts.zip");
    if !download(ZIP_URL, &zip_path) {
        return Err(format!("failed to download {ZIP_URL}"));
    }

    let mut data = Vec::new();
    fs::File::open(&zip_path)
        .and_then(|mut f| f.read_to_end(&mut data))
        .map_err(|e| format!("zip read failed: {e}"))?;
    let mut zip = ZipArchive::new(std::io::Cursor::new(data))
        .map_err(|e| format!("zip parse failed: {e}"))?;
    for i in 0..zip.len() {
        let mut file = zip.by_index(i).map_err(|e| e.to_string())?;
        if file.name().ends_with(&format!("ttf/{FONT_FILE}")) {
            let mut buf = Vec::new();
            std::io::copy(&mut file, &mut buf).map_err(|e| e.to_string())?;
            return Ok(buf);
        }
    }
    Err(format!("{FONT_FILE} not found in archive"))
}
