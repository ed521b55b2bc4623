mod compose;
mod fetch;
mod job;

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use starmap_core::{ImageFormat, StarMapImage, StarMapRequest, plan_composite};
use tracing::{info, warn};

use crate::job::{PROXY_ENV, RenderJob, format_from_path};

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_chart(path: &str) -> Result<StarMapImage> {
    let format = format_from_path(Path::new(path))
        .with_context(|| format!("cannot tell the image format of {path}"))?;
    let bytes = fs::read(path).with_context(|| format!("reading chart {path}"))?;
    Ok(StarMapImage { format, bytes })
}

fn obtain_chart(
    job: &RenderJob,
    request: &StarMapRequest,
    chart_path: Option<&str>,
) -> Result<StarMapImage> {
    if let Some(path) = chart_path {
        return read_chart(path);
    }
    let proxy = job.proxy_url(env::var(PROXY_ENV).ok());
    let (image, offline) = fetch::fetch_or_fallback(proxy.as_deref(), request)?;
    if offline {
        info!("rendered with an offline approximation of the sky");
    }
    Ok(image)
}

fn main() -> Result<()> {
    init_tracing();
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: starmap-render <job.json> <output.(png|jpg|svg)> [chart.(png|jpg|svg)]");
        std::process::exit(2);
    }
    let job = RenderJob::load(&args[1])?;
    let output = Path::new(&args[2]);

    let mut form = job.form.clone();
    if let Some(format) = format_from_path(output) {
        form.output.format = format;
    }
    let format = form.output.format;
    let (width, height) = (form.output.width, form.output.height);
    let request = form.download_request()?;
    let chart = obtain_chart(&job, &request, args.get(3).map(String::as_str))?;

    let bytes = match format {
        ImageFormat::Svg => {
            if chart.format != ImageFormat::Svg {
                bail!("SVG output needs an SVG chart, got {}", chart.format);
            }
            warn!("SVG export is written without the border and text overlay");
            chart.bytes
        }
        raster => {
            let opt = compose::svg_options();
            let config = form.render_config(width, height, raster, &request.location);
            let plan = plan_composite(&config);
            let chart = compose::chart_pixmap(&chart, width, height, &opt)?;
            let canvas = compose::composite(&plan, &chart, &opt)?;
            compose::encode(&canvas, raster)?
        }
    };

    fs::write(output, &bytes).with_context(|| format!("writing {}", output.display()))?;
    info!(
        "wrote {} ({}x{} {}, {} bytes)",
        output.display(),
        width,
        height,
        format,
        bytes.len()
    );
    Ok(())
}
