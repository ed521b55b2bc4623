use approx::assert_abs_diff_eq;
use starmap_core::form::StarMapForm;
use starmap_core::layout::{PREVIEW_WIDTH_PX, plan_composite};
use starmap_core::{
    ImageFormat, InputIssue, LocationInput, ObservationMoment, ObserverLocation, StarMapError,
    TextPosition, local_sidereal_time_hours,
};

fn charleston_form() -> StarMapForm {
    StarMapForm {
        location: LocationInput::new("N32°55.93211′", "W80°7.22460′"),
        moment: ObservationMoment {
            date: "2024-06-21".into(),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn charleston_request_points_at_zenith() {
    let req = charleston_form().preview_request().unwrap();
    let eq = req.body.view.parameters.position.equatorial;
    assert_abs_diff_eq!(
        eq.right_ascension,
        local_sidereal_time_hours("2024-06-21", -80.12041),
        epsilon = 1e-5
    );
    assert_abs_diff_eq!(eq.declination, 32.0 + 55.93211 / 60.0, epsilon = 1e-9);
    assert!((0.0..24.0).contains(&eq.right_ascension));
}

#[test]
fn empty_location_requires_coordinates() {
    let form = StarMapForm {
        location: LocationInput::default(),
        ..charleston_form()
    };
    let err = form.preview_request().unwrap_err();
    assert!(matches!(err, StarMapError::Validation(_)));
    assert!(err.issues().contains(&InputIssue::MissingLatitude));
    assert!(err.to_string().contains("coordinates required"));
}

#[test]
fn jpeg_ignores_transparency_and_fills_background() {
    let mut form = charleston_form();
    form.output.format = ImageFormat::Jpg;
    form.output.transparent = true;
    form.output.background_color = "#0b1026".into();

    let req = form.download_request().unwrap();
    assert_eq!(req.body.output.transparent, None);
    assert_eq!(
        req.body.view.parameters.background_color.as_deref(),
        Some("#0b1026")
    );

    let plan = plan_composite(&form.render_config(
        form.output.width,
        form.output.height,
        form.output.format,
        &req.location,
    ));
    assert_eq!(plan.background.as_deref(), Some("#0b1026"));
}

#[test]
fn download_matches_preview_proportions() {
    let mut form = charleston_form();
    form.output.width = 3000;
    form.output.height = 2400;
    form.circle.radius_percent = 60;
    form.circle.border_width_px = 4;
    form.push_text("Hello", TextPosition::Below);
    assert_eq!(form.preview_size(), (PREVIEW_WIDTH_PX, 640));

    let loc = ObserverLocation::from_input(&form.location).unwrap();
    let (pw, ph) = form.preview_size();
    let preview = plan_composite(&form.render_config(pw, ph, ImageFormat::Png, &loc));
    let download = plan_composite(&form.render_config(3000, 2400, ImageFormat::Png, &loc));

    assert_eq!((download.width, download.height), (3000, 2400));
    assert!(download.overflow.is_empty());
    let hello = download.texts.iter().find(|t| t.layer.id == "text1").unwrap();
    assert_eq!(hello.font_px, 60);
    let hello_preview = preview.texts.iter().find(|t| t.layer.id == "text1").unwrap();
    assert_eq!(hello_preview.font_px, 16);

    let ratio = 3000.0 / 800.0;
    assert_abs_diff_eq!(download.clip.rx, preview.clip.rx * ratio, epsilon = 1e-9);
    assert_abs_diff_eq!(download.clip.ry, preview.clip.ry * ratio, epsilon = 1e-9);
    assert_abs_diff_eq!(
        download.border.as_ref().unwrap().width,
        preview.border.as_ref().unwrap().width * ratio,
        epsilon = 1e-9
    );
    assert_eq!(download.texts.len(), preview.texts.len());
}
