use std::path::{Path, PathBuf};

use wellplate::{get_colors, match_size, to_rgb, PipelineConfig};

fn testdata_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../testdata")
        .join(name)
}

#[test]
fn reference_deck_photo_keeps_its_a1_color() {
    let path = testdata_path("IMG_1812.png");
    if !path.exists() {
        eprintln!("skipping: {} not found", path.display());
        return;
    }
    let frame = to_rgb(&image::open(&path).expect("decode fixture"));
    let frame = match_size(&frame, (1280, 1920));
    assert_eq!(frame.dimensions(), (1920, 1280));

    let report = get_colors(&frame, &PipelineConfig::default()).expect("colors");
    let a1 = report.color(1, "A1").expect("slot 1 well A1");
    assert_eq!(a1.bgr(), [161, 163, 215]);
}
