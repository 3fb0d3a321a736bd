use sketch_tutor::draw::export::export_raster;
use sketch_tutor::draw::{DrawSurface, Rgba};

#[test]
fn export_writes_a_decodable_png() {
    let dir = tempfile::tempdir().unwrap();
    let mut surface = DrawSurface::new(40, 30, Rgba::WHITE);
    surface.begin_stroke((5.0, 5.0));
    surface.extend_stroke((30.0, 20.0));
    surface.end_stroke();

    let path = export_raster(surface.raster(), dir.path()).unwrap();
    assert!(path.exists());
    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("_sketch.png"));

    let decoded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (40, 30));
}

#[test]
fn export_creates_the_folder_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("exports").join("today");
    let surface = DrawSurface::new(8, 8, Rgba::WHITE);

    let path = export_raster(surface.raster(), &nested).unwrap();
    assert!(path.starts_with(&nested));
    assert!(path.exists());
}
