use sketch_tutor::draw::{DrawSurface, Rgba};

fn stroke(surface: &mut DrawSurface, points: &[(f32, f32)]) {
    let mut iter = points.iter();
    if let Some(first) = iter.next() {
        surface.begin_stroke(*first);
    }
    for point in iter {
        surface.extend_stroke(*point);
    }
    surface.end_stroke();
}

#[test]
fn same_points_and_settings_produce_the_same_raster() {
    let points = [(5.0, 5.0), (20.0, 12.0), (33.0, 40.0), (10.0, 44.0)];

    let mut a = DrawSurface::new(64, 64, Rgba::WHITE);
    let mut b = DrawSurface::new(64, 64, Rgba::WHITE);
    a.brush.width = 3;
    b.brush.width = 3;
    stroke(&mut a, &points);
    stroke(&mut b, &points);

    assert_eq!(a.raster(), b.raster());
}

#[test]
fn clear_then_snapshot_is_the_uniform_background() {
    let background = Rgba::rgb(240, 240, 200);
    let mut surface = DrawSurface::new(32, 32, background);
    stroke(&mut surface, &[(2.0, 2.0), (30.0, 30.0)]);
    surface.clear();

    let png = surface.snapshot_png().unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (32, 32));
    for px in decoded.pixels() {
        assert_eq!((px[0], px[1], px[2]), (240, 240, 200));
    }
}

#[test]
fn eraser_paints_background_regardless_of_brush_color() {
    let background = Rgba::WHITE;
    let mut surface = DrawSurface::new(48, 48, background);

    // Cover the area in ink first.
    surface.brush.color = Rgba::rgb(200, 0, 0);
    surface.brush.width = 20;
    stroke(&mut surface, &[(0.0, 24.0), (48.0, 24.0)]);
    assert_eq!(surface.raster().pixel(24, 24), Rgba::rgb(200, 0, 0));

    // Eraser with a loud configured color must still restore background.
    surface.brush.color = Rgba::rgb(0, 255, 0);
    surface.brush.eraser = true;
    surface.brush.width = 6;
    stroke(&mut surface, &[(10.0, 24.0), (38.0, 24.0)]);

    for x in 12..=36 {
        assert_eq!(surface.raster().pixel(x, 24), background, "x = {x}");
    }
}

#[test]
fn snapshot_does_not_mutate_the_raster() {
    let mut surface = DrawSurface::new(16, 16, Rgba::WHITE);
    stroke(&mut surface, &[(1.0, 1.0), (14.0, 14.0)]);
    let before = surface.raster().clone();
    let first = surface.snapshot_png().unwrap();
    let second = surface.snapshot_png().unwrap();
    assert_eq!(first, second);
    assert_eq!(surface.raster(), &before);
}

#[test]
fn restore_round_trips_a_snapshot() {
    let mut original = DrawSurface::new(24, 24, Rgba::WHITE);
    original.brush.color = Rgba::rgb(0, 0, 180);
    stroke(&mut original, &[(3.0, 3.0), (20.0, 9.0)]);
    let png = original.snapshot_png().unwrap();

    let mut restored = DrawSurface::new(24, 24, Rgba::WHITE);
    restored.restore_png(&png).unwrap();
    assert_eq!(restored.raster(), original.raster());
}
