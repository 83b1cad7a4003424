use image::{GrayImage, Luma};
use nalgebra::Point2;
use wellplate_core::{well_names, PlateBox, PLATE_COLS, PLATE_ROWS};
use wellplate_grid::{
    fit_plate_grid, lattice_residual, refine_plate, refine_plate_detailed, RefineParams,
};

const X0: f64 = 118.0;
const Y0: f64 = 92.0;
const SX: f64 = 31.0;
const SY: f64 = 30.5;

fn truth(i: usize, j: usize) -> Point2<f64> {
    Point2::new(X0 + SX * i as f64, Y0 + SY * j as f64)
}

/// Deterministic sub-pixel jitter.
fn jitter(k: usize, amp: f64) -> (f64, f64) {
    let k = k as f64;
    (
        amp * (k * 12.9898).sin() * 0.999,
        amp * (k * 78.233).cos() * 0.999,
    )
}

fn jittered_centers() -> Vec<Point2<f64>> {
    let mut out = Vec::new();
    for j in 0..PLATE_ROWS {
        for i in 0..PLATE_COLS {
            let (dx, dy) = jitter(out.len(), 0.8);
            let p = truth(i, j);
            out.push(Point2::new(
                (p.x + dx).round_ties_even(),
                (p.y + dy).round_ties_even(),
            ));
        }
    }
    out
}

fn plate() -> PlateBox {
    PlateBox::new(100, 70, 520, 355)
}

fn near(p: Point2<f64>, x: f64, y: f64, tol: f64) -> bool {
    (p.x - x).abs() <= tol && (p.y - y).abs() <= tol
}

#[test]
fn optimizer_recovers_ground_truth_within_one_step() {
    let plate = plate();
    let r = fit_plate_grid(&jittered_centers(), &plate, &RefineParams::default()).expect("grid");

    let estimate = plate.diagonal() / 16.37;
    let pitch_step = estimate * 0.08 / 8.0;
    let origin_step = r.fit.scale_x / 8.0;
    let t = r.grid.transform;
    assert!((t.scale_x() - SX).abs() <= pitch_step * 1.01, "{t:?}");
    assert!((t.scale_y() - SY).abs() <= pitch_step * 1.01, "{t:?}");

    let a1 = t.apply(Point2::new(0.0, 0.0));
    assert!(near(a1, X0, Y0, origin_step), "{a1:?}");
    assert_eq!(r.inlier_count(), PLATE_ROWS * PLATE_COLS);
}

#[test]
fn outliers_do_not_move_the_grid() {
    let plate = plate();
    let mut centers = jittered_centers();
    // 20 detections between wells, about 17% of the total
    for m in 0..20 {
        let u = (m as f64 * 3.7).sin() * 0.5 + 0.5;
        let v = (m as f64 * 5.3).cos() * 0.5 + 0.5;
        let i = (u * 11.0) as usize;
        let j = (v * 7.0) as usize;
        let p = truth(i, j);
        centers.push(Point2::new(
            (p.x + SX * 0.5).round_ties_even(),
            (p.y + SY * 0.5).round_ties_even(),
        ));
    }

    let r = fit_plate_grid(&centers, &plate, &RefineParams::default()).expect("grid");
    let inv = r.grid.transform.inverse().expect("invertible");
    let mean: f64 = (0..PLATE_ROWS)
        .flat_map(|j| (0..PLATE_COLS).map(move |i| truth(i, j)))
        .map(|p| lattice_residual(inv.apply(p)))
        .sum::<f64>()
        / (PLATE_ROWS * PLATE_COLS) as f64;
    assert!(mean < 0.2, "mean residual {mean}");
    assert!(r.inliers[PLATE_ROWS * PLATE_COLS..].iter().all(|&b| !b));
}

fn render_plate(w: u32, h: u32, origin: (f32, f32), pitch: f32, radius: f32) -> GrayImage {
    let mut img = GrayImage::from_pixel(w, h, Luma([200]));
    for (x, y, px) in img.enumerate_pixels_mut() {
        let gx = (x as f32 - origin.0) / pitch;
        let gy = (y as f32 - origin.1) / pitch;
        let (i, j) = (gx.round(), gy.round());
        if !(0.0..12.0).contains(&i) || !(0.0..8.0).contains(&j) {
            continue;
        }
        let dx = x as f32 - (origin.0 + i * pitch);
        let dy = y as f32 - (origin.1 + j * pitch);
        if dx.hypot(dy) <= radius {
            *px = Luma([70]);
        }
    }
    img
}

#[test]
fn synthetic_plate_image_is_refined() {
    let img = render_plate(500, 360, (70.0, 65.0), 30.0, 9.0);
    let plate = PlateBox::new(40, 40, 450, 322);
    let r = refine_plate_detailed(&img, &plate, &RefineParams::default()).expect("grid");
    assert!(r.centers.len() >= 80, "{} circles", r.centers.len());

    let step = r.fit.scale_x / 8.0;
    let a1 = r.grid.transform.apply(Point2::new(0.0, 0.0));
    let h12 = r.grid.transform.apply(Point2::new(11.0, 7.0));
    assert!(near(a1, 70.0, 65.0, step), "{a1:?}");
    assert!(near(h12, 400.0, 275.0, 2.0 * step), "{h12:?}");

    let names = well_names(PLATE_ROWS, PLATE_COLS);
    for w in names {
        let c = r.grid.well_center(w);
        assert!(plate.strictly_contains(c.x, c.y), "{w} at {c:?}");
    }
}

#[test]
fn empty_plate_region_is_skipped() {
    let img = GrayImage::from_pixel(300, 200, Luma([180]));
    let plate = PlateBox::new(20, 20, 280, 180);
    assert!(refine_plate(&img, &plate, &RefineParams::default()).is_none());
}

#[test]
fn three_wells_are_not_enough() {
    let mut img = GrayImage::from_pixel(500, 360, Luma([200]));
    for (cx, cy) in [(100.0f32, 100.0f32), (130.0, 100.0), (160.0, 100.0)] {
        for (x, y, px) in img.enumerate_pixels_mut() {
            if (x as f32 - cx).hypot(y as f32 - cy) <= 9.0 {
                *px = Luma([70]);
            }
        }
    }
    let plate = PlateBox::new(40, 40, 450, 322);
    assert!(refine_plate(&img, &plate, &RefineParams::default()).is_none());
}
