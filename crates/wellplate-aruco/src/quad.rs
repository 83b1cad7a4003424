//! Marker candidate extraction: binary contours reduced to convex quads.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use nalgebra::Point2;

/// Geometric filters applied to contour polygons.
#[derive(Clone, Copy, Debug)]
pub struct QuadFilter {
    /// Minimum contour length relative to the larger image side.
    pub min_perimeter_rate: f64,
    /// Maximum contour length relative to the larger image side.
    pub max_perimeter_rate: f64,
    /// Douglas-Peucker tolerance relative to the contour length.
    pub polygon_accuracy_rate: f64,
    /// Minimum side length relative to the quad perimeter.
    pub min_side_rate: f64,
    /// Corners closer than this to the image border are rejected.
    pub min_border_distance: f32,
}

/// Convex quads around foreground blobs, corners clockwise in image
/// coordinates (y down), starting from the first polygon vertex.
pub fn find_quads(binary: &GrayImage, filter: &QuadFilter) -> Vec<[Point2<f32>; 4]> {
    let (w, h) = binary.dimensions();
    let max_dim = w.max(h) as f64;
    let min_len = filter.min_perimeter_rate * max_dim;
    let max_len = filter.max_perimeter_rate * max_dim;

    let mut quads = Vec::new();
    for contour in find_contours::<i32>(binary) {
        if contour.border_type != BorderType::Outer {
            continue;
        }
        let n = contour.points.len() as f64;
        if n < min_len || n > max_len {
            continue;
        }

        let perimeter = arc_length(&contour.points, true);
        let eps = (perimeter * filter.polygon_accuracy_rate).max(1.0);
        let poly = simplify_closed(&contour.points, eps);
        if poly.len() != 4 || !is_convex(&poly) {
            continue;
        }

        let mut quad: [Point2<f32>; 4] =
            std::array::from_fn(|i| Point2::new(poly[i].x as f32, poly[i].y as f32));
        if signed_area(&quad) < 0.0 {
            quad.swap(1, 3);
        }
        if !far_from_border(&quad, w, h, filter.min_border_distance) {
            continue;
        }
        let quad_perimeter: f32 = (0..4).map(|i| side(&quad, i)).sum();
        let min_side = (0..4).map(|i| side(&quad, i)).fold(f32::INFINITY, f32::min);
        if (min_side as f64) < filter.min_side_rate * quad_perimeter as f64 {
            continue;
        }
        quads.push(quad);
    }
    quads
}

/// Douglas-Peucker on a closed contour.
///
/// The contour is split at its start point and the point farthest from it;
/// the start point is dropped again when it lies on a straight edge.
fn simplify_closed(points: &[Point<i32>], eps: f64) -> Vec<Point<i32>> {
    let Some(&start) = points.first() else {
        return Vec::new();
    };
    let dist2 = |p: &Point<i32>| {
        let dx = (p.x - start.x) as i64;
        let dy = (p.y - start.y) as i64;
        dx * dx + dy * dy
    };
    let Some((far, _)) = points
        .iter()
        .enumerate()
        .max_by_key(|(i, p)| (dist2(p), std::cmp::Reverse(*i)))
    else {
        return Vec::new();
    };
    if far == 0 {
        return vec![start];
    }

    let mut poly = approximate_polygon_dp(&points[..=far], eps, false);
    let mut tail = points[far..].to_vec();
    tail.push(start);
    let back = approximate_polygon_dp(&tail, eps, false);
    poly.pop();
    poly.extend(back);
    poly.pop();

    let n = poly.len();
    if n > 3 && distance_to_line(poly[0], poly[n - 1], poly[1]) <= eps {
        poly.remove(0);
    }
    poly
}

fn distance_to_line(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (dx, dy) = (b.x as f64 - ax, b.y as f64 - ay);
    let len = dx.hypot(dy);
    if len == 0.0 {
        return (p.x as f64 - ax).hypot(p.y as f64 - ay);
    }
    ((p.x as f64 - ax) * dy - (p.y as f64 - ay) * dx).abs() / len
}

fn is_convex(poly: &[Point<i32>]) -> bool {
    let n = poly.len();
    let mut sign = 0i64;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        let c = poly[(i + 2) % n];
        let cross =
            (b.x - a.x) as i64 * (c.y - b.y) as i64 - (b.y - a.y) as i64 * (c.x - b.x) as i64;
        if cross == 0 {
            return false;
        }
        if sign == 0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// Shoelace area; positive for clockwise order on screen (y down).
pub(crate) fn signed_area(q: &[Point2<f32>; 4]) -> f32 {
    let mut a = 0.0;
    for i in 0..4 {
        let p = q[i];
        let r = q[(i + 1) % 4];
        a += p.x * r.y - r.x * p.y;
    }
    0.5 * a
}

fn side(q: &[Point2<f32>; 4], i: usize) -> f32 {
    (q[(i + 1) % 4] - q[i]).norm()
}

fn far_from_border(q: &[Point2<f32>; 4], w: u32, h: u32, d: f32) -> bool {
    q.iter().all(|p| {
        p.x >= d && p.y >= d && p.x <= w as f32 - 1.0 - d && p.y <= h as f32 - 1.0 - d
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn filter() -> QuadFilter {
        QuadFilter {
            min_perimeter_rate: 0.03,
            max_perimeter_rate: 4.0,
            polygon_accuracy_rate: 0.03,
            min_side_rate: 0.05,
            min_border_distance: 3.0,
        }
    }

    #[test]
    fn filled_square_yields_clockwise_quad() {
        let mut bin = GrayImage::new(100, 80);
        for y in 20..60 {
            for x in 30..70 {
                bin.put_pixel(x, y, Luma([255]));
            }
        }
        let quads = find_quads(&bin, &filter());
        assert_eq!(quads.len(), 1);
        let q = quads[0];
        assert!(signed_area(&q) > 0.0);
        let xs: Vec<f32> = q.iter().map(|p| p.x).collect();
        let ys: Vec<f32> = q.iter().map(|p| p.y).collect();
        assert_eq!(xs.iter().cloned().fold(f32::INFINITY, f32::min), 30.0);
        assert_eq!(xs.iter().cloned().fold(0.0, f32::max), 69.0);
        assert_eq!(ys.iter().cloned().fold(f32::INFINITY, f32::min), 20.0);
        assert_eq!(ys.iter().cloned().fold(0.0, f32::max), 59.0);
    }

    #[test]
    fn round_blob_is_not_a_quad() {
        let mut bin = GrayImage::new(100, 100);
        for y in 0..100i32 {
            for x in 0..100i32 {
                if (x - 50).pow(2) + (y - 50).pow(2) < 30 * 30 {
                    bin.put_pixel(x as u32, y as u32, Luma([255]));
                }
            }
        }
        assert!(find_quads(&bin, &filter()).is_empty());
    }

    #[test]
    fn quads_touching_the_border_are_dropped() {
        let mut bin = GrayImage::new(60, 60);
        for y in 0..30 {
            for x in 0..30 {
                bin.put_pixel(x, y, Luma([255]));
            }
        }
        assert!(find_quads(&bin, &filter()).is_empty());
    }
}
