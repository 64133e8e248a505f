//! Douglas-Peucker polyline simplification.

/// A point in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Distance from `point` to the infinite line through `start` and `end`.
/// Falls back to point distance when the line is degenerate.
pub fn perpendicular_distance(point: Point, start: Point, end: Point) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    if dx == 0.0 && dy == 0.0 {
        return ((point.x - start.x).powi(2) + (point.y - start.y).powi(2)).sqrt();
    }
    ((point.x - start.x) * dy - (point.y - start.y) * dx).abs() / (dx * dx + dy * dy).sqrt()
}

/// Drop points that deviate from the simplified line by at most `tolerance`.
///
/// Endpoints are always kept and the output never has more points than the
/// input. Iterative so long series cannot overflow the stack.
pub fn simplify_path(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut stack = vec![(0usize, points.len() - 1)];
    while let Some((first, last)) = stack.pop() {
        if last <= first + 1 {
            continue;
        }

        let (start, end) = (points[first], points[last]);
        let (index, distance) = (first + 1..last)
            .map(|i| (i, perpendicular_distance(points[i], start, end)))
            .fold((first, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });

        if distance > tolerance {
            keep[index] = true;
            stack.push((first, index));
            stack.push((index, last));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collinear_points_collapse() {
        let points: Vec<Point> = (0..10).map(|i| Point::new(i as f64, 2.0 * i as f64)).collect();
        let simplified = simplify_path(&points, 0.5);
        assert_eq!(simplified, vec![points[0], points[9]]);
    }

    #[test]
    fn test_spike_is_kept() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.1),
            Point::new(2.0, 5.0),
            Point::new(3.0, 0.1),
            Point::new(4.0, 0.0),
        ];
        let simplified = simplify_path(&points, 0.5);
        assert_eq!(
            simplified,
            vec![points[0], points[2], points[4]]
        );
    }

    #[test]
    fn test_fidelity_within_tolerance() {
        let points: Vec<Point> = (0..500)
            .map(|i| {
                let x = i as f64;
                Point::new(x, (x * 0.05).sin() * 40.0 + (x * 0.9).sin() * 0.3)
            })
            .collect();
        let tolerance = 0.5;
        let simplified = simplify_path(&points, tolerance);

        assert!(simplified.len() <= points.len());
        assert_eq!(simplified.first(), points.first());
        assert_eq!(simplified.last(), points.last());

        // every dropped point lies within tolerance of the segment that replaced it
        for window in simplified.windows(2) {
            let (a, b) = (window[0], window[1]);
            for p in points.iter().filter(|p| p.x > a.x && p.x < b.x) {
                assert!(perpendicular_distance(*p, a, b) <= tolerance + 1e-9);
            }
        }
    }

    #[test]
    fn test_short_paths_untouched() {
        let two = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        assert_eq!(simplify_path(&two, 0.5), two);
        assert!(simplify_path(&[], 0.5).is_empty());
    }
}
