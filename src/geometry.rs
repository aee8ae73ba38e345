// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Planar geometry in map units.
//!
//! Distances returned by this module are in map units; the [Route](crate::Route)
//! carries a `point_scale` (metres per map unit) to convert them into metres.
//! Directions (bearings) are in degrees, measured anticlockwise from the map's
//! +x axis and wrapped into (-180, 180].

/// A position in map units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the straight-line distance to another point, in map units.
    #[inline]
    pub fn distance(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Returns the direction from this point towards another point.
    ///
    /// Coincident points have no direction and give [None].
    pub fn direction_to(&self, other: Point) -> Option<f64> {
        if self == &other {
            None
        } else {
            Some((other.y - self.y).atan2(other.x - self.x).to_degrees())
        }
    }

    /// Linearly interpolates between this point (`t == 0`) and `other` (`t == 1`).
    #[inline]
    pub fn lerp(&self, other: Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// Wraps an angle in degrees into the (-180, 180] range.
pub fn wrap_degrees(angle: f64) -> f64 {
    let a = (angle + 180.0).rem_euclid(360.0) - 180.0;
    if a == -180.0 {
        180.0
    } else {
        a
    }
}

/// Closest point of a [Path] to some other point, as returned by [Path::nearest_point].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NearestPoint {
    pub point: Point,

    /// Index of the line (pair of consecutive points) containing the nearest point.
    pub line_index: usize,

    /// Distance from the start of the path to [NearestPoint::point], in map units.
    pub distance_along: f64,

    /// Distance between the queried point and [NearestPoint::point], in map units.
    pub distance: f64,
}

/// An open polyline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path(Vec<Point>);

impl Path {
    pub fn new() -> Self {
        Self(Vec::default())
    }

    pub fn from_points(points: Vec<Point>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Point] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<Point> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<Point> {
        self.0.last().copied()
    }

    pub fn push(&mut self, p: Point) {
        self.0.push(p);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Appends all points of another path to this one.
    ///
    /// If the other path starts where this one ends, the shared point is only kept once.
    pub fn append(&mut self, other: &Path) {
        let skip = match (self.last(), other.first()) {
            (Some(a), Some(b)) if a == b => 1,
            _ => 0,
        };
        self.0.extend(other.0.iter().skip(skip));
    }

    /// Reverses the order of points in place.
    pub fn reverse(&mut self) {
        self.0.reverse();
    }

    /// Returns the total length of the path, in map units.
    pub fn length(&self) -> f64 {
        self.0.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// Returns the direction of the `i`-th line of the path, or [None] if
    /// that line doesn't exist or is degenerate.
    pub fn line_direction(&self, i: usize) -> Option<f64> {
        let a = self.0.get(i)?;
        let b = self.0.get(i + 1)?;
        a.direction_to(*b)
    }

    /// Returns the direction in which the path starts, skipping over
    /// any leading repeated points.
    pub fn direction_at_start(&self) -> Option<f64> {
        self.0.windows(2).find_map(|w| w[0].direction_to(w[1]))
    }

    /// Returns the direction in which the path ends, skipping over
    /// any trailing repeated points.
    pub fn direction_at_end(&self) -> Option<f64> {
        self.0.windows(2).rev().find_map(|w| w[0].direction_to(w[1]))
    }

    /// Returns the direction of travel at a given distance (in map units) along the path.
    pub fn direction_at(&self, distance: f64) -> Option<f64> {
        let (_, line) = self.locate(distance)?;
        self.line_direction(line)
            .or_else(|| self.direction_at_start())
    }

    /// Returns the point at a given distance (in map units) from the start of the path,
    /// together with the index of the line it lies on. The distance is clamped
    /// to the extent of the path.
    ///
    /// Returns [None] for an empty path. A single-point path always returns that point.
    pub fn point_at_distance(&self, distance: f64) -> Option<(Point, usize)> {
        let (point, line) = self.locate(distance)?;
        Some((point, line))
    }

    fn locate(&self, distance: f64) -> Option<(Point, usize)> {
        let first = self.first()?;
        if self.0.len() == 1 {
            return Some((first, 0));
        }

        let mut remaining = if distance.is_nan() { 0.0 } else { distance.max(0.0) };
        let last_line = self.0.len() - 2;
        for (i, w) in self.0.windows(2).enumerate() {
            let length = w[0].distance(w[1]);
            if remaining <= length || i == last_line {
                let t = if length > 0.0 { (remaining / length).min(1.0) } else { 0.0 };
                return Some((w[0].lerp(w[1], t), i));
            }
            remaining -= length;
        }

        return None;
    }

    /// Finds the point on the path closest to `p`.
    ///
    /// When several lines are equally close, the one nearest to the start of the path wins.
    pub fn nearest_point(&self, p: Point) -> Option<NearestPoint> {
        let first = self.first()?;
        if self.0.len() == 1 {
            return Some(NearestPoint {
                point: first,
                line_index: 0,
                distance_along: 0.0,
                distance: first.distance(p),
            });
        }

        let mut best: Option<NearestPoint> = None;
        let mut along = 0.0;
        for (i, w) in self.0.windows(2).enumerate() {
            let (a, b) = (w[0], w[1]);
            let length = a.distance(b);
            let t = if length > 0.0 {
                let dot = (p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y);
                (dot / (length * length)).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let candidate = a.lerp(b, t);
            let distance = candidate.distance(p);
            if best.map_or(true, |nearest| distance < nearest.distance) {
                best = Some(NearestPoint {
                    point: candidate,
                    line_index: i,
                    distance_along: along + length * t,
                    distance,
                });
            }
            along += length;
        }

        return best;
    }
}

impl FromIterator<Point> for Path {
    fn from_iter<T: IntoIterator<Item = Point>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<Point>> for Path {
    fn from(points: Vec<Point>) -> Self {
        Self(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr) => {
            assert!(
                (($a - $b).abs() < 1e-6),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    fn l_shape() -> Path {
        Path::from_points(vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 50.0),
        ])
    }

    #[test]
    fn wrap() {
        assert_almost_eq!(wrap_degrees(190.0), -170.0);
        assert_almost_eq!(wrap_degrees(-190.0), 170.0);
        assert_almost_eq!(wrap_degrees(-180.0), 180.0);
        assert_almost_eq!(wrap_degrees(720.0), 0.0);
        assert_almost_eq!(wrap_degrees(45.0), 45.0);
    }

    #[test]
    fn directions() {
        let o = Point::ZERO;
        assert_almost_eq!(o.direction_to(Point::new(1.0, 0.0)).unwrap(), 0.0);
        assert_almost_eq!(o.direction_to(Point::new(0.0, 1.0)).unwrap(), 90.0);
        assert_almost_eq!(o.direction_to(Point::new(0.0, -1.0)).unwrap(), -90.0);
        assert_almost_eq!(o.direction_to(Point::new(-1.0, 0.0)).unwrap(), 180.0);
        assert_eq!(o.direction_to(o), None);
    }

    #[test]
    fn length() {
        assert_almost_eq!(l_shape().length(), 150.0);
        assert_almost_eq!(Path::new().length(), 0.0);
        assert_almost_eq!(Path::from_points(vec![Point::new(3.0, 4.0)]).length(), 0.0);
    }

    #[test]
    fn point_at_distance() {
        let p = l_shape();

        let (pt, line) = p.point_at_distance(50.0).unwrap();
        assert_eq!(pt, Point::new(50.0, 0.0));
        assert_eq!(line, 0);

        let (pt, line) = p.point_at_distance(125.0).unwrap();
        assert_eq!(pt, Point::new(100.0, 25.0));
        assert_eq!(line, 1);

        let (pt, _) = p.point_at_distance(-10.0).unwrap();
        assert_eq!(pt, Point::new(0.0, 0.0));

        let (pt, line) = p.point_at_distance(1000.0).unwrap();
        assert_eq!(pt, Point::new(100.0, 50.0));
        assert_eq!(line, 1);

        assert_eq!(Path::new().point_at_distance(1.0), None);
    }

    #[test]
    fn nearest_point() {
        let p = l_shape();

        let n = p.nearest_point(Point::new(40.0, 10.0)).unwrap();
        assert_eq!(n.point, Point::new(40.0, 0.0));
        assert_eq!(n.line_index, 0);
        assert_almost_eq!(n.distance_along, 40.0);
        assert_almost_eq!(n.distance, 10.0);

        let n = p.nearest_point(Point::new(120.0, 30.0)).unwrap();
        assert_eq!(n.point, Point::new(100.0, 30.0));
        assert_eq!(n.line_index, 1);
        assert_almost_eq!(n.distance_along, 130.0);
        assert_almost_eq!(n.distance, 20.0);

        let n = p.nearest_point(Point::new(-30.0, -40.0)).unwrap();
        assert_eq!(n.point, Point::ZERO);
        assert_almost_eq!(n.distance, 50.0);
    }

    #[test]
    fn direction_at() {
        let p = l_shape();
        assert_almost_eq!(p.direction_at_start().unwrap(), 0.0);
        assert_almost_eq!(p.direction_at_end().unwrap(), 90.0);
        assert_almost_eq!(p.direction_at(30.0).unwrap(), 0.0);
        assert_almost_eq!(p.direction_at(130.0).unwrap(), 90.0);
    }

    #[test]
    fn direction_skips_repeated_points() {
        let p = Path::from_points(vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        assert_almost_eq!(p.direction_at_start().unwrap(), 90.0);
        assert_almost_eq!(p.direction_at_end().unwrap(), 90.0);
    }

    #[test]
    fn append_and_reverse() {
        let mut p = l_shape();
        p.append(&Path::from_points(vec![
            Point::new(100.0, 50.0),
            Point::new(0.0, 50.0),
        ]));
        assert_eq!(p.len(), 4);
        assert_almost_eq!(p.length(), 250.0);

        p.reverse();
        assert_eq!(p.first(), Some(Point::new(0.0, 50.0)));
        assert_eq!(p.last(), Some(Point::ZERO));
    }
}
