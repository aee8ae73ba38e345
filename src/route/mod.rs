// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Structured representation of a computed route.

mod builder;
mod xml;

pub use builder::RouteBuilder;
pub use xml::FileFormat;

use crate::geometry::{wrap_degrees, NearestPoint, Path, Point};
use crate::profile::{Profile, RoadType};
use crate::turn::{Turn, TurnType};

/// Penalty (in metres) for matching a position behind the previously matched one,
/// so that a route doubling back on itself is followed in order.
const BACKWARD_MATCH_PENALTY: f64 = 20.0;

/// Portion of the road network between a route's end point and the nearest junction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathToJunction {
    pub path: Path,
    pub start_road_type: RoadType,
    pub end_road_type: RoadType,

    /// Length in metres.
    pub distance: f64,
}

impl PathToJunction {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Reverses the path, swapping the start and end road types.
    pub fn reverse(&mut self) {
        self.path.reverse();
        std::mem::swap(&mut self.start_road_type, &mut self.end_road_type);
    }
}

/// A stretch of a [Route] along a single road, starting at a junction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteSegment {
    pub road_type: RoadType,

    /// Legal speed limit in km/h, or zero if unknown.
    pub max_speed_kph: f64,

    pub name: String,
    pub ref_: String,

    /// Length in metres.
    pub distance: f64,

    /// Travel time in seconds, including [RouteSegment::turn_time].
    pub time: f64,

    /// Time spent at the junction at the start of this segment, in seconds.
    pub turn_time: f64,

    /// Geometry in map units.
    pub path: Path,

    /// Index of the waypoint pair this segment leads between.
    pub section: i32,

    /// The turn taken at the junction at the start of this segment.
    pub turn: Turn,

    /// Set if this segment is restricted for the route's vehicle, which is only
    /// permitted at the very start or end of the route.
    pub restricted: bool,

    pub toll: bool,
}

impl RouteSegment {
    /// Checks whether two segments are on the same road: same type, name and ref.
    pub fn is_same_road(&self, other: &RouteSegment) -> bool {
        self.road_type == other.road_type && self.name == other.name && self.ref_ == other.ref_
    }

    /// Returns the time spent travelling the segment, excluding the junction at its start.
    pub fn travel_time(&self) -> f64 {
        (self.time - self.turn_time).max(0.0)
    }
}

/// A position on a [Route], as returned by [Route::nearest_segment],
/// [Route::point_at_distance] and [Route::point_at_time].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NearestSegmentInfo {
    pub segment_index: usize,

    /// Index of the line within the segment's path.
    pub line_index: usize,

    pub nearest_point: Point,

    /// Distance between the queried position and [NearestSegmentInfo::nearest_point], in metres.
    pub distance_to_route: f64,

    pub distance_along_route: f64,
    pub distance_along_segment: f64,
    pub time_along_route: f64,
    pub time_along_segment: f64,

    /// Direction of the route at the nearest point.
    pub heading: f64,
}

/// A route: an ordered sequence of [RouteSegments](RouteSegment).
///
/// `distance` and `time` always equal the sums over all segments, and
/// segment sections never decrease. An empty route means "no route".
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub segments: Vec<RouteSegment>,

    /// Total length in metres.
    pub distance: f64,

    /// Total travel time in seconds.
    pub time: f64,

    /// Concatenated geometry of all segments.
    pub path: Path,

    /// The profile used to create this route.
    pub profile: Profile,

    /// Metres per map unit.
    pub point_scale: f64,

    pub path_to_junction_before: PathToJunction,
    pub path_to_junction_after: PathToJunction,
}

impl Default for Route {
    fn default() -> Self {
        Self::new(Profile::default(), 1.0)
    }
}

impl Route {
    pub fn new(profile: Profile, point_scale: f64) -> Self {
        Self {
            segments: Vec::default(),
            distance: 0.0,
            time: 0.0,
            path: Path::new(),
            profile,
            point_scale,
            path_to_junction_before: PathToJunction::default(),
            path_to_junction_after: PathToJunction::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Removes all segments, keeping the profile and the point scale.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.distance = 0.0;
        self.time = 0.0;
        self.path.clear();
        self.path_to_junction_before = PathToJunction::default();
        self.path_to_junction_after = PathToJunction::default();
    }

    /// Adds a segment at the end of the route, updating the totals and the path.
    pub fn push_segment(&mut self, segment: RouteSegment) {
        self.distance += segment.distance;
        self.time += segment.time;
        self.path.append(&segment.path);
        self.segments.push(segment);
    }

    /// Recomputes the totals and the path from the segments.
    pub(crate) fn recompute_totals(&mut self) {
        self.distance = self.segments.iter().map(|s| s.distance).sum();
        self.time = self.segments.iter().map(|s| s.time).sum();
        self.path.clear();
        for s in &self.segments {
            self.path.append(&s.path);
        }
    }

    pub fn start_point(&self) -> Option<Point> {
        self.segments.first().and_then(|s| s.path.first())
    }

    pub fn end_point(&self) -> Option<Point> {
        self.segments.last().and_then(|s| s.path.last())
    }

    pub fn max_section(&self) -> Option<i32> {
        self.segments.iter().map(|s| s.section).max()
    }

    /// Returns the end point of every section, in order.
    pub fn section_end_points(&self) -> Vec<Point> {
        let mut points: Vec<Point> = Vec::default();
        for (i, s) in self.segments.iter().enumerate() {
            let last_of_section = self
                .segments
                .get(i + 1)
                .map_or(true, |next| next.section != s.section);
            if last_of_section {
                if let Some(p) = s.path.last() {
                    points.push(p);
                }
            }
        }
        return points;
    }

    /// Total length (in metres) of toll road segments.
    pub fn toll_road_distance(&self) -> f64 {
        self.segments
            .iter()
            .filter(|s| s.toll)
            .map(|s| s.distance)
            .sum()
    }

    /// Appends another route, renumbering its sections to follow this route's sections.
    pub fn append(&mut self, other: &Route) {
        if other.is_empty() {
            return;
        }

        let shift = self.max_section().map_or(0, |s| s + 1);
        if self.is_empty() {
            self.path_to_junction_before = other.path_to_junction_before.clone();
        }

        for s in &other.segments {
            let mut s = s.clone();
            s.section += shift;
            self.push_segment(s);
        }
        self.path_to_junction_after = other.path_to_junction_after.clone();
    }

    /// Returns a copy of the route without any restricted segments.
    pub fn copy_without_restricted_segments(&self) -> Route {
        let mut r = Route::new(self.profile.clone(), self.point_scale);
        r.path_to_junction_before = self.path_to_junction_before.clone();
        r.path_to_junction_after = self.path_to_junction_after.clone();
        for s in self.segments.iter().filter(|s| !s.restricted) {
            r.push_segment(s.clone());
        }
        return r;
    }

    /// Reverses the route: segment order, geometry and sections are reversed,
    /// and every turn is re-derived as if the junction was passed the other way.
    ///
    /// Junction times are recomputed from the profile; traffic light times
    /// are not carried over, as the junction description doesn't record them.
    pub fn reverse(&mut self) {
        let n = self.segments.len();
        if n == 0 {
            return;
        }

        let max_section = self.max_section().unwrap_or(0);
        let old = std::mem::take(&mut self.segments);
        let old_turns: Vec<Turn> = old.iter().map(|s| s.turn.clone()).collect();

        for (j, mut s) in old.into_iter().rev().enumerate() {
            let travel = s.travel_time();
            s.path.reverse();
            s.section = max_section - s.section;

            // New segment j is entered through the junction which used to start
            // old segment n - j.
            s.turn = if j == 0 {
                Turn::default()
            } else {
                reversed_turn(&old_turns[n - j])
            };
            s.turn_time = if j == 0 {
                0.0
            } else {
                self.profile.junction_time(&s.turn, false, false)
            };
            s.time = travel + s.turn_time;
            self.segments.push(s);
        }

        std::mem::swap(&mut self.path_to_junction_before, &mut self.path_to_junction_after);
        self.path_to_junction_before.reverse();
        self.path_to_junction_after.reverse();
        self.recompute_totals();
    }

    /// Iterates over segments together with the distance and time at their start.
    fn segments_with_offsets(&self) -> impl Iterator<Item = (usize, &RouteSegment, f64, f64)> {
        self.segments
            .iter()
            .enumerate()
            .scan((0.0, 0.0), |acc, (i, s)| {
                let (d0, t0) = *acc;
                acc.0 += s.distance;
                acc.1 += s.time;
                Some((i, s, d0, t0))
            })
    }

    /// Describes the point a given fraction of the way along a segment.
    #[allow(clippy::too_many_arguments)]
    fn info_at(
        &self,
        index: usize,
        segment: &RouteSegment,
        d0: f64,
        t0: f64,
        fraction: f64,
        time_along_segment: f64,
        point: Point,
        line_index: usize,
    ) -> NearestSegmentInfo {
        let distance_along_segment = fraction * segment.distance;
        NearestSegmentInfo {
            segment_index: index,
            line_index,
            nearest_point: point,
            distance_to_route: 0.0,
            distance_along_route: d0 + distance_along_segment,
            distance_along_segment,
            time_along_route: t0 + time_along_segment,
            time_along_segment,
            heading: segment
                .path
                .line_direction(line_index)
                .or_else(|| segment.path.direction_at_start())
                .unwrap_or(0.0),
        }
    }

    /// Time along a segment corresponding to a fraction of its length;
    /// the junction at its start is passed as soon as the segment is entered.
    fn time_at_fraction(segment: &RouteSegment, fraction: f64) -> f64 {
        if fraction > 0.0 {
            segment.turn_time.min(segment.time) + fraction * segment.travel_time()
        } else {
            0.0
        }
    }

    /// Finds the position on the route nearest to `point`.
    ///
    /// Segments in sections before `section` are never considered. If
    /// `previous_distance` (in metres along the route) is positive, positions
    /// behind it are penalized, so that the match progresses along routes
    /// doubling back on themselves.
    pub fn nearest_segment(
        &self,
        point: Point,
        section: Option<i32>,
        previous_distance: f64,
    ) -> Option<NearestSegmentInfo> {
        let mut best: Option<(f64, NearestSegmentInfo)> = None;

        for (i, s, d0, t0) in self.segments_with_offsets() {
            if section.is_some_and(|min| s.section < min) {
                continue;
            }
            let Some(NearestPoint {
                point: nearest,
                line_index,
                distance_along,
                distance,
            }) = s.path.nearest_point(point)
            else {
                continue;
            };

            let length = s.path.length();
            let fraction = if length > 0.0 {
                (distance_along / length).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let mut info = self.info_at(
                i,
                s,
                d0,
                t0,
                fraction,
                Self::time_at_fraction(s, fraction),
                nearest,
                line_index,
            );
            info.distance_to_route = distance * self.point_scale;

            let mut score = info.distance_to_route;
            if previous_distance > 0.0
                && info.distance_along_route < previous_distance - BACKWARD_MATCH_PENALTY
            {
                score += BACKWARD_MATCH_PENALTY;
            }

            let better = match &best {
                None => true,
                Some((best_score, b)) => {
                    score < *best_score
                        || (score == *best_score
                            && (info.distance_along_route - previous_distance).abs()
                                < (b.distance_along_route - previous_distance).abs())
                }
            };
            if better {
                best = Some((score, info));
            }
        }

        best.map(|(_, info)| info)
    }

    /// Returns the position a given distance (in metres) along the route,
    /// clamped to the route's extent.
    pub fn point_at_distance(&self, distance: f64) -> Option<NearestSegmentInfo> {
        let last = self.segments.len().checked_sub(1)?;
        let distance = if distance.is_nan() { 0.0 } else { distance.max(0.0) };

        for (i, s, d0, t0) in self.segments_with_offsets() {
            if distance <= d0 + s.distance || i == last {
                let fraction = if s.distance > 0.0 {
                    ((distance - d0) / s.distance).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let (point, line) = s.path.point_at_distance(fraction * s.path.length())?;
                return Some(self.info_at(
                    i,
                    s,
                    d0,
                    t0,
                    fraction,
                    Self::time_at_fraction(s, fraction),
                    point,
                    line,
                ));
            }
        }

        return None;
    }

    /// Returns the position reached a given time (in seconds) after starting the route,
    /// clamped to the route's extent.
    pub fn point_at_time(&self, time: f64) -> Option<NearestSegmentInfo> {
        let last = self.segments.len().checked_sub(1)?;
        let time = if time.is_nan() { 0.0 } else { time.max(0.0) };

        for (i, s, d0, t0) in self.segments_with_offsets() {
            if time <= t0 + s.time || i == last {
                let time_along_segment = (time - t0).clamp(0.0, s.time);
                let travel = s.travel_time();
                let fraction = if travel > 0.0 {
                    ((time_along_segment - s.turn_time) / travel).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let (point, line) = s.path.point_at_distance(fraction * s.path.length())?;
                return Some(self.info_at(
                    i,
                    s,
                    d0,
                    t0,
                    fraction,
                    time_along_segment,
                    point,
                    line,
                ));
            }
        }

        return None;
    }
}

/// Describes the junction at the start of a segment as passed in the opposite direction.
fn reversed_turn(t: &Turn) -> Turn {
    let mut r = Turn {
        roundabout: t.roundabout.reversed(),
        exit_number: t.exit_number,
        is_continue: t.is_continue,
        junction_name: t.junction_name.clone(),
        junction_ref: t.junction_ref.clone(),
        ..Default::default()
    };

    match t.turn_type {
        TurnType::None => {}
        TurnType::Around => {
            r.set(
                wrap_degrees(t.out_direction + 180.0),
                wrap_degrees(t.in_direction + 180.0),
                t.choices,
                t.right_alternatives,
                t.left_alternatives,
                t.is_fork,
                false,
            );
            r.turn_type = TurnType::Around;
        }
        _ => r.set(
            wrap_degrees(t.out_direction + 180.0),
            wrap_degrees(t.in_direction + 180.0),
            t.choices,
            t.right_alternatives,
            t.left_alternatives,
            t.is_fork,
            false,
        ),
    }
    return r;
}
