// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::geometry::Point;
use crate::instructions::Instructions;
use crate::profile::{Profile, RoadType};
use crate::route::{NearestSegmentInfo, Route, RouteSegment};
use crate::turn::{RoundaboutState, Turn, TurnFamily, TurnType};

/// A second turn is only reported if it comes this close (in metres) after the first.
pub const SECOND_TURN_DISTANCE: f64 = 100.0;

/// An upcoming turn, as presented to the traveller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavigatorTurn {
    pub turn: Turn,

    /// Distance to the turn in metres. For the first turn and the continuation
    /// this is measured from the current position; for the second turn,
    /// from the first turn.
    pub distance: f64,

    /// Travel time to the turn in seconds, measured like [NavigatorTurn::distance].
    pub time: f64,

    pub from_name: String,
    pub from_ref: String,
    pub from_road_type: RoadType,
    pub to_name: String,
    pub to_ref: String,
    pub to_road_type: RoadType,

    /// Position of the junction in map units.
    pub position: Point,

    /// Set if this is the end of the route rather than a junction.
    pub arrival: bool,

    /// Text created by [NavigatorTurn::create_instructions].
    pub instructions: Option<String>,
}

impl NavigatorTurn {
    /// Describes the junction between two consecutive segments,
    /// or the end of the route if `to` is [None].
    pub fn new(from: &RouteSegment, to: Option<&RouteSegment>, distance: f64, time: f64) -> Self {
        let mut t = Self {
            distance,
            time,
            from_name: from.name.clone(),
            from_ref: from.ref_.clone(),
            from_road_type: from.road_type,
            position: from.path.last().unwrap_or_default(),
            ..Default::default()
        };

        match to {
            Some(s) => {
                t.turn = s.turn.clone();
                t.to_name = s.name.clone();
                t.to_ref = s.ref_.clone();
                t.to_road_type = s.road_type;
            }
            None => t.arrival = true,
        }

        return t;
    }

    /// Checks whether `next`, which follows `next.distance` metres after this turn,
    /// should be presented together with this turn as a single manoeuvre.
    ///
    /// Only two left (or two right) turns outside roundabouts, closer than
    /// [Profile::turn_merge_distance], are merged.
    pub fn can_merge(&self, next: &NavigatorTurn, profile: &Profile) -> bool {
        let family = self.turn.turn_type.family();
        !self.arrival
            && !next.arrival
            && next.distance < profile.turn_merge_distance()
            && matches!(family, TurnFamily::Left | TurnFamily::Right)
            && family == next.turn.turn_type.family()
            && self.turn.roundabout == RoundaboutState::None
            && next.turn.roundabout == RoundaboutState::None
    }

    /// Absorbs the following turn: distances and times are summed, the more
    /// significant category (with its angle) is kept, and the destination road
    /// is taken from `next`. The position stays at this turn's junction.
    pub fn merge(&mut self, next: &NavigatorTurn) {
        self.distance += next.distance;
        self.time += next.time;

        if next.turn.turn_type.significance() > self.turn.turn_type.significance() {
            self.turn.turn_type = next.turn.turn_type;
            self.turn.angle = next.turn.angle;
        }
        self.turn.out_direction = next.turn.out_direction;
        self.turn.is_continue = false;

        self.to_name = next.to_name.clone();
        self.to_ref = next.to_ref.clone();
        self.to_road_type = next.to_road_type;
        self.instructions = None;
    }

    /// Merges `next` into this turn if [NavigatorTurn::can_merge] allows it.
    pub fn merge_if_possible(&mut self, next: &NavigatorTurn, profile: &Profile) -> bool {
        if self.can_merge(next, profile) {
            self.merge(next);
            true
        } else {
            false
        }
    }

    /// Returns the instructions for this turn, rendering them on first use.
    pub fn create_instructions(
        &mut self,
        instructions: &dyn Instructions,
        profile: &Profile,
        locale: &str,
        metric_units: bool,
        abbreviate: bool,
    ) -> &str {
        if self.instructions.is_none() {
            self.instructions = Some(instructions.render(
                self,
                profile,
                locale,
                metric_units,
                abbreviate,
            ));
        }
        self.instructions.as_deref().unwrap_or_default()
    }

    fn is_announced(&self) -> bool {
        self.arrival || self.turn.turn_type.is_significant()
    }
}

/// The turns presented while navigating.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct TurnWindow {
    pub(crate) first: NavigatorTurn,
    pub(crate) second: Option<NavigatorTurn>,
    pub(crate) continuation: Option<NavigatorTurn>,
}

impl TurnWindow {
    /// Finds the turns ahead of a position on a route.
    ///
    /// The first turn is the first significant one, or the arrival if none remains.
    /// The second turn is only set if it follows within [SECOND_TURN_DISTANCE] of the
    /// first, and the continuation only if a straight-on junction precedes the first turn.
    pub(crate) fn ahead(route: &Route, at: &NearestSegmentInfo) -> Option<Self> {
        let segments = &route.segments;
        let current = segments.get(at.segment_index)?;
        let last = segments.last()?;

        // Raw turns, each with the distance and time from the previous one
        let mut gap_distance = (current.distance - at.distance_along_segment).max(0.0);
        let mut gap_time = (current.time - at.time_along_segment).max(0.0);
        let mut merged: Vec<NavigatorTurn> = Vec::default();
        for i in at.segment_index + 1..segments.len() {
            let t = NavigatorTurn::new(&segments[i - 1], Some(&segments[i]), gap_distance, gap_time);
            push_merged(&mut merged, t, &route.profile);
            gap_distance = segments[i].distance;
            gap_time = segments[i].time;
        }
        push_merged(
            &mut merged,
            NavigatorTurn::new(last, None, gap_distance, gap_time),
            &route.profile,
        );

        // Measure from the current position
        let (mut distance, mut time) = (0.0, 0.0);
        for t in merged.iter_mut() {
            distance += t.distance;
            time += t.time;
            t.distance = distance;
            t.time = time;
        }

        let first_index = merged
            .iter()
            .position(|t| t.is_announced())
            .unwrap_or(merged.len() - 1);
        let first = merged.get(first_index)?.clone();

        let second = merged[first_index + 1..]
            .iter()
            .find(|t| t.is_announced())
            .filter(|t| t.distance - first.distance <= SECOND_TURN_DISTANCE)
            .map(|t| NavigatorTurn {
                distance: t.distance - first.distance,
                time: t.time - first.time,
                ..t.clone()
            });

        let continuation = merged[..first_index].first().cloned();

        return Some(Self {
            first,
            second,
            continuation,
        });
    }

    /// Presents the end of the route as the first turn.
    pub(crate) fn arrival(route: &Route, at: &NearestSegmentInfo) -> Option<Self> {
        let last = route.segments.last()?;
        let first = NavigatorTurn::new(
            last,
            None,
            (route.distance - at.distance_along_route).max(0.0),
            (route.time - at.time_along_route).max(0.0),
        );
        return Some(Self {
            first,
            ..Default::default()
        });
    }

    /// Presents a U-turn at `position` as the first turn, for a traveller
    /// heading along `course` while the route goes the other way.
    pub(crate) fn turn_round(
        route: &Route,
        at: &NearestSegmentInfo,
        position: Point,
        course: f64,
    ) -> Option<Self> {
        let current = route.segments.get(at.segment_index)?;
        let mut first = NavigatorTurn::new(current, Some(current), 0.0, 0.0);
        first.position = position;
        first.turn = Turn {
            turn_type: TurnType::Around,
            angle: 180.0,
            in_direction: course,
            out_direction: at.heading,
            ..Default::default()
        };
        return Some(Self {
            first,
            ..Default::default()
        });
    }
}

fn push_merged(merged: &mut Vec<NavigatorTurn>, t: NavigatorTurn, profile: &Profile) {
    if let Some(previous) = merged.last_mut() {
        if previous.merge_if_possible(&t, profile) {
            return;
        }
    }
    merged.push(t);
}
