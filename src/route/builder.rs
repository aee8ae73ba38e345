// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use log::{debug, warn};

use super::{Route, RouteSegment};
use crate::profile::Profile;
use crate::router::{RawEdge, RawRoute};
use crate::turn::{RoundaboutState, Turn, TurnType, U_TURN_ANGLE};
use crate::Error;

/// Converts the raw output of a [Router](crate::Router) into a [Route],
/// classifying every junction and timing every segment.
///
/// Consecutive edges of the same road (same type, name, ref, speed limit, toll and
/// restriction status, in the same section) joined without any turn are coalesced into
/// a single [RouteSegment], as are consecutive edges around a roundabout. Roundabout
/// exits passed are counted to fill [Turn::exit_number].
pub struct RouteBuilder<'a> {
    profile: Profile,
    route: Route,
    edges: &'a [RawEdge],
    previous: Option<&'a RawEdge>,
    roundabout_entry: Option<usize>,
    roundabout_exits: i32,
}

impl<'a> RouteBuilder<'a> {
    /// Builds a [Route] out of a [RawRoute] using the provided [Profile].
    pub fn build(profile: &Profile, raw: &'a RawRoute) -> Result<Route, Error> {
        let profile = profile.normalized();
        if raw.edges.is_empty() {
            debug!("no edges to build a route from");
            return Err(Error::NoRoute);
        }
        if !profile.accepts_any_road() {
            warn!("profile {:?} does not accept any roads", profile.name);
            return Err(Error::NoRoute);
        }

        let point_scale = if raw.point_scale > 0.0 && raw.point_scale.is_finite() {
            raw.point_scale
        } else {
            1.0
        };

        let mut b = Self {
            route: Route::new(profile.clone(), point_scale),
            profile,
            edges: &raw.edges,
            previous: None,
            roundabout_entry: None,
            roundabout_exits: 0,
        };

        for i in 0..raw.edges.len() {
            b.add_edge(i)?;
        }

        b.route.path_to_junction_before = raw.path_to_junction_before.clone();
        b.route.path_to_junction_after = raw.path_to_junction_after.clone();
        b.route.recompute_totals();
        debug!(
            "built a route of {} segments ({:.0} m, {:.0} s) from {} edges",
            b.route.segments.len(),
            b.route.distance,
            b.route.time,
            raw.edges.len(),
        );
        Ok(b.route)
    }

    fn add_edge(&mut self, i: usize) -> Result<(), Error> {
        let edges = self.edges;
        let edge = &edges[i];
        let at_end = i == 0 || i + 1 == edges.len();

        let usable = if at_end {
            self.profile.is_usable_at_end(edge.road_type)
        } else {
            self.profile.is_usable(edge.road_type)
        };
        if !usable {
            warn!(
                "edge {} on {} road {:?} is not usable by profile {:?}",
                i, edge.road_type, edge.name, self.profile.name
            );
            return Err(Error::NoRoute);
        }

        let restricted = self.profile.is_restricted(edge.road_type, edge.access);
        if restricted && !at_end {
            debug!("edge {} on {:?} is restricted in the middle of a route", i, edge.name);
        }

        let distance = if edge.distance > 0.0 {
            edge.distance
        } else {
            edge.path.length() * self.route.point_scale
        };
        let speed = self
            .profile
            .speed_kph(edge.road_type, edge.gradient, edge.max_speed_kph);
        let travel_time = distance / (speed / 3.6);

        let Some(previous) = self.previous else {
            self.start_segment(edge, Turn::default(), distance, travel_time, 0.0, restricted);
            if edge.roundabout {
                self.roundabout_entry = Some(0);
                self.roundabout_exits = 0;
            }
            self.previous = Some(edge);
            return Ok(());
        };

        let turn = self.classify_junction(previous, edge);
        let junction_time =
            self.profile
                .junction_time(&turn, edge.drive_on_left, edge.junction.traffic_light);

        match turn.roundabout {
            RoundaboutState::Continue if edge.junction.choices > 1 => self.roundabout_exits += 1,
            RoundaboutState::Exit => self.roundabout_exits += 1,
            _ => {}
        }

        let coalesce = self.route.segments.last().is_some_and(|last| {
            last.road_type == edge.road_type
                && last.name == edge.name
                && last.ref_ == edge.ref_
                && last.max_speed_kph == edge.max_speed_kph
                && last.restricted == restricted
                && last.toll == edge.toll
                && last.section == edge.section
                && (turn.roundabout == RoundaboutState::Continue
                    || (turn.roundabout == RoundaboutState::None
                        && turn.turn_type == TurnType::Ahead
                        && junction_time == 0.0))
        });

        if coalesce {
            if let Some(last) = self.route.segments.last_mut() {
                last.path.append(&edge.path);
                last.distance += distance;
                // Waits inside a roundabout count as junction time, not travel
                last.time += travel_time + junction_time;
                last.turn_time += junction_time;
            }
        } else {
            let is_exit = turn.roundabout == RoundaboutState::Exit;
            let is_enter = turn.roundabout == RoundaboutState::Enter;
            self.start_segment(edge, turn, distance, travel_time, junction_time, restricted);
            let index = self.route.segments.len() - 1;

            if is_enter {
                self.roundabout_entry = Some(index);
                self.roundabout_exits = 0;
            } else if is_exit {
                self.finish_roundabout(index);
            }
        }

        self.previous = Some(edge);
        Ok(())
    }

    fn start_segment(
        &mut self,
        edge: &RawEdge,
        turn: Turn,
        distance: f64,
        travel_time: f64,
        junction_time: f64,
        restricted: bool,
    ) {
        self.route.segments.push(RouteSegment {
            road_type: edge.road_type,
            max_speed_kph: edge.max_speed_kph,
            name: edge.name.clone(),
            ref_: edge.ref_.clone(),
            distance,
            time: travel_time + junction_time,
            turn_time: junction_time,
            path: edge.path.clone(),
            section: edge.section,
            turn,
            restricted,
            toll: edge.toll,
        });
    }

    /// Stores the number of exits passed on the roundabout's entry and exit turns.
    fn finish_roundabout(&mut self, exit_index: usize) {
        let exits = self.roundabout_exits;
        self.route.segments[exit_index].turn.exit_number = exits;
        if let Some(entry) = self.roundabout_entry.take() {
            self.route.segments[entry].turn.exit_number = exits;
        }
        self.roundabout_exits = 0;
    }

    /// Describes the junction between two consecutive edges.
    fn classify_junction(&self, previous: &RawEdge, edge: &RawEdge) -> Turn {
        let j = &edge.junction;
        let mut turn = Turn {
            junction_name: j.name.clone(),
            junction_ref: j.ref_.clone(),
            ..Default::default()
        };

        match (previous.path.direction_at_end(), edge.path.direction_at_start()) {
            (Some(in_dir), Some(out_dir)) => turn.set(
                in_dir,
                out_dir,
                j.choices,
                j.left_alternatives,
                j.right_alternatives,
                j.is_fork,
                j.is_turn_off,
            ),
            _ => turn.set_angle(f64::NAN),
        }

        let same_road = previous.road_type == edge.road_type
            && previous.name == edge.name
            && previous.ref_ == edge.ref_;

        if same_road && turn.angle.abs() >= U_TURN_ANGLE {
            turn.turn_type = TurnType::Around;
        }

        turn.roundabout = match (previous.roundabout, edge.roundabout) {
            (false, true) => RoundaboutState::Enter,
            (true, true) => RoundaboutState::Continue,
            (true, false) => RoundaboutState::Exit,
            (false, false) => RoundaboutState::None,
        };

        turn.is_continue = same_road && !turn.turn_type.is_significant();
        return turn;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Path, Point};
    use crate::profile::{AccessFlags, Gradient, RoadType};
    use crate::router::Junction;
    use crate::ProfileType;

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

    fn edge(points: &[(f64, f64)], road_type: RoadType, name: &str) -> RawEdge {
        RawEdge {
            path: points
                .iter()
                .map(|&(x, y)| Point::new(x, y))
                .collect::<Path>(),
            road_type,
            name: name.to_string(),
            junction: Junction {
                choices: 2,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn raw(edges: Vec<RawEdge>) -> RawRoute {
        RawRoute {
            edges,
            ..Default::default()
        }
    }

    fn fixed_speed_profile(speed: f64) -> Profile {
        let mut p = Profile::default();
        for rt in RoadType::ALL {
            p.set_speed(rt, speed, 0.0);
        }
        return p;
    }

    #[test]
    fn single_segment_time() {
        let p = fixed_speed_profile(90.0);
        let r = RouteBuilder::build(
            &p,
            &raw(vec![edge(&[(0.0, 0.0), (9000.0, 0.0)], RoadType::Motorway, "")]),
        )
        .unwrap();

        assert_eq!(r.segments.len(), 1);
        assert_almost_eq!(r.distance, 9000.0);
        assert_almost_eq!(r.time, 360.0);
        assert_eq!(r.segments[0].turn.turn_type, TurnType::None);
    }

    #[test]
    fn explicit_distance_and_point_scale() {
        let p = fixed_speed_profile(36.0);
        let mut e = edge(&[(0.0, 0.0), (10.0, 0.0)], RoadType::PrimaryRoad, "");
        let mut rr = raw(vec![e.clone()]);
        rr.point_scale = 2.0;
        let r = RouteBuilder::build(&p, &rr).unwrap();
        assert_almost_eq!(r.distance, 20.0);
        assert_almost_eq!(r.time, 2.0);

        e.distance = 50.0;
        let r = RouteBuilder::build(&p, &raw(vec![e])).unwrap();
        assert_almost_eq!(r.distance, 50.0);
    }

    #[test]
    fn max_speed_caps() {
        let p = fixed_speed_profile(90.0);
        let mut e = edge(&[(0.0, 0.0), (1000.0, 0.0)], RoadType::PrimaryRoad, "");
        e.max_speed_kph = 36.0;
        let r = RouteBuilder::build(&p, &raw(vec![e])).unwrap();
        assert_almost_eq!(r.time, 100.0);
    }

    #[test]
    fn gradient_slows_down() {
        let mut p = fixed_speed_profile(36.0);
        p.gradient_speed[Gradient::Up2.index()] = -18.0;
        let mut e = edge(&[(0.0, 0.0), (100.0, 0.0)], RoadType::PrimaryRoad, "");
        e.gradient = Gradient::Up2;
        let r = RouteBuilder::build(&p, &raw(vec![e])).unwrap();
        assert_almost_eq!(r.time, 20.0);
    }

    #[test]
    fn coalesces_same_road() {
        let p = fixed_speed_profile(36.0);
        let r = RouteBuilder::build(
            &p,
            &raw(vec![
                edge(&[(0.0, 0.0), (100.0, 0.0)], RoadType::ResidentialRoad, "Main"),
                edge(&[(100.0, 0.0), (200.0, 5.0)], RoadType::ResidentialRoad, "Main"),
                edge(&[(200.0, 5.0), (200.0, 105.0)], RoadType::ResidentialRoad, "Main"),
                edge(&[(200.0, 105.0), (300.0, 105.0)], RoadType::ResidentialRoad, "Side"),
            ]),
        )
        .unwrap();

        assert_eq!(r.segments.len(), 3);
        assert_eq!(r.segments[0].path.len(), 3);
        assert_eq!(r.segments[1].turn.turn_type, TurnType::Left);
        assert!(!r.segments[1].turn.is_continue);
        assert_eq!(r.segments[2].turn.turn_type, TurnType::Right);
        assert_eq!(r.segments[2].name, "Side");

        let expected_time: f64 = r.segments.iter().map(|s| s.time).sum();
        assert_almost_eq!(r.time, expected_time);
        assert_almost_eq!(r.segments[1].turn_time, p.cross_traffic_turn_time);
        assert_almost_eq!(r.segments[2].turn_time, p.turn_time);
    }

    #[test]
    fn ahead_on_another_road_is_a_new_segment() {
        let p = fixed_speed_profile(36.0);
        let r = RouteBuilder::build(
            &p,
            &raw(vec![
                edge(&[(0.0, 0.0), (100.0, 0.0)], RoadType::ResidentialRoad, "Main"),
                edge(&[(100.0, 0.0), (200.0, 0.0)], RoadType::ResidentialRoad, "High"),
            ]),
        )
        .unwrap();

        assert_eq!(r.segments.len(), 2);
        assert_eq!(r.segments[1].turn.turn_type, TurnType::Ahead);
        assert!(!r.segments[1].turn.is_continue);
        assert_almost_eq!(r.segments[1].turn_time, 0.0);
    }

    #[test]
    fn drive_on_left_cross_traffic() {
        let p = fixed_speed_profile(36.0);
        let mut second = edge(&[(100.0, 0.0), (100.0, -100.0)], RoadType::ResidentialRoad, "B");
        second.drive_on_left = true;
        let r = RouteBuilder::build(
            &p,
            &raw(vec![
                edge(&[(0.0, 0.0), (100.0, 0.0)], RoadType::ResidentialRoad, "A"),
                second,
            ]),
        )
        .unwrap();

        assert_eq!(r.segments[1].turn.turn_type, TurnType::Right);
        assert_almost_eq!(r.segments[1].turn_time, p.cross_traffic_turn_time);
    }

    #[test]
    fn traffic_light_time() {
        let p = fixed_speed_profile(36.0);
        let mut second = edge(&[(100.0, 0.0), (200.0, 0.0)], RoadType::ResidentialRoad, "B");
        second.junction.traffic_light = true;
        let r = RouteBuilder::build(
            &p,
            &raw(vec![
                edge(&[(0.0, 0.0), (100.0, 0.0)], RoadType::ResidentialRoad, "A"),
                second,
            ]),
        )
        .unwrap();
        assert_almost_eq!(r.segments[1].turn_time, p.traffic_light_time);
        assert_almost_eq!(r.time, 20.0 + p.traffic_light_time);
    }

    #[test]
    fn u_turn() {
        let p = fixed_speed_profile(36.0);
        let r = RouteBuilder::build(
            &p,
            &raw(vec![
                edge(&[(0.0, 0.0), (100.0, 0.0)], RoadType::ResidentialRoad, "A"),
                edge(&[(100.0, 0.0), (0.0, 0.0)], RoadType::ResidentialRoad, "A"),
            ]),
        )
        .unwrap();
        assert_eq!(r.segments[1].turn.turn_type, TurnType::Around);
        assert_almost_eq!(r.segments[1].turn_time, p.u_turn_time);

        // Sharp reversal onto another road is not a U-turn
        let r = RouteBuilder::build(
            &p,
            &raw(vec![
                edge(&[(0.0, 0.0), (100.0, 0.0)], RoadType::ResidentialRoad, "A"),
                edge(&[(100.0, 0.0), (0.0, 1.0)], RoadType::ResidentialRoad, "B"),
            ]),
        )
        .unwrap();
        assert_eq!(r.segments[1].turn.turn_type, TurnType::SharpLeft);
    }

    #[test]
    fn roundabout_exit_number() {
        let p = fixed_speed_profile(36.0);
        let ring = |points: &[(f64, f64)], choices: i32| {
            let mut e = edge(points, RoadType::SecondaryRoad, "");
            e.roundabout = true;
            e.junction.choices = choices;
            e
        };

        let edges = vec![
            edge(&[(-100.0, 0.0), (0.0, 0.0)], RoadType::SecondaryRoad, "In"),
            ring(&[(0.0, 0.0), (10.0, -10.0)], 2),
            ring(&[(10.0, -10.0), (20.0, 0.0)], 2), // passes exit 1
            ring(&[(20.0, 0.0), (10.0, 10.0)], 2),  // passes exit 2
            edge(&[(10.0, 10.0), (10.0, 100.0)], RoadType::SecondaryRoad, "Out"),
        ];
        let r = RouteBuilder::build(&p, &raw(edges)).unwrap();

        assert_eq!(r.segments.len(), 3);
        assert_eq!(r.segments[1].turn.roundabout, RoundaboutState::Enter);
        assert_eq!(r.segments[2].turn.roundabout, RoundaboutState::Exit);
        assert_eq!(r.segments[1].turn.exit_number, 3);
        assert_eq!(r.segments[2].turn.exit_number, 3);
        assert_eq!(r.segments[1].path.len(), 4);
        assert_almost_eq!(r.segments[1].travel_time(), r.segments[1].path.length() / 10.0);
    }

    #[test]
    fn traffic_light_on_straight_junction() {
        let mut p = fixed_speed_profile(36.0);
        p.traffic_light_time = 15.0;

        let mut second = edge(&[(100.0, 0.0), (200.0, 0.0)], RoadType::ResidentialRoad, "Main");
        second.junction.traffic_light = true;
        let edges = vec![
            edge(&[(0.0, 0.0), (100.0, 0.0)], RoadType::ResidentialRoad, "Main"),
            second,
        ];
        let mut r = RouteBuilder::build(&p, &raw(edges)).unwrap();

        assert_eq!(r.segments.len(), 2);
        assert_eq!(r.segments[1].turn.turn_type, TurnType::Ahead);
        assert_almost_eq!(r.segments[1].turn_time, 15.0);
        assert_almost_eq!(r.segments[1].travel_time(), 10.0);
        assert_almost_eq!(r.time, 35.0);

        // waiting at the light
        let info = r.point_at_time(20.0).unwrap();
        assert_eq!(info.segment_index, 1);
        assert_eq!(info.nearest_point, Point::new(100.0, 0.0));

        r.reverse();
        assert_almost_eq!(r.segments[0].travel_time(), 10.0);
        assert_almost_eq!(r.segments[1].travel_time(), 10.0);
        assert_almost_eq!(r.time, 20.0);
    }

    #[test]
    fn empty_route() {
        let p = Profile::default();
        assert!(matches!(
            RouteBuilder::build(&p, &RawRoute::default()),
            Err(Error::NoRoute)
        ));
    }

    #[test]
    fn zero_speed_profile() {
        let p = fixed_speed_profile(0.0);
        let r = raw(vec![edge(&[(0.0, 0.0), (1.0, 0.0)], RoadType::PrimaryRoad, "")]);
        assert!(matches!(RouteBuilder::build(&p, &r), Err(Error::NoRoute)));
    }

    #[test]
    fn end_only_roads() {
        let p = Profile::new(ProfileType::Drive);
        let track = |pts: &[(f64, f64)]| edge(pts, RoadType::Track, "");
        let road = |pts: &[(f64, f64)]| edge(pts, RoadType::ResidentialRoad, "");

        let ok = raw(vec![
            track(&[(0.0, 0.0), (10.0, 0.0)]),
            road(&[(10.0, 0.0), (20.0, 0.0)]),
            track(&[(20.0, 0.0), (30.0, 0.0)]),
        ]);
        assert!(RouteBuilder::build(&p, &ok).is_ok());

        let bad = raw(vec![
            road(&[(0.0, 0.0), (10.0, 0.0)]),
            track(&[(10.0, 0.0), (20.0, 0.0)]),
            road(&[(20.0, 0.0), (30.0, 0.0)]),
        ]);
        assert!(matches!(RouteBuilder::build(&p, &bad), Err(Error::NoRoute)));
    }

    #[test]
    fn restricted_ends() {
        let p = fixed_speed_profile(36.0);
        let mut private = edge(&[(0.0, 0.0), (10.0, 0.0)], RoadType::ServiceRoad, "");
        private.access = AccessFlags::NO_MOTOR_VEHICLES;
        let r = RouteBuilder::build(
            &p,
            &raw(vec![
                private,
                edge(&[(10.0, 0.0), (20.0, 0.0)], RoadType::ResidentialRoad, ""),
            ]),
        )
        .unwrap();

        assert!(r.segments[0].restricted);
        assert!(!r.segments[1].restricted);
        assert_eq!(r.copy_without_restricted_segments().segments.len(), 1);
    }

    #[test]
    fn sections_are_kept_apart() {
        let p = fixed_speed_profile(36.0);
        let mut second = edge(&[(10.0, 0.0), (20.0, 0.0)], RoadType::ResidentialRoad, "A");
        second.section = 1;
        let r = RouteBuilder::build(
            &p,
            &raw(vec![
                edge(&[(0.0, 0.0), (10.0, 0.0)], RoadType::ResidentialRoad, "A"),
                second,
            ]),
        )
        .unwrap();
        assert_eq!(r.segments.len(), 2);
        assert_eq!(r.segments[1].section, 1);
    }
}
