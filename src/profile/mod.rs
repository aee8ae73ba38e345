// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Routing profiles: per-road-type speeds and preferences, junction costs
//! and the vehicle a route is made for.

mod road_type;
mod vehicle;
pub(crate) mod xml;

pub use road_type::{Gradient, RoadType};
pub use vehicle::{AccessFlags, VehicleType};

use crate::turn::{Turn, TurnType};

/// Slowest speed assumed on any usable road, in km/h.
pub const MIN_SPEED_KPH: f64 = 1.0;

/// Time (in seconds) of travel at the profile's top speed, below which two
/// consecutive turns are presented as a single manoeuvre.
pub const TURN_MERGE_TIME: f64 = 2.0;

/// Bounds (in metres) on [Profile::turn_merge_distance].
pub const MIN_TURN_MERGE_DISTANCE: f64 = 10.0;
pub const MAX_TURN_MERGE_DISTANCE: f64 = 50.0;

/// Road types (as bits of [Profile::gradient_flags]) on which gradients
/// don't affect the speed by default: steps and ferries.
pub const DEFAULT_GRADIENT_FLAGS: u32 = !((1 << RoadType::Steps as u32)
    | (1 << RoadType::VehicularFerry as u32)
    | (1 << RoadType::PassengerFerry as u32));

/// Preset kinds of [Profile].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProfileType {
    #[default]
    Drive,
    Walk,
    Cycle,
    Hike,
}

impl ProfileType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Drive => "drive",
            Self::Walk => "walk",
            Self::Cycle => "cycle",
            Self::Hike => "hike",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "drive" | "car" => Some(Self::Drive),
            "walk" | "foot" => Some(Self::Walk),
            "cycle" | "bicycle" => Some(Self::Cycle),
            "hike" => Some(Self::Hike),
            _ => None,
        }
    }
}

/// Describes how a route is costed and timed.
///
/// All road-type tables are indexed by [RoadType::index]; all gradient tables
/// by [Gradient::index].
///
/// A road type is usable when `speed + bonus > 0`. A road type with positive speed
/// whose bonus exactly cancels the speed out (`speed + bonus == 0`) may only be used
/// at the very start or end of a route, e.g. to leave a private driveway.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Human readable name, persisted but otherwise unused.
    pub name: String,

    pub vehicle: VehicleType,

    /// Travel speed in km/h.
    pub speed: [f64; RoadType::COUNT],

    /// Added to [Profile::speed] to express preference or avoidance of a road type.
    /// Bonuses are included in travel times.
    pub bonus: [f64; RoadType::COUNT],

    /// Access bits to ignore on roads of a given type, e.g. to allow a delivery
    /// vehicle onto pedestrian roads.
    pub restriction_override: [AccessFlags; RoadType::COUNT],

    /// Added to the speed of gradient-affected roads, in km/h.
    pub gradient_speed: [f64; Gradient::COUNT],

    /// Added to the bonus of gradient-affected roads, in km/h.
    pub gradient_bonus: [f64; Gradient::COUNT],

    /// Road types (bit `1 << RoadType::index`) on which gradients apply.
    pub gradient_flags: u32,

    /// Seconds spent on any turn other than a U-turn or a turn across traffic.
    pub turn_time: f64,

    /// Seconds spent on a U-turn.
    pub u_turn_time: f64,

    /// Seconds spent turning across oncoming traffic.
    pub cross_traffic_turn_time: f64,

    /// Seconds spent at a junction controlled by traffic lights.
    pub traffic_light_time: f64,

    /// Find the shortest route by distance, ignoring speeds and bonuses when ranking routes.
    pub shortest: bool,

    /// Find the fastest route by pure travel time, ignoring bonuses when ranking routes.
    pub shortest_by_time: bool,

    /// Avoidance of toll roads: 0 (no avoidance) to 1 (toll roads never used).
    pub toll_penalty: f64,
}

#[rustfmt::skip]
const DRIVE_SPEED: [f64; RoadType::COUNT] = [
    110.0, 60.0, 90.0, 50.0, 70.0, 50.0, 60.0, 45.0,  // motorway .. secondary_link
    50.0, 40.0, 30.0, 10.0, 20.0, 0.0, 10.0, 0.0,     // tertiary .. passenger_ferry
    10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 30.0, 10.0,        // living_street .. unpaved
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,           // other0 .. other7
];

#[rustfmt::skip]
const DRIVE_BONUS: [f64; RoadType::COUNT] = [
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, -10.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -5.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
];

#[rustfmt::skip]
const WALK_SPEED: [f64; RoadType::COUNT] = [
    0.0, 0.0, 0.0, 0.0, 5.0, 5.0, 5.0, 5.0,
    5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0,
    5.0, 5.0, 5.0, 5.0, 5.0, 4.0, 5.0, 5.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
];

#[rustfmt::skip]
const WALK_BONUS: [f64; RoadType::COUNT] = [
    0.0, 0.0, 0.0, 0.0, -1.0, -1.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
];

#[rustfmt::skip]
const CYCLE_SPEED: [f64; RoadType::COUNT] = [
    0.0, 0.0, 0.0, 0.0, 16.0, 16.0, 16.0, 16.0,
    16.0, 16.0, 16.0, 12.0, 14.0, 0.0, 10.0, 10.0,
    12.0, 18.0, 12.0, 0.0, 0.0, 0.0, 14.0, 12.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
];

#[rustfmt::skip]
const CYCLE_BONUS: [f64; RoadType::COUNT] = [
    0.0, 0.0, 0.0, 0.0, -4.0, -4.0, -2.0, -2.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
];

#[rustfmt::skip]
const HIKE_SPEED: [f64; RoadType::COUNT] = [
    0.0, 0.0, 0.0, 0.0, 5.0, 5.0, 5.0, 5.0,
    5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0,
    5.0, 5.0, 5.0, 5.0, 5.0, 3.0, 5.0, 5.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
];

#[rustfmt::skip]
const HIKE_BONUS: [f64; RoadType::COUNT] = [
    0.0, 0.0, 0.0, 0.0, -2.0, -2.0, -1.0, -1.0,
    -1.0, -1.0, -1.0, 1.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
];

const FLAT_GRADIENTS: [f64; Gradient::COUNT] = [0.0; Gradient::COUNT];
const WALK_GRADIENT_SPEED: [f64; Gradient::COUNT] = [0.0, -0.5, -1.0, -2.0, 0.0, 0.0, -0.5, -1.0];
const CYCLE_GRADIENT_SPEED: [f64; Gradient::COUNT] = [0.0, -2.0, -5.0, -8.0, 0.0, 2.0, 4.0, 0.0];
const HIKE_GRADIENT_SPEED: [f64; Gradient::COUNT] = [0.0, -1.0, -1.5, -2.5, 0.0, 0.0, -0.5, -1.0];

impl Default for Profile {
    fn default() -> Self {
        Self::new(ProfileType::Drive)
    }
}

impl Profile {
    /// Creates one of the preset profiles.
    pub fn new(profile_type: ProfileType) -> Self {
        let (access, speed, bonus, gradient_speed) = match profile_type {
            ProfileType::Drive => (
                AccessFlags::CAR | AccessFlags::WRONG_WAY,
                DRIVE_SPEED,
                DRIVE_BONUS,
                FLAT_GRADIENTS,
            ),
            ProfileType::Walk => (AccessFlags::PEDESTRIAN, WALK_SPEED, WALK_BONUS, WALK_GRADIENT_SPEED),
            ProfileType::Cycle => (
                AccessFlags::BICYCLE | AccessFlags::WRONG_WAY,
                CYCLE_SPEED,
                CYCLE_BONUS,
                CYCLE_GRADIENT_SPEED,
            ),
            ProfileType::Hike => (AccessFlags::PEDESTRIAN, HIKE_SPEED, HIKE_BONUS, HIKE_GRADIENT_SPEED),
        };

        Self {
            name: profile_type.name().to_string(),
            vehicle: VehicleType::with_access(access),
            speed,
            bonus,
            restriction_override: [AccessFlags::empty(); RoadType::COUNT],
            gradient_speed,
            gradient_bonus: FLAT_GRADIENTS,
            gradient_flags: DEFAULT_GRADIENT_FLAGS,
            turn_time: 4.0,
            u_turn_time: 300.0,
            cross_traffic_turn_time: 12.0,
            traffic_light_time: 10.0,
            shortest: false,
            shortest_by_time: false,
            toll_penalty: 0.0,
        }
    }

    /// Sets the speed and bonus for a road type.
    pub fn set_speed(&mut self, road_type: RoadType, speed: f64, bonus: f64) {
        self.speed[road_type.index()] = speed;
        self.bonus[road_type.index()] = bonus;
    }

    /// Clamps every numeric field into its domain.
    pub fn normalize(&mut self) {
        self.vehicle.normalize();

        for v in self.speed.iter_mut() {
            if !v.is_finite() || *v < 0.0 {
                *v = 0.0;
            }
        }

        for v in self
            .bonus
            .iter_mut()
            .chain(self.gradient_speed.iter_mut())
            .chain(self.gradient_bonus.iter_mut())
        {
            if !v.is_finite() {
                *v = 0.0;
            }
        }

        for v in [
            &mut self.turn_time,
            &mut self.u_turn_time,
            &mut self.cross_traffic_turn_time,
            &mut self.traffic_light_time,
        ] {
            if !v.is_finite() || *v < 0.0 {
                *v = 0.0;
            }
        }

        self.toll_penalty = if self.toll_penalty.is_nan() {
            0.0
        } else {
            self.toll_penalty.clamp(0.0, 1.0)
        };
    }

    /// Returns a normalized copy of this profile.
    pub fn normalized(&self) -> Self {
        let mut p = self.clone();
        p.normalize();
        return p;
    }

    /// Checks whether roads of a given type may be used anywhere along the route.
    pub fn is_usable(&self, road_type: RoadType) -> bool {
        let i = road_type.index();
        self.speed[i] + self.bonus[i] > 0.0
    }

    /// Checks whether roads of a given type may be used as the first or last edge of a route.
    pub fn is_usable_at_end(&self, road_type: RoadType) -> bool {
        let i = road_type.index();
        self.is_usable(road_type) || (self.speed[i] > 0.0 && self.speed[i] + self.bonus[i] == 0.0)
    }

    /// Returns false if no road type is usable, not even at the ends of a route.
    pub fn accepts_any_road(&self) -> bool {
        RoadType::ALL.iter().any(|&rt| self.is_usable_at_end(rt))
    }

    /// Checks whether a road of a given type with the given "no access" bits
    /// is restricted for [Profile::vehicle].
    pub fn is_restricted(&self, road_type: RoadType, access: AccessFlags) -> bool {
        let effective = access - self.restriction_override[road_type.index()];
        effective.intersects(self.vehicle.access)
    }

    /// Checks whether gradients affect speeds on roads of a given type.
    #[inline]
    pub fn gradient_applies(&self, road_type: RoadType) -> bool {
        self.gradient_flags & (1 << road_type.index()) != 0
    }

    /// Returns the preference of a road: speed plus bonus (including gradient adjustments),
    /// in km/h, without any speed limit applied. Used to rank alternative routes.
    pub fn preference_kph(&self, road_type: RoadType, gradient: Gradient) -> f64 {
        let i = road_type.index();
        let mut v = self.speed[i] + self.bonus[i];
        if self.gradient_applies(road_type) {
            let g = gradient.index();
            v += self.gradient_speed[g] + self.gradient_bonus[g];
        }
        return v;
    }

    /// Returns the speed (in km/h) used to compute travel times over a road.
    ///
    /// The speed includes the bonus and gradient adjustments, is capped by a known
    /// (positive) `max_speed_kph`, and is never lower than [MIN_SPEED_KPH].
    pub fn speed_kph(&self, road_type: RoadType, gradient: Gradient, max_speed_kph: f64) -> f64 {
        let mut v = self.preference_kph(road_type, gradient);
        if max_speed_kph > 0.0 && v > max_speed_kph {
            v = max_speed_kph;
        }
        return v.max(MIN_SPEED_KPH);
    }

    /// Returns the speed (in km/h) without any bonuses, used to rank routes
    /// when [Profile::shortest_by_time] is set.
    pub fn raw_speed_kph(&self, road_type: RoadType, gradient: Gradient, max_speed_kph: f64) -> f64 {
        let mut v = self.speed[road_type.index()];
        if self.gradient_applies(road_type) {
            v += self.gradient_speed[gradient.index()];
        }
        if max_speed_kph > 0.0 && v > max_speed_kph {
            v = max_speed_kph;
        }
        return v.max(MIN_SPEED_KPH);
    }

    /// Returns the highest speed (in km/h) reachable on any usable road, including
    /// favourable gradients.
    pub fn top_speed_kph(&self) -> f64 {
        let gradient_boost = (0..Gradient::COUNT)
            .map(|g| self.gradient_speed[g] + self.gradient_bonus[g].max(0.0))
            .fold(0.0_f64, f64::max);

        RoadType::ALL
            .iter()
            .filter(|&&rt| self.is_usable_at_end(rt))
            .map(|&rt| {
                let i = rt.index();
                let base = self.speed[i] + self.bonus[i].max(0.0);
                if self.gradient_applies(rt) {
                    base + gradient_boost
                } else {
                    base
                }
            })
            .fold(MIN_SPEED_KPH, f64::max)
    }

    /// Returns the time (in seconds) spent passing a junction with a given turn.
    pub fn junction_time(&self, turn: &Turn, drive_on_left: bool, traffic_light: bool) -> f64 {
        let manoeuvre = match turn.turn_type {
            TurnType::None | TurnType::Ahead => 0.0,
            TurnType::Around => self.u_turn_time,
            TurnType::Left | TurnType::SharpLeft if !drive_on_left => self.cross_traffic_turn_time,
            TurnType::Right | TurnType::SharpRight if drive_on_left => self.cross_traffic_turn_time,
            _ => self.turn_time,
        };

        if traffic_light {
            manoeuvre + self.traffic_light_time
        } else {
            manoeuvre
        }
    }

    /// Returns the distance (in metres) below which two consecutive turns are
    /// presented as a single manoeuvre: the distance covered in [TURN_MERGE_TIME]
    /// at [Profile::top_speed_kph], clamped to
    /// [MIN_TURN_MERGE_DISTANCE]..[MAX_TURN_MERGE_DISTANCE].
    pub fn turn_merge_distance(&self) -> f64 {
        let d = self.top_speed_kph() / 3.6 * TURN_MERGE_TIME;
        d.clamp(MIN_TURN_MERGE_DISTANCE, MAX_TURN_MERGE_DISTANCE)
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

    #[test]
    fn presets() {
        let drive = Profile::new(ProfileType::Drive);
        assert!(drive.is_usable(RoadType::Motorway));
        assert!(!drive.is_usable(RoadType::Footway));
        assert!(!drive.is_usable(RoadType::Track));
        assert!(drive.is_usable_at_end(RoadType::Track));
        assert!(drive.vehicle.obeys_one_way());

        let walk = Profile::new(ProfileType::Walk);
        assert!(!walk.is_usable(RoadType::Motorway));
        assert!(walk.is_usable(RoadType::Footway));
        assert!(!walk.vehicle.obeys_one_way());

        let cycle = Profile::new(ProfileType::Cycle);
        assert!(cycle.is_usable(RoadType::Cycleway));
        assert!(!cycle.is_usable(RoadType::Footway));

        assert_eq!(Profile::default(), drive);
        assert_eq!(ProfileType::from_name("hike"), Some(ProfileType::Hike));
    }

    #[test]
    fn all_zero_accepts_nothing() {
        let mut p = Profile::default();
        p.speed = [0.0; RoadType::COUNT];
        assert!(!p.accepts_any_road());
    }

    #[test]
    fn speed() {
        let mut p = Profile::default();
        p.set_speed(RoadType::PrimaryRoad, 70.0, 5.0);
        assert_almost_eq!(p.speed_kph(RoadType::PrimaryRoad, Gradient::Up0, 0.0), 75.0);
        assert_almost_eq!(p.speed_kph(RoadType::PrimaryRoad, Gradient::Up0, 50.0), 50.0);
        assert_almost_eq!(p.raw_speed_kph(RoadType::PrimaryRoad, Gradient::Up0, 0.0), 70.0);

        // unusable-in-the-middle roads still get a minimal speed
        assert_almost_eq!(p.speed_kph(RoadType::Track, Gradient::Up0, 0.0), MIN_SPEED_KPH);
    }

    #[test]
    fn gradient_speed() {
        let p = Profile::new(ProfileType::Cycle);
        assert_almost_eq!(p.speed_kph(RoadType::ResidentialRoad, Gradient::Up2, 0.0), 11.0);
        assert_almost_eq!(p.speed_kph(RoadType::ResidentialRoad, Gradient::Down1, 0.0), 18.0);
        // ferries ignore gradients
        assert_almost_eq!(p.speed_kph(RoadType::VehicularFerry, Gradient::Up3, 0.0), 10.0);
    }

    #[test]
    fn restrictions() {
        let mut p = Profile::default();
        assert!(p.is_restricted(RoadType::ResidentialRoad, AccessFlags::CAR));
        assert!(p.is_restricted(RoadType::ResidentialRoad, AccessFlags::WRONG_WAY));
        assert!(!p.is_restricted(RoadType::ResidentialRoad, AccessFlags::BICYCLE));
        assert!(!p.is_restricted(RoadType::ResidentialRoad, AccessFlags::empty()));

        p.restriction_override[RoadType::ServiceRoad.index()] = AccessFlags::CAR;
        assert!(!p.is_restricted(RoadType::ServiceRoad, AccessFlags::CAR));
        assert!(p.is_restricted(RoadType::ResidentialRoad, AccessFlags::CAR));

        let walk = Profile::new(ProfileType::Walk);
        assert!(!walk.is_restricted(RoadType::ResidentialRoad, AccessFlags::WRONG_WAY));
        assert!(walk.is_restricted(RoadType::Cycleway, AccessFlags::BICYCLE_ONLY));
    }

    #[test]
    fn normalize() {
        let mut p = Profile::default();
        p.toll_penalty = 3.0;
        p.turn_time = -1.0;
        p.speed[0] = f64::INFINITY;
        p.bonus[1] = f64::NAN;
        p.vehicle.weight = 7.5;
        p.normalize();

        assert_eq!(p.toll_penalty, 1.0);
        assert_eq!(p.turn_time, 0.0);
        assert_eq!(p.speed[0], 0.0);
        assert_eq!(p.bonus[1], 0.0);
        assert!(p.vehicle.access.contains(AccessFlags::OTHER));
    }

    #[test]
    fn junction_time() {
        let p = Profile::default();
        let mut t = Turn::default();

        t.turn_type = TurnType::Ahead;
        assert_almost_eq!(p.junction_time(&t, false, false), 0.0);
        assert_almost_eq!(p.junction_time(&t, false, true), 10.0);

        t.turn_type = TurnType::Left;
        assert_almost_eq!(p.junction_time(&t, false, false), 12.0);
        assert_almost_eq!(p.junction_time(&t, true, false), 4.0);

        t.turn_type = TurnType::SharpRight;
        assert_almost_eq!(p.junction_time(&t, true, false), 12.0);

        t.turn_type = TurnType::BearLeft;
        assert_almost_eq!(p.junction_time(&t, false, false), 4.0);

        t.turn_type = TurnType::Around;
        assert_almost_eq!(p.junction_time(&t, false, true), 310.0);
    }

    #[test]
    fn turn_merge_distance() {
        assert_almost_eq!(Profile::new(ProfileType::Drive).turn_merge_distance(), 50.0);
        assert_almost_eq!(Profile::new(ProfileType::Walk).turn_merge_distance(), 10.0);

        let cycle = Profile::new(ProfileType::Cycle);
        // 18 km/h cycleway + 4 km/h downhill
        assert_almost_eq!(cycle.turn_merge_distance(), 22.0 / 3.6 * 2.0);
    }
}
