// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fmt;

/// Functional class of a road, used to index the per-road-type tables of a
/// [Profile](crate::Profile).
///
/// The declaration order doubles as the road's status: a lower index is a more
/// important road. Leaving a road for a less important one is a "turn off".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum RoadType {
    Motorway = 0,
    MotorwayLink,
    TrunkRoad,
    TrunkRoadLink,
    PrimaryRoad,
    PrimaryRoadLink,
    SecondaryRoad,
    SecondaryRoadLink,
    TertiaryRoad,
    UnclassifiedRoad,
    ResidentialRoad,
    Track,
    ServiceRoad,
    PedestrianRoad,
    VehicularFerry,
    PassengerFerry,
    LivingStreet,
    Cycleway,
    Path,
    Footway,
    Bridleway,
    Steps,
    #[default]
    Unknown,
    UnpavedRoad,
    Other0,
    Other1,
    Other2,
    Other3,
    Other4,
    Other5,
    Other6,
    Other7,
}

impl RoadType {
    /// Number of distinct road types, and the length of the per-road-type tables.
    pub const COUNT: usize = 32;

    pub const ALL: [RoadType; Self::COUNT] = [
        Self::Motorway,
        Self::MotorwayLink,
        Self::TrunkRoad,
        Self::TrunkRoadLink,
        Self::PrimaryRoad,
        Self::PrimaryRoadLink,
        Self::SecondaryRoad,
        Self::SecondaryRoadLink,
        Self::TertiaryRoad,
        Self::UnclassifiedRoad,
        Self::ResidentialRoad,
        Self::Track,
        Self::ServiceRoad,
        Self::PedestrianRoad,
        Self::VehicularFerry,
        Self::PassengerFerry,
        Self::LivingStreet,
        Self::Cycleway,
        Self::Path,
        Self::Footway,
        Self::Bridleway,
        Self::Steps,
        Self::Unknown,
        Self::UnpavedRoad,
        Self::Other0,
        Self::Other1,
        Self::Other2,
        Self::Other3,
        Self::Other4,
        Self::Other5,
        Self::Other6,
        Self::Other7,
    ];

    const NAMES: [&'static str; Self::COUNT] = [
        "motorway",
        "motorway_link",
        "trunk",
        "trunk_link",
        "primary",
        "primary_link",
        "secondary",
        "secondary_link",
        "tertiary",
        "unclassified",
        "residential",
        "track",
        "service",
        "pedestrian",
        "vehicular_ferry",
        "passenger_ferry",
        "living_street",
        "cycleway",
        "path",
        "footway",
        "bridleway",
        "steps",
        "unknown",
        "unpaved",
        "other0",
        "other1",
        "other2",
        "other3",
        "other4",
        "other5",
        "other6",
        "other7",
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    /// Returns the name used in the XML interchange format.
    pub fn name(self) -> &'static str {
        Self::NAMES[self.index()]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .position(|&n| n == name)
            .and_then(Self::from_index)
    }

    /// Returns true for slip roads connecting roads of the same class.
    pub fn is_link(self) -> bool {
        matches!(
            self,
            Self::MotorwayLink | Self::TrunkRoadLink | Self::PrimaryRoadLink | Self::SecondaryRoadLink
        )
    }

    /// Returns true for both kinds of ferry routes.
    pub fn is_ferry(self) -> bool {
        matches!(self, Self::VehicularFerry | Self::PassengerFerry)
    }

    /// Returns true if this road has a lower status than `other`.
    #[inline]
    pub fn is_less_important_than(self, other: RoadType) -> bool {
        self.index() > other.index()
    }
}

impl fmt::Display for RoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Gradient bucket of an edge, in the direction of travel.
///
/// Buckets 0 to 3 cover increasing steepness; `Up0` and `Down0` are (nearly) flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum Gradient {
    #[default]
    Up0 = 0,
    Up1,
    Up2,
    Up3,
    Down0,
    Down1,
    Down2,
    Down3,
}

impl Gradient {
    pub const COUNT: usize = 8;

    pub const ALL: [Gradient; Self::COUNT] = [
        Self::Up0,
        Self::Up1,
        Self::Up2,
        Self::Up3,
        Self::Down0,
        Self::Down1,
        Self::Down2,
        Self::Down3,
    ];

    const NAMES: [&'static str; Self::COUNT] =
        ["up0", "up1", "up2", "up3", "down0", "down1", "down2", "down3"];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn name(self) -> &'static str {
        Self::NAMES[self.index()]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .position(|&n| n == name)
            .and_then(Self::from_index)
    }

    /// Returns the same steepness in the opposite direction of travel.
    pub fn reversed(self) -> Self {
        match self {
            Self::Up0 => Self::Down0,
            Self::Up1 => Self::Down1,
            Self::Up2 => Self::Down2,
            Self::Up3 => Self::Down3,
            Self::Down0 => Self::Up0,
            Self::Down1 => Self::Up1,
            Self::Down2 => Self::Up2,
            Self::Down3 => Self::Up3,
        }
    }
}

impl fmt::Display for Gradient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn road_type_indices() {
        for (i, rt) in RoadType::ALL.iter().enumerate() {
            assert_eq!(rt.index(), i);
            assert_eq!(RoadType::from_index(i), Some(*rt));
        }
        assert_eq!(RoadType::from_index(32), None);
        assert_eq!(RoadType::Unknown.index(), 22);
        assert_eq!(RoadType::Other7.index(), 31);
    }

    #[test]
    fn road_type_names() {
        assert_eq!(RoadType::from_name("motorway_link"), Some(RoadType::MotorwayLink));
        assert_eq!(RoadType::from_name("other3"), Some(RoadType::Other3));
        assert_eq!(RoadType::from_name("highway"), None);
        assert_eq!(RoadType::LivingStreet.to_string(), "living_street");
    }

    #[test]
    fn road_type_status() {
        assert!(RoadType::MotorwayLink.is_less_important_than(RoadType::Motorway));
        assert!(!RoadType::PrimaryRoad.is_less_important_than(RoadType::SecondaryRoad));
        assert!(RoadType::TrunkRoadLink.is_link());
        assert!(!RoadType::TertiaryRoad.is_link());
    }

    #[test]
    fn gradients() {
        assert_eq!(Gradient::from_name("down2"), Some(Gradient::Down2));
        assert_eq!(Gradient::Up3.reversed(), Gradient::Down3);
        assert_eq!(Gradient::Down0.reversed(), Gradient::Up0);
        assert_eq!(Gradient::from_index(8), None);
    }
}
