// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use bitflags::bitflags;

bitflags! {
    /// Access restriction bits.
    ///
    /// On a road (see [RawEdge::access](crate::RawEdge::access)) a set bit means
    /// "no access" for that kind of traveller; on a [VehicleType] a set bit means
    /// "this vehicle is such a traveller". A road is restricted for a vehicle if the two
    /// sets intersect.
    ///
    /// [AccessFlags::WRONG_WAY] marks a road traversed against its one-way direction;
    /// vehicles which must obey one-way restrictions carry the same bit.
    /// [AccessFlags::OTHER] marks weight, dimension or hazardous goods limits;
    /// vehicles with any such property known carry the same bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u32 {
        const WRONG_WAY = 0x0010_0000;
        const BICYCLE = 0x0020_0000;
        const MOTORCYCLE = 0x0040_0000;
        const CAR = 0x0080_0000;
        const HIGH_OCCUPANCY = 0x0100_0000;
        const LIGHT_GOODS = 0x0200_0000;
        const HEAVY_GOODS = 0x0400_0000;
        const BUS = 0x0800_0000;
        const TAXI = 0x1000_0000;
        const PEDESTRIAN = 0x2000_0000;
        const EMERGENCY = 0x4000_0000;
        const OTHER = 0x8000_0000;

        /// All vehicle-type bits, excluding the wrong-way and other-limit bits.
        const VEHICLES = 0x7FE0_0000;

        /// Roads on which only pedestrians may go.
        const PEDESTRIAN_ONLY = Self::VEHICLES.bits() & !Self::PEDESTRIAN.bits();

        /// Roads on which only bicycles may go.
        const BICYCLE_ONLY = Self::VEHICLES.bits() & !Self::BICYCLE.bits();

        /// Roads closed to all motor vehicles.
        const NO_MOTOR_VEHICLES = Self::VEHICLES.bits()
            & !(Self::BICYCLE.bits() | Self::PEDESTRIAN.bits());
    }
}

/// Properties of the vehicle (or traveller) a route is made for.
///
/// Dimensions and weights of zero or less mean "unknown", and never cause any restriction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleType {
    /// Kinds of traveller this vehicle counts as, and whether it obeys one-way
    /// restrictions ([AccessFlags::WRONG_WAY]).
    pub access: AccessFlags,

    /// Weight in metric tonnes.
    pub weight: f64,

    /// Axle load in metric tonnes.
    pub axle_load: f64,

    /// Double axle load in metric tonnes.
    pub double_axle_load: f64,

    /// Triple axle load in metric tonnes.
    pub triple_axle_load: f64,

    /// Height in metres.
    pub height: f64,

    /// Width in metres.
    pub width: f64,

    /// Length in metres.
    pub length: f64,

    /// Is the vehicle carrying hazardous materials?
    pub hazmat: bool,
}

impl Default for VehicleType {
    fn default() -> Self {
        Self::with_access(AccessFlags::CAR | AccessFlags::WRONG_WAY)
    }
}

impl VehicleType {
    /// Creates a vehicle with given access flags and no known dimensions.
    pub const fn with_access(access: AccessFlags) -> Self {
        Self {
            access,
            weight: 0.0,
            axle_load: 0.0,
            double_axle_load: 0.0,
            triple_axle_load: 0.0,
            height: 0.0,
            width: 0.0,
            length: 0.0,
            hazmat: false,
        }
    }

    /// Returns true if any dimension, weight or hazardous cargo is given.
    pub fn has_limits(&self) -> bool {
        self.hazmat
            || [
                self.weight,
                self.axle_load,
                self.double_axle_load,
                self.triple_axle_load,
                self.height,
                self.width,
                self.length,
            ]
            .iter()
            .any(|&v| v > 0.0)
    }

    /// Clamps all dimensions to non-negative finite values, and sets
    /// [AccessFlags::OTHER] if and only if [VehicleType::has_limits].
    pub fn normalize(&mut self) {
        for v in [
            &mut self.weight,
            &mut self.axle_load,
            &mut self.double_axle_load,
            &mut self.triple_axle_load,
            &mut self.height,
            &mut self.width,
            &mut self.length,
        ] {
            if !v.is_finite() || *v < 0.0 {
                *v = 0.0;
            }
        }

        let other = self.has_limits();
        self.access.set(AccessFlags::OTHER, other);
    }

    /// Returns true if the vehicle must obey one-way restrictions.
    pub fn obeys_one_way(&self) -> bool {
        self.access.contains(AccessFlags::WRONG_WAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_layout() {
        assert_eq!(AccessFlags::WRONG_WAY.bits(), 0x0010_0000);
        assert_eq!(AccessFlags::PEDESTRIAN.bits(), 0x2000_0000);
        assert_eq!(AccessFlags::OTHER.bits(), 0x8000_0000);
        assert!(AccessFlags::PEDESTRIAN_ONLY.contains(AccessFlags::CAR));
        assert!(!AccessFlags::PEDESTRIAN_ONLY.contains(AccessFlags::PEDESTRIAN));
        assert!(!AccessFlags::NO_MOTOR_VEHICLES.intersects(AccessFlags::BICYCLE));
    }

    #[test]
    fn default_vehicle() {
        let v = VehicleType::default();
        assert_eq!(v.access, AccessFlags::CAR | AccessFlags::WRONG_WAY);
        assert!(v.obeys_one_way());
        assert!(!v.has_limits());
    }

    #[test]
    fn normalize() {
        let mut v = VehicleType::default();
        v.height = 4.1;
        v.weight = -3.0;
        v.width = f64::NAN;
        v.normalize();

        assert_eq!(v.weight, 0.0);
        assert_eq!(v.width, 0.0);
        assert_eq!(v.height, 4.1);
        assert!(v.access.contains(AccessFlags::OTHER));

        v.height = 0.0;
        v.normalize();
        assert!(!v.access.contains(AccessFlags::OTHER));
    }
}
