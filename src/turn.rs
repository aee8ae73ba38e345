// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fmt;

use crate::geometry::wrap_degrees;

/// Lower bounds (in degrees, inclusive) of the bear, plain and sharp turn categories.
pub const BEAR_ANGLE: f64 = 15.0;
pub const PLAIN_ANGLE: f64 = 45.0;
pub const SHARP_ANGLE: f64 = 120.0;

/// Junctions whose absolute turn angle is at least this large (within 1/32 of a circle
/// of a full reversal) and which lead back onto the same road are U-turns.
pub const U_TURN_ANGLE: f64 = 180.0 - 360.0 / 32.0;

/// Two roads leaving a junction within this angle of each other form a fork.
pub const FORK_ANGLE: f64 = 22.5;

/// Category of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TurnType {
    /// No turn: the start or the end of a route, or an unknown angle.
    #[default]
    None,
    Ahead,
    BearRight,
    Right,
    SharpRight,
    Around,
    SharpLeft,
    Left,
    BearLeft,
}

/// Turns are merged only if they are in the same family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TurnFamily {
    Straight,
    Left,
    Right,
    Around,
}

impl TurnType {
    /// Buckets a turn angle (positive is right) into a category.
    /// Never returns [TurnType::Around]; NaN gives [TurnType::None].
    pub fn from_angle(angle: f64) -> Self {
        if angle.is_nan() {
            Self::None
        } else if angle >= SHARP_ANGLE {
            Self::SharpRight
        } else if angle >= PLAIN_ANGLE {
            Self::Right
        } else if angle >= BEAR_ANGLE {
            Self::BearRight
        } else if angle > -BEAR_ANGLE {
            Self::Ahead
        } else if angle > -PLAIN_ANGLE {
            Self::BearLeft
        } else if angle > -SHARP_ANGLE {
            Self::Left
        } else {
            Self::SharpLeft
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ahead => "ahead",
            Self::BearRight => "bear_right",
            Self::Right => "right",
            Self::SharpRight => "sharp_right",
            Self::Around => "around",
            Self::SharpLeft => "sharp_left",
            Self::Left => "left",
            Self::BearLeft => "bear_left",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Self::None),
            "ahead" => Some(Self::Ahead),
            "bear_right" => Some(Self::BearRight),
            "right" => Some(Self::Right),
            "sharp_right" => Some(Self::SharpRight),
            "around" => Some(Self::Around),
            "sharp_left" => Some(Self::SharpLeft),
            "left" => Some(Self::Left),
            "bear_left" => Some(Self::BearLeft),
            _ => None,
        }
    }

    /// Returns false for [TurnType::None] and [TurnType::Ahead], which
    /// need no action from the traveller.
    pub fn is_significant(self) -> bool {
        !matches!(self, Self::None | Self::Ahead)
    }

    /// Returns the same manoeuvre mirrored left-to-right.
    pub fn mirrored(self) -> Self {
        match self {
            Self::BearRight => Self::BearLeft,
            Self::Right => Self::Left,
            Self::SharpRight => Self::SharpLeft,
            Self::SharpLeft => Self::SharpRight,
            Self::Left => Self::Right,
            Self::BearLeft => Self::BearRight,
            other => other,
        }
    }

    pub(crate) fn family(self) -> TurnFamily {
        match self {
            Self::None | Self::Ahead => TurnFamily::Straight,
            Self::BearLeft | Self::Left | Self::SharpLeft => TurnFamily::Left,
            Self::BearRight | Self::Right | Self::SharpRight => TurnFamily::Right,
            Self::Around => TurnFamily::Around,
        }
    }

    /// Orders categories by how much they deviate from going straight on.
    pub(crate) fn significance(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Ahead => 1,
            Self::BearLeft | Self::BearRight => 2,
            Self::Left | Self::Right => 3,
            Self::SharpLeft | Self::SharpRight => 4,
            Self::Around => 5,
        }
    }
}

impl fmt::Display for TurnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Relation of a turn to a roundabout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RoundaboutState {
    #[default]
    None,
    Enter,
    Continue,
    Exit,
}

impl RoundaboutState {
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Enter => "enter",
            Self::Continue => "continue",
            Self::Exit => "exit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Self::None),
            "enter" => Some(Self::Enter),
            "continue" => Some(Self::Continue),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }

    /// Returns the state of the same junction passed in the opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Self::Enter => Self::Exit,
            Self::Exit => Self::Enter,
            other => other,
        }
    }
}

/// A decision point: the junction at which a [RouteSegment](crate::RouteSegment) starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub turn_type: TurnType,

    /// Set if the turn continues along the current road.
    pub is_continue: bool,

    pub roundabout: RoundaboutState,

    /// Turn angle in degrees, in (-180, 180]; negative turns are to the left.
    pub angle: f64,

    /// Bearing of travel into the junction.
    pub in_direction: f64,

    /// Bearing of travel out of the junction.
    pub out_direction: f64,

    /// Exit to take from a roundabout, counting from the entry.
    pub exit_number: i32,

    /// Number of ways out of the junction, including the one taken;
    /// zero if unknown.
    pub choices: i32,

    /// Number of ways out to the left of the one taken.
    pub left_alternatives: i32,

    /// Number of ways out to the right of the one taken.
    pub right_alternatives: i32,

    /// Set if the junction is a fork: another way out leaves at a small angle.
    pub is_fork: bool,

    /// Set if the turn leaves the current road for a road of lower status.
    pub is_turn_off: bool,

    pub junction_name: String,
    pub junction_ref: String,
}

impl Default for Turn {
    fn default() -> Self {
        Self {
            turn_type: TurnType::None,
            is_continue: true,
            roundabout: RoundaboutState::None,
            angle: 0.0,
            in_direction: 0.0,
            out_direction: 0.0,
            exit_number: 0,
            choices: 0,
            left_alternatives: 0,
            right_alternatives: 0,
            is_fork: false,
            is_turn_off: false,
            junction_name: String::default(),
            junction_ref: String::default(),
        }
    }
}

impl Turn {
    /// Sets the geometry and the junction description, and classifies the turn.
    ///
    /// `in_direction` and `out_direction` are travel bearings into and out of the
    /// junction. A turn that would be [TurnType::Ahead] is reported as a bear turn
    /// when the junction is a turn-off, or a fork with exactly two ways out; bearing
    /// right if other ways out lie to the left.
    #[allow(clippy::too_many_arguments)]
    pub fn set(
        &mut self,
        in_direction: f64,
        out_direction: f64,
        choices: i32,
        left_alternatives: i32,
        right_alternatives: i32,
        is_fork: bool,
        is_turn_off: bool,
    ) {
        self.in_direction = in_direction;
        self.out_direction = out_direction;
        self.choices = choices;
        self.left_alternatives = left_alternatives;
        self.right_alternatives = right_alternatives;
        self.is_fork = is_fork;
        self.is_turn_off = is_turn_off;
        self.set_angle(in_direction - out_direction);
    }

    /// Sets the turn angle (positive is right) and classifies the turn,
    /// keeping the junction description.
    pub fn set_angle(&mut self, angle: f64) {
        // A full reversal is kept at -180 if that's what the bearings give.
        self.angle = if (-180.0..=180.0).contains(&angle) {
            angle
        } else {
            wrap_degrees(angle)
        };

        self.turn_type = TurnType::from_angle(self.angle);
        if self.turn_type == TurnType::Ahead
            && (self.is_turn_off || (self.is_fork && self.choices == 2))
        {
            self.turn_type = if self.left_alternatives > 0 {
                TurnType::BearRight
            } else {
                TurnType::BearLeft
            };
        }
    }

    /// Resets the turn to its default (no turn, continuing on the same road).
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
