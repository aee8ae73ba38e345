// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Text rendering of [NavigatorTurns](crate::NavigatorTurn).

use log::debug;

use crate::profile::{AccessFlags, Profile};
use crate::turn::{RoundaboutState, TurnType};
use crate::NavigatorTurn;

const METRES_PER_MILE: f64 = 1609.344;
const METRES_PER_YARD: f64 = 0.9144;

/// Turns closer than this (in metres) are announced without a distance.
const IMMEDIATE_DISTANCE: f64 = 10.0;

/// Renders human readable instructions for a turn.
pub trait Instructions: Send + Sync {
    /// Describes `turn`, e.g. "In 300 metres, turn left onto North Street".
    ///
    /// `locale` is a language tag such as "en-GB"; implementations fall back to
    /// a language they support. `metric_units` selects metres over yards and miles,
    /// and `abbreviate` requests short unit names.
    fn render(
        &self,
        turn: &NavigatorTurn,
        profile: &Profile,
        locale: &str,
        metric_units: bool,
        abbreviate: bool,
    ) -> String;
}

/// Plain English [Instructions].
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishInstructions;

impl Instructions for EnglishInstructions {
    fn render(
        &self,
        turn: &NavigatorTurn,
        profile: &Profile,
        locale: &str,
        metric_units: bool,
        abbreviate: bool,
    ) -> String {
        if !locale.is_empty() && !locale.starts_with("en") {
            debug!("no instructions for locale {:?}, using English", locale);
        }

        let mut text = action(turn, profile);
        if !turn.arrival {
            if let Some(road) = road_description(&turn.to_name, &turn.to_ref) {
                text = format!("{} onto {}", text, road);
            }
        }
        if turn.distance >= IMMEDIATE_DISTANCE {
            text = format!(
                "in {}, {}",
                format_distance(turn.distance, metric_units, abbreviate),
                text
            );
        }

        return capitalize(&text);
    }
}

fn action(turn: &NavigatorTurn, profile: &Profile) -> String {
    if turn.arrival {
        return "arrive at your destination".to_string();
    }

    let t = &turn.turn;
    match t.roundabout {
        RoundaboutState::Enter | RoundaboutState::Continue if t.exit_number > 0 => {
            return format!("at the roundabout, take the {} exit", ordinal(t.exit_number));
        }
        RoundaboutState::Enter => return "enter the roundabout".to_string(),
        RoundaboutState::Exit => return "leave the roundabout".to_string(),
        _ => {}
    }

    let s = match t.turn_type {
        TurnType::None | TurnType::Ahead => "continue",
        TurnType::BearLeft if t.is_fork => "keep left",
        TurnType::BearRight if t.is_fork => "keep right",
        TurnType::BearLeft => "bear left",
        TurnType::BearRight => "bear right",
        TurnType::Left => "turn left",
        TurnType::Right => "turn right",
        TurnType::SharpLeft => "turn sharp left",
        TurnType::SharpRight => "turn sharp right",
        TurnType::Around
            if profile
                .vehicle
                .access
                .intersects(AccessFlags::PEDESTRIAN | AccessFlags::BICYCLE) =>
        {
            "turn around"
        }
        TurnType::Around => "make a U-turn",
    };
    return s.to_string();
}

fn road_description(name: &str, ref_: &str) -> Option<String> {
    match (name.is_empty(), ref_.is_empty()) {
        (false, false) => Some(format!("{} ({})", name, ref_)),
        (false, true) => Some(name.to_string()),
        (true, false) => Some(ref_.to_string()),
        (true, true) => None,
    }
}

fn ordinal(n: i32) -> String {
    const WORDS: [&str; 10] = [
        "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth",
        "tenth",
    ];

    if (1..=10).contains(&n) {
        return WORDS[(n - 1) as usize].to_string();
    }

    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    return format!("{}{}", n, suffix);
}

/// Formats a value with at most one decimal place, dropping a trailing ".0".
fn format_decimal(v: f64) -> String {
    let r = (v * 10.0).round() / 10.0;
    if r.fract() == 0.0 {
        format!("{:.0}", r)
    } else {
        format!("{:.1}", r)
    }
}

pub(crate) fn format_distance(metres: f64, metric_units: bool, abbreviate: bool) -> String {
    let unit = |short: &'static str, long: &'static str| if abbreviate { short } else { long };

    if metric_units {
        let rounded = (metres / 10.0).round() * 10.0;
        if rounded < 1000.0 {
            format!("{:.0} {}", rounded, unit("m", "metres"))
        } else {
            format!("{} {}", format_decimal(metres / 1000.0), unit("km", "kilometres"))
        }
    } else {
        let miles = metres / METRES_PER_MILE;
        if miles < 0.1 {
            let yards = (metres / METRES_PER_YARD / 10.0).round() * 10.0;
            format!("{:.0} {}", yards, unit("yd", "yards"))
        } else {
            format!("{} {}", format_decimal(miles), unit("mi", "miles"))
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::Turn;
    use crate::ProfileType;

    fn turn(turn_type: TurnType, distance: f64, to_name: &str) -> NavigatorTurn {
        NavigatorTurn {
            turn: Turn {
                turn_type,
                ..Default::default()
            },
            distance,
            to_name: to_name.to_string(),
            ..Default::default()
        }
    }

    fn render(t: &NavigatorTurn, metric_units: bool, abbreviate: bool) -> String {
        EnglishInstructions.render(t, &Profile::default(), "en", metric_units, abbreviate)
    }

    #[test]
    fn turn_onto_road() {
        let t = turn(TurnType::Left, 300.0, "North Street");
        assert_eq!(render(&t, true, false), "In 300 metres, turn left onto North Street");
        assert_eq!(render(&t, true, true), "In 300 m, turn left onto North Street");
    }

    #[test]
    fn immediate_turn() {
        let t = turn(TurnType::SharpRight, 4.0, "");
        assert_eq!(render(&t, true, false), "Turn sharp right");
    }

    #[test]
    fn road_with_ref() {
        let mut t = turn(TurnType::BearRight, 1234.0, "Ring Road");
        t.to_ref = "A1".to_string();
        assert_eq!(render(&t, true, false), "In 1.2 kilometres, bear right onto Ring Road (A1)");

        t.turn.is_fork = true;
        t.distance = 2000.0;
        assert_eq!(render(&t, true, true), "In 2 km, keep right onto Ring Road (A1)");
    }

    #[test]
    fn imperial_units() {
        let t = turn(TurnType::Right, 2.5 * METRES_PER_MILE, "");
        assert_eq!(render(&t, false, false), "In 2.5 miles, turn right");

        let t = turn(TurnType::Right, 100.0 * METRES_PER_YARD, "");
        assert_eq!(render(&t, false, true), "In 100 yd, turn right");
    }

    #[test]
    fn roundabout() {
        let mut t = turn(TurnType::Right, 0.0, "");
        t.turn.roundabout = RoundaboutState::Enter;
        t.turn.exit_number = 3;
        assert_eq!(render(&t, true, false), "At the roundabout, take the third exit");
    }

    #[test]
    fn arrival() {
        let mut t = turn(TurnType::None, 5.0, "");
        t.arrival = true;
        assert_eq!(render(&t, true, false), "Arrive at your destination");

        t.distance = 250.0;
        assert_eq!(render(&t, true, false), "In 250 metres, arrive at your destination");
    }

    #[test]
    fn around() {
        let t = turn(TurnType::Around, 0.0, "");
        assert_eq!(render(&t, true, false), "Make a U-turn");

        let walk = Profile::new(ProfileType::Walk);
        assert_eq!(
            EnglishInstructions.render(&t, &walk, "en", true, false),
            "Turn around"
        );
    }

    #[test]
    fn ordinals() {
        assert_eq!(ordinal(1), "first");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(22), "22nd");
        assert_eq!(ordinal(103), "103rd");
    }
}
