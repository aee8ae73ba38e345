// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::io;

use quick_xml::events::{BytesDecl, BytesEnd, Event};

use super::{AccessFlags, Gradient, Profile, RoadType};
use crate::xml::{hex, start, yes_no, BufParser, Element, IoParser, Parser};
use crate::Error;

pub(crate) const PROFILE_ELEMENT: &str = "RouteProfile";

impl Profile {
    /// Writes the profile as a standalone XML document.
    pub fn write_as_xml<W: io::Write>(&self, w: W) -> Result<(), Error> {
        let mut writer = quick_xml::Writer::new_with_indent(w, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write_xml_element(&mut writer)
    }

    /// Writes the profile as a `RouteProfile` element.
    pub(crate) fn write_xml_element<W: io::Write>(
        &self,
        writer: &mut quick_xml::Writer<W>,
    ) -> Result<(), Error> {
        writer.write_event(Event::Start(start(
            PROFILE_ELEMENT,
            &[
                ("name", self.name.clone()),
                ("turn_time", self.turn_time.to_string()),
                ("u_turn_time", self.u_turn_time.to_string()),
                ("cross_traffic_turn_time", self.cross_traffic_turn_time.to_string()),
                ("traffic_light_time", self.traffic_light_time.to_string()),
                ("shortest", yes_no(self.shortest)),
                ("shortest_by_time", yes_no(self.shortest_by_time)),
                ("toll_penalty", self.toll_penalty.to_string()),
                ("gradient_flags", hex(self.gradient_flags)),
            ],
        )))?;

        let v = &self.vehicle;
        writer.write_event(Event::Empty(start(
            "Vehicle",
            &[
                ("access", hex(v.access.bits())),
                ("weight", v.weight.to_string()),
                ("axle_load", v.axle_load.to_string()),
                ("double_axle_load", v.double_axle_load.to_string()),
                ("triple_axle_load", v.triple_axle_load.to_string()),
                ("height", v.height.to_string()),
                ("width", v.width.to_string()),
                ("length", v.length.to_string()),
                ("hazmat", yes_no(v.hazmat)),
            ],
        )))?;

        for rt in RoadType::ALL {
            let i = rt.index();
            writer.write_event(Event::Empty(start(
                "Road",
                &[
                    ("type", rt.name().to_string()),
                    ("speed", self.speed[i].to_string()),
                    ("bonus", self.bonus[i].to_string()),
                    ("override", hex(self.restriction_override[i].bits())),
                ],
            )))?;
        }

        for g in Gradient::ALL {
            let i = g.index();
            writer.write_event(Event::Empty(start(
                "Gradient",
                &[
                    ("type", g.name().to_string()),
                    ("speed", self.gradient_speed[i].to_string()),
                    ("bonus", self.gradient_bonus[i].to_string()),
                ],
            )))?;
        }

        writer.write_event(Event::End(BytesEnd::new(PROFILE_ELEMENT)))?;
        Ok(())
    }

    /// Reads a profile from an XML document containing a `RouteProfile` element.
    ///
    /// Fields missing from the document keep their [Profile::default] values.
    pub fn read_from_xml<R: io::Read>(reader: R) -> Result<Self, Error> {
        read_profile(IoParser::new(io::BufReader::new(reader)))
    }

    /// Reads a profile from an in-memory XML document.
    pub fn read_from_xml_buffer(data: &[u8]) -> Result<Self, Error> {
        read_profile(BufParser::new(data))
    }
}

fn read_profile<P: Parser>(mut parser: P) -> Result<Profile, Error> {
    let mut reader: Option<ProfileReader> = None;

    loop {
        match parser.read_event()? {
            Event::Start(s) => {
                let e = Element::parse(&s)?;
                if e.name == PROFILE_ELEMENT {
                    reader = Some(ProfileReader::new(&e)?);
                } else if let Some(r) = reader.as_mut() {
                    r.element(&e)?;
                }
            }

            Event::Empty(s) => {
                let e = Element::parse(&s)?;
                if e.name == PROFILE_ELEMENT {
                    return Ok(ProfileReader::new(&e)?.finish());
                } else if let Some(r) = reader.as_mut() {
                    r.element(&e)?;
                }
            }

            Event::End(end) => {
                if end.local_name().as_ref() == PROFILE_ELEMENT.as_bytes() {
                    if let Some(r) = reader.take() {
                        return Ok(r.finish());
                    }
                }
            }

            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::Xml(format!("missing {} element", PROFILE_ELEMENT)))
}

/// Accumulates a [Profile] from the contents of a `RouteProfile` element.
pub(crate) struct ProfileReader {
    profile: Profile,
}

impl ProfileReader {
    /// Starts reading a profile from the attributes of a `RouteProfile` element.
    pub(crate) fn new(e: &Element) -> Result<Self, Error> {
        let d = Profile::default();
        let profile = Profile {
            name: e.str("name").to_string(),
            turn_time: e.f64("turn_time", d.turn_time)?,
            u_turn_time: e.f64("u_turn_time", d.u_turn_time)?,
            cross_traffic_turn_time: e.f64("cross_traffic_turn_time", d.cross_traffic_turn_time)?,
            traffic_light_time: e.f64("traffic_light_time", d.traffic_light_time)?,
            shortest: e.bool("shortest", d.shortest)?,
            shortest_by_time: e.bool("shortest_by_time", d.shortest_by_time)?,
            toll_penalty: e.f64("toll_penalty", d.toll_penalty)?,
            gradient_flags: e.hex_u32("gradient_flags", d.gradient_flags)?,
            ..d
        };
        Ok(Self { profile })
    }

    /// Handles an element nested in `RouteProfile`; unknown elements are ignored.
    pub(crate) fn element(&mut self, e: &Element) -> Result<(), Error> {
        match e.name.as_str() {
            "Vehicle" => {
                let v = &mut self.profile.vehicle;
                v.access = AccessFlags::from_bits_retain(e.hex_u32("access", v.access.bits())?);
                v.weight = e.f64("weight", 0.0)?;
                v.axle_load = e.f64("axle_load", 0.0)?;
                v.double_axle_load = e.f64("double_axle_load", 0.0)?;
                v.triple_axle_load = e.f64("triple_axle_load", 0.0)?;
                v.height = e.f64("height", 0.0)?;
                v.width = e.f64("width", 0.0)?;
                v.length = e.f64("length", 0.0)?;
                v.hazmat = e.bool("hazmat", false)?;
            }

            "Road" => {
                let rt = e.parse_with("type", None, |v| RoadType::from_name(v).map(Some))?;
                let Some(rt) = rt else {
                    return Err(Error::Parse {
                        element: e.name.clone(),
                        attribute: "type".to_string(),
                        value: String::default(),
                    });
                };
                let i = rt.index();
                self.profile.speed[i] = e.f64("speed", self.profile.speed[i])?;
                self.profile.bonus[i] = e.f64("bonus", self.profile.bonus[i])?;
                self.profile.restriction_override[i] = AccessFlags::from_bits_retain(
                    e.hex_u32("override", self.profile.restriction_override[i].bits())?,
                );
            }

            "Gradient" => {
                let g = e.parse_with("type", None, |v| Gradient::from_name(v).map(Some))?;
                let Some(g) = g else {
                    return Err(Error::Parse {
                        element: e.name.clone(),
                        attribute: "type".to_string(),
                        value: String::default(),
                    });
                };
                let i = g.index();
                self.profile.gradient_speed[i] = e.f64("speed", self.profile.gradient_speed[i])?;
                self.profile.gradient_bonus[i] = e.f64("bonus", self.profile.gradient_bonus[i])?;
            }

            _ => {}
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> Profile {
        self.profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProfileType;

    #[test]
    fn round_trip() {
        let mut p = Profile::new(ProfileType::Cycle);
        p.name = "touring <bike>".to_string();
        p.toll_penalty = 0.25;
        p.shortest_by_time = true;
        p.vehicle.weight = 0.1;
        p.vehicle.hazmat = true;
        p.set_speed(RoadType::Other3, 7.3, -0.1);
        p.restriction_override[RoadType::PedestrianRoad.index()] = AccessFlags::BICYCLE;
        p.gradient_bonus[Gradient::Down3.index()] = -1.5;
        p.gradient_flags = 0x0000_ffff;

        let mut buf = Vec::new();
        p.write_as_xml(&mut buf).unwrap();
        let read = Profile::read_from_xml_buffer(&buf).unwrap();
        assert_eq!(read, p);

        let read = Profile::read_from_xml(buf.as_slice()).unwrap();
        assert_eq!(read, p);
    }

    #[test]
    fn partial_document() {
        let data = br#"<RouteProfile name="slow" turn_time="8">
            <Road type="motorway" speed="80"/>
        </RouteProfile>"#;
        let p = Profile::read_from_xml_buffer(data).unwrap();
        let d = Profile::default();

        assert_eq!(p.name, "slow");
        assert_eq!(p.turn_time, 8.0);
        assert_eq!(p.u_turn_time, d.u_turn_time);
        assert_eq!(p.speed[RoadType::Motorway.index()], 80.0);
        assert_eq!(p.speed[RoadType::PrimaryRoad.index()], d.speed[RoadType::PrimaryRoad.index()]);
    }

    #[test]
    fn unknown_road_type() {
        let data = br#"<RouteProfile><Road type="highway" speed="80"/></RouteProfile>"#;
        assert!(matches!(
            Profile::read_from_xml_buffer(data),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn missing_profile() {
        assert!(matches!(
            Profile::read_from_xml_buffer(b"<Route/>"),
            Err(Error::Xml(_))
        ));
    }
}
