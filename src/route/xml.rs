// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{self, BufRead};

use log::debug;
use quick_xml::events::{BytesDecl, BytesEnd, Event};

use super::{PathToJunction, Route, RouteSegment};
use crate::geometry::{Path, Point};
use crate::profile::xml::{ProfileReader, PROFILE_ELEMENT};
use crate::profile::{Profile, RoadType};
use crate::turn::{RoundaboutState, Turn, TurnType};
use crate::xml::{start, yes_no, BufParser, Element, IoParser, Parser};
use crate::Error;

/// Encoding of a route file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// Unknown format - guess the format based on the content when reading,
    /// and write uncompressed XML.
    #[default]
    Unknown,

    /// Force uncompressed XML
    Xml,

    /// Force XML with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    XmlGz,

    /// Force XML with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    XmlBz2,
}

impl FileFormat {
    /// Guesses the format from the first bytes of a file.
    pub fn detect(head: &[u8]) -> Self {
        if head.starts_with(&[0x1f, 0x8b]) {
            Self::XmlGz
        } else if head.starts_with(b"BZh") {
            Self::XmlBz2
        } else {
            Self::Xml
        }
    }

    /// Guesses the format from the extension of a file name.
    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("gz") => Self::XmlGz,
            Some("bz2") => Self::XmlBz2,
            Some("xml") => Self::Xml,
            _ => Self::Unknown,
        }
    }
}

const ROUTE_ELEMENT: &str = "Route";
const SEGMENT_ELEMENT: &str = "Segment";
const PATH_TO_JUNCTION_ELEMENT: &str = "PathToJunction";

impl Route {
    /// Writes the route as an XML document, compressed as requested.
    pub fn write_as_xml<W: io::Write>(&self, w: W, format: FileFormat) -> Result<(), Error> {
        match format {
            FileFormat::Unknown | FileFormat::Xml => {
                let mut w = w;
                self.write_document(&mut w)
            }

            FileFormat::XmlGz => {
                let mut e = flate2::write::GzEncoder::new(w, flate2::Compression::default());
                self.write_document(&mut e)?;
                e.finish()?;
                Ok(())
            }

            FileFormat::XmlBz2 => {
                let mut e = bzip2::write::BzEncoder::new(w, bzip2::Compression::default());
                self.write_document(&mut e)?;
                e.finish()?;
                Ok(())
            }
        }
    }

    /// Writes the route to a file. [FileFormat::Unknown] picks the format based on the extension.
    pub fn write_xml_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
        format: FileFormat,
    ) -> Result<(), Error> {
        let format = match format {
            FileFormat::Unknown => FileFormat::from_path(&path),
            f => f,
        };
        let f = io::BufWriter::new(File::create(path)?);
        self.write_as_xml(f, format)
    }

    fn write_document<W: io::Write>(&self, w: &mut W) -> Result<(), Error> {
        let mut writer = quick_xml::Writer::new_with_indent(w, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(start(
            ROUTE_ELEMENT,
            &[
                ("distance", self.distance.to_string()),
                ("time", self.time.to_string()),
                ("point_scale", self.point_scale.to_string()),
            ],
        )))?;

        self.profile.write_xml_element(&mut writer)?;

        for (position, ptj) in [
            ("before", &self.path_to_junction_before),
            ("after", &self.path_to_junction_after),
        ] {
            if !ptj.is_empty() {
                write_path_to_junction(&mut writer, position, ptj)?;
            }
        }

        for s in &self.segments {
            write_segment(&mut writer, s)?;
        }

        writer.write_event(Event::End(BytesEnd::new(ROUTE_ELEMENT)))?;
        Ok(())
    }

    /// Reads a route from an XML document, decompressing it if necessary.
    /// [FileFormat::Unknown] detects the compression from the content.
    ///
    /// The provided stream will be automatically wrapped in a buffered reader.
    pub fn read_from_xml<R: io::Read>(reader: R, format: FileFormat) -> Result<Route, Error> {
        let mut b = io::BufReader::new(reader);
        let format = match format {
            FileFormat::Unknown => FileFormat::detect(b.fill_buf()?),
            f => f,
        };

        match format {
            FileFormat::Unknown | FileFormat::Xml => read_route(IoParser::new(b)),

            FileFormat::XmlGz => {
                let d = flate2::read::MultiGzDecoder::new(b);
                read_route(IoParser::new(io::BufReader::new(d)))
            }

            FileFormat::XmlBz2 => {
                let d = bzip2::read::MultiBzDecoder::new(b);
                read_route(IoParser::new(io::BufReader::new(d)))
            }
        }
    }

    /// Reads a route from a file.
    pub fn read_from_xml_file<P: AsRef<std::path::Path>>(
        path: P,
        format: FileFormat,
    ) -> Result<Route, Error> {
        let f = File::open(path)?;
        Self::read_from_xml(f, format)
    }

    /// Reads a route from an in-memory document.
    pub fn read_from_xml_buffer(data: &[u8], format: FileFormat) -> Result<Route, Error> {
        let format = match format {
            FileFormat::Unknown => FileFormat::detect(data),
            f => f,
        };

        if format == FileFormat::Xml {
            // Fast path is available for in-memory XML data
            read_route(BufParser::new(data))
        } else {
            Self::read_from_xml(io::Cursor::new(data), format)
        }
    }

    /// Writes the route path as a [GPX](https://www.topografix.com/gpx.asp) track,
    /// with one track segment per route section. `to_degrees` converts map
    /// coordinates into latitude and longitude, in that order.
    pub fn write_as_gpx<W: io::Write, F: Fn(Point) -> (f64, f64)>(
        &self,
        w: W,
        to_degrees: F,
    ) -> Result<(), Error> {
        let mut writer = quick_xml::Writer::new_with_indent(w, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(start(
            "gpx",
            &[
                ("version", "1.1".to_string()),
                ("creator", env!("CARGO_PKG_NAME").to_string()),
                ("xmlns", "http://www.topografix.com/GPX/1/1".to_string()),
            ],
        )))?;
        writer.write_event(Event::Start(start("trk", &[])))?;

        let mut sections: Vec<Path> = Vec::default();
        let mut current_section: Option<i32> = None;
        for s in &self.segments {
            if current_section != Some(s.section) {
                sections.push(Path::new());
                current_section = Some(s.section);
            }
            if let Some(p) = sections.last_mut() {
                p.append(&s.path);
            }
        }

        for path in &sections {
            writer.write_event(Event::Start(start("trkseg", &[])))?;
            for &pt in path.points() {
                let (lat, lon) = to_degrees(pt);
                writer.write_event(Event::Empty(start(
                    "trkpt",
                    &[("lat", lat.to_string()), ("lon", lon.to_string())],
                )))?;
            }
            writer.write_event(Event::End(BytesEnd::new("trkseg")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("trk")))?;
        writer.write_event(Event::End(BytesEnd::new("gpx")))?;
        Ok(())
    }
}

fn write_points<W: io::Write>(writer: &mut quick_xml::Writer<W>, path: &Path) -> Result<(), Error> {
    for pt in path.points() {
        writer.write_event(Event::Empty(start(
            "Point",
            &[("x", pt.x.to_string()), ("y", pt.y.to_string())],
        )))?;
    }
    Ok(())
}

fn write_path_to_junction<W: io::Write>(
    writer: &mut quick_xml::Writer<W>,
    position: &str,
    ptj: &PathToJunction,
) -> Result<(), Error> {
    writer.write_event(Event::Start(start(
        PATH_TO_JUNCTION_ELEMENT,
        &[
            ("position", position.to_string()),
            ("start_road_type", ptj.start_road_type.name().to_string()),
            ("end_road_type", ptj.end_road_type.name().to_string()),
            ("distance", ptj.distance.to_string()),
        ],
    )))?;
    write_points(writer, &ptj.path)?;
    writer.write_event(Event::End(BytesEnd::new(PATH_TO_JUNCTION_ELEMENT)))?;
    Ok(())
}

fn write_segment<W: io::Write>(writer: &mut quick_xml::Writer<W>, s: &RouteSegment) -> Result<(), Error> {
    writer.write_event(Event::Start(start(
        SEGMENT_ELEMENT,
        &[
            ("road_type", s.road_type.name().to_string()),
            ("max_speed", s.max_speed_kph.to_string()),
            ("name", s.name.clone()),
            ("ref", s.ref_.clone()),
            ("distance", s.distance.to_string()),
            ("time", s.time.to_string()),
            ("turn_time", s.turn_time.to_string()),
            ("section", s.section.to_string()),
            ("restricted", yes_no(s.restricted)),
            ("toll", yes_no(s.toll)),
        ],
    )))?;

    let t = &s.turn;
    writer.write_event(Event::Empty(start(
        "Turn",
        &[
            ("type", t.turn_type.name().to_string()),
            ("continue", yes_no(t.is_continue)),
            ("roundabout", t.roundabout.name().to_string()),
            ("angle", t.angle.to_string()),
            ("in_direction", t.in_direction.to_string()),
            ("out_direction", t.out_direction.to_string()),
            ("exit_number", t.exit_number.to_string()),
            ("choices", t.choices.to_string()),
            ("left_alternatives", t.left_alternatives.to_string()),
            ("right_alternatives", t.right_alternatives.to_string()),
            ("fork", yes_no(t.is_fork)),
            ("turn_off", yes_no(t.is_turn_off)),
            ("junction_name", t.junction_name.clone()),
            ("junction_ref", t.junction_ref.clone()),
        ],
    )))?;

    write_points(writer, &s.path)?;
    writer.write_event(Event::End(BytesEnd::new(SEGMENT_ELEMENT)))?;
    Ok(())
}

fn road_type(e: &Element, key: &str) -> Result<RoadType, Error> {
    e.parse_with(key, RoadType::default(), RoadType::from_name)
}

/// Accumulates a [Route] from a stream of XML elements.
#[derive(Default)]
struct RouteReader {
    route: Option<Route>,
    profile: Option<ProfileReader>,
    segment: Option<RouteSegment>,
    path_to_junction: Option<(bool, PathToJunction)>,
    done: bool,
}

impl RouteReader {
    fn start(&mut self, e: &Element) -> Result<(), Error> {
        match e.name.as_str() {
            ROUTE_ELEMENT => {
                self.route = Some(Route::new(Profile::default(), e.f64("point_scale", 1.0)?));
            }

            PROFILE_ELEMENT => self.profile = Some(ProfileReader::new(e)?),

            SEGMENT_ELEMENT => {
                self.segment = Some(RouteSegment {
                    road_type: road_type(e, "road_type")?,
                    max_speed_kph: e.f64("max_speed", 0.0)?,
                    name: e.str("name").to_string(),
                    ref_: e.str("ref").to_string(),
                    distance: e.f64("distance", 0.0)?,
                    time: e.f64("time", 0.0)?,
                    turn_time: e.f64("turn_time", 0.0)?,
                    section: e.i32("section", 0)?,
                    restricted: e.bool("restricted", false)?,
                    toll: e.bool("toll", false)?,
                    ..Default::default()
                })
            }

            "Turn" => {
                if let Some(s) = self.segment.as_mut() {
                    s.turn = Turn {
                        turn_type: e.parse_with("type", TurnType::None, TurnType::from_name)?,
                        is_continue: e.bool("continue", true)?,
                        roundabout: e.parse_with(
                            "roundabout",
                            RoundaboutState::None,
                            RoundaboutState::from_name,
                        )?,
                        angle: e.f64("angle", 0.0)?,
                        in_direction: e.f64("in_direction", 0.0)?,
                        out_direction: e.f64("out_direction", 0.0)?,
                        exit_number: e.i32("exit_number", 0)?,
                        choices: e.i32("choices", 0)?,
                        left_alternatives: e.i32("left_alternatives", 0)?,
                        right_alternatives: e.i32("right_alternatives", 0)?,
                        is_fork: e.bool("fork", false)?,
                        is_turn_off: e.bool("turn_off", false)?,
                        junction_name: e.str("junction_name").to_string(),
                        junction_ref: e.str("junction_ref").to_string(),
                    };
                }
            }

            PATH_TO_JUNCTION_ELEMENT => {
                let after = e.str("position") == "after";
                self.path_to_junction = Some((
                    after,
                    PathToJunction {
                        path: Path::new(),
                        start_road_type: road_type(e, "start_road_type")?,
                        end_road_type: road_type(e, "end_road_type")?,
                        distance: e.f64("distance", 0.0)?,
                    },
                ));
            }

            "Point" => {
                let pt = Point::new(e.f64("x", 0.0)?, e.f64("y", 0.0)?);
                if let Some(s) = self.segment.as_mut() {
                    s.path.push(pt);
                } else if let Some((_, ptj)) = self.path_to_junction.as_mut() {
                    ptj.path.push(pt);
                }
            }

            _ => {
                if let Some(p) = self.profile.as_mut() {
                    p.element(e)?;
                }
            }
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"RouteProfile" => {
                if let (Some(p), Some(r)) = (self.profile.take(), self.route.as_mut()) {
                    r.profile = p.finish();
                }
            }

            b"Segment" => {
                if let (Some(s), Some(r)) = (self.segment.take(), self.route.as_mut()) {
                    r.segments.push(s);
                }
            }

            b"PathToJunction" => {
                if let (Some((after, ptj)), Some(r)) =
                    (self.path_to_junction.take(), self.route.as_mut())
                {
                    if after {
                        r.path_to_junction_after = ptj;
                    } else {
                        r.path_to_junction_before = ptj;
                    }
                }
            }

            b"Route" => self.done = true,
            _ => {}
        }
    }

    fn finish(self) -> Result<Route, Error> {
        let mut r = self
            .route
            .ok_or_else(|| Error::Xml(format!("missing {} element", ROUTE_ELEMENT)))?;
        r.recompute_totals();
        debug!(
            "read a route of {} segments ({:.0} m, {:.0} s)",
            r.segments.len(),
            r.distance,
            r.time
        );
        Ok(r)
    }
}

fn read_route<P: Parser>(mut parser: P) -> Result<Route, Error> {
    let mut r = RouteReader::default();

    while !r.done {
        match parser.read_event()? {
            Event::Start(s) => {
                let e = Element::parse(&s)?;
                r.start(&e)?;
            }

            Event::Empty(s) => {
                let e = Element::parse(&s)?;
                r.start(&e)?;
                r.end(e.name.as_bytes());
            }

            Event::End(end) => r.end(end.local_name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
    }

    r.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::tests::l_route;
    use crate::ProfileType;

    fn sample_route() -> Route {
        let mut r = l_route();
        r.profile = Profile::new(ProfileType::Cycle);
        r.point_scale = 0.5;
        r.segments[0].road_type = RoadType::Cycleway;
        r.segments[0].toll = true;
        r.segments[1].ref_ = "B 12 & \"co\"".to_string();
        r.segments[1].turn.junction_name = "Market <Square>".to_string();
        r.segments[1].section = 1;
        r.path_to_junction_before = PathToJunction {
            path: Path::from_points(vec![Point::new(-10.0, 0.0), Point::ZERO]),
            start_road_type: RoadType::ServiceRoad,
            end_road_type: RoadType::Cycleway,
            distance: 10.0,
        };
        return r;
    }

    fn assert_same(read: &Route, r: &Route) {
        assert_eq!(read.segments.len(), r.segments.len());
        assert!((read.distance - r.distance).abs() <= 1e-6 * r.distance);
        assert!((read.time - r.time).abs() <= 1e-6 * r.time);
        for (a, b) in read.segments.iter().zip(&r.segments) {
            assert_eq!(a.road_type, b.road_type);
            assert_eq!(a.turn.turn_type, b.turn.turn_type);
        }
    }

    #[test]
    fn round_trip() {
        let r = sample_route();
        let mut buf = Vec::new();
        r.write_as_xml(&mut buf, FileFormat::Xml).unwrap();

        let read = Route::read_from_xml_buffer(&buf, FileFormat::Unknown).unwrap();
        assert_same(&read, &r);
        assert_eq!(read, r);
    }

    #[test]
    fn round_trip_gz() {
        let r = sample_route();
        let mut buf = Vec::new();
        r.write_as_xml(&mut buf, FileFormat::XmlGz).unwrap();
        assert_eq!(FileFormat::detect(&buf), FileFormat::XmlGz);

        let read = Route::read_from_xml(buf.as_slice(), FileFormat::Unknown).unwrap();
        assert_eq!(read, r);
    }

    #[test]
    fn round_trip_bz2() {
        let r = sample_route();
        let mut buf = Vec::new();
        r.write_as_xml(&mut buf, FileFormat::XmlBz2).unwrap();
        assert_eq!(FileFormat::detect(&buf), FileFormat::XmlBz2);

        let read = Route::read_from_xml_buffer(&buf, FileFormat::Unknown).unwrap();
        assert_eq!(read, r);
    }

    #[test]
    fn totals_are_recomputed() {
        let data = br#"<Route distance="1" time="1">
            <Segment road_type="primary" distance="100" time="10"><Point x="0" y="0"/><Point x="100" y="0"/></Segment>
            <Segment road_type="primary" distance="50" time="7"><Turn type="left"/><Point x="100" y="0"/><Point x="100" y="50"/></Segment>
        </Route>"#;
        let r = Route::read_from_xml_buffer(data, FileFormat::Xml).unwrap();
        assert_eq!(r.segments.len(), 2);
        assert_eq!(r.distance, 150.0);
        assert_eq!(r.time, 17.0);
        assert_eq!(r.segments[1].turn.turn_type, TurnType::Left);
        assert_eq!(r.path.len(), 3);
        assert_eq!(r.profile, Profile::default());
    }

    #[test]
    fn malformed_number() {
        let data = br#"<Route><Segment road_type="primary" distance="far"/></Route>"#;
        assert!(matches!(
            Route::read_from_xml_buffer(data, FileFormat::Xml),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn unknown_turn_type() {
        let data = br#"<Route><Segment><Turn type="loop"/></Segment></Route>"#;
        assert!(matches!(
            Route::read_from_xml_buffer(data, FileFormat::Xml),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn missing_route() {
        assert!(matches!(
            Route::read_from_xml_buffer(b"<gpx/>", FileFormat::Xml),
            Err(Error::Xml(_))
        ));
    }

    #[test]
    fn format_from_path() {
        assert_eq!(FileFormat::from_path("a/route.xml.gz"), FileFormat::XmlGz);
        assert_eq!(FileFormat::from_path("route.xml.bz2"), FileFormat::XmlBz2);
        assert_eq!(FileFormat::from_path("route.xml"), FileFormat::Xml);
        assert_eq!(FileFormat::from_path("route"), FileFormat::Unknown);
    }

    #[test]
    fn gpx() {
        let r = sample_route();
        let mut buf = Vec::new();
        r.write_as_gpx(&mut buf, |p| (p.y / 1000.0, p.x / 1000.0)).unwrap();
        let s = String::from_utf8(buf).unwrap();

        assert_eq!(s.matches("<trkseg>").count(), 2);
        assert_eq!(s.matches("<trkpt").count(), 4);
        assert!(s.contains(r#"<trkpt lat="0.1" lon="0.1"/>"#));
    }
}
